//! Pattern taxonomy: maps an episode's title and trigger tags onto a fixed set
//! of recurring-incident categories used for rule promotion.
//!
//! Rules are evaluated in table order and the first match wins, so narrower
//! categories sit above broader ones. Inputs no rule claims land in
//! [`PatternKey::Uncategorized`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tokenizer::normalize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKey {
    AuthTokenHandling,
    SecretExposure,
    AccessControl,
    InjectionHardening,
    InputValidation,
    ConcurrencyRace,
    ResourceLeak,
    ErrorHandling,
    NullSafety,
    MigrationSafety,
    DependencyUpgrade,
    ConfigDrift,
    PerformanceRegression,
    ApiContract,
    FlakyTests,
    Observability,
    Uncategorized,
}

impl PatternKey {
    pub const ALL: [PatternKey; 17] = [
        PatternKey::AuthTokenHandling,
        PatternKey::SecretExposure,
        PatternKey::AccessControl,
        PatternKey::InjectionHardening,
        PatternKey::InputValidation,
        PatternKey::ConcurrencyRace,
        PatternKey::ResourceLeak,
        PatternKey::ErrorHandling,
        PatternKey::NullSafety,
        PatternKey::MigrationSafety,
        PatternKey::DependencyUpgrade,
        PatternKey::ConfigDrift,
        PatternKey::PerformanceRegression,
        PatternKey::ApiContract,
        PatternKey::FlakyTests,
        PatternKey::Observability,
        PatternKey::Uncategorized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKey::AuthTokenHandling => "auth-token-handling",
            PatternKey::SecretExposure => "secret-exposure",
            PatternKey::AccessControl => "access-control",
            PatternKey::InjectionHardening => "injection-hardening",
            PatternKey::InputValidation => "input-validation",
            PatternKey::ConcurrencyRace => "concurrency-race",
            PatternKey::ResourceLeak => "resource-leak",
            PatternKey::ErrorHandling => "error-handling",
            PatternKey::NullSafety => "null-safety",
            PatternKey::MigrationSafety => "migration-safety",
            PatternKey::DependencyUpgrade => "dependency-upgrade",
            PatternKey::ConfigDrift => "config-drift",
            PatternKey::PerformanceRegression => "performance-regression",
            PatternKey::ApiContract => "api-contract",
            PatternKey::FlakyTests => "flaky-tests",
            PatternKey::Observability => "observability",
            PatternKey::Uncategorized => "uncategorized",
        }
    }

    /// Human-readable label. Every key has exactly one.
    pub fn label(self) -> &'static str {
        match self {
            PatternKey::AuthTokenHandling => "Auth token handling",
            PatternKey::SecretExposure => "Secret exposure",
            PatternKey::AccessControl => "Access control",
            PatternKey::InjectionHardening => "Injection hardening",
            PatternKey::InputValidation => "Input validation",
            PatternKey::ConcurrencyRace => "Concurrency and races",
            PatternKey::ResourceLeak => "Resource leaks",
            PatternKey::ErrorHandling => "Error handling",
            PatternKey::NullSafety => "Null safety",
            PatternKey::MigrationSafety => "Migration safety",
            PatternKey::DependencyUpgrade => "Dependency upgrades",
            PatternKey::ConfigDrift => "Configuration drift",
            PatternKey::PerformanceRegression => "Performance regressions",
            PatternKey::ApiContract => "API contract changes",
            PatternKey::FlakyTests => "Flaky tests",
            PatternKey::Observability => "Logging and observability",
            PatternKey::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKey {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TaxonomyError::UnknownKey(s.to_string()))
    }
}

/// Taxonomy configuration defects. Never raised for malformed episode input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    UnknownKey(String),
}

impl fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomyError::UnknownKey(key) => {
                write!(f, "pattern key '{key}' is not part of the taxonomy")
            }
        }
    }
}

impl std::error::Error for TaxonomyError {}

/// One row of the ordered rule table.
///
/// Tags and phrases are stored pre-normalized (lowercase, single spaces).
/// A rule matches when any normalized trigger equals one of `tags`, or any
/// of `phrases` occurs on token boundaries in the title or a trigger.
#[derive(Debug)]
pub struct TaxonomyRule {
    pub key: PatternKey,
    pub tags: &'static [&'static str],
    pub phrases: &'static [&'static str],
}

pub static TAXONOMY_RULES: &[TaxonomyRule] = &[
    TaxonomyRule {
        key: PatternKey::AuthTokenHandling,
        tags: &[
            "bearer token forwarding",
            "credential propagation",
            "token refresh",
            "token expiry",
            "session fixation",
        ],
        phrases: &[
            "bearer token",
            "bearer tokens",
            "auth token",
            "auth tokens",
            "access token",
            "access tokens",
            "refresh token",
            "refresh tokens",
            "session token",
            "jwt",
            "oauth",
        ],
    },
    TaxonomyRule {
        key: PatternKey::SecretExposure,
        tags: &["secret leak", "hardcoded secret", "credential leak"],
        phrases: &[
            "secret",
            "secrets",
            "api key",
            "api keys",
            "private key",
            "hardcoded password",
            "plaintext password",
        ],
    },
    TaxonomyRule {
        key: PatternKey::AccessControl,
        tags: &["authorization bypass", "privilege escalation", "missing authz"],
        phrases: &[
            "authorization",
            "authz",
            "permission check",
            "permission checks",
            "rbac",
            "privilege escalation",
            "access control",
        ],
    },
    TaxonomyRule {
        key: PatternKey::InjectionHardening,
        tags: &["sql injection", "xss", "command injection", "path traversal"],
        phrases: &[
            "injection",
            "xss",
            "escape",
            "escaping",
            "sanitize",
            "sanitise",
            "path traversal",
            "parameterized query",
        ],
    },
    TaxonomyRule {
        key: PatternKey::InputValidation,
        tags: &["input validation", "schema validation", "bounds check"],
        phrases: &[
            "validate",
            "validation",
            "invalid input",
            "malformed",
            "bounds check",
            "out of range",
        ],
    },
    TaxonomyRule {
        key: PatternKey::ConcurrencyRace,
        tags: &["race condition", "deadlock", "data race"],
        phrases: &[
            "race",
            "race condition",
            "deadlock",
            "mutex",
            "lock ordering",
            "concurrent",
            "concurrency",
            "atomic",
        ],
    },
    TaxonomyRule {
        key: PatternKey::ResourceLeak,
        tags: &["memory leak", "handle leak", "connection leak"],
        phrases: &[
            "leak",
            "leaks",
            "memory leak",
            "file descriptor",
            "connection pool",
            "unclosed",
        ],
    },
    TaxonomyRule {
        key: PatternKey::ErrorHandling,
        tags: &["swallowed error", "unhandled exception", "error propagation"],
        phrases: &[
            "error handling",
            "unhandled",
            "swallow",
            "swallowed",
            "panic",
            "crash",
            "exception",
            "retry",
            "retries",
        ],
    },
    TaxonomyRule {
        key: PatternKey::NullSafety,
        tags: &["null dereference", "null pointer", "optional chaining"],
        phrases: &["null", "nil", "undefined", "none check", "npe"],
    },
    TaxonomyRule {
        key: PatternKey::MigrationSafety,
        tags: &["schema migration", "data migration", "backfill"],
        phrases: &["migration", "migrations", "schema change", "backfill", "rollback"],
    },
    TaxonomyRule {
        key: PatternKey::DependencyUpgrade,
        tags: &["dependency upgrade", "dependency bump", "cve"],
        phrases: &[
            "bump",
            "upgrade",
            "dependency",
            "dependencies",
            "lockfile",
            "cve",
            "vulnerable version",
        ],
    },
    TaxonomyRule {
        key: PatternKey::ConfigDrift,
        tags: &["config drift", "environment mismatch", "feature flag"],
        phrases: &[
            "config",
            "configuration",
            "env var",
            "environment variable",
            "feature flag",
            "default value",
        ],
    },
    TaxonomyRule {
        key: PatternKey::PerformanceRegression,
        tags: &["performance regression", "n plus one", "slow query"],
        phrases: &[
            "performance",
            "slow",
            "latency",
            "n 1 query",
            "cache",
            "caching",
            "timeout",
            "memory usage",
        ],
    },
    TaxonomyRule {
        key: PatternKey::ApiContract,
        tags: &["breaking change", "api contract", "backward compatibility"],
        phrases: &[
            "breaking change",
            "deprecate",
            "deprecated",
            "backward compatible",
            "backwards compatible",
            "api version",
            "response shape",
        ],
    },
    TaxonomyRule {
        key: PatternKey::FlakyTests,
        tags: &["flaky test", "test isolation", "nondeterministic test"],
        phrases: &["flaky", "flake", "intermittent", "test isolation"],
    },
    TaxonomyRule {
        key: PatternKey::Observability,
        tags: &["logging", "metrics", "tracing"],
        phrases: &["log", "logs", "logging", "metric", "metrics", "tracing", "telemetry"],
    },
];

/// Classify an episode into its pattern key.
///
/// Total and deterministic: the same title/triggers, up to case and
/// punctuation, always yield the same key.
pub fn map_to_pattern_key<S: AsRef<str>>(title: &str, triggers: &[S]) -> PatternKey {
    let title = normalize(title);
    let triggers: Vec<String> = triggers
        .iter()
        .map(|t| normalize(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect();

    TAXONOMY_RULES
        .iter()
        .find(|rule| rule_matches(rule, &title, &triggers))
        .map(|rule| rule.key)
        .unwrap_or(PatternKey::Uncategorized)
}

/// Label for a stored or externally supplied key string.
///
/// Errors instead of guessing when the key is not in the taxonomy; that means
/// the caller and the taxonomy disagree.
pub fn pattern_label_for_key(key: &str) -> Result<&'static str, TaxonomyError> {
    key.parse::<PatternKey>().map(PatternKey::label)
}

fn rule_matches(rule: &TaxonomyRule, title: &str, triggers: &[String]) -> bool {
    if triggers.iter().any(|t| rule.tags.contains(&t.as_str())) {
        return true;
    }
    rule.phrases.iter().any(|phrase| {
        contains_phrase(title, phrase) || triggers.iter().any(|t| contains_phrase(t, phrase))
    })
}

/// Whole-token containment: `"log"` matches `"add log line"` but not `"login"`.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if haystack.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}
