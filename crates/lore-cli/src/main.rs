mod config;
mod follow;
mod pipeline;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lore_core::{PatternKey, map_to_pattern_key};
use lore_store::{Store, resolve_scope};

use crate::config::Config;
use crate::pipeline::{ImportRunner, last_mode_key};

#[derive(Parser)]
#[command(name = "lore", about = "Import PR history as classified episodes")]
struct Cli {
    /// Config file (default: <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest recorded import stream transcripts
    Ingest {
        /// Repository the import describes (org/repo or a git URL)
        #[arg(long)]
        repo: String,

        /// Transcript file(s), one import session each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Follow a live import stream over HTTP
    Follow {
        #[arg(long)]
        repo: String,

        /// Stream endpoint
        url: String,
    },

    /// Classify a title and triggers without storing anything
    Classify {
        title: String,

        /// Trigger tag (repeatable)
        #[arg(long = "trigger")]
        triggers: Vec<String>,
    },

    /// List the pattern taxonomy
    Taxonomy,

    /// Show stored episodes for a repository, or every scope when omitted
    Stats {
        #[arg(long)]
        repo: Option<String>,
    },

    /// Show patterns that recur often enough to promote
    Patterns {
        /// Minimum episodes per scope (default: promotion_threshold)
        #[arg(long)]
        min: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn open_store(config: &Config) -> Result<Store> {
    lore_store::open_store(Some(&config.base_dir())).context("failed to open store")
}

fn scope_for(repo: &str) -> Result<String> {
    match resolve_scope(repo) {
        Some(scope) => Ok(scope),
        None => bail!("cannot derive a scope from repository {repo:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Ingest { repo, files } => cmd_ingest(&config, repo, files),
        Commands::Follow { repo, url } => cmd_follow(&config, repo, url).await,
        Commands::Classify { title, triggers } => {
            cmd_classify(title, triggers);
            Ok(())
        }
        Commands::Taxonomy => {
            cmd_taxonomy();
            Ok(())
        }
        Commands::Stats { repo } => cmd_stats(&config, repo.as_deref()),
        Commands::Patterns { min } => cmd_patterns(&config, *min),
    }
}

fn ingest_file(store: &Store, scope: &str, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut runner = ImportRunner::new(store, scope)?;
    for line in content.split_inclusive('\n') {
        runner.feed(line)?;
    }
    let summary = runner.finish()?;
    println!("ingested {}: {summary}", path.display());
    Ok(())
}

fn cmd_ingest(config: &Config, repo: &str, files: &[PathBuf]) -> Result<()> {
    let scope = scope_for(repo)?;
    let store = open_store(config)?;
    for path in files {
        ingest_file(&store, &scope, path)?;
    }
    println!("done. scope={scope} episodes={}", store.count_for_scope(&scope)?);
    Ok(())
}

async fn cmd_follow(config: &Config, repo: &str, url: &str) -> Result<()> {
    let scope = scope_for(repo)?;
    let store = open_store(config)?;
    let runner = ImportRunner::new(&store, &scope)?;
    let summary = follow::follow(config, url, runner).await?;
    println!("followed {url}: {summary}");
    println!("done. scope={scope} episodes={}", store.count_for_scope(&scope)?);
    Ok(())
}

fn cmd_classify(title: &str, triggers: &[String]) {
    let key = map_to_pattern_key(title, triggers);
    println!("{key}\t{}", key.label());
}

fn cmd_taxonomy() {
    for key in PatternKey::ALL {
        println!("{:<24} {}", key.as_str(), key.label());
    }
}

fn cmd_stats(config: &Config, repo: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let Some(repo) = repo else {
        let scopes = store.scopes()?;
        if scopes.is_empty() {
            println!("no imports yet");
        }
        for scope in scopes {
            println!("{scope:<24} {}", store.count_for_scope(&scope)?);
        }
        return Ok(());
    };

    let scope = scope_for(repo)?;
    let last_mode = store
        .get_metadata(&last_mode_key(&scope))?
        .unwrap_or_else(|| "-".to_string());

    println!("scope:      {scope}");
    println!("episodes:   {}", store.count_for_scope(&scope)?);
    println!("last mode:  {last_mode}");
    let counts = store.pattern_counts(&scope)?;
    if !counts.is_empty() {
        println!("patterns:");
        for (key, count) in counts {
            println!("  {:<24} {count}", key.as_str());
        }
    }
    Ok(())
}

fn cmd_patterns(config: &Config, min: Option<usize>) -> Result<()> {
    let min = min.unwrap_or(config.promotion_threshold);
    let store = open_store(config)?;
    let candidates = store.promotion_candidates(min)?;
    if candidates.is_empty() {
        println!("no patterns with at least {min} episodes");
        return Ok(());
    }
    for c in candidates {
        println!(
            "{:<24} {:<24} {:>4}  {}",
            c.scope,
            c.pattern_key.as_str(),
            c.count,
            c.pattern_key.label()
        );
    }
    Ok(())
}
