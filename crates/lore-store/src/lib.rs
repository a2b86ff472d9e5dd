pub mod error;
pub mod guard;
pub mod schema;
pub mod scope;
pub mod store;

pub use error::{Result, StoreError, UNIQUE_VIOLATION_CODE};
pub use guard::{
    DuplicateReason, ImportRow, ImportStore, PersistOutcome, collect_existing_pr_numbers,
    is_unique_violation_error, load_existing_pr_numbers, try_persist,
};
pub use scope::{default_base_dir, open_store, resolve_scope};
pub use store::{PromotionCandidate, Store, StoredEpisode};
