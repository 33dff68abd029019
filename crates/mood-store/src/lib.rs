//! SQLite-backed reaction store and model artifact persistence for moodfeed.

pub mod artifact;
pub mod config;
pub mod error;
pub mod feed;
pub mod schema;
pub mod store;

pub use artifact::{load_model, save_model};
pub use config::{CONFIG_FILE, Config, StorageConfig};
pub use error::{Result, StoreError};
pub use feed::{Feed, FeedStats, PublishDecision, TrainOutcome, default_base_dir};
pub use store::Store;
