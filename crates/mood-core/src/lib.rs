//! Reaction aggregation and candidate scoring core.
//!
//! Merges repeated emotional reactions into one signal per item, computes the
//! unseen candidate set, and ranks candidates with a trainable preference
//! model that degrades to a uniform prior while untrained.
//!
//! Zero I/O: storage and artifact files live in `mood-store`.

pub mod artifact;
pub mod candidates;
pub mod constants;
pub mod emotion;
pub mod item;
pub mod model;
pub mod reaction;
pub mod select;
pub mod time;

pub use artifact::{ARTIFACT_VERSION, ArtifactError, ModelArtifact, export_model, import_model};
pub use candidates::unseen_items;
pub use constants::{MIN_TRAINING_REACTIONS, UNTRAINED_SCORE};
pub use emotion::{Emotion, POSITIVE_EMOTIONS};
pub use item::{Item, NewItem, Reaction};
pub use model::{
    ModelState, Pipeline, ScoringModel, TrainReport, TrainSkipped, TrainedModel, TrainingConfig,
    TrainingSample,
};
pub use reaction::{MergeOutcome, merge_outcome, merged_label};
pub use select::{Selection, arg_max, best_scored, choose_next};
pub use time::{now_iso8601, unix_to_iso8601};
