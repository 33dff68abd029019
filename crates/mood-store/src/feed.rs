use std::path::{Path, PathBuf};
use std::{env, fs};

use rand::Rng;

use mood_core::{
    Emotion, Item, MergeOutcome, NewItem, ScoringModel, Selection, TrainReport, TrainSkipped,
    best_scored, choose_next, unseen_items,
};

use crate::artifact::{load_model, save_model};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::Store;

/// Default data directory: `$HOME/.moodfeed`.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".moodfeed")
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainOutcome {
    Trained(TrainReport),
    Skipped(TrainSkipped),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishDecision {
    Publish { item: Item, score: f64 },
    /// Publishing needs real scores; a random pick is never published.
    ModelUntrained,
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedStats {
    pub items: usize,
    pub reactions: usize,
    pub unseen: usize,
    pub emotions: Vec<(String, usize)>,
    pub trained: bool,
    pub trained_samples: usize,
    pub trained_at: Option<String>,
}

/// Reaction store plus scoring model, wired together.
///
/// Layout:
/// ```text
/// ~/.moodfeed/
/// ├── config.toml              (optional)
/// ├── feed.db
/// └── recommender_model.json
/// ```
pub struct Feed {
    store: Store,
    model: ScoringModel,
    model_path: Option<PathBuf>,
}

impl Feed {
    /// Open (creating if needed) the data directory, its database and model.
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
        })?;

        let config = Config::load(&base)?;
        let store = Store::open(&config.database_path(&base))?;
        let model_path = config.model_path(&base);
        let model = load_model(&model_path, config.training);

        Ok(Self::with_parts(store, model, Some(model_path)))
    }

    /// In-memory database, untrained model, no artifact file (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_parts(
            Store::open_in_memory()?,
            ScoringModel::default(),
            None,
        ))
    }

    /// Assemble from explicitly constructed parts. `model_path: None` keeps
    /// the model in memory only.
    pub fn with_parts(store: Store, model: ScoringModel, model_path: Option<PathBuf>) -> Self {
        Self {
            store,
            model,
            model_path,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    // --- Catalog ---

    pub fn add_item(&self, item: &NewItem) -> Result<Option<i64>> {
        self.store.add_item(item)
    }

    pub fn import_items(&self, items: &[NewItem]) -> Result<usize> {
        self.store.add_items(items)
    }

    // --- Reactions ---

    pub fn react(&self, item_id: i64, emotion: &Emotion) -> Result<MergeOutcome> {
        self.store.record_reaction(item_id, emotion)
    }

    /// Record the `published` pseudo-emotion so the item leaves the candidate pool.
    pub fn mark_published(&self, item_id: i64) -> Result<MergeOutcome> {
        self.store.record_reaction(item_id, &Emotion::Published)
    }

    // --- Selection ---

    /// Next item to show. Candidates are recomputed from storage on every call.
    pub fn next_item<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Selection> {
        let items = self.store.all_items()?;
        let reacted = self.store.reacted_ids()?;
        let selection = choose_next(&items, &reacted, &self.model, rng);
        tracing::debug!(
            "selection strategy={} candidates={} catalog={}",
            selection.strategy(),
            items.len() - reacted.len().min(items.len()),
            items.len()
        );
        Ok(selection)
    }

    /// All unseen candidates with their scores, best first. Ties keep catalog order.
    pub fn rank_candidates(&self) -> Result<Vec<(Item, f64)>> {
        let candidates = unseen_items(&self.store.all_items()?, &self.store.reacted_ids()?);
        let scores = self.model.score_items(&candidates);
        let mut ranked: Vec<(Item, f64)> = candidates.into_iter().zip(scores).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranked)
    }

    /// Best unseen item for the publishing channel. Requires a trained model.
    pub fn pick_for_publication(&self) -> Result<PublishDecision> {
        if !self.model.is_trained() {
            return Ok(PublishDecision::ModelUntrained);
        }
        let candidates = unseen_items(&self.store.all_items()?, &self.store.reacted_ids()?);
        Ok(match best_scored(&candidates, &self.model) {
            Some((item, score)) => PublishDecision::Publish { item, score },
            None => PublishDecision::NoCandidates,
        })
    }

    // --- Model lifecycle ---

    /// Train on every stored reaction. On success the new pipeline replaces
    /// the old one and is persisted; a skip leaves both untouched.
    pub fn train(&mut self) -> Result<TrainOutcome> {
        let samples = self.store.training_samples()?;
        tracing::info!("training on {} reactions", samples.len());

        match self.model.train(&samples) {
            Ok(report) => {
                tracing::info!(
                    "model trained: samples={} positives={} categories={} iterations={} converged={}",
                    report.samples,
                    report.positives,
                    report.categories,
                    report.iterations,
                    report.converged
                );
                self.persist_model()?;
                Ok(TrainOutcome::Trained(report))
            }
            Err(skip) => {
                tracing::warn!("{skip}");
                Ok(TrainOutcome::Skipped(skip))
            }
        }
    }

    /// Write the current trained model to its artifact path, if it has one.
    pub fn persist_model(&self) -> Result<()> {
        let Some(path) = &self.model_path else {
            return Ok(());
        };
        save_model(&self.model, path)?;
        if let Some(trained) = self.model.trained() {
            self.store.set_metadata("model_trained_at", &trained.trained_at)?;
        }
        Ok(())
    }

    /// Re-read the artifact. Missing or corrupt leaves the model untrained.
    pub fn reload_model(&mut self) {
        let Some(path) = &self.model_path else {
            return;
        };
        self.model = load_model(path, self.model.config().clone());
    }

    pub fn stats(&self) -> Result<FeedStats> {
        let items = self.store.all_items()?;
        let reacted = self.store.reacted_ids()?;
        let trained = self.model.trained();
        Ok(FeedStats {
            items: items.len(),
            reactions: self.store.reaction_count()?,
            unseen: unseen_items(&items, &reacted).len(),
            emotions: self.store.emotion_counts()?,
            trained: trained.is_some(),
            trained_samples: trained.map(|t| t.samples).unwrap_or(0),
            trained_at: trained.map(|t| t.trained_at.clone()),
        })
    }
}
