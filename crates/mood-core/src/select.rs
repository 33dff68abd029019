//! Next-item selection cascade.
//!
//! Scoring is only consulted when the model is trained AND at least one
//! unseen candidate exists. Otherwise the choice falls back, in order, to a
//! uniform pick among unseen candidates, then a uniform pick over the whole
//! catalog, then nothing.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::candidates::unseen_items;
use crate::item::Item;
use crate::model::ScoringModel;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Highest-scoring unseen candidate under a trained model.
    Scored { item: Item, score: f64 },
    /// Uniform pick among unseen candidates (model untrained).
    Unseen(Item),
    /// Every item has a reaction; uniform pick over the whole catalog.
    Recirculated(Item),
    /// Empty catalog.
    NoItemsAvailable,
}

impl Selection {
    pub fn item(&self) -> Option<&Item> {
        match self {
            Selection::Scored { item, .. } | Selection::Unseen(item) | Selection::Recirculated(item) => {
                Some(item)
            }
            Selection::NoItemsAvailable => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Selection::Scored { item, .. } | Selection::Unseen(item) | Selection::Recirculated(item) => {
                Some(item)
            }
            Selection::NoItemsAvailable => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Selection::Scored { score, .. } => Some(*score),
            _ => None,
        }
    }

    /// Short tag for logs and CLI output.
    pub fn strategy(&self) -> &'static str {
        match self {
            Selection::Scored { .. } => "scored",
            Selection::Unseen(_) => "random-unseen",
            Selection::Recirculated(_) => "recirculated",
            Selection::NoItemsAvailable => "none",
        }
    }
}

/// Index and score of the best entry; ties go to the earliest index.
pub fn arg_max(scores: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best
}

/// Pick the best candidate by model score. `None` when there are no candidates.
pub fn best_scored(candidates: &[Item], model: &ScoringModel) -> Option<(Item, f64)> {
    let scores = model.score_items(candidates);
    arg_max(&scores).map(|(idx, score)| (candidates[idx].clone(), score))
}

pub fn choose_next<R: Rng + ?Sized>(
    all_items: &[Item],
    reacted_ids: &HashSet<i64>,
    model: &ScoringModel,
    rng: &mut R,
) -> Selection {
    let candidates = unseen_items(all_items, reacted_ids);

    if model.is_trained()
        && let Some((item, score)) = best_scored(&candidates, model)
    {
        return Selection::Scored { item, score };
    }

    if let Some(item) = candidates.choose(rng) {
        return Selection::Unseen(item.clone());
    }

    match all_items.choose(rng) {
        Some(item) => Selection::Recirculated(item.clone()),
        None => Selection::NoItemsAvailable,
    }
}
