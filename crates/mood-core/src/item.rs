use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// A catalog entry. Created by the acquisition side, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    /// Local path or remote URL. Unique across the catalog.
    pub location: String,
    /// Provenance tag (community, channel, feed). The only model feature.
    pub source: String,
    pub created_at: String,
}

/// Fields the acquisition side supplies for a new catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub location: String,
    pub source: String,
}

impl NewItem {
    pub fn new(title: &str, location: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            location: location.to_string(),
            source: source.to_string(),
        }
    }
}

/// The single aggregated signal stored against an item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub item_id: i64,
    pub emotion: Emotion,
    pub updated_at: String,
}
