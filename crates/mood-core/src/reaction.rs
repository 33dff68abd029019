//! Merge rule for repeated reactions to the same item.
//!
//! An item keeps one reaction for its whole lifetime. A new observation
//! creates it when none exists, and afterwards only replaces the stored
//! label when it ranks strictly higher in the priority table. Same-priority
//! labels never displace each other, so the first arrival wins a tie, and
//! priority-0 labels (sentinels, `published`, unknown) can only ever create.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// What the merge rule did with an incoming observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No reaction existed; one was created.
    Created,
    /// The stored label was replaced by a higher-priority one.
    Updated,
    /// The stored label outranks or ties the incoming one.
    Ignored,
}

impl MergeOutcome {
    /// Whether the outcome requires a durable write.
    pub fn is_write(self) -> bool {
        !matches!(self, MergeOutcome::Ignored)
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergeOutcome::Created => "created",
            MergeOutcome::Updated => "updated",
            MergeOutcome::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// Decide how `incoming` merges into the currently stored label, if any.
pub fn merge_outcome(existing: Option<&Emotion>, incoming: &Emotion) -> MergeOutcome {
    match existing {
        None => MergeOutcome::Created,
        Some(current) if incoming.priority() > current.priority() => MergeOutcome::Updated,
        Some(_) => MergeOutcome::Ignored,
    }
}

/// Fold a sequence of observations through the merge rule, returning the
/// label that would end up stored.
pub fn merged_label<'a, I>(observations: I) -> Option<Emotion>
where
    I: IntoIterator<Item = &'a Emotion>,
{
    let mut stored: Option<Emotion> = None;
    for e in observations {
        if merge_outcome(stored.as_ref(), e).is_write() {
            stored = Some(e.clone());
        }
    }
    stored
}
