use std::collections::HashSet;

use crate::item::Item;

/// Items with no reaction yet, in catalog order.
///
/// Pure set difference by id; recomputed by callers on every request.
pub fn unseen_items(all_items: &[Item], reacted_ids: &HashSet<i64>) -> Vec<Item> {
    all_items
        .iter()
        .filter(|item| !reacted_ids.contains(&item.id))
        .cloned()
        .collect()
}
