use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};

use mood_core::{Emotion, Item, MergeOutcome, NewItem, Reaction, TrainingSample, merge_outcome};

use crate::error::{Result, StoreError};
use crate::schema;

/// Catalog + reaction tables in one SQLite database.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        Ok(stmt.query_row([key], |row| row.get(0)).optional()?)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Catalog ---

    /// Insert a catalog item. Returns `None` when the location already exists.
    pub fn add_item(&self, item: &NewItem) -> Result<Option<i64>> {
        add_item_on(&self.conn, item)
    }

    /// Insert many items in one transaction, skipping known locations.
    /// Returns the number actually inserted.
    pub fn add_items(&self, items: &[NewItem]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        for item in items {
            if add_item_on(&tx, item)?.is_some() {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, location, source, created_at FROM items WHERE id = ?1",
        )?;
        Ok(stmt.query_row([id], item_from_row).optional()?)
    }

    /// Whole catalog in insertion order.
    pub fn all_items(&self) -> Result<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, location, source, created_at FROM items ORDER BY id")?;
        let items: Vec<Item> = stmt
            .query_map([], item_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(items)
    }

    pub fn item_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // --- Reactions ---

    /// Merge an observed emotion into the item's single reaction.
    ///
    /// Read, compare and write happen inside one `BEGIN IMMEDIATE`
    /// transaction, so concurrent writers on the same database serialize
    /// and cannot lose a higher-priority update.
    pub fn record_reaction(&self, item_id: i64, emotion: &Emotion) -> Result<MergeOutcome> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let exists: bool = tx
            .query_row("SELECT 1 FROM items WHERE id = ?1", [item_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(item_id));
        }

        let existing: Option<Emotion> = tx
            .query_row(
                "SELECT dominant_emotion FROM reactions WHERE item_id = ?1",
                [item_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|label| Emotion::parse(&label));

        let outcome = merge_outcome(existing.as_ref(), emotion);
        let now = mood_core::now_iso8601();
        match outcome {
            MergeOutcome::Created => {
                tx.execute(
                    "INSERT INTO reactions (item_id, dominant_emotion, updated_at) VALUES (?1, ?2, ?3)",
                    params![item_id, emotion.as_str(), now],
                )?;
                tracing::info!("first reaction '{emotion}' saved for item {item_id}");
            }
            MergeOutcome::Updated => {
                tx.execute(
                    "UPDATE reactions SET dominant_emotion = ?1, updated_at = ?2 WHERE item_id = ?3",
                    params![emotion.as_str(), now, item_id],
                )?;
                tracing::info!(
                    "reaction for item {item_id} raised to '{emotion}' (was '{}')",
                    existing.as_ref().map(Emotion::as_str).unwrap_or_default()
                );
            }
            MergeOutcome::Ignored => {
                tracing::debug!("reaction '{emotion}' for item {item_id} ignored, stored label ranks at least as high");
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    pub fn get_reaction(&self, item_id: i64) -> Result<Option<Reaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, dominant_emotion, updated_at FROM reactions WHERE item_id = ?1",
        )?;
        let reaction = stmt
            .query_row([item_id], |row| {
                Ok(Reaction {
                    item_id: row.get(0)?,
                    emotion: Emotion::parse(&row.get::<_, String>(1)?),
                    updated_at: row.get(2)?,
                })
            })
            .optional()?;
        Ok(reaction)
    }

    pub fn has_reaction(&self, item_id: i64) -> Result<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM reactions WHERE item_id = ?1",
                [item_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    pub fn reacted_ids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT item_id FROM reactions")?;
        let ids: HashSet<i64> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    pub fn reaction_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reactions", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Every reaction joined with its item's source tag, oldest first.
    pub fn training_samples(&self) -> Result<Vec<TrainingSample>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.dominant_emotion, i.source
             FROM reactions r JOIN items i ON i.id = r.item_id
             ORDER BY r.id",
        )?;
        let samples: Vec<TrainingSample> = stmt
            .query_map([], |row| {
                let label: String = row.get(0)?;
                let source: String = row.get(1)?;
                Ok(TrainingSample::new(Emotion::parse(&label), &source))
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(samples)
    }

    /// Reaction count per stored label, most frequent first.
    pub fn emotion_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT dominant_emotion, COUNT(*) AS n FROM reactions
             GROUP BY dominant_emotion ORDER BY n DESC, dominant_emotion",
        )?;
        let counts: Vec<(String, usize)> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(counts)
    }
}

fn add_item_on(conn: &Connection, item: &NewItem) -> Result<Option<i64>> {
    if item.location.trim().is_empty() {
        return Err(StoreError::InvalidData("item location is empty".to_string()));
    }
    let rows = conn.execute(
        "INSERT OR IGNORE INTO items (title, location, source, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            item.title,
            item.location,
            item.source,
            mood_core::now_iso8601()
        ],
    )?;
    if rows == 0 {
        tracing::debug!("skipping known location {}", item.location);
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        title: row.get(1)?,
        location: row.get(2)?,
        source: row.get(3)?,
        created_at: row.get(4)?,
    })
}
