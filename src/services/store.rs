//! Result Store
//!
//! Ephemeral, process-wide storage of tool results. Each entry maps an
//! opaque id to named layers plus metadata and is never mutated once
//! written. Entries expire after a TTL. Past the size bound the oldest
//! entries are evicted first; a fresh `put` is always retrievable.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mini_moka::sync::{Cache, ConcurrentCacheExt};
use serde::Serialize;
use serde_json::Value;
use tokyo_map_core::{merge_union, GeoPoint, Layers};

use crate::utils::error::{AppError, AppResult};

/// What produced an entry. Plain multi-category searches carry no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    CategorySearch,
    MergedSearch,
    TripCandidates,
    Trip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreMeta {
    /// Unix time in seconds.
    pub created_at: f64,
    /// Arguments the entry was produced with.
    pub args: Value,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_store_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_candidate_id: Option<String>,
}

impl StoreMeta {
    pub fn new(args: Value) -> Self {
        Self {
            created_at: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            args,
            kind: None,
            center: None,
            place: None,
            source_store_ids: None,
            source_candidate_id: None,
        }
    }

    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn center(mut self, center: GeoPoint) -> Self {
        self.center = Some(center);
        self
    }

    pub fn place(mut self, place: Option<String>) -> Self {
        self.place = place;
        self
    }

    pub fn source_store_ids(mut self, ids: Vec<String>) -> Self {
        self.source_store_ids = Some(ids);
        self
    }

    pub fn source_candidate_id(mut self, id: impl Into<String>) -> Self {
        self.source_candidate_id = Some(id.into());
        self
    }

    /// String field of the stored args, if present.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreEntry {
    pub id: String,
    pub layers: Layers,
    pub meta: StoreMeta,
}

#[derive(Clone)]
pub struct ResultStore {
    /// TTL only; the size bound is enforced through `order`.
    entries: Cache<String, Arc<StoreEntry>>,
    /// Ids in insertion order, oldest first.
    order: Arc<Mutex<VecDeque<String>>>,
    max_entries: usize,
}

impl ResultStore {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().time_to_live(ttl).build(),
            order: Arc::new(Mutex::new(VecDeque::new())),
            max_entries: usize::try_from(max_entries).unwrap_or(usize::MAX).max(1),
        }
    }

    /// Store `layers` under a fresh id.
    pub fn put(&self, layers: Layers, meta: StoreMeta) -> Arc<StoreEntry> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let entry = Arc::new(StoreEntry {
            id: id.clone(),
            layers,
            meta,
        });
        self.entries.insert(id.clone(), entry.clone());

        let evicted: Vec<String> = {
            let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
            order.push_back(id.clone());
            let overflow = order.len().saturating_sub(self.max_entries);
            order.drain(..overflow).collect()
        };
        for old in &evicted {
            self.entries.invalidate(old);
            tracing::debug!("[store] evicted {}", old);
        }

        tracing::debug!(
            "[store] put id={} layers={}",
            id,
            entry.layers.len()
        );
        entry
    }

    pub fn get(&self, id: &str) -> AppResult<Arc<StoreEntry>> {
        self.entries
            .get(&id.to_string())
            .ok_or_else(|| AppError::unknown_store_id(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&id.to_string())
    }

    /// Concatenate same-labelled layers of every entry in `ids` (in order),
    /// collapsing them into one deduplicated `union` layer when `union` is
    /// set. The merged args are the first entry's args with `categories`
    /// replaced by the first-seen union of all inputs' categories.
    pub fn merge(&self, ids: &[String], union: bool) -> AppResult<Arc<StoreEntry>> {
        let mut layers = Layers::new();
        let mut categories: Vec<String> = Vec::new();
        let mut merged_args = serde_json::Map::new();

        for (idx, id) in ids.iter().enumerate() {
            let entry = self.get(id)?;
            for (label, rows) in &entry.layers {
                layers
                    .entry(label.clone())
                    .or_default()
                    .extend(rows.iter().cloned());
            }
            if idx == 0 {
                if let Value::Object(args) = &entry.meta.args {
                    merged_args = args.clone();
                }
            }
            let entry_categories = entry
                .meta
                .args
                .get("categories")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str);
            for category in entry_categories {
                if !categories.iter().any(|c| c == category) {
                    categories.push(category.to_string());
                }
            }
        }

        merged_args.insert("categories".to_string(), Value::from(categories));
        merged_args.insert("union".to_string(), Value::Bool(union));

        if union {
            layers = merge_union(layers);
        }

        let meta = StoreMeta::new(Value::Object(merged_args))
            .kind(EntryKind::MergedSearch)
            .source_store_ids(ids.to_vec());
        Ok(self.put(layers, meta))
    }

    /// Remove an entry. Returns whether it was present.
    pub fn discard(&self, id: &str) -> bool {
        let key = id.to_string();
        let present = self.entries.contains_key(&key);
        self.entries.invalidate(&key);
        self.order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|queued| queued != id);
        if present {
            tracing::info!("[store] discarded {}", id);
        }
        present
    }

    pub fn len(&self) -> u64 {
        self.entries.sync();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
