//! Process-lifetime memo of runtime configuration, indexed by theme id and
//! by technical name.

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;
use uuid::Uuid;

use crate::domain::entities::RuntimeConfigRecord;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "livery_runtime_config_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "livery_runtime_config_cache_miss_total";

/// Outcome of a memo lookup.
///
/// `Hit(None)` is a remembered absence: the store was asked before and had
/// nothing, and will not be asked again until the memo is cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(Option<RuntimeConfigRecord>),
    Miss,
}

/// In-memory memo in front of the runtime config store.
///
/// Entries never expire; everything is dropped together by [`clear`].
///
/// [`clear`]: RuntimeConfigCache::clear
#[derive(Default)]
pub struct RuntimeConfigCache {
    by_id: RwLock<HashMap<Uuid, Option<RuntimeConfigRecord>>>,
    by_name: RwLock<HashMap<String, Option<RuntimeConfigRecord>>>,
    active_theme_names: RwLock<Option<Vec<String>>>,
}

impl RuntimeConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_id(&self, theme_id: Uuid) -> Lookup {
        let entry = rw_read(&self.by_id, SOURCE, "get_by_id")
            .get(&theme_id)
            .cloned();
        record_lookup("id", entry)
    }

    pub fn get_by_name(&self, technical_name: &str) -> Lookup {
        let entry = rw_read(&self.by_name, SOURCE, "get_by_name")
            .get(technical_name)
            .cloned();
        record_lookup("name", entry)
    }

    /// Remembers the result of an id lookup, mirroring a found record into
    /// the name index.
    pub fn remember_id(&self, theme_id: Uuid, record: Option<RuntimeConfigRecord>) {
        let mut by_id = rw_write(&self.by_id, SOURCE, "remember_id.by_id");
        let mut by_name = rw_write(&self.by_name, SOURCE, "remember_id.by_name");
        if let Some(name) = record.as_ref().and_then(|r| r.technical_name.clone()) {
            by_name.insert(name, record.clone());
        }
        by_id.insert(theme_id, record);
    }

    /// Remembers the result of a name lookup, mirroring a found record into
    /// the id index.
    pub fn remember_name(&self, technical_name: &str, record: Option<RuntimeConfigRecord>) {
        let mut by_id = rw_write(&self.by_id, SOURCE, "remember_name.by_id");
        let mut by_name = rw_write(&self.by_name, SOURCE, "remember_name.by_name");
        if let Some(found) = record.as_ref() {
            by_id.insert(found.theme_id, record.clone());
        }
        by_name.insert(technical_name.to_string(), record);
    }

    /// Stores a freshly persisted record under both keys.
    pub fn store(&self, record: &RuntimeConfigRecord) {
        self.remember_id(record.theme_id, Some(record.clone()));
    }

    pub fn active_theme_names(&self) -> Option<Vec<String>> {
        rw_read(&self.active_theme_names, SOURCE, "active_theme_names").clone()
    }

    pub fn set_active_theme_names(&self, names: Vec<String>) {
        *rw_write(&self.active_theme_names, SOURCE, "set_active_theme_names") = Some(names);
    }

    /// Drops every memoized entry, including remembered absences.
    pub fn clear(&self) {
        rw_write(&self.by_id, SOURCE, "clear.by_id").clear();
        rw_write(&self.by_name, SOURCE, "clear.by_name").clear();
        *rw_write(&self.active_theme_names, SOURCE, "clear.active_theme_names") = None;
    }

    pub fn len(&self) -> usize {
        rw_read(&self.by_id, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn record_lookup(index: &'static str, entry: Option<Option<RuntimeConfigRecord>>) -> Lookup {
    match entry {
        Some(record) => {
            counter!(METRIC_CACHE_HIT, "index" => index).increment(1);
            Lookup::Hit(record)
        }
        None => {
            counter!(METRIC_CACHE_MISS, "index" => index).increment(1);
            Lookup::Miss
        }
    }
}
