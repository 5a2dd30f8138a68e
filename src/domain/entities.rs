//! Domain entities mirrored from persistent storage.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::theme_config::{IconSet, ThemeConfigLayer};

/// A theme instance as persisted by the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeRecord {
    pub id: Uuid,
    pub technical_name: Option<String>,
    pub parent_theme_id: Option<Uuid>,
    pub static_config: ThemeConfigLayer,
    /// Stored per-field override values, keyed by field name.
    pub config_values: IndexMap<String, Value>,
    pub sales_channel_ids: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ThemeRecord {
    /// Copies have no technical name of their own and point at the theme
    /// they were derived from.
    pub fn is_copy(&self) -> bool {
        self.technical_name.is_none() && self.parent_theme_id.is_some()
    }
}

/// Precomputed runtime configuration of one theme instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfigRecord {
    pub theme_id: Uuid,
    pub technical_name: Option<String>,
    pub resolved_config: IndexMap<String, Value>,
    pub view_inheritance: Vec<String>,
    /// `None` until the theme's script files have been resolved once.
    pub script_files: Option<Vec<String>>,
    pub icon_sets: IndexMap<String, IconSet>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl RuntimeConfigRecord {
    pub fn is_compiled(&self) -> bool {
        self.script_files.is_some()
    }
}
