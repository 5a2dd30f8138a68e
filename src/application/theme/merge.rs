//! Inheritance-aware merge of theme field configuration.
//!
//! A theme's effective configuration is built from layers applied in this
//! order, later layers winning attribute by attribute:
//!
//! 1. the base theme,
//! 2. every ancestor, in declared inheritance order and then along the
//!    `parent_theme_id` chain (furthest first),
//! 3. the theme itself.
//!
//! Each layer is the theme's static field declarations with that theme's
//! own stored override values applied on top.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::ThemeRecord;
use crate::domain::theme_config::{FieldConfig, theme_reference};

use super::error::ThemeConfigError;

type FieldMap = IndexMap<String, FieldConfig>;

/// Result of merging one theme against its ancestry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedConfig {
    pub theme_id: Uuid,
    pub technical_name: Option<String>,
    pub config_inheritance: Vec<String>,
    pub fields: FieldMap,
    /// Effective value per field, or `None` when the theme inherits it.
    pub current_fields: IndexMap<String, Option<Value>>,
    /// The base theme's own value per field, or `None` when it has none.
    pub base_theme_fields: IndexMap<String, Option<Value>>,
}

impl MergedConfig {
    /// Field name to effective value, `null` for fields without a value.
    pub fn resolved_values(&self) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone().unwrap_or(Value::Null)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigMerger {
    base_theme: String,
}

impl ConfigMerger {
    pub fn new(base_theme: impl Into<String>) -> Self {
        Self {
            base_theme: base_theme.into(),
        }
    }

    pub fn merge(
        &self,
        theme_id: Uuid,
        themes: &[ThemeRecord],
    ) -> Result<MergedConfig, ThemeConfigError> {
        let theme = find_by_id(themes, theme_id)
            .ok_or_else(|| ThemeConfigError::theme_not_found(theme_id))?;
        let base = self.base_record(themes)?;

        let config_inheritance = self.config_inheritance(theme, themes);
        let ancestors = self.parent_themes(theme, base, &config_inheritance, themes);

        let base_layer = own_layer(base);
        let target_layer = own_layer(theme);

        let mut fields = base_layer.clone();
        for ancestor in &ancestors {
            merge_fields(&mut fields, &own_layer(ancestor));
        }
        if theme.id != base.id {
            merge_fields(&mut fields, &target_layer);
        }

        let current_fields = fields
            .iter()
            .map(|(name, field)| {
                let value = if target_layer.contains_key(name) {
                    field.value.clone()
                } else {
                    None
                };
                (name.clone(), value)
            })
            .collect();
        let base_theme_fields = fields
            .keys()
            .map(|name| {
                let value = base_layer.get(name).and_then(|field| field.value.clone());
                (name.clone(), value)
            })
            .collect();

        debug!(
            theme_id = %theme.id,
            ancestors = ancestors.len(),
            fields = fields.len(),
            "merged theme configuration"
        );

        Ok(MergedConfig {
            theme_id: theme.id,
            technical_name: theme.technical_name.clone(),
            config_inheritance,
            fields,
            current_fields,
            base_theme_fields,
        })
    }

    /// The `@ThemeName` list consulted for a theme: its own list, the
    /// parent's list for a copy without one, otherwise the base theme.
    pub fn config_inheritance(&self, theme: &ThemeRecord, themes: &[ThemeRecord]) -> Vec<String> {
        if !theme.static_config.config_inheritance.is_empty() {
            return theme.static_config.config_inheritance.clone();
        }

        if theme.is_copy() {
            let parent_list = theme
                .parent_theme_id
                .and_then(|parent_id| find_by_id(themes, parent_id))
                .map(|parent| parent.static_config.config_inheritance.clone())
                .unwrap_or_default();
            if !parent_list.is_empty() {
                return parent_list;
            }
        }

        if theme.technical_name.as_deref() == Some(self.base_theme.as_str()) {
            Vec::new()
        } else {
            vec![format!("@{}", self.base_theme)]
        }
    }

    fn base_record<'a>(&self, themes: &'a [ThemeRecord]) -> Result<&'a ThemeRecord, ThemeConfigError> {
        find_by_name(themes, &self.base_theme)
            .ok_or_else(|| ThemeConfigError::base_theme_not_found(&self.base_theme))
    }

    fn parent_themes<'a>(
        &self,
        theme: &'a ThemeRecord,
        base: &'a ThemeRecord,
        inheritance: &[String],
        themes: &'a [ThemeRecord],
    ) -> Vec<&'a ThemeRecord> {
        let mut applied = HashSet::from([base.id, theme.id]);
        let mut ordered = Vec::new();

        for entry in inheritance {
            let Some(name) = theme_reference(entry) else {
                debug!(theme_id = %theme.id, entry, "ignoring malformed inheritance entry");
                continue;
            };
            let Some(ancestor) = find_by_name(themes, name) else {
                debug!(theme_id = %theme.id, entry, "inherited theme is not installed");
                continue;
            };
            if applied.insert(ancestor.id) {
                ordered.push(ancestor);
            }
        }

        let mut walked = HashSet::from([theme.id]);
        let mut chain = Vec::new();
        let mut cursor = theme.parent_theme_id;
        while let Some(parent_id) = cursor {
            if !walked.insert(parent_id) {
                debug!(theme_id = %theme.id, %parent_id, "parent chain loops back on itself");
                break;
            }
            let Some(parent) = find_by_id(themes, parent_id) else {
                break;
            };
            if applied.insert(parent.id) {
                chain.push(parent);
            }
            cursor = parent.parent_theme_id;
        }
        chain.reverse();
        ordered.extend(chain);

        ordered
    }
}

fn find_by_id(themes: &[ThemeRecord], id: Uuid) -> Option<&ThemeRecord> {
    themes.iter().find(|theme| theme.id == id)
}

fn find_by_name<'a>(themes: &'a [ThemeRecord], name: &str) -> Option<&'a ThemeRecord> {
    themes
        .iter()
        .find(|theme| theme.technical_name.as_deref() == Some(name))
}

/// Static fields of a theme with its stored override values applied.
fn own_layer(theme: &ThemeRecord) -> FieldMap {
    let mut fields = theme.static_config.fields.clone().unwrap_or_default();
    for (name, value) in &theme.config_values {
        if value.is_null() {
            continue;
        }
        fields.entry(name.clone()).or_default().value = Some(value.clone());
    }
    fields
}

/// Applies `layer` on top of `into`, field by field.
fn merge_fields(into: &mut FieldMap, layer: &FieldMap) {
    for (name, field) in layer {
        match into.get_mut(name) {
            Some(existing) => merge_field(existing, field),
            None => {
                into.insert(name.clone(), field.clone());
            }
        }
    }
}

/// Later attributes win; `custom` and unknown attributes merge recursively.
fn merge_field(into: &mut FieldConfig, layer: &FieldConfig) {
    fn replace<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            slot.clone_from(value);
        }
    }

    replace(&mut into.kind, &layer.kind);
    replace(&mut into.value, &layer.value);
    replace(&mut into.editable, &layer.editable);
    replace(&mut into.tab, &layer.tab);
    replace(&mut into.block, &layer.block);
    replace(&mut into.section, &layer.section);
    replace(&mut into.order, &layer.order);

    if let Some(overlay) = &layer.custom {
        match into.custom.as_mut() {
            Some(existing) => merge_json(existing, overlay),
            None => into.custom = Some(overlay.clone()),
        }
    }

    merge_json_maps(&mut into.extra, &layer.extra);
}

/// Recursive JSON merge: objects merge key by key, anything else
/// (including arrays) is replaced by the overlay.
fn merge_json(into: &mut Value, overlay: &Value) {
    match (into, overlay) {
        (Value::Object(existing), Value::Object(overlay)) => merge_json_maps(existing, overlay),
        (slot, overlay) => *slot = overlay.clone(),
    }
}

fn merge_json_maps(into: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match into.get_mut(key) {
            Some(existing) => merge_json(existing, value),
            None => {
                into.insert(key.clone(), value.clone());
            }
        }
    }
}
