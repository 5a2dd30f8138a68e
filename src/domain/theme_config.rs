//! Declarative theme configuration: field definitions, config layers and
//! the manifest a theme bundle ships with.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

/// Tab, block or section name used when a field does not declare one.
pub const DEFAULT_GROUP: &str = "default";

/// One declared configuration field.
///
/// Every attribute is optional so that a layer can override a single
/// attribute of a field declared by an ancestor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldConfig {
    pub fn tab_or_default(&self) -> &str {
        self.tab.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    pub fn block_or_default(&self) -> &str {
        self.block.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    pub fn section_or_default(&self) -> &str {
        self.section.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.unwrap_or(true)
    }
}

/// The static configuration one theme contributes to a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConfigLayer {
    /// `None` when the layer declares no fields or the declaration is not a
    /// mapping; every field then counts as inherited for this layer.
    #[serde(
        default,
        deserialize_with = "lenient_fields",
        skip_serializing_if = "Option::is_none"
    )]
    pub fields: Option<IndexMap<String, FieldConfig>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_inheritance: Vec<String>,
}

fn lenient_fields<'de, D>(deserializer: D) -> Result<Option<IndexMap<String, FieldConfig>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(entries)) = raw else {
        return Ok(None);
    };

    let fields = entries
        .into_iter()
        .filter_map(|(name, field)| {
            serde_json::from_value::<FieldConfig>(field)
                .ok()
                .map(|config| (name, config))
        })
        .collect();
    Ok(Some(fields))
}

/// An icon pack exposed by a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSet {
    pub path: String,
    pub namespace: String,
}

/// Declared bundle of a real (named) theme, as shipped in its `theme.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeManifest {
    pub technical_name: String,
    #[serde(default = "default_is_theme")]
    pub is_theme: bool,
    #[serde(default, rename = "views")]
    pub view_inheritance: Vec<String>,
    #[serde(default, rename = "script")]
    pub script_files: Vec<String>,
    /// Icon pack name to path, relative to the theme's asset directory.
    #[serde(default)]
    pub icon_sets: IndexMap<String, String>,
}

fn default_is_theme() -> bool {
    true
}

impl ThemeManifest {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let manifest: Self = serde_json::from_str(raw)
            .map_err(|err| DomainError::validation(format!("invalid theme manifest: {err}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.technical_name.trim().is_empty() {
            return Err(DomainError::validation(
                "theme manifest technical name must not be empty",
            ));
        }
        Ok(())
    }

    /// Icon sets keyed by pack name, namespaced by this theme.
    pub fn resolved_icon_sets(&self) -> IndexMap<String, IconSet> {
        self.icon_sets
            .iter()
            .map(|(name, path)| {
                (
                    name.clone(),
                    IconSet {
                        path: path.clone(),
                        namespace: self.technical_name.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Strips the `@` marker from a `configInheritance` / script reference.
pub fn theme_reference(entry: &str) -> Option<&str> {
    entry.strip_prefix('@').filter(|name| !name.is_empty())
}
