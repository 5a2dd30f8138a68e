//! Presentation tree of a merged theme configuration.

use indexmap::IndexMap;
use serde::Serialize;

use crate::domain::theme_config::FieldConfig;

use super::merge::MergedConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStructure {
    pub tabs: IndexMap<String, TabNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabNode {
    pub label_snippet_key: String,
    pub blocks: IndexMap<String, BlockNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNode {
    pub label_snippet_key: String,
    pub sections: IndexMap<String, SectionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionNode {
    pub label_snippet_key: String,
    pub fields: IndexMap<String, StructuredField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredField {
    #[serde(flatten)]
    pub config: FieldConfig,
    pub label_snippet_key: String,
    pub help_text_snippet_key: String,
    /// One key per entry of `custom.options`, by position.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub option_snippet_keys: Vec<String>,
}

/// Groups the merged fields into `tabs → blocks → sections → fields`.
///
/// Non-editable fields are left out; missing groups fall back to
/// `"default"`. Field order follows the merged declaration order.
///
/// Snippet keys are dot-joined and prefixed with `technical_name`:
///
/// - tab: `<name>.<tab>.label`
/// - block: `<name>.<tab>.<block>.label`
/// - section: `<name>.<tab>.<block>.<section>.label`
/// - field: `<name>.<tab>.<block>.<section>.<field>.label` and `.helpText`
/// - option `i` of `custom.options`: `<name>.<tab>.<block>.<section>.<field>.<i>.label`
///
/// Copies have no name of their own; callers pass the parent's.
pub fn build_structure(merged: &MergedConfig, technical_name: &str) -> ThemeStructure {
    let mut structure = ThemeStructure::default();

    for (name, field) in &merged.fields {
        if !field.is_editable() {
            continue;
        }

        let tab = field.tab_or_default();
        let block = field.block_or_default();
        let section = field.section_or_default();

        let tab_node = structure
            .tabs
            .entry(tab.to_string())
            .or_insert_with(|| TabNode {
                label_snippet_key: snippet_key(&[technical_name, tab, "label"]),
                blocks: IndexMap::new(),
            });
        let block_node = tab_node
            .blocks
            .entry(block.to_string())
            .or_insert_with(|| BlockNode {
                label_snippet_key: snippet_key(&[technical_name, tab, block, "label"]),
                sections: IndexMap::new(),
            });
        let section_node = block_node
            .sections
            .entry(section.to_string())
            .or_insert_with(|| SectionNode {
                label_snippet_key: snippet_key(&[technical_name, tab, block, section, "label"]),
                fields: IndexMap::new(),
            });

        let field_prefix = snippet_key(&[technical_name, tab, block, section, name]);
        section_node.fields.insert(
            name.clone(),
            StructuredField {
                config: field.clone(),
                label_snippet_key: format!("{field_prefix}.label"),
                help_text_snippet_key: format!("{field_prefix}.helpText"),
                option_snippet_keys: option_keys(field, &field_prefix),
            },
        );
    }

    structure
}

fn snippet_key(parts: &[&str]) -> String {
    parts.join(".")
}

fn option_keys(field: &FieldConfig, field_prefix: &str) -> Vec<String> {
    let Some(options) = field
        .custom
        .as_ref()
        .and_then(|custom| custom.get("options"))
        .and_then(|options| options.as_array())
    else {
        return Vec::new();
    };

    (0..options.len())
        .map(|index| format!("{field_prefix}.{index}.label"))
        .collect()
}
