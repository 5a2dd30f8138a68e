use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, ThemesRepo},
    domain::{entities::ThemeRecord, theme_config::ThemeConfigLayer},
};

use super::{PostgresRepositories, map_sqlx_error};

const THEME_COLUMNS: &str = "id, technical_name, parent_theme_id, base_config, config_values, \
     sales_channel_ids, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ThemeRow {
    id: Uuid,
    technical_name: Option<String>,
    parent_theme_id: Option<Uuid>,
    base_config: Json<Value>,
    config_values: Json<Value>,
    sales_channel_ids: Vec<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ThemeRow> for ThemeRecord {
    fn from(row: ThemeRow) -> Self {
        let static_config = serde_json::from_value::<ThemeConfigLayer>(row.base_config.0)
            .unwrap_or_else(|err| {
                debug!(theme_id = %row.id, error = %err, "treating malformed base config as empty");
                ThemeConfigLayer::default()
            });
        let config_values = match row.config_values.0 {
            Value::Object(values) => values.into_iter().collect(),
            _ => IndexMap::new(),
        };

        Self {
            id: row.id,
            technical_name: row.technical_name,
            parent_theme_id: row.parent_theme_id,
            static_config,
            config_values,
            sales_channel_ids: row.sales_channel_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ThemesRepo for PostgresRepositories {
    async fn list_themes(&self) -> Result<Vec<ThemeRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ThemeRow>(&format!(
            "SELECT {THEME_COLUMNS} FROM themes ORDER BY created_at, id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ThemeRecord::from).collect())
    }
}
