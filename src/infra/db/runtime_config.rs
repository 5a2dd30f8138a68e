use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        repos::{RepoError, RuntimeConfigRepo},
        theme::graph::breadth_first_descendants,
    },
    domain::{entities::RuntimeConfigRecord, theme_config::IconSet},
};

use super::{PostgresRepositories, map_sqlx_error};

const RUNTIME_CONFIG_COLUMNS: &str = "theme_id, technical_name, resolved_config, \
     view_inheritance, script_files, icon_sets, updated_at";

#[derive(sqlx::FromRow)]
struct RuntimeConfigRow {
    theme_id: Uuid,
    technical_name: Option<String>,
    resolved_config: Json<IndexMap<String, Value>>,
    view_inheritance: Json<Vec<String>>,
    script_files: Option<Json<Vec<String>>>,
    icon_sets: Json<IndexMap<String, IconSet>>,
    updated_at: OffsetDateTime,
}

impl From<RuntimeConfigRow> for RuntimeConfigRecord {
    fn from(row: RuntimeConfigRow) -> Self {
        Self {
            theme_id: row.theme_id,
            technical_name: row.technical_name,
            resolved_config: row.resolved_config.0,
            view_inheritance: row.view_inheritance.0,
            script_files: row.script_files.map(|files| files.0),
            icon_sets: row.icon_sets.0,
            updated_at: row.updated_at,
        }
    }
}

/// Serializes to JSON text, bound as `$n::json` so Postgres stores the
/// document verbatim and key order survives the round trip.
fn encode_json<T: Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(|err| RepoError::InvalidInput {
        message: format!("runtime config is not serializable: {err}"),
    })
}

#[async_trait]
impl RuntimeConfigRepo for PostgresRepositories {
    async fn find_by_id(&self, theme_id: Uuid) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        let row = sqlx::query_as::<_, RuntimeConfigRow>(&format!(
            "SELECT {RUNTIME_CONFIG_COLUMNS} FROM theme_runtime_configs WHERE theme_id = $1"
        ))
        .bind(theme_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RuntimeConfigRecord::from))
    }

    async fn find_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        let row = sqlx::query_as::<_, RuntimeConfigRow>(&format!(
            "SELECT {RUNTIME_CONFIG_COLUMNS} FROM theme_runtime_configs \
             WHERE technical_name = $1 \
             ORDER BY updated_at DESC \
             LIMIT 1"
        ))
        .bind(technical_name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RuntimeConfigRecord::from))
    }

    async fn upsert(&self, record: &RuntimeConfigRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO theme_runtime_configs (
                theme_id,
                technical_name,
                resolved_config,
                view_inheritance,
                script_files,
                icon_sets,
                updated_at
            ) VALUES ($1, $2, $3::json, $4::json, $5::json, $6::json, $7)
            ON CONFLICT (theme_id) DO UPDATE SET
                technical_name = EXCLUDED.technical_name,
                resolved_config = EXCLUDED.resolved_config,
                view_inheritance = EXCLUDED.view_inheritance,
                script_files = EXCLUDED.script_files,
                icon_sets = EXCLUDED.icon_sets,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.theme_id)
        .bind(record.technical_name.as_deref())
        .bind(encode_json(&record.resolved_config)?)
        .bind(encode_json(&record.view_inheritance)?)
        .bind(record.script_files.as_ref().map(encode_json).transpose()?)
        .bind(encode_json(&record.icon_sets)?)
        .bind(record.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_copy_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM themes
            WHERE parent_theme_id = $1
              AND technical_name IS NULL
            ORDER BY created_at, id
            "#,
        )
        .bind(theme_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_child_theme_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let edges = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT parent_theme_id, id
            FROM themes
            WHERE parent_theme_id IS NOT NULL
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(breadth_first_descendants(theme_id, &edges))
    }

    async fn theme_technical_name(&self, theme_id: Uuid) -> Result<Option<String>, RepoError> {
        let name = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT COALESCE(t.technical_name, parent.technical_name)
            FROM themes t
            LEFT JOIN themes parent ON parent.id = t.parent_theme_id
            WHERE t.id = $1
            "#,
        )
        .bind(theme_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(name.flatten())
    }

    async fn theme_id_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<Uuid>, RepoError> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM themes WHERE technical_name = $1")
            .bind(technical_name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_active_theme_names(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT technical_name
            FROM theme_runtime_configs
            WHERE technical_name IS NOT NULL
            ORDER BY technical_name
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
