use std::collections::HashSet;
use std::sync::Arc;

use livery::application::theme::{ConfigMerger, RuntimeConfigService, SystemClock};
use livery::cache::RuntimeConfigCache;
use livery::domain::entities::ThemeRecord;
use livery::infra::assets::FilesystemScriptResolver;
use livery::infra::memory::InMemoryThemeStore;
use livery::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

fn named_theme(name: &str) -> ThemeRecord {
    ThemeRecord {
        id: Uuid::new_v4(),
        technical_name: Some(name.to_string()),
        parent_theme_id: None,
        static_config: serde_json::from_value(json!({
            "fields": { "sw-color-brand-primary": { "type": "color", "value": "#008490" } }
        }))
        .expect("static config"),
        config_values: Default::default(),
        sales_channel_ids: Vec::new(),
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn runtime_config_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let store = Arc::new(InMemoryThemeStore::new());
    let storefront = named_theme("Storefront");
    let storefront_id = storefront.id;
    store.insert_theme(storefront);
    store.insert_manifest(
        serde_json::from_value(json!({
            "technicalName": "Storefront",
            "script": ["@Vendor", "app/storefront.js"]
        }))
        .expect("manifest"),
    );

    let service = RuntimeConfigService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(FilesystemScriptResolver::new("/nonexistent/livery/assets")),
        Arc::new(RuntimeConfigCache::new()),
        Arc::new(SystemClock),
        ConfigMerger::new("Storefront"),
    );

    // miss, failed best-effort compilation, generation
    let record = service
        .runtime_config(storefront_id)
        .await
        .expect("lookup")
        .expect("generated");
    assert!(!record.is_compiled());
    // hit
    service.runtime_config(storefront_id).await.expect("lookup");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "livery_runtime_config_cache_hit_total",
        "livery_runtime_config_cache_miss_total",
        "livery_runtime_config_generated_total",
        "livery_runtime_config_compile_failure_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
