use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use livery::application::repos::{RepoError, RuntimeConfigRepo};
use livery::application::theme::{
    CompilationError, ConfigMerger, RuntimeConfigService, SystemClock, ThemeConfigError,
};
use livery::cache::RuntimeConfigCache;
use livery::domain::entities::{RuntimeConfigRecord, ThemeRecord};
use livery::domain::theme_config::ThemeManifest;
use livery::infra::assets::FilesystemScriptResolver;
use livery::infra::memory::InMemoryThemeStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

/// Counts reads of stored records before delegating to the in-memory store.
struct CountingStore {
    inner: Arc<InMemoryThemeStore>,
    reads: AtomicUsize,
}

impl CountingStore {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeConfigRepo for CountingStore {
    async fn find_by_id(&self, theme_id: Uuid) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(theme_id).await
    }

    async fn find_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_technical_name(technical_name).await
    }

    async fn upsert(&self, record: &RuntimeConfigRecord) -> Result<(), RepoError> {
        self.inner.upsert(record).await
    }

    async fn list_copy_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        self.inner.list_copy_ids(theme_id).await
    }

    async fn list_child_theme_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        self.inner.list_child_theme_ids(theme_id).await
    }

    async fn theme_technical_name(&self, theme_id: Uuid) -> Result<Option<String>, RepoError> {
        self.inner.theme_technical_name(theme_id).await
    }

    async fn theme_id_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<Uuid>, RepoError> {
        self.inner.theme_id_by_technical_name(technical_name).await
    }

    async fn list_active_theme_names(&self) -> Result<Vec<String>, RepoError> {
        self.inner.list_active_theme_names().await
    }
}

struct Fixture {
    assets: TempDir,
    store: Arc<InMemoryThemeStore>,
    counting: Arc<CountingStore>,
    service: RuntimeConfigService,
    aurora: Uuid,
    aurora_copy: Uuid,
    aurora_dark: Uuid,
}

fn theme(
    name: Option<&str>,
    parent: Option<Uuid>,
    static_config: Value,
    config_values: Value,
) -> ThemeRecord {
    ThemeRecord {
        id: Uuid::new_v4(),
        technical_name: name.map(str::to_string),
        parent_theme_id: parent,
        static_config: serde_json::from_value(static_config).expect("static config"),
        config_values: serde_json::from_value(config_values).expect("config values"),
        sales_channel_ids: Vec::new(),
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

fn manifest(value: Value) -> ThemeManifest {
    serde_json::from_value(value).expect("manifest")
}

fn write_asset(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("asset dir");
    std::fs::write(path, "// script").expect("asset");
}

fn fixture() -> Fixture {
    let assets = TempDir::new().expect("asset root");
    for relative in [
        "Storefront/app/storefront.js",
        "SwagPayments/app/payments.js",
        "Aurora/app/aurora.js",
    ] {
        write_asset(assets.path(), relative);
    }

    let store = Arc::new(InMemoryThemeStore::new());

    let storefront = theme(
        Some("Storefront"),
        None,
        json!({
            "fields": {
                "sw-color-brand-primary": { "type": "color", "value": "#008490" },
                "sw-font-family": { "type": "fontFamily", "value": "Inter" },
                "sw-logo-desktop": { "type": "media", "value": null, "editable": false }
            }
        }),
        json!({}),
    );
    let aurora = theme(
        Some("Aurora"),
        None,
        json!({
            "fields": { "sw-color-brand-primary": { "value": "#ff6600" } },
            "configInheritance": ["@Storefront"]
        }),
        json!({}),
    );
    let aurora_copy = theme(
        None,
        Some(aurora.id),
        json!({}),
        json!({ "sw-font-family": "Lato" }),
    );
    let aurora_dark = theme(
        Some("AuroraDark"),
        Some(aurora.id),
        json!({}),
        json!({ "sw-color-brand-primary": "#111111" }),
    );
    let (aurora_id, copy_id, dark_id) = (aurora.id, aurora_copy.id, aurora_dark.id);
    for record in [storefront, aurora, aurora_copy, aurora_dark] {
        store.insert_theme(record);
    }

    store.insert_manifest(manifest(json!({
        "technicalName": "Storefront",
        "views": ["@Storefront", "@Plugins"],
        "script": ["app/storefront.js"]
    })));
    store.insert_manifest(manifest(json!({
        "technicalName": "SwagPayments",
        "isTheme": false,
        "script": ["app/payments.js"]
    })));
    store.insert_manifest(manifest(json!({
        "technicalName": "Aurora",
        "views": ["@Storefront", "@Plugins", "@Aurora"],
        "script": ["@Storefront", "@Plugins", "app/aurora.js"],
        "iconSets": { "aurora-icons": "assets/icons" }
    })));
    store.insert_manifest(manifest(json!({
        "technicalName": "AuroraDark",
        "views": ["@Aurora", "@AuroraDark"],
        "script": ["@Aurora"]
    })));

    let counting = Arc::new(CountingStore {
        inner: store.clone(),
        reads: AtomicUsize::new(0),
    });
    let service = RuntimeConfigService::new(
        counting.clone(),
        store.clone(),
        store.clone(),
        Arc::new(FilesystemScriptResolver::new(assets.path())),
        Arc::new(RuntimeConfigCache::new()),
        Arc::new(SystemClock),
        ConfigMerger::new("Storefront"),
    );

    Fixture {
        assets,
        store,
        counting,
        service,
        aurora: aurora_id,
        aurora_copy: copy_id,
        aurora_dark: dark_id,
    }
}

fn aurora_scripts() -> Vec<String> {
    vec![
        "Storefront/app/storefront.js".to_string(),
        "SwagPayments/app/payments.js".to_string(),
        "Aurora/app/aurora.js".to_string(),
    ]
}

#[tokio::test]
async fn first_lookup_generates_and_persists_theme_and_copies() {
    let fx = fixture();

    let record = fx
        .service
        .runtime_config(fx.aurora)
        .await
        .expect("lookup")
        .expect("generated");

    assert_eq!(record.technical_name.as_deref(), Some("Aurora"));
    assert_eq!(record.resolved_config["sw-color-brand-primary"], json!("#ff6600"));
    assert_eq!(record.resolved_config["sw-font-family"], json!("Inter"));
    assert_eq!(record.resolved_config["sw-logo-desktop"], Value::Null);
    assert_eq!(record.script_files, Some(aurora_scripts()));
    assert_eq!(
        record.view_inheritance,
        vec!["@Storefront", "@Plugins", "@Aurora"]
    );
    assert_eq!(record.icon_sets["aurora-icons"].namespace, "Aurora");

    let stored = fx
        .store
        .find_by_id(fx.aurora)
        .await
        .expect("find")
        .expect("persisted");
    assert_eq!(stored, record);

    let copy = fx
        .store
        .find_by_id(fx.aurora_copy)
        .await
        .expect("find")
        .expect("copy persisted");
    assert!(copy.technical_name.is_none());
    assert_eq!(copy.resolved_config["sw-font-family"], json!("Lato"));
    assert_eq!(copy.resolved_config["sw-color-brand-primary"], json!("#ff6600"));
    assert_eq!(copy.script_files, record.script_files);
    assert_eq!(copy.icon_sets, record.icon_sets);
}

#[tokio::test]
async fn lookups_are_memoized_until_reset() {
    let fx = fixture();

    let first = fx.service.runtime_config(fx.aurora).await.expect("first");
    let second = fx.service.runtime_config(fx.aurora).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(fx.counting.reads(), 1);

    fx.service.reset_caches();
    let third = fx.service.runtime_config(fx.aurora).await.expect("third");
    assert_eq!(third, first);
    assert_eq!(fx.counting.reads(), 2);
}

#[tokio::test]
async fn name_lookup_shares_the_memo_with_id_lookup() {
    let fx = fixture();

    let by_name = fx
        .service
        .runtime_config_by_name("Aurora")
        .await
        .expect("by name")
        .expect("generated");
    assert_eq!(by_name.theme_id, fx.aurora);

    let by_id = fx.service.runtime_config(fx.aurora).await.expect("by id");
    assert_eq!(by_id, Some(by_name));
    assert_eq!(fx.counting.reads(), 1);
}

#[tokio::test]
async fn unknown_themes_yield_none_and_are_remembered() {
    let fx = fixture();
    let stray = Uuid::new_v4();

    assert!(fx.service.runtime_config(stray).await.expect("lookup").is_none());
    assert!(fx.service.runtime_config(stray).await.expect("lookup").is_none());
    assert!(
        fx.service
            .runtime_config_by_name("Nope")
            .await
            .expect("lookup")
            .is_none()
    );
    assert_eq!(fx.counting.reads(), 2);
}

#[tokio::test]
async fn strict_refresh_reports_missing_script_files() {
    let fx = fixture();
    std::fs::remove_file(fx.assets.path().join("Aurora/app/aurora.js")).expect("remove");

    let err = fx
        .service
        .regenerate(fx.aurora, true)
        .await
        .expect_err("missing file");
    assert!(matches!(
        err,
        ThemeConfigError::Compilation(CompilationError::MissingFile { .. })
    ));

    let uncompiled = fx.service.regenerate(fx.aurora, false).await.expect("best effort");
    assert_eq!(uncompiled.script_files, None);
}

#[tokio::test]
async fn missing_script_file_leaves_lookup_uncompiled() {
    let fx = fixture();
    std::fs::remove_file(fx.assets.path().join("Aurora/app/aurora.js")).expect("remove");

    let record = fx
        .service
        .runtime_config(fx.aurora)
        .await
        .expect("lookup")
        .expect("generated");
    assert_eq!(record.script_files, None);
    assert_eq!(record.resolved_config["sw-color-brand-primary"], json!("#ff6600"));

    let stored = fx
        .store
        .find_by_id(fx.aurora)
        .await
        .expect("find")
        .expect("persisted");
    assert_eq!(stored.script_files, None);

    let err = fx
        .service
        .resolved_runtime_config(fx.aurora)
        .await
        .expect_err("strict recompilation");
    assert!(matches!(
        err,
        ThemeConfigError::Compilation(CompilationError::MissingFile { .. })
    ));
}

#[tokio::test]
async fn unresolvable_scripts_leave_the_record_uncompiled() {
    let fx = fixture();
    fx.store.insert_manifest(manifest(json!({
        "technicalName": "Aurora",
        "script": ["@Missing", "app/aurora.js"]
    })));

    let record = fx
        .service
        .runtime_config(fx.aurora)
        .await
        .expect("lookup")
        .expect("generated");
    assert!(!record.is_compiled());
    assert_eq!(record.resolved_config["sw-color-brand-primary"], json!("#ff6600"));

    let err = fx
        .service
        .resolved_runtime_config(fx.aurora)
        .await
        .expect_err("strict recompilation");
    assert!(matches!(
        err,
        ThemeConfigError::Compilation(CompilationError::UnknownThemeReference { .. })
    ));
}

#[tokio::test]
async fn resolved_lookup_returns_compiled_records_as_is() {
    let fx = fixture();

    let generated = fx.service.runtime_config(fx.aurora).await.expect("lookup");
    let resolved = fx
        .service
        .resolved_runtime_config(fx.aurora)
        .await
        .expect("resolved");
    assert_eq!(resolved, generated);
}

#[tokio::test]
async fn value_refresh_reaches_every_descendant() {
    let fx = fixture();
    fx.service.runtime_config(fx.aurora).await.expect("aurora");
    let dark = fx
        .service
        .runtime_config(fx.aurora_dark)
        .await
        .expect("dark")
        .expect("generated");
    assert_eq!(dark.resolved_config["sw-color-brand-primary"], json!("#111111"));
    assert_eq!(dark.resolved_config["sw-font-family"], json!("Inter"));

    assert!(fx.store.set_config_values(
        fx.aurora,
        IndexMap::from([("sw-font-family".to_string(), json!("Roboto"))]),
    ));

    let refreshed = fx
        .service
        .refresh_config_values(fx.aurora)
        .await
        .expect("refresh")
        .expect("stored record");
    assert_eq!(refreshed.resolved_config["sw-font-family"], json!("Roboto"));
    assert_eq!(refreshed.script_files, Some(aurora_scripts()));

    let dark = fx
        .service
        .runtime_config(fx.aurora_dark)
        .await
        .expect("dark")
        .expect("stored");
    assert_eq!(dark.resolved_config["sw-font-family"], json!("Roboto"));
    assert_eq!(dark.resolved_config["sw-color-brand-primary"], json!("#111111"));
    assert!(dark.is_compiled());

    let copy = fx
        .store
        .find_by_id(fx.aurora_copy)
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(copy.resolved_config["sw-font-family"], json!("Lato"));
}

#[tokio::test]
async fn value_refresh_skips_themes_never_generated() {
    let fx = fixture();

    let refreshed = fx
        .service
        .refresh_config_values(fx.aurora)
        .await
        .expect("refresh");
    assert!(refreshed.is_none());
    assert!(fx.store.find_by_id(fx.aurora).await.expect("find").is_none());
}

#[tokio::test]
async fn copies_are_structured_under_their_parent_name() {
    let fx = fixture();

    let structure = fx
        .service
        .theme_structure(fx.aurora_copy)
        .await
        .expect("structure");
    let fields = &structure.tabs["default"].blocks["default"].sections["default"].fields;

    assert_eq!(
        fields.keys().collect::<Vec<_>>(),
        vec!["sw-color-brand-primary", "sw-font-family"]
    );
    assert_eq!(
        fields["sw-font-family"].label_snippet_key,
        "Aurora.default.default.default.sw-font-family.label"
    );
    assert_eq!(fields["sw-font-family"].config.value, Some(json!("Lato")));
}

#[tokio::test]
async fn active_theme_names_cover_named_records_only() {
    let fx = fixture();
    fx.service.runtime_config(fx.aurora).await.expect("aurora");
    fx.service
        .runtime_config_by_name("Storefront")
        .await
        .expect("storefront");

    assert_eq!(
        fx.service.active_theme_names().await.expect("names"),
        vec!["Aurora".to_string(), "Storefront".to_string()]
    );
}
