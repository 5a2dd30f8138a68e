//! File-system backed theme sources: manifest directories and the script
//! file resolver.

use std::path::Path;

use livery::application::repos::{RepoError, ThemeManifestRepo};
use livery::application::theme::{CompilationError, ScriptFileResolver};
use livery::domain::theme_config::ThemeManifest;
use livery::infra::assets::FilesystemScriptResolver;
use livery::infra::manifests::ManifestDirectory;
use serde_json::json;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("directory");
    std::fs::write(path, contents).expect("write");
}

fn manifest(name: &str, is_theme: bool, script: &[&str]) -> ThemeManifest {
    serde_json::from_value(json!({
        "technicalName": name,
        "isTheme": is_theme,
        "script": script,
    }))
    .expect("manifest")
}

#[tokio::test]
async fn manifests_are_listed_in_directory_order() {
    let root = TempDir::new().expect("themes dir");
    write(
        root.path(),
        "Storefront/theme.json",
        r#"{ "technicalName": "Storefront", "script": ["app/storefront.js"] }"#,
    );
    write(
        root.path(),
        "Aurora/theme.json",
        r#"{ "technicalName": "Aurora", "views": ["@Storefront", "@Aurora"] }"#,
    );
    write(root.path(), "Unrelated/README.md", "not a theme");
    write(root.path(), "stray.json", "{}");

    let directory = ManifestDirectory::new(root.path());
    let names: Vec<String> = directory
        .list_manifests()
        .await
        .expect("list")
        .into_iter()
        .map(|manifest| manifest.technical_name)
        .collect();
    assert_eq!(names, vec!["Aurora".to_string(), "Storefront".to_string()]);

    let aurora = directory
        .find_manifest("Aurora")
        .await
        .expect("find")
        .expect("present");
    assert_eq!(aurora.view_inheritance, vec!["@Storefront", "@Aurora"]);
    assert!(directory.find_manifest("Unrelated").await.expect("find").is_none());
    assert!(directory.find_manifest("../Aurora").await.expect("find").is_none());
}

#[tokio::test]
async fn mismatched_or_malformed_manifests_are_errors() {
    let root = TempDir::new().expect("themes dir");
    write(
        root.path(),
        "Aurora/theme.json",
        r#"{ "technicalName": "Borealis" }"#,
    );
    write(root.path(), "Broken/theme.json", "{ not json");

    let directory = ManifestDirectory::new(root.path());
    assert!(matches!(
        directory.find_manifest("Aurora").await,
        Err(RepoError::Integrity { .. })
    ));
    assert!(matches!(
        directory.find_manifest("Broken").await,
        Err(RepoError::Decode { .. })
    ));
}

#[tokio::test]
async fn missing_themes_directory_lists_nothing() {
    let root = TempDir::new().expect("parent");
    let directory = ManifestDirectory::new(root.path().join("absent"));

    assert!(directory.list_manifests().await.expect("list").is_empty());
}

#[tokio::test]
async fn resolver_expands_references_and_drops_duplicates() {
    let assets = TempDir::new().expect("asset root");
    write(assets.path(), "Storefront/app/storefront.js", "// base");
    write(assets.path(), "Aurora/app/aurora.js", "// aurora");

    let storefront = manifest("Storefront", true, &["app/storefront.js"]);
    let aurora = manifest(
        "Aurora",
        true,
        &["@Storefront", "app/aurora.js", "app/aurora.js"],
    );
    let manifests = vec![storefront, aurora.clone()];
    let resolver = FilesystemScriptResolver::new(assets.path());

    let resolved = resolver
        .resolve_script_files(&aurora, &manifests)
        .await
        .expect("resolve");
    assert_eq!(
        resolved,
        vec![
            "Storefront/app/storefront.js".to_string(),
            "Aurora/app/aurora.js".to_string(),
        ]
    );
}

#[tokio::test]
async fn any_missing_file_fails_resolution() {
    let assets = TempDir::new().expect("asset root");
    write(assets.path(), "Storefront/app/storefront.js", "// base");
    write(assets.path(), "Aurora/app/aurora.js", "// aurora");

    let storefront = manifest("Storefront", true, &["app/storefront.js"]);
    let aurora = manifest(
        "Aurora",
        true,
        &["@Storefront", "app/aurora.js", "app/missing.js"],
    );
    let manifests = vec![storefront, aurora.clone()];
    let resolver = FilesystemScriptResolver::new(assets.path());

    let err = resolver
        .resolve_script_files(&aurora, &manifests)
        .await
        .expect_err("missing file");
    match err {
        CompilationError::MissingFile { theme, path } => {
            assert_eq!(theme, "Aurora");
            assert!(path.ends_with("app/missing.js"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn directories_are_not_script_files() {
    let assets = TempDir::new().expect("asset root");
    std::fs::create_dir_all(assets.path().join("Aurora/app")).expect("directory");

    let aurora = manifest("Aurora", true, &["app"]);
    let resolver = FilesystemScriptResolver::new(assets.path());

    let err = resolver
        .resolve_script_files(&aurora, std::slice::from_ref(&aurora))
        .await
        .expect_err("directory entry");
    assert!(matches!(err, CompilationError::MissingFile { .. }));
}
