//! Loading resolved modules into a real sandboxed isolate.

use boundary_loader::{BoundaryLoader, JsHost, LoaderConfig, LoaderError};
use std::fs;
use tempfile::tempdir;

fn config_for(root: &std::path::Path) -> LoaderConfig {
    LoaderConfig {
        timeout_ms: Some(5_000),
        ..LoaderConfig::for_project(root)
    }
}

#[tokio::test]
async fn test_client_module_evaluates_from_cache() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("counter.js");
    fs::write(&file, "'use client';\nexport const Counter = 42;\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let resolved = loader.resolve(&file).unwrap();
    let module = loader.load_resolved(&mut host, &resolved).await.unwrap();

    assert_eq!(module.specifier.to_file_path().unwrap(), resolved.load_path);
    assert!(resolved.load_path.starts_with(loader.cache().dir()));
}

#[tokio::test]
async fn test_server_module_evaluates_in_place() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("page.js");
    fs::write(&file, "export default function Page() { return '<p>hi</p>'; }\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let module = loader.resolve_and_load(&mut host, &file).await.unwrap();
    assert_eq!(module.specifier.to_file_path().unwrap(), file);
}

#[tokio::test]
async fn test_evaluation_error_surfaces_as_host_error() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("broken.js");
    fs::write(&file, "throw new Error('boom');\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let err = loader.resolve_and_load(&mut host, &file).await.unwrap_err();
    assert!(matches!(err, LoaderError::Host { .. }));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_disallowed_extension_rejected_by_sandbox() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("widget.tsx");
    fs::write(&file, "'use client';\nexport const Widget = 1;\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let err = loader.resolve_and_load(&mut host, &file).await.unwrap_err();
    assert!(matches!(err, LoaderError::Host { .. }));
}

#[tokio::test]
async fn test_loading_same_module_twice_reuses_evaluation() {
    let dir = tempdir().unwrap();
    let server = dir.path().join("page.js");
    let client = dir.path().join("counter.js");
    fs::write(&server, "export default function Page() { return 'page'; }\n").unwrap();
    fs::write(&client, "'use client';\nexport const Counter = 1;\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let first = loader.resolve_and_load(&mut host, &server).await.unwrap();
    let second = loader.resolve_and_load(&mut host, &server).await.unwrap();
    assert_eq!(first.id, second.id);

    let first = loader.resolve_and_load(&mut host, &client).await.unwrap();
    let second = loader.resolve_and_load(&mut host, &client).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.specifier, second.specifier);
}

#[tokio::test]
async fn test_loading_module_already_imported_by_another() {
    let dir = tempdir().unwrap();
    let widget = dir.path().join("widget.js");
    let page = dir.path().join("page.js");
    fs::write(&widget, "export function Widget() { return 'w'; }\n").unwrap();
    fs::write(&page, "import { Widget } from './widget.js';\nexport default Widget;\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let page_module = loader.resolve_and_load(&mut host, &page).await.unwrap();
    let widget_module = loader.resolve_and_load(&mut host, &widget).await.unwrap();

    assert_ne!(page_module.id, widget_module.id);
    assert_eq!(widget_module.specifier.to_file_path().unwrap(), widget);

    let again = loader.resolve_and_load(&mut host, &widget).await.unwrap();
    assert_eq!(again.id, widget_module.id);
}

#[tokio::test]
async fn test_failed_module_reports_error_on_reload() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("broken.js");
    fs::write(&file, "throw new Error('boom');\n").unwrap();

    let config = config_for(dir.path());
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    assert!(loader.resolve_and_load(&mut host, &file).await.is_err());
    let err = loader.resolve_and_load(&mut host, &file).await.unwrap_err();
    assert!(matches!(err, LoaderError::Host { .. }));
    assert!(err.to_string().contains("failed earlier"));
}

// The watchdog is a tokio task and needs a second worker while V8 spins
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_terminates_and_host_stays_usable() {
    let dir = tempdir().unwrap();
    let spin = dir.path().join("spin.js");
    let page = dir.path().join("page.js");
    fs::write(&spin, "while (true) {}\nexport const Never = 1;\n").unwrap();
    fs::write(&page, "export const Page = 'ok';\n").unwrap();

    let config = LoaderConfig {
        timeout_ms: Some(100),
        ..LoaderConfig::for_project(dir.path())
    };
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config).unwrap();

    let err = loader.resolve_and_load(&mut host, &spin).await.unwrap_err();
    assert!(matches!(err, LoaderError::Host { .. }));
    assert!(err.to_string().contains("timed out"), "{err}");

    // Termination is cleared; other modules still evaluate
    let module = loader.resolve_and_load(&mut host, &page).await.unwrap();
    assert_eq!(module.specifier.to_file_path().unwrap(), page);

    // The spinning module is not re-run
    let err = loader.resolve_and_load(&mut host, &spin).await.unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
}
