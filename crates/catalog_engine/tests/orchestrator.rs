mod common;

use std::fs;

use catalog_engine::{run, PipelineError};
use common::{
    init_logging, session_with_token, shared, table_html, test_settings, FakeHost, MemoryStore,
    Site, VALID_SESSION,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn catalog_pages() -> Vec<String> {
    vec![table_html(
        &["Name", "Price"],
        &[(None, vec!["Café", "€1"]), (None, vec!["B", "$2"])],
    )]
}

fn site_with_catalog() -> Site {
    Site {
        pages: catalog_pages(),
        ..Site::default()
    }
}

#[tokio::test]
async fn fresh_run_logs_in_harvests_and_writes_output() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("products.json");
    let settings = test_settings(&output);
    let site = shared(site_with_catalog());
    let store = MemoryStore::default();

    let summary = run(Box::new(FakeHost::new(site.clone())), &store, &settings)
        .await
        .unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.pages, 1);
    assert!(!summary.session_reused);
    assert_eq!(summary.output, output);
    assert_eq!(store.saves(), 1);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        "[\n    {\n        \"Name\": \"Café\",\n        \"Price\": \"€1\"\n    },\n    {\n        \"Name\": \"B\",\n        \"Price\": \"$2\"\n    }\n]"
    );

    let site = site.lock().unwrap();
    assert!(site.shut_down);
    assert_eq!(site.pages_opened, site.pages_closed);
}

#[tokio::test]
async fn valid_stored_session_skips_login() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let settings = test_settings(&temp.path().join("products.json"));
    let site = shared(site_with_catalog());
    let store = MemoryStore::holding(session_with_token(VALID_SESSION));

    let summary = run(Box::new(FakeHost::new(site.clone())), &store, &settings)
        .await
        .unwrap();

    assert!(summary.session_reused);
    assert_eq!(store.deletes(), 0);
    let site = site.lock().unwrap();
    assert_eq!(site.submits, 0);
    assert_eq!(site.restores, 1);
    assert_eq!(site.pages_opened, 1);
}

#[tokio::test]
async fn rejected_session_is_deleted_and_login_runs_once() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let settings = test_settings(&temp.path().join("products.json"));
    let site = shared(site_with_catalog());
    let store = MemoryStore::holding(session_with_token("expired"));

    let summary = run(Box::new(FakeHost::new(site.clone())), &store, &settings)
        .await
        .unwrap();

    assert!(!summary.session_reused);
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.saves(), 1);
    let site = site.lock().unwrap();
    assert_eq!(site.submits, 1);
    assert_eq!(site.cookie_clears, 1);
    assert_eq!(site.pages_opened, 2);
    assert_eq!(site.pages_closed, 2);
    // Login happens in a fresh context, not the one the stale session was seeded into.
    assert_eq!(site.restored_contexts.len(), 1);
    assert_eq!(site.login_contexts.len(), 1);
    assert!(!site.restored_contexts.contains(&site.login_contexts[0]));
}

#[tokio::test]
async fn failure_releases_browser_and_writes_nothing() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("products.json");
    let settings = test_settings(&output);
    let mut site = site_with_catalog();
    site.missing.insert("Inventory");
    let site = shared(site);
    let store = MemoryStore::default();

    let err = run(Box::new(FakeHost::new(site.clone())), &store, &settings)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Navigation(_)), "{err}");
    assert!(!output.exists());
    let site = site.lock().unwrap();
    assert!(site.shut_down);
    assert_eq!(site.pages_opened, site.pages_closed);
}

#[tokio::test]
async fn login_failure_is_fatal() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(&temp.path().join("products.json"));
    settings.credentials = catalog_engine::Credentials::new("someone@example.com", "nope");
    let site = shared(site_with_catalog());

    let err = run(Box::new(FakeHost::new(site.clone())), &MemoryStore::default(), &settings)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Auth(_)), "{err}");
    assert!(site.lock().unwrap().shut_down);
}
