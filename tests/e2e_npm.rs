//! npm registry E2E tests: a full crawl against a mock registry server

use std::sync::Arc;

use mockito::{Mock, Server, ServerGuard};
use tempfile::TempDir;

use remote_ls::crawl::{self, CrawlOptions, Resolver};
use remote_ls::registry::{CachedRegistry, ManifestCache, NpmRegistry, Registry};

async fn mock_packument(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

/// express@4.18.2 -> debug@2.6.9 -> ms@2.0.0, plus a scoped optional dependency
async fn setup_server() -> (ServerGuard, Vec<Mock>) {
    let mut server = Server::new_async().await;

    let mocks = vec![
        mock_packument(
            &mut server,
            "/express",
            r#"{
                "name": "express",
                "dist-tags": { "latest": "4.18.2" },
                "versions": {
                    "4.18.2": {
                        "name": "express",
                        "version": "4.18.2",
                        "dependencies": { "debug": "2.6.9", "@types/node": "^20.0.0" },
                        "optionalDependencies": { "@types/node": "^20.0.0" }
                    }
                }
            }"#,
        )
        .await,
        mock_packument(
            &mut server,
            "/debug",
            r#"{
                "name": "debug",
                "dist-tags": { "latest": "4.3.4" },
                "versions": {
                    "2.6.9": { "name": "debug", "version": "2.6.9", "dependencies": { "ms": "2.0.0" } },
                    "4.3.4": { "name": "debug", "version": "4.3.4", "dependencies": { "ms": "2.1.2" } }
                }
            }"#,
        )
        .await,
        mock_packument(
            &mut server,
            "/ms",
            r#"{
                "name": "ms",
                "dist-tags": { "latest": "2.1.3" },
                "versions": {
                    "2.0.0": { "name": "ms", "version": "2.0.0" },
                    "2.1.3": { "name": "ms", "version": "2.1.3" }
                }
            }"#,
        )
        .await,
    ];

    (server, mocks)
}

#[tokio::test(flavor = "multi_thread")]
async fn crawls_transitive_dependencies_from_registry() {
    let (server, mocks) = setup_server().await;

    let resolver = Resolver::new(
        Arc::new(NpmRegistry::new(&server.url())),
        CrawlOptions::default(),
    );

    let report = crawl::list_dependencies(&resolver, "express", "4.18.2", None)
        .await
        .unwrap();

    for mock in mocks {
        mock.assert_async().await;
    }
    assert_eq!(
        report.packages,
        vec!["express@4.18.2", "debug@2.6.9", "ms@2.0.0"]
    );
    assert!(report.failed.is_empty());
    assert_eq!(
        report.resolved.get("ms@2.0.0").map(String::as_str),
        Some("2.0.0")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn optional_dependency_that_is_missing_is_recorded_as_failed() {
    let (mut server, _mocks) = setup_server().await;
    let missing = server
        .mock("GET", "/@types%2Fnode")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let resolver = Resolver::new(
        Arc::new(NpmRegistry::new(&server.url())),
        CrawlOptions {
            include_optional: true,
            ..CrawlOptions::default()
        },
    );

    let report = crawl::list_dependencies(&resolver, "express", "4.18.2", None)
        .await
        .unwrap();

    missing.assert_async().await;
    assert_eq!(report.packages.len(), 4);
    assert!(report.packages.contains(&"@types/node@^20.0.0".to_string()));
    assert_eq!(report.failed, vec!["@types/node@^20.0.0"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_crawl_is_served_from_cache() {
    let (server, mocks) = setup_server().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("manifests.db");

    let registry: Arc<dyn Registry> = Arc::new(CachedRegistry::new(
        NpmRegistry::new(&server.url()),
        ManifestCache::new(&db_path, 86_400_000).unwrap(),
    ));
    let resolver = Resolver::new(registry, CrawlOptions::default());

    let first = crawl::list_dependencies(&resolver, "express", "4.18.2", None)
        .await
        .unwrap();
    let second = crawl::list_dependencies(&resolver, "express", "4.18.2", None)
        .await
        .unwrap();

    // Each packument was requested exactly once across both crawls
    for mock in mocks {
        mock.assert_async().await;
    }
    assert_eq!(first.packages, second.packages);
}
