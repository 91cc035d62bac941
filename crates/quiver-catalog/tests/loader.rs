//! End-to-end loader tests over a synthetic catalog tree.

use quiver_catalog::{CatalogError, CatalogLimits, CatalogLoader};
use quiver_security::{SecurityError, UrlPolicy};
use resource_types::ResourceKind;
use tempfile::TempDir;

struct Fixture {
    catalog: TempDir,
    user_base: TempDir,
    cache: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            catalog: TempDir::new().unwrap(),
            user_base: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        };
        fixture.write(
            "index.yaml",
            "total: 2\ntypes:\n  agent: 2\n  command: 0\n  hook: 0\n  template: 0\n  mcp: 0\nversion: '1.0'\n",
        );
        fixture.write("agents/architect.yaml", &resource_doc("architect", "agents/architect.md"));
        fixture.write(
            "agents/security-reviewer.yaml",
            &resource_doc("security-reviewer", "agents/security-reviewer.md"),
        );
        fixture
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.catalog.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn loader(&self) -> CatalogLoader {
        self.loader_with_limits(CatalogLimits::default())
    }

    fn loader_with_limits(&self, limits: CatalogLimits) -> CatalogLoader {
        CatalogLoader::new(
            self.catalog.path(),
            self.user_base.path(),
            UrlPolicy::default(),
            limits,
            Some(self.cache.path().join("catalog-v0")),
        )
    }
}

fn resource_doc(id: &str, install_path: &str) -> String {
    format!(
        "id: {id}\n\
         type: agent\n\
         name: {id}\n\
         description: A test resource\n\
         source:\n  url: https://raw.githubusercontent.com/org/repo/main/{id}.md\n\
         install_path: {install_path}\n"
    )
}

#[tokio::test]
async fn loads_index_and_enumerates_ids() {
    let fixture = Fixture::new();
    let loader = fixture.loader();

    let index = loader.load_index().await.unwrap();
    assert_eq!(index.total, 2);
    let ids: Vec<&str> = index
        .ids(ResourceKind::Agent)
        .iter()
        .map(resource_types::ResourceId::as_str)
        .collect();
    assert_eq!(ids, ["architect", "security-reviewer"]);
}

#[tokio::test]
async fn loads_and_caches_a_resource() {
    let fixture = Fixture::new();
    let loader = fixture.loader();

    let first = loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    let second = loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    assert_eq!(first, second);

    let stats = loader.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn loading_twice_yields_equal_values_across_loaders() {
    let fixture = Fixture::new();

    // A fresh loader (fresh memory tier, warm disk tier) must produce a value
    // equal to the first load.
    let first = fixture
        .loader()
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    let second = fixture
        .loader()
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let fixture = Fixture::new();
    let loader = fixture.loader();

    let err = loader
        .load_resource(ResourceKind::Agent, "no-such-agent")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[tokio::test]
async fn invalid_id_never_touches_the_filesystem() {
    let fixture = Fixture::new();
    let loader = fixture.loader();

    let err = loader
        .load_resource(ResourceKind::Agent, "../../../etc/passwd")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidId(_)));
}

#[tokio::test]
async fn file_at_exactly_the_cap_is_accepted() {
    let fixture = Fixture::new();
    let doc = resource_doc("architect", "agents/architect.md");
    let limits = CatalogLimits {
        max_catalog_bytes: doc.len() as u64,
        ..CatalogLimits::default()
    };
    let loader = fixture.loader_with_limits(limits);

    loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
}

#[tokio::test]
async fn file_one_byte_over_the_cap_is_too_large() {
    let fixture = Fixture::new();
    let doc = resource_doc("architect", "agents/architect.md");
    let limits = CatalogLimits {
        max_catalog_bytes: doc.len() as u64 - 1,
        ..CatalogLimits::default()
    };
    let loader = fixture.loader_with_limits(limits);

    let err = loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Security(SecurityError::TooLarge { .. })
    ));
}

#[tokio::test]
async fn schema_violation_names_the_field() {
    let fixture = Fixture::new();
    fixture.write(
        "agents/broken.yaml",
        "id: broken\ntype: agent\nname: Broken\nsource:\n  url: https://github.com/org/repo\n  sha256: nope\ninstall_path: agents/broken.md\n",
    );
    let loader = fixture.loader();

    let err = loader
        .load_resource(ResourceKind::Agent, "broken")
        .await
        .unwrap_err();
    match err {
        CatalogError::InvalidSchema { field, .. } => assert_eq!(field, "source.sha256"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn disguised_traversal_in_install_path_is_rejected_at_load() {
    let fixture = Fixture::new();
    fixture.write(
        "agents/sneaky.yaml",
        &resource_doc("sneaky", "agents/\u{FE52}\u{FE52}/secret.txt"),
    );
    let loader = fixture.loader();

    let err = loader
        .load_resource(ResourceKind::Agent, "sneaky")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Security(SecurityError::PathTraversal { .. })
    ));

    // The resource is excluded from a bulk load rather than poisoning it.
    fixture.write(
        "index.yaml",
        "total: 3\ntypes:\n  agent: 3\n  command: 0\n  hook: 0\n  template: 0\n  mcp: 0\nversion: '1.0'\n",
    );
    let loader = fixture.loader();
    let index = loader.load_index().await.unwrap();
    let (resources, rejected) = loader.load_all(&index).await.unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0.as_str(), "sneaky");
}

#[tokio::test]
async fn non_whitelisted_source_url_is_rejected_at_load() {
    let fixture = Fixture::new();
    fixture.write(
        "agents/offsite.yaml",
        "id: offsite\ntype: agent\nname: Offsite\nsource:\n  url: https://evil.example.net/a.md\ninstall_path: agents/offsite.md\n",
    );
    let loader = fixture.loader();

    let err = loader
        .load_resource(ResourceKind::Agent, "offsite")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Security(SecurityError::UnsafeUrl { .. })
    ));
}

#[tokio::test]
async fn corrupt_disk_cache_falls_through_to_source() {
    let fixture = Fixture::new();
    let cache_root = fixture.cache.path().join("catalog-v0");
    let loader = fixture.loader();
    loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();

    // Scribble over the cached entry, then reload through a fresh loader.
    let entry = cache_root.join("agent/architect.msgpack");
    assert!(entry.is_file(), "expected a disk cache entry");
    std::fs::write(&entry, b"garbage").unwrap();

    let loader = fixture.loader();
    let resource = loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    assert_eq!(resource.id.as_str(), "architect");
}

#[tokio::test]
async fn refresh_drops_both_tiers() {
    let fixture = Fixture::new();
    let loader = fixture.loader();
    loader
        .load_resource(ResourceKind::Agent, "architect")
        .await
        .unwrap();
    loader.refresh();

    assert_eq!(loader.cache_stats().entries, 0);
    assert!(!fixture.cache.path().join("catalog-v0").exists());
}

#[tokio::test]
async fn empty_catalog_loads_cleanly() {
    let catalog = TempDir::new().unwrap();
    let user_base = TempDir::new().unwrap();
    std::fs::write(
        catalog.path().join("index.yaml"),
        "total: 0\ntypes: {}\nversion: '1.0'\n",
    )
    .unwrap();
    let loader = CatalogLoader::new(
        catalog.path(),
        user_base.path(),
        UrlPolicy::default(),
        CatalogLimits::default(),
        None,
    );

    let index = loader.load_index().await.unwrap();
    assert!(index.is_empty());
    let (resources, rejected) = loader.load_all(&index).await.unwrap();
    assert!(resources.is_empty());
    assert!(rejected.is_empty());
}

#[tokio::test]
async fn missing_index_is_reported_with_path() {
    let catalog = TempDir::new().unwrap();
    let user_base = TempDir::new().unwrap();
    let loader = CatalogLoader::new(
        catalog.path(),
        user_base.path(),
        UrlPolicy::default(),
        CatalogLimits::default(),
        None,
    );

    let err = loader.load_index().await.unwrap_err();
    match err {
        CatalogError::IndexNotFound { path } => {
            assert_eq!(path, catalog.path().join("index.yaml"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[allow(dead_code)]
fn assert_send<T: Send>(_: &T) {}

#[tokio::test]
async fn loader_is_shareable_across_tasks() {
    let fixture = Fixture::new();
    let loader = std::sync::Arc::new(fixture.loader());
    assert_send(&loader);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let loader = std::sync::Arc::clone(&loader);
            tokio::spawn(async move {
                loader
                    .load_resource(ResourceKind::Agent, "architect")
                    .await
                    .map(|resource| resource.id.clone())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().as_str(), "architect");
    }
}
