use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use quiver_catalog::{CacheStats, CatalogLimits, CatalogLoader};
use quiver_categories::{CategoryEngine, CategoryStatistics};
use quiver_client::DownloadClientBuilder;
use quiver_installer::{BatchReport, InstallError, Installer, ProgressSink, RollbackReport};
use quiver_resolver::Resolver;
use quiver_search::{SearchIndex, SearchOptions, SearchResult};
use quiver_security::UrlPolicy;
use resource_types::{
    CatalogIndex, CategoryTree, InstallPlan, InstallRecord, Resource, ResourceId, ResourceKind,
};

use crate::{Error, Settings};

/// Everything derived from one load of the resource set. Replaced wholesale
/// on refresh; readers hold an `Arc` and are never invalidated mid-call.
#[derive(Debug)]
struct Snapshot {
    resources: Vec<Arc<Resource>>,
    by_id: FxHashMap<ResourceId, Arc<Resource>>,
    search: SearchIndex,
    categories: CategoryEngine,
    resolver: Resolver,
}

/// The resource engine: owns the catalog loader and coordinates search,
/// categorization, resolution, and installation.
#[derive(Debug)]
pub struct Engine {
    loader: CatalogLoader,
    installer: Installer,
    settings: Settings,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl Engine {
    /// Open the catalog at `base_dir` with explicit `settings`, loading the
    /// index eagerly. Resource descriptors are loaded on demand.
    #[instrument(skip_all, fields(base = %base_dir.as_ref().display()))]
    pub async fn load_catalog(
        base_dir: impl AsRef<std::path::Path>,
        settings: Settings,
    ) -> Result<Self, Error> {
        let policy = UrlPolicy::strict(&settings.extra_allowed_hosts);
        let limits = CatalogLimits {
            max_catalog_bytes: settings.max_catalog_bytes,
            ..CatalogLimits::default()
        };
        let disk_cache = settings.claude_home.join(".cache").join("catalog-v0");
        let loader = CatalogLoader::new(
            base_dir.as_ref(),
            &settings.claude_home,
            policy.clone(),
            limits,
            Some(disk_cache),
        );

        let client = DownloadClientBuilder::default()
            .retries(settings.retries)
            .total_timeout(settings.http_timeout)
            .build();
        let installer = Installer::new(&settings.claude_home, policy, client)?
            .with_max_download_bytes(settings.max_download_bytes);

        let engine = Self {
            loader,
            installer,
            settings,
            snapshot: RwLock::new(None),
        };
        engine.loader.load_index().await?;
        Ok(engine)
    }

    /// [`Engine::load_catalog`] with settings taken from the environment.
    pub async fn load_catalog_from_env(
        base_dir: impl AsRef<std::path::Path>,
    ) -> Result<Self, Error> {
        Self::load_catalog(base_dir, Settings::from_env()).await
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The catalog index (counts and per-kind id lists).
    pub async fn index(&self) -> Result<Arc<CatalogIndex>, Error> {
        Ok(self.loader.load_index().await?)
    }

    /// All resources, optionally limited to one kind, ordered by kind then
    /// id.
    pub async fn list(&self, kind: Option<ResourceKind>) -> Result<Vec<Arc<Resource>>, Error> {
        let snapshot = self.snapshot().await?;
        let mut resources: Vec<Arc<Resource>> = snapshot
            .resources
            .iter()
            .filter(|resource| kind.map_or(true, |kind| resource.kind == kind))
            .cloned()
            .collect();
        resources.sort_by(|a, b| (a.kind, &a.id).cmp(&(b.kind, &b.id)));
        Ok(resources)
    }

    /// Weighted search over the loaded resource set.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.search.search_smart(query, options))
    }

    /// The hierarchical category tree.
    pub async fn categories(&self) -> Result<CategoryTree, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.categories.tree().clone())
    }

    /// Resources under a primary (and optional secondary) category.
    pub async fn filter(
        &self,
        primary: &str,
        secondary: Option<&str>,
    ) -> Result<Vec<Arc<Resource>>, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.categories.filter(primary, secondary))
    }

    /// Aggregate category counts.
    pub async fn category_statistics(&self) -> Result<CategoryStatistics, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.categories.statistics())
    }

    /// Resolve `selection` into an ordered install plan, with
    /// `already_installed` filled in from the install history.
    pub async fn plan_install(
        &self,
        selection: &[ResourceId],
        include_recommended: bool,
    ) -> Result<InstallPlan, Error> {
        let snapshot = self.snapshot().await?;
        let mut plan = snapshot.resolver.resolve(selection, include_recommended)?;

        let latest = self.installer.history().latest().map_err(InstallError::from)?;
        for planned in &mut plan.resources {
            if let (Some(record), Some(resource)) =
                (latest.get(&planned.id), snapshot.by_id.get(&planned.id))
            {
                planned.already_installed =
                    record.sha256 == resource.source.sha256 && record.path.is_file();
            }
        }
        Ok(plan)
    }

    /// Execute a plan. `parallelism` defaults to the configured value;
    /// `sink` receives progress events; `cancel` aborts cooperatively.
    pub async fn install(
        &self,
        plan: &InstallPlan,
        parallelism: Option<usize>,
        force: bool,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, Error> {
        let snapshot = self.snapshot().await?;
        let parallelism = parallelism.unwrap_or(self.settings.install_parallelism);
        Ok(self
            .installer
            .batch_install(plan, &snapshot.by_id, parallelism, force, sink, cancel)
            .await?)
    }

    /// Undo a batch, best-effort.
    pub fn rollback(&self, report: &BatchReport) -> RollbackReport {
        self.installer.rollback_batch(report)
    }

    /// The install history, oldest first.
    pub fn installed(&self) -> Result<Vec<InstallRecord>, Error> {
        Ok(self
            .installer
            .history()
            .read_all()
            .map_err(InstallError::from)?)
    }

    /// Rewrite the history keeping the latest record per id.
    pub fn compact_history(&self) -> Result<(), Error> {
        Ok(self
            .installer
            .history()
            .compact()
            .map_err(InstallError::from)?)
    }

    /// All resources that depend on `id`, directly or transitively.
    pub async fn reverse_dependencies(&self, id: &ResourceId) -> Result<Vec<ResourceId>, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.resolver.reverse_dependencies(id))
    }

    /// Every dependency cycle in the loaded set.
    pub async fn detect_cycles(
        &self,
        include_recommended: bool,
    ) -> Result<Vec<Vec<ResourceId>>, Error> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.resolver.detect_cycles(include_recommended))
    }

    /// Drop every cache tier and derived snapshot; the next call reloads
    /// from the catalog tree.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.loader.refresh();
        *self.snapshot.write().await = None;
        self.loader.load_index().await?;
        Ok(())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.loader.cache_stats()
    }

    /// The current snapshot, building it on first use. Resources that fail
    /// validation are excluded (the loader has already logged them).
    async fn snapshot(&self) -> Result<Arc<Snapshot>, Error> {
        if let Some(snapshot) = self.snapshot.read().await.clone() {
            return Ok(snapshot);
        }

        let mut guard = self.snapshot.write().await;
        // Another task may have built it while we waited for the lock.
        if let Some(snapshot) = guard.clone() {
            return Ok(snapshot);
        }

        let index = self.loader.load_index().await?;
        let (resources, rejected) = self.loader.load_all(&index).await?;
        debug!(
            "Building engine snapshot over {} resource(s) ({} rejected)",
            resources.len(),
            rejected.len()
        );

        let by_id: FxHashMap<ResourceId, Arc<Resource>> = resources
            .iter()
            .map(|resource| (resource.id.clone(), Arc::clone(resource)))
            .collect();
        let snapshot = Arc::new(Snapshot {
            search: SearchIndex::build(resources.iter().cloned()),
            categories: CategoryEngine::build(resources.iter().cloned()),
            resolver: Resolver::new(resources.iter().cloned()),
            by_id,
            resources,
        });
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
