use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use resource_types::{CatalogIndex, Resource, ResourceId, ResourceKind};
use quiver_security::{
    check_file_size, parse_yaml_with_timeout, validate_path, validate_url, UrlPolicy,
};
use tracing::{debug, instrument, warn};

use crate::disk::DiskCache;
use crate::memory::{CacheStats, MemoryCache};
use crate::CatalogError;

/// Bounds applied to catalog file handling.
#[derive(Debug, Clone)]
pub struct CatalogLimits {
    /// Maximum size of any single catalog YAML file.
    pub max_catalog_bytes: u64,
    /// Wall-clock deadline for parsing one document.
    pub parse_deadline: Duration,
    /// Concurrent file loads for bulk operations.
    pub load_parallelism: usize,
    /// Entry cap for the in-process resource cache.
    pub memory_entries: NonZeroUsize,
    /// Soft byte budget for the in-process resource cache.
    pub memory_soft_bytes: u64,
    /// Time-to-live for on-disk cache entries.
    pub disk_ttl: Duration,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            max_catalog_bytes: 1024 * 1024,
            parse_deadline: Duration::from_secs(5),
            load_parallelism: 8,
            memory_entries: NonZeroUsize::new(128).unwrap(),
            memory_soft_bytes: 10 * 1024 * 1024,
            disk_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Loads and caches catalog documents from a base directory.
///
/// Thread-safe: cache tiers sit behind a mutex that is never held across
/// I/O. Bulk loads fan out over a bounded number of concurrent file reads.
#[derive(Debug)]
pub struct CatalogLoader {
    base: PathBuf,
    user_base: PathBuf,
    url_policy: UrlPolicy,
    limits: CatalogLimits,
    memory: Mutex<MemoryCache>,
    disk: Option<DiskCache>,
    index: Mutex<Option<Arc<CatalogIndex>>>,
}

impl CatalogLoader {
    /// A loader over the catalog at `base`, validating install paths against
    /// `user_base`. `disk_cache_dir` enables the persistent cache tier; pass
    /// `None` to run memory-only.
    pub fn new(
        base: impl Into<PathBuf>,
        user_base: impl Into<PathBuf>,
        url_policy: UrlPolicy,
        limits: CatalogLimits,
        disk_cache_dir: Option<PathBuf>,
    ) -> Self {
        let memory = MemoryCache::new(limits.memory_entries, limits.memory_soft_bytes);
        let disk = disk_cache_dir.map(|dir| DiskCache::new(dir, limits.disk_ttl));
        Self {
            base: base.into(),
            user_base: user_base.into(),
            url_policy,
            limits,
            memory: Mutex::new(memory),
            disk,
            index: Mutex::new(None),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn user_base(&self) -> &Path {
        &self.user_base
    }

    pub fn url_policy(&self) -> &UrlPolicy {
        &self.url_policy
    }

    /// Load the catalog index, including the per-kind id enumeration.
    ///
    /// Cached in memory for the life of the loader and on disk keyed by the
    /// index file's mtime.
    #[instrument(skip(self))]
    pub async fn load_index(&self) -> Result<Arc<CatalogIndex>, CatalogError> {
        if let Some(index) = self.index.lock().unwrap().clone() {
            return Ok(index);
        }

        let path = self.base.join("index.yaml");
        if !path.is_file() {
            return Err(CatalogError::IndexNotFound { path });
        }
        check_file_size(&path, self.limits.max_catalog_bytes)?;
        let mtime = file_mtime(&path)?;

        if let Some(disk) = &self.disk {
            if let Some(cached) = disk.read::<CatalogIndex>("index", mtime) {
                debug!("Catalog index loaded from disk cache");
                let index = Arc::new(cached);
                *self.index.lock().unwrap() = Some(Arc::clone(&index));
                return Ok(index);
            }
        }

        let bytes = fs_err::tokio::read(&path).await?;
        let mut index: CatalogIndex =
            parse_yaml_with_timeout(bytes, self.limits.parse_deadline)
                .await?
                .map_err(|err| CatalogError::from_yaml(path.clone(), &err))?;
        index.resource_ids = self.enumerate_ids().await?;

        let enumerated: usize = index.resource_ids.values().map(Vec::len).sum();
        if enumerated != index.total {
            warn!(
                "Catalog index declares {} resources but {} were enumerated",
                index.total, enumerated
            );
        }

        if let Some(disk) = &self.disk {
            disk.write("index", mtime, &index);
        }
        let index = Arc::new(index);
        *self.index.lock().unwrap() = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Load a single resource by kind and id, consulting both cache tiers.
    ///
    /// The id is re-validated against the id pattern before it is ever used
    /// to build a path, independent of any validation the caller did.
    #[instrument(skip(self), fields(kind = %kind, id = id))]
    pub async fn load_resource(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Arc<Resource>, CatalogError> {
        let id = ResourceId::new(id)?;
        let key = format!("{}/{}", kind.as_str(), id);

        if let Some(resource) = self.memory.lock().unwrap().get(&key) {
            return Ok(resource);
        }

        let relative = format!("{}/{}.yaml", kind.dir_name(), id);
        let path = validate_path(&relative, &self.base)?;
        if !path.is_file() {
            return Err(CatalogError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        let size = check_file_size(&path, self.limits.max_catalog_bytes)?;
        let mtime = file_mtime(&path)?;

        let resource = match self
            .disk
            .as_ref()
            .and_then(|disk| disk.read::<Resource>(&key, mtime))
        {
            Some(cached) => cached,
            None => {
                let resource = self.parse_resource(&path, kind, &id).await?;
                if let Some(disk) = &self.disk {
                    disk.write(&key, mtime, &resource);
                }
                resource
            }
        };

        let resource = Arc::new(resource);
        self.memory
            .lock()
            .unwrap()
            .insert(key, Arc::clone(&resource), size);
        Ok(resource)
    }

    /// Load a specific set of resources concurrently, preserving input
    /// order. Fails on the first error.
    pub async fn load_resources(
        &self,
        requests: &[(ResourceKind, ResourceId)],
    ) -> Result<Vec<Arc<Resource>>, CatalogError> {
        futures::stream::iter(requests)
            .map(|(kind, id)| self.load_resource(*kind, id.as_str()))
            .buffered(self.limits.load_parallelism)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    /// Load every resource named by the index, skipping (and returning) the
    /// ones that fail validation so one bad file cannot poison the catalog.
    pub async fn load_all(
        &self,
        index: &CatalogIndex,
    ) -> Result<(Vec<Arc<Resource>>, Vec<(ResourceId, CatalogError)>), CatalogError> {
        let requests: Vec<(ResourceKind, ResourceId)> = index
            .all()
            .map(|(kind, id)| (kind, id.clone()))
            .collect();

        let results: Vec<(ResourceId, Result<Arc<Resource>, CatalogError>)> =
            futures::stream::iter(requests)
                .map(|(kind, id)| async move {
                    let result = self.load_resource(kind, id.as_str()).await;
                    (id, result)
                })
                .buffered(self.limits.load_parallelism)
                .collect()
                .await;

        let mut resources = Vec::with_capacity(results.len());
        let mut rejected = Vec::new();
        for (id, result) in results {
            match result {
                Ok(resource) => resources.push(resource),
                Err(err) => {
                    warn!("Skipping `{id}`: {err}");
                    rejected.push((id, err));
                }
            }
        }
        Ok((resources, rejected))
    }

    /// Drop the in-memory tier (the index cache included).
    pub fn clear_cache(&self) {
        self.memory.lock().unwrap().clear();
        *self.index.lock().unwrap() = None;
    }

    /// Drop every cache tier, forcing the next load to hit the source tree.
    pub fn refresh(&self) {
        self.clear_cache();
        if let Some(disk) = &self.disk {
            disk.clear();
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.memory.lock().unwrap().stats()
    }

    async fn parse_resource(
        &self,
        path: &Path,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> Result<Resource, CatalogError> {
        let bytes = fs_err::tokio::read(path).await?;
        let resource: Resource = parse_yaml_with_timeout(bytes, self.limits.parse_deadline)
            .await?
            .map_err(|err| CatalogError::from_yaml(path.to_path_buf(), &err))?;

        resource
            .validate()
            .map_err(|violation| CatalogError::invalid_schema(path.to_path_buf(), violation))?;
        if resource.id != *id {
            return Err(CatalogError::InvalidSchema {
                path: path.to_path_buf(),
                field: "id".to_string(),
                message: format!("`{}` does not match the filename", resource.id),
            });
        }
        if resource.kind != kind {
            return Err(CatalogError::InvalidSchema {
                path: path.to_path_buf(),
                field: "type".to_string(),
                message: format!("`{}` does not match the catalog directory", resource.kind),
            });
        }

        // Security validation: the URL must be fetchable under the policy and
        // the install path must stay inside the user base.
        validate_url(&resource.source.url, &self.url_policy)?;
        validate_path(&resource.install_path, &self.user_base)?;

        Ok(resource)
    }

    /// Enumerate `<base>/<kind dir>/*.yaml` per kind, sorted by id.
    async fn enumerate_ids(
        &self,
    ) -> Result<indexmap::IndexMap<ResourceKind, Vec<ResourceId>>, CatalogError> {
        let mut ids = indexmap::IndexMap::new();
        for kind in ResourceKind::ALL {
            let dir = self.base.join(kind.dir_name());
            let mut kind_ids = Vec::new();
            if dir.is_dir() {
                let mut entries = fs_err::tokio::read_dir(&dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().map_or(true, |ext| ext != "yaml") {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                        continue;
                    };
                    match ResourceId::new(stem) {
                        Ok(id) => kind_ids.push(id),
                        Err(err) => warn!("Ignoring `{}`: {err}", path.display()),
                    }
                }
            }
            kind_ids.sort();
            ids.insert(kind, kind_ids);
        }
        Ok(ids)
    }
}

fn file_mtime(path: &Path) -> Result<SystemTime, CatalogError> {
    Ok(fs_err::metadata(path)?.modified()?)
}
