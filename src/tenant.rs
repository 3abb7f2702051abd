use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::engine::Engine;
use crate::limits::*;
use crate::store::SqliteStore;

/// One tenant's store plus an engine wired to it.
pub struct Tenant {
    pub store: Arc<SqliteStore>,
    pub engine: Engine,
}

impl Tenant {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        let engine = Engine::new(store.clone(), store.clone());
        Self { store, engine }
    }
}

/// Manages per-tenant stores. Tenant = database name from the pgwire connection.
pub struct TenantManager {
    tenants: DashMap<String, Arc<Tenant>>,
    data_dir: PathBuf,
    max_tenants: usize,
}

impl TenantManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            tenants: DashMap::new(),
            data_dir,
            max_tenants: MAX_TENANTS,
        }
    }

    /// Lower the open-tenant cap below `MAX_TENANTS`.
    pub fn with_max_tenants(mut self, max_tenants: usize) -> Self {
        self.max_tenants = max_tenants.min(MAX_TENANTS);
        self
    }

    /// Get or lazily open the store for the given tenant.
    pub fn get_or_create(&self, tenant: &str) -> std::io::Result<Arc<Tenant>> {
        if tenant.len() > MAX_TENANT_NAME_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "tenant name too long",
            ));
        }

        // Sanitize tenant name to prevent path traversal. The sanitized name
        // is the key, so names mapping to the same file share one store.
        let safe_name: String = tenant
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if safe_name.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty tenant name",
            ));
        }

        if let Some(existing) = self.tenants.get(&safe_name) {
            return Ok(existing.value().clone());
        }
        if self.tenants.len() >= self.max_tenants {
            return Err(std::io::Error::other("too many tenants"));
        }

        // Two connections may race to open the same tenant; the entry API
        // keeps a single store per name.
        let entry = self.tenants.entry(safe_name.clone()).or_try_insert_with(|| {
            let path = self.data_dir.join(format!("{safe_name}.db"));
            let store = SqliteStore::open(&path).map_err(std::io::Error::other)?;
            info!(tenant = %safe_name, path = %path.display(), "tenant store opened");
            Ok::<_, std::io::Error>(Arc::new(Tenant::new(Arc::new(store))))
        })?;
        let tenant = entry.value().clone();
        drop(entry);

        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.tenants.len() as f64);
        Ok(tenant)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
