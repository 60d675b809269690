//! Shared catalog context.
//!
//! Owns the store location and the builder, and hands out the current
//! accessor. The first access loads the catalog: a fresh file is served as
//! is, otherwise the catalog is rebuilt from the provider and persisted. A
//! failed rebuild never touches the file and degrades to whatever was cached.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use crate::accessor::CatalogAccessor;
use crate::builder::CatalogBuilder;
use crate::error::CatalogError;
use crate::provider::BandProvider;
use crate::store::{CatalogStore, RecordMap};
use crate::types::{CatalogStatus, VariableRecord};

pub struct CatalogContext<P> {
    store_path: PathBuf,
    builder: CatalogBuilder<P>,
    /// Zero disables the age check
    max_age: Duration,
    current: RwLock<Option<Arc<CatalogAccessor>>>,
    /// Serializes loads so concurrent first accesses build once
    load_lock: tokio::sync::Mutex<()>,
}

impl<P: BandProvider> CatalogContext<P> {
    pub fn new(store_path: impl Into<PathBuf>, builder: CatalogBuilder<P>, max_age: Duration) -> Self {
        Self {
            store_path: store_path.into(),
            builder,
            max_age,
            current: RwLock::new(None),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn builder(&self) -> &CatalogBuilder<P> {
        &self.builder
    }

    /// The current accessor, loading the catalog on first use.
    ///
    /// Never fails; provider or disk problems show up in the accessor status.
    pub async fn accessor(&self) -> Arc<CatalogAccessor> {
        if let Some(current) = self.current() {
            return current;
        }

        let _guard = self.load_lock.lock().await;
        if let Some(current) = self.current() {
            return current;
        }

        let accessor = Arc::new(self.load().await);
        info!(
            status = ?accessor.status(),
            count = accessor.len(),
            "{}",
            accessor.status().description()
        );
        *self.current.write() = Some(Arc::clone(&accessor));
        accessor
    }

    pub async fn lookup(&self, key: &str) -> VariableRecord {
        self.accessor().await.lookup(key)
    }

    /// Rebuild from the provider regardless of the cached file's age.
    ///
    /// On provider failure the file and the current accessor stay as they were.
    #[instrument(skip(self), fields(path = %self.store_path.display()))]
    pub async fn refresh(&self) -> Result<Arc<CatalogAccessor>, CatalogError> {
        let _guard = self.load_lock.lock().await;

        let records = self.builder.build().await?;
        let mut store = CatalogStore::open(&self.store_path);
        let accessor = Arc::new(self.persist(&mut store, records));

        *self.current.write() = Some(Arc::clone(&accessor));
        Ok(accessor)
    }

    /// Drop the current accessor; the next access reloads from disk.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    fn current(&self) -> Option<Arc<CatalogAccessor>> {
        self.current.read().clone()
    }

    async fn load(&self) -> CatalogAccessor {
        let mut store = CatalogStore::open(&self.store_path);

        if !store.is_stale(self.max_age) {
            return CatalogAccessor::new(store.records().clone(), CatalogStatus::Cached);
        }

        match self.builder.build().await {
            Ok(records) => self.persist(&mut store, records),
            Err(e) if store.is_empty() => {
                warn!("Cannot build variable catalog: {}", e);
                CatalogAccessor::unavailable()
            }
            Err(e) => {
                warn!("Cannot refresh variable catalog, serving cached copy: {}", e);
                CatalogAccessor::new(store.records().clone(), CatalogStatus::Stale)
            }
        }
    }

    fn persist(&self, store: &mut CatalogStore, records: RecordMap) -> CatalogAccessor {
        match store.put_all(records.clone()) {
            Ok(()) => CatalogAccessor::new(records, CatalogStatus::Rebuilt),
            Err(e) => {
                warn!("Variable catalog built but not saved: {}", e);
                CatalogAccessor::new(records, CatalogStatus::Unpersisted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::provider::{ProviderBand, TemporalExtent};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl BandProvider for Counting {
        async fn list_bands(&self) -> Result<Vec<ProviderBand>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![ProviderBand::named("temperature_2m")])
        }

        async fn temporal_extent(&self) -> Result<TemporalExtent, CatalogError> {
            Err(CatalogError::provider("not needed"))
        }
    }

    fn context(dir: &Path) -> CatalogContext<Counting> {
        CatalogContext::new(
            dir.join("catalog.json"),
            CatalogBuilder::new(Counting::default(), Duration::from_secs(5)),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_concurrent_first_access_builds_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let (a, b) = tokio::join!(ctx.accessor(), ctx.accessor());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(ctx.builder().provider().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        assert_eq!(ctx.accessor().await.status(), CatalogStatus::Rebuilt);
        ctx.invalidate();
        assert_eq!(ctx.accessor().await.status(), CatalogStatus::Cached);
        assert_eq!(ctx.builder().provider().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unwritable_store_is_unpersisted() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "directory" is a regular file, so the write must fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let ctx = CatalogContext::new(
            blocker.join("catalog.json"),
            CatalogBuilder::new(Counting::default(), Duration::from_secs(5)),
            Duration::ZERO,
        );

        let accessor = ctx.accessor().await;
        assert_eq!(accessor.status(), CatalogStatus::Unpersisted);
        assert_eq!(ctx.lookup("temperature_2m").await.unit, "K");
    }
}
