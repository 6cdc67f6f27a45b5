//! Storage of declared resources.
//!
//! The controller only needs to read a resource, replace its finalizer set
//! and replace its status. A resource whose deletion was requested is
//! removed by the store as soon as its finalizer set becomes empty.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resource::{DeclaredTeamResource, ReconcileStatus, ResourceKey};

/// Trait for declared-resource storage backends.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a resource; `None` when it no longer exists.
    async fn get(&self, key: &ResourceKey) -> Result<Option<DeclaredTeamResource>>;

    /// Keys of every stored resource.
    async fn list(&self) -> Result<Vec<ResourceKey>>;

    /// Replace the finalizer set of a resource.
    async fn update_finalizers(&self, key: &ResourceKey, finalizers: BTreeSet<String>)
    -> Result<()>;

    /// Replace the status of a resource.
    async fn update_status(&self, key: &ResourceKey, status: ReconcileStatus) -> Result<()>;
}

#[derive(Default)]
struct Inner {
    resources: BTreeMap<ResourceKey, DeclaredTeamResource>,
    status_writes: usize,
}

/// In-memory resource store.
#[derive(Default)]
pub struct InMemoryResourceStore {
    inner: RwLock<Inner>,
}

impl InMemoryResourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create or update a resource.
    ///
    /// Updating keeps the stored finalizers, status and deletion timestamp;
    /// only the declared team content is replaced.
    pub async fn apply(&self, resource: DeclaredTeamResource) {
        let mut inner = self.inner.write().await;
        match inner.resources.get_mut(&resource.key) {
            Some(existing) => existing.team = resource.team,
            None => {
                inner.resources.insert(resource.key.clone(), resource);
            }
        }
    }

    /// Mark a resource for deletion.
    ///
    /// Without finalizers the resource disappears at once. Returns whether
    /// the resource existed.
    pub async fn request_deletion(&self, key: &ResourceKey, at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        let Some(resource) = inner.resources.get_mut(key) else {
            return false;
        };
        if resource.deletion_timestamp.is_none() {
            resource.deletion_timestamp = Some(at);
        }
        if resource.finalizers.is_empty() {
            inner.resources.remove(key);
            debug!(resource = %key, "Resource removed");
        }
        true
    }

    /// Number of status writes accepted so far.
    pub async fn status_writes(&self) -> usize {
        self.inner.read().await.status_writes
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<DeclaredTeamResource>> {
        Ok(self.inner.read().await.resources.get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<ResourceKey>> {
        Ok(self.inner.read().await.resources.keys().cloned().collect())
    }

    async fn update_finalizers(
        &self,
        key: &ResourceKey,
        finalizers: BTreeSet<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let resource = inner
            .resources
            .get_mut(key)
            .ok_or_else(|| Error::store(format!("resource {key} not found")))?;

        let released = resource.is_deleting() && finalizers.is_empty();
        resource.finalizers = finalizers;

        if released {
            inner.resources.remove(key);
            debug!(resource = %key, "Resource removed after finalizers cleared");
        }
        Ok(())
    }

    async fn update_status(&self, key: &ResourceKey, status: ReconcileStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let resource = inner
            .resources
            .get_mut(key)
            .ok_or_else(|| Error::store(format!("resource {key} not found")))?;
        resource.status = status;
        inner.status_writes = inner.status_writes.saturating_add(1);
        Ok(())
    }
}
