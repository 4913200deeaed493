//! The control-plane boundary
//!
//! Everything the walkthrough does remotely goes through [`ResourceManager`].
//! Creates are idempotent upserts and, like deletes, only return once the
//! remote long-running operation has finished. The two list calls return
//! whatever the backend knows right now, which is often nothing.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    DatabaseHandle, DatabaseSpec, DroppedDatabase, ResourceGroupHandle, ResourceId, RestorePoint,
    ServerHandle, ServerSpec, SubscriptionRef,
};

#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// The subscription the client was configured for
    async fn default_subscription(&self) -> Result<SubscriptionRef>;

    async fn create_resource_group(
        &self,
        subscription: &SubscriptionRef,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupHandle>;

    async fn create_server(
        &self,
        group: &ResourceGroupHandle,
        name: &str,
        spec: &ServerSpec,
    ) -> Result<ServerHandle>;

    async fn create_database(
        &self,
        server: &ServerHandle,
        name: &str,
        spec: &DatabaseSpec,
    ) -> Result<DatabaseHandle>;

    /// Delete any resource and wait until it is gone
    async fn delete(&self, id: &ResourceId) -> Result<()>;

    /// Restore points currently known for `database`
    async fn list_restore_points(&self, database: &DatabaseHandle) -> Result<Vec<RestorePoint>>;

    /// Dropped-database backup records currently retained for `server`
    async fn list_dropped_databases(&self, server: &ServerHandle) -> Result<Vec<DroppedDatabase>>;
}

#[async_trait]
impl<T: ResourceManager + ?Sized> ResourceManager for std::sync::Arc<T> {
    async fn default_subscription(&self) -> Result<SubscriptionRef> {
        (**self).default_subscription().await
    }

    async fn create_resource_group(
        &self,
        subscription: &SubscriptionRef,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupHandle> {
        (**self).create_resource_group(subscription, name, location).await
    }

    async fn create_server(
        &self,
        group: &ResourceGroupHandle,
        name: &str,
        spec: &ServerSpec,
    ) -> Result<ServerHandle> {
        (**self).create_server(group, name, spec).await
    }

    async fn create_database(
        &self,
        server: &ServerHandle,
        name: &str,
        spec: &DatabaseSpec,
    ) -> Result<DatabaseHandle> {
        (**self).create_database(server, name, spec).await
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        (**self).delete(id).await
    }

    async fn list_restore_points(&self, database: &DatabaseHandle) -> Result<Vec<RestorePoint>> {
        (**self).list_restore_points(database).await
    }

    async fn list_dropped_databases(&self, server: &ServerHandle) -> Result<Vec<DroppedDatabase>> {
        (**self).list_dropped_databases(server).await
    }
}
