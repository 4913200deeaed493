//! The restore walkthrough
//!
//! One fixed sequence of remote calls:
//!
//! 1. Create a resource group, a SQL server and two databases
//! 2. Wait for the second database to report a restore point
//! 3. Restore it to a point in time, then delete the copy right away
//! 4. Delete the first database and wait for its dropped-database backup
//! 5. Restore the dropped database from that backup
//! 6. Delete the databases and the server
//!
//! The resource group is deleted afterwards no matter how the sequence ended.
//! Running out of polling attempts ends the sequence early without an error.

use chrono::Utc;
use std::fmt;

use crate::client::ResourceManager;
use crate::config::WorkflowSettings;
use crate::error::{CoreError, Result};
use crate::model::{
    DatabaseHandle, DatabaseSpec, DroppedDatabase, ResourceGroupHandle, RestorePoint,
    ServerHandle, ServerSpec, SubscriptionRef,
};
use crate::names::{MAX_NAME_LEN, random_name, random_password};
use crate::poll::{ProgressCallback, poll_until, restore_wait};

const GROUP_PREFIX: &str = "rgSQLServer";
const SERVER_PREFIX: &str = "sqlserver";
const ADMIN_PREFIX: &str = "sqladmin";
const DB_TO_DELETE_PREFIX: &str = "db-to-delete";
const DB_TO_RESTORE_PREFIX: &str = "db-to-restore";
const PITR_PREFIX: &str = "db-restore-pit";
const DROPPED_RESTORE_PREFIX: &str = "db-restore-deleted";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every step ran
    Completed,
    /// No restore point showed up within the polling budget
    RestorePointUnavailable,
    /// No dropped-database backup showed up within the polling budget
    DroppedBackupUnavailable,
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowOutcome::Completed => write!(f, "completed"),
            WorkflowOutcome::RestorePointUnavailable => {
                write!(f, "stopped early: no restore point became available")
            }
            WorkflowOutcome::DroppedBackupUnavailable => {
                write!(f, "stopped early: no dropped-database backup became available")
            }
        }
    }
}

/// Drives the walkthrough against a [`ResourceManager`]
pub struct RestoreWorkflow<C> {
    client: C,
    settings: WorkflowSettings,
    on_progress: Option<ProgressCallback>,
}

impl<C: ResourceManager> RestoreWorkflow<C> {
    pub fn new(client: C, settings: WorkflowSettings) -> Self {
        Self {
            client,
            settings,
            on_progress: None,
        }
    }

    /// Report polling progress to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run every step, then delete the resource group
    ///
    /// The group is deleted exactly once if it was created, whether the steps
    /// succeeded, failed, or stopped early. A failed cleanup is logged and
    /// does not replace the result of the steps.
    pub async fn run(&self) -> Result<WorkflowOutcome> {
        let subscription = self.client.default_subscription().await?;
        let group = self.provision_group(&subscription).await?;

        let result = self.run_in_group(&group).await;
        match &result {
            Ok(outcome) => tracing::info!(%outcome, "Walkthrough finished"),
            // Reported by the caller
            Err(e) => tracing::debug!(error = %e, "Walkthrough failed, cleaning up"),
        }

        self.cleanup(&group).await;
        result
    }

    async fn provision_group(&self, subscription: &SubscriptionRef) -> Result<ResourceGroupHandle> {
        let name = random_name(GROUP_PREFIX, MAX_NAME_LEN);
        tracing::info!(%name, region = %self.settings.region, "Creating resource group...");
        let group = self
            .client
            .create_resource_group(subscription, &name, &self.settings.region)
            .await?;
        tracing::info!("Created a resource group with name: {}", group.name);
        Ok(group)
    }

    async fn run_in_group(&self, group: &ResourceGroupHandle) -> Result<WorkflowOutcome> {
        let server = self.provision_server(group).await?;

        let db_to_delete = self.create_database(&server, DB_TO_DELETE_PREFIX, "first").await?;
        let db_to_restore = self.create_database(&server, DB_TO_RESTORE_PREFIX, "second").await?;

        let settle = self.settings.settle_delay();
        if !settle.is_zero() {
            tracing::info!(
                ?settle,
                "Waiting for the service to become aware of the new server and databases"
            );
            tokio::time::sleep(settle).await;
        }

        let Some(point) = self.wait_for_restore_point(&db_to_restore).await? else {
            return Ok(WorkflowOutcome::RestorePointUnavailable);
        };
        self.point_in_time_restore(&server, &db_to_restore, &point)
            .await?;

        tracing::info!(
            database = %db_to_delete.name,
            "Deleting the database, then waiting for its dropped-database backup"
        );
        self.client.delete(&db_to_delete.id).await?;

        let Some(record) = self.wait_for_dropped_backup(&server, &db_to_delete).await? else {
            return Ok(WorkflowOutcome::DroppedBackupUnavailable);
        };
        let restored = self.restore_dropped(&server, &record).await?;

        tracing::info!("Deleting databases");
        self.client.delete(&db_to_restore.id).await?;
        self.client.delete(&restored.id).await?;

        tracing::info!(server = %server.name, "Deleting the SQL server");
        self.client.delete(&server.id).await?;

        Ok(WorkflowOutcome::Completed)
    }

    async fn provision_server(&self, group: &ResourceGroupHandle) -> Result<ServerHandle> {
        let name = random_name(SERVER_PREFIX, MAX_NAME_LEN);
        let spec = ServerSpec {
            location: self.settings.region.clone(),
            administrator_login: format!("{ADMIN_PREFIX}{name}"),
            administrator_password: random_password(),
        };

        tracing::info!(%name, "Creating SQL server...");
        let server = self.client.create_server(group, &name, &spec).await?;
        tracing::info!("Created a SQL server with name: {}", server.name);
        Ok(server)
    }

    async fn create_database(
        &self,
        server: &ServerHandle,
        prefix: &str,
        ordinal: &str,
    ) -> Result<DatabaseHandle> {
        let name = random_name(prefix, MAX_NAME_LEN);
        tracing::info!(%name, "Creating {ordinal} database...");
        let database = self
            .client
            .create_database(server, &name, &DatabaseSpec::new(&self.settings.region))
            .await?;
        tracing::info!("Created {ordinal} database with name: {}", database.name);
        Ok(database)
    }

    async fn wait_for_restore_point(&self, database: &DatabaseHandle) -> Result<Option<RestorePoint>> {
        let policy = &self.settings.restore_point_poll;
        tracing::info!(
            database = %database.name,
            max_attempts = policy.max_attempts,
            interval = ?policy.interval(),
            "Waiting until a point-in-time restore is available"
        );

        poll_until(
            "restore point",
            policy,
            self.on_progress.as_ref(),
            || async move {
                let points = self.client.list_restore_points(database).await?;
                Ok(points.into_iter().next())
            },
        )
        .await
    }

    async fn point_in_time_restore(
        &self,
        server: &ServerHandle,
        source: &DatabaseHandle,
        point: &RestorePoint,
    ) -> Result<()> {
        let earliest = point.earliest_restore_date.ok_or_else(|| {
            CoreError::Validation(format!(
                "restore point {} has no earliest restorable time",
                point.id
            ))
        })?;

        let wait = restore_wait(earliest, Utc::now(), self.settings.restore_margin());
        if !wait.is_zero() {
            tracing::info!(?wait, %earliest, "Restore point is not ready yet, waiting");
            tokio::time::sleep(wait).await;
        }

        let spec = DatabaseSpec::point_in_time_restore(source, point, earliest)?;
        let name = random_name(PITR_PREFIX, MAX_NAME_LEN);
        tracing::info!(%name, source = %source.id, %earliest, "Creating a point-in-time restore database...");
        let restored = self.client.create_database(server, &name, &spec).await?;
        tracing::info!(
            "Created a point-in-time restore database with name: {}",
            restored.name
        );

        self.client.delete(&restored.id).await?;
        tracing::info!(database = %restored.name, "Deleted the point-in-time restore database");
        Ok(())
    }

    async fn wait_for_dropped_backup(
        &self,
        server: &ServerHandle,
        dropped: &DatabaseHandle,
    ) -> Result<Option<DroppedDatabase>> {
        let policy = &self.settings.dropped_database_poll;
        tracing::info!(
            database = %dropped.name,
            max_attempts = policy.max_attempts,
            interval = ?policy.interval(),
            "Waiting until the dropped-database backup is available"
        );

        poll_until(
            "dropped-database backup",
            policy,
            self.on_progress.as_ref(),
            || async move {
                let records = self.client.list_dropped_databases(server).await?;
                Ok(records.into_iter().find(|r| r.is_for(&dropped.name)))
            },
        )
        .await
    }

    async fn restore_dropped(
        &self,
        server: &ServerHandle,
        record: &DroppedDatabase,
    ) -> Result<DatabaseHandle> {
        let spec = DatabaseSpec::restore_dropped(record);
        let name = random_name(DROPPED_RESTORE_PREFIX, MAX_NAME_LEN);
        tracing::info!(%name, source = %record.id, "Restoring a dropped database...");
        let restored = self.client.create_database(server, &name, &spec).await?;
        tracing::info!("Restored a database with name: {}", restored.name);
        Ok(restored)
    }

    async fn cleanup(&self, group: &ResourceGroupHandle) {
        tracing::info!(name = %group.name, "Deleting resource group...");
        match self.client.delete(&group.id).await {
            Ok(()) => tracing::info!("Deleted resource group: {}", group.name),
            Err(e) => tracing::error!(
                error = %e,
                group = %group.id,
                "Failed to delete resource group; it has to be removed by hand"
            ),
        }
    }
}
