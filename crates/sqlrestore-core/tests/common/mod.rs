//! In-memory control plane for workflow tests
//!
//! Records every call in order and lets tests script how long restore points
//! and dropped-database backups take to appear, and which calls fail.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;

use sqlrestore_core::{
    CoreError, DatabaseHandle, DatabaseSpec, DroppedDatabase, ResourceGroupHandle, ResourceId,
    ResourceManager, RestorePoint, Result, ServerHandle, ServerSpec, SubscriptionRef,
};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const DROPPED_MAX_SIZE: i64 = 2_147_483_648;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DefaultSubscription,
    CreateResourceGroup {
        name: String,
        location: String,
    },
    CreateServer {
        group: ResourceId,
        name: String,
    },
    CreateDatabase {
        server: ResourceId,
        name: String,
        spec: DatabaseSpec,
    },
    Delete(ResourceId),
    ListRestorePoints(ResourceId),
    ListDroppedDatabases(ResourceId),
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

pub struct FakeResourceManager {
    /// Empty restore-point polls before one shows up; `None` means never
    empty_restore_polls: Option<u32>,
    /// Offset of the earliest restorable time from "now" at list time
    earliest_offset: Duration,
    /// Empty dropped-database polls before records show up; `None` means never
    empty_dropped_polls: Option<u32>,
    fail_when: Option<FailWhen>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    restore_polls: u32,
    dropped_polls: u32,
    deleted: Vec<DatabaseHandle>,
    databases: Vec<DatabaseHandle>,
    last_restore_point: Option<RestorePoint>,
}

impl Default for FakeResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeResourceManager {
    /// Restore point and dropped backup both show up on the first poll
    pub fn new() -> Self {
        Self {
            empty_restore_polls: Some(0),
            earliest_offset: Duration::hours(-1),
            empty_dropped_polls: Some(0),
            fail_when: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn restore_point_after(mut self, empty_polls: u32) -> Self {
        self.empty_restore_polls = Some(empty_polls);
        self
    }

    pub fn never_restore_point(mut self) -> Self {
        self.empty_restore_polls = None;
        self
    }

    pub fn earliest_offset(mut self, offset: Duration) -> Self {
        self.earliest_offset = offset;
        self
    }

    pub fn dropped_after(mut self, empty_polls: u32) -> Self {
        self.empty_dropped_polls = Some(empty_polls);
        self
    }

    pub fn never_dropped(mut self) -> Self {
        self.empty_dropped_polls = None;
        self
    }

    /// Fail every call matching `predicate` with a 409
    pub fn fail_when(mut self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn restore_polls(&self) -> u32 {
        self.state.lock().unwrap().restore_polls
    }

    pub fn dropped_polls(&self) -> u32 {
        self.state.lock().unwrap().dropped_polls
    }

    pub fn last_restore_point(&self) -> Option<RestorePoint> {
        self.state.lock().unwrap().last_restore_point.clone()
    }

    /// Deletions of `id` recorded so far
    pub fn deletes_of(&self, id: &ResourceId) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Delete(d) if d == id))
            .count()
    }

    /// Ids of resource groups created so far
    pub fn created_groups(&self) -> Vec<ResourceId> {
        let sub = ResourceId::subscription(SUBSCRIPTION_ID);
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::CreateResourceGroup { name, .. } => Some(sub.child("resourceGroups", name)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let fail = self.fail_when.as_ref().is_some_and(|f| f(&call));
        self.state.lock().unwrap().calls.push(call.clone());
        if fail {
            return Err(CoreError::Api {
                status: 409,
                code: Some("Conflict".to_string()),
                message: format!("injected failure for {call:?}"),
            });
        }
        Ok(())
    }
}

pub fn dropped_record_id(server: &ResourceId, database: &str) -> ResourceId {
    server.child("restorableDroppedDatabases", &format!("{database},133400000000000000"))
}

#[async_trait]
impl ResourceManager for FakeResourceManager {
    async fn default_subscription(&self) -> Result<SubscriptionRef> {
        self.record(Call::DefaultSubscription)?;
        Ok(SubscriptionRef {
            id: ResourceId::subscription(SUBSCRIPTION_ID),
            subscription_id: SUBSCRIPTION_ID.to_string(),
            display_name: Some("Test subscription".to_string()),
        })
    }

    async fn create_resource_group(
        &self,
        subscription: &SubscriptionRef,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupHandle> {
        self.record(Call::CreateResourceGroup {
            name: name.to_string(),
            location: location.to_string(),
        })?;
        Ok(ResourceGroupHandle {
            id: subscription.id.child("resourceGroups", name),
            name: name.to_string(),
            location: location.to_string(),
        })
    }

    async fn create_server(
        &self,
        group: &ResourceGroupHandle,
        name: &str,
        spec: &ServerSpec,
    ) -> Result<ServerHandle> {
        self.record(Call::CreateServer {
            group: group.id.clone(),
            name: name.to_string(),
        })?;
        Ok(ServerHandle {
            id: group
                .id
                .child("providers", "Microsoft.Sql")
                .child("servers", name),
            name: name.to_string(),
            location: spec.location.clone(),
            administrator_login: Some(spec.administrator_login.clone()),
        })
    }

    async fn create_database(
        &self,
        server: &ServerHandle,
        name: &str,
        spec: &DatabaseSpec,
    ) -> Result<DatabaseHandle> {
        self.record(Call::CreateDatabase {
            server: server.id.clone(),
            name: name.to_string(),
            spec: spec.clone(),
        })?;
        let database = DatabaseHandle {
            id: server.id.child("databases", name),
            name: name.to_string(),
            server: server.id.clone(),
            location: spec.location.clone(),
            create_mode: spec.create_mode,
            source_resource_id: spec.source_resource_id.clone(),
            restore_point_in_time: spec.restore_point_in_time,
            max_size_bytes: spec.max_size_bytes,
        };
        self.state.lock().unwrap().databases.push(database.clone());
        Ok(database)
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.record(Call::Delete(id.clone()))?;
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.databases.iter().position(|d| &d.id == id) {
            let database = state.databases.remove(pos);
            state.deleted.push(database);
        }
        Ok(())
    }

    async fn list_restore_points(&self, database: &DatabaseHandle) -> Result<Vec<RestorePoint>> {
        self.record(Call::ListRestorePoints(database.id.clone()))?;
        let mut state = self.state.lock().unwrap();
        let polls_before = state.restore_polls;
        state.restore_polls += 1;

        match self.empty_restore_polls {
            Some(empty) if polls_before >= empty => {
                let point = RestorePoint {
                    id: database.id.child("restorePoints", "ContinuousRestorePoint"),
                    location: Some(database.location.clone()),
                    restore_point_type: Some("CONTINUOUS".to_string()),
                    earliest_restore_date: Some(Utc::now() + self.earliest_offset),
                    latest_restore_date: None,
                };
                state.last_restore_point = Some(point.clone());
                Ok(vec![point])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn list_dropped_databases(&self, server: &ServerHandle) -> Result<Vec<DroppedDatabase>> {
        self.record(Call::ListDroppedDatabases(server.id.clone()))?;
        let mut state = self.state.lock().unwrap();
        let polls_before = state.dropped_polls;
        state.dropped_polls += 1;

        match self.empty_dropped_polls {
            Some(empty) if polls_before >= empty => Ok(state
                .deleted
                .iter()
                .filter(|d| d.server == server.id)
                .map(|d| DroppedDatabase {
                    id: dropped_record_id(&server.id, &d.name),
                    location: d.location.clone(),
                    database_name: Some(d.name.clone()),
                    max_size_bytes: Some(DROPPED_MAX_SIZE),
                    deletion_date: Some(Utc::now()),
                    earliest_restore_date: Some(Utc::now() - Duration::days(1)),
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}
