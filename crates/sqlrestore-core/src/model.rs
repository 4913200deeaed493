//! Value types exchanged with the control plane
//!
//! Handles are a cache of the last state the control plane reported. They are
//! never authoritative; the walkthrough only moves forward once a remote call
//! or a poll has confirmed the transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};

/// Tag attached to databases restored from a dropped-database backup
pub const DROPPED_RESTORE_TAG: (&str, &str) = ("key1", "restorableDroppedDatabase");

/// Fully qualified resource identifier, e.g.
/// `/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.Sql/servers/{n}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn subscription(subscription_id: &str) -> Self {
        Self(format!("/subscriptions/{subscription_id}"))
    }

    /// Append a `{segment}/{name}` pair
    pub fn child(&self, segment: &str, name: &str) -> Self {
        Self(format!("{}/{segment}/{name}", self.0.trim_end_matches('/')))
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.0.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRef {
    pub id: ResourceId,
    pub subscription_id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupHandle {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    pub id: ResourceId,
    pub name: String,
    pub location: String,
    pub administrator_login: Option<String>,
}

/// Requested shape of a logical SQL server
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub location: String,
    pub administrator_login: String,
    pub administrator_password: String,
}

impl fmt::Debug for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSpec")
            .field("location", &self.location)
            .field("administrator_login", &self.administrator_login)
            .field("administrator_password", &"<redacted>")
            .finish()
    }
}

/// How a database comes into existence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateMode {
    #[default]
    Default,
    PointInTimeRestore,
    /// Restore from the automatic backup of a dropped database
    #[serde(rename = "Restore")]
    RestoreFromDroppedBackup,
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateMode::Default => write!(f, "Default"),
            CreateMode::PointInTimeRestore => write!(f, "PointInTimeRestore"),
            CreateMode::RestoreFromDroppedBackup => write!(f, "Restore"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHandle {
    pub id: ResourceId,
    pub name: String,
    pub server: ResourceId,
    pub location: String,
    pub create_mode: CreateMode,
    pub source_resource_id: Option<ResourceId>,
    pub restore_point_in_time: Option<DateTime<Utc>>,
    pub max_size_bytes: Option<i64>,
}

/// Requested shape of a database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub location: String,
    pub create_mode: CreateMode,
    pub source_resource_id: Option<ResourceId>,
    pub restore_point_in_time: Option<DateTime<Utc>>,
    pub max_size_bytes: Option<i64>,
    pub tags: BTreeMap<String, String>,
}

impl DatabaseSpec {
    /// An empty database in `location`
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Restore `source` as it was at `at`
    ///
    /// `at` has to fall inside the restore point's window.
    pub fn point_in_time_restore(
        source: &DatabaseHandle,
        restore_point: &RestorePoint,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        restore_point.check_contains(at)?;

        Ok(Self {
            location: restore_point
                .location
                .clone()
                .unwrap_or_else(|| source.location.clone()),
            create_mode: CreateMode::PointInTimeRestore,
            source_resource_id: Some(source.id.clone()),
            restore_point_in_time: Some(at),
            ..Default::default()
        })
    }

    /// Bring a dropped database back from its retained backup
    pub fn restore_dropped(record: &DroppedDatabase) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(
            DROPPED_RESTORE_TAG.0.to_string(),
            DROPPED_RESTORE_TAG.1.to_string(),
        );

        Self {
            location: record.location.clone(),
            create_mode: CreateMode::RestoreFromDroppedBackup,
            source_resource_id: Some(record.id.clone()),
            restore_point_in_time: None,
            max_size_bytes: record.max_size_bytes,
            tags,
        }
    }
}

/// A window a database can be restored into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePoint {
    pub id: ResourceId,
    pub location: Option<String>,
    pub restore_point_type: Option<String>,
    pub earliest_restore_date: Option<DateTime<Utc>>,
    /// Upper bound of the window; `None` for continuous points
    pub latest_restore_date: Option<DateTime<Utc>>,
}

impl RestorePoint {
    /// Fail unless `at` lies within `[earliest, latest]`
    pub fn check_contains(&self, at: DateTime<Utc>) -> Result<()> {
        let earliest = self.earliest_restore_date.ok_or_else(|| {
            CoreError::Validation(format!(
                "restore point {} has no earliest restorable time",
                self.id
            ))
        })?;

        if at < earliest {
            return Err(CoreError::Validation(format!(
                "restore time {at} is before the earliest restorable time {earliest}"
            )));
        }
        if let Some(latest) = self.latest_restore_date
            && at > latest
        {
            return Err(CoreError::Validation(format!(
                "restore time {at} is after the latest restorable time {latest}"
            )));
        }
        Ok(())
    }
}

/// Backup record the control plane keeps for a deleted database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedDatabase {
    pub id: ResourceId,
    pub location: String,
    pub database_name: Option<String>,
    pub max_size_bytes: Option<i64>,
    pub deletion_date: Option<DateTime<Utc>>,
    pub earliest_restore_date: Option<DateTime<Utc>>,
}

impl DroppedDatabase {
    /// Whether this record belongs to the database called `name`
    pub fn is_for(&self, name: &str) -> bool {
        self.database_name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }
}
