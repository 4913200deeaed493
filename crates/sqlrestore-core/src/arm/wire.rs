//! JSON shapes of the resource manager REST API
//!
//! Only the fields the walkthrough reads or writes are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::CreateMode;

/// One page of a list response
#[derive(Debug, Deserialize)]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// Common envelope of a tracked resource
#[derive(Debug, Deserialize)]
pub struct Resource<P> {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: P,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResourceGroupRequest<'a> {
    pub location: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceGroupProperties {}

#[derive(Debug, Serialize)]
pub struct ServerRequest<'a> {
    pub location: &'a str,
    pub properties: ServerRequestProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRequestProperties<'a> {
    pub administrator_login: &'a str,
    pub administrator_login_password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default)]
    pub administrator_login: Option<String>,
}

fn no_tags(tags: &&BTreeMap<String, String>) -> bool {
    tags.is_empty()
}

#[derive(Debug, Serialize)]
pub struct DatabaseRequest<'a> {
    pub location: &'a str,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a BTreeMap<String, String>,
    pub properties: DatabaseRequestProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRequestProperties<'a> {
    pub create_mode: CreateMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_resource_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_point_in_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseProperties {
    #[serde(default)]
    pub max_size_bytes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePointProperties {
    #[serde(default)]
    pub restore_point_type: Option<String>,
    #[serde(default)]
    pub earliest_restore_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub restore_point_creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedDatabaseProperties {
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub max_size_bytes: Option<i64>,
    #[serde(default)]
    pub deletion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub earliest_restore_date: Option<DateTime<Utc>>,
}

/// Body of an `Azure-AsyncOperation` status URL
#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
