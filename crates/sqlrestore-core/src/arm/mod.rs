//! Azure Resource Manager implementation of [`ResourceManager`]
//!
//! A thin REST binding: every call gets a bearer token from the
//! client-credentials grant, PUT/DELETE responses are followed until their
//! long-running operation finishes, and created resources are read back with
//! a GET so the returned handle reflects what the control plane stored.

mod auth;
mod lro;
pub mod wire;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::client::ResourceManager;
use crate::config::{ClientSettings, Credentials};
use crate::error::{CoreError, Result};
use crate::model::{
    DatabaseHandle, DatabaseSpec, DroppedDatabase, ResourceGroupHandle, ResourceId, RestorePoint,
    ServerHandle, ServerSpec, SubscriptionRef,
};

use auth::TokenSource;
use wire::{
    ArmList, DatabaseProperties, DatabaseRequest, DatabaseRequestProperties,
    DroppedDatabaseProperties, ErrorEnvelope, Resource, ResourceGroupProperties,
    ResourceGroupRequest, RestorePointProperties, ServerProperties, ServerRequest,
    ServerRequestProperties,
};

pub const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
pub const SQL_API_VERSION: &str = "2021-11-01";

const SQL_PROVIDER: &str = "Microsoft.Sql";

/// API version matching the resource type of `id`
fn api_version_for(id: &ResourceId) -> &'static str {
    let id = id.as_str().to_ascii_lowercase();
    if id.contains("/providers/microsoft.sql/") {
        SQL_API_VERSION
    } else if id.contains("/resourcegroups/") {
        RESOURCE_GROUPS_API_VERSION
    } else {
        SUBSCRIPTIONS_API_VERSION
    }
}

/// Resource manager client authenticated as a service principal
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_id: String,
    settings: ClientSettings,
    tokens: TokenSource,
}

impl ArmClient {
    pub fn new(credentials: Credentials, settings: ClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sqlrestore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_http_client(http, credentials, settings)
    }

    /// Use a preconfigured `reqwest` client
    pub fn with_http_client(
        http: reqwest::Client,
        credentials: Credentials,
        settings: ClientSettings,
    ) -> Result<Self> {
        let tokens = TokenSource::new(&settings.authority, &settings.endpoint, &credentials)?;
        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            subscription_id: credentials.subscription_id,
            settings,
            tokens,
        })
    }

    fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.endpoint, path))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Send an authenticated request; non-success statuses become errors
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let token = self.tokens.token(&self.http).await?;
        tracing::trace!(%method, %url, "ARM request");

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(Method::GET, url, None).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Collect every page of a list endpoint
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let page: ArmList<T> = self.get_json(url).await?;
            items.extend(page.value);
            next = page.next_link.as_deref().map(Url::parse).transpose()?;
        }
        Ok(items)
    }

    /// PUT `body` at `id`, wait for the operation, then read the resource back
    async fn put_and_wait<B, T>(&self, id: &ResourceId, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.url(id.as_str(), api_version_for(id))?;
        let body = serde_json::to_value(body)?;

        let response = self.send(Method::PUT, url.clone(), Some(&body)).await?;
        self.wait_for_operation(response, id.name()).await?;

        self.get_json(url).await
    }
}

/// Turn a failed response into [`CoreError::Api`]
async fn api_error(response: Response) -> CoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => CoreError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| status.to_string()),
        },
        Err(_) => CoreError::Api {
            status: status.as_u16(),
            code: None,
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            },
        },
    }
}

#[async_trait]
impl ResourceManager for ArmClient {
    async fn default_subscription(&self) -> Result<SubscriptionRef> {
        let id = ResourceId::subscription(&self.subscription_id);
        let body: wire::Subscription = self
            .get_json(self.url(id.as_str(), SUBSCRIPTIONS_API_VERSION)?)
            .await?;

        Ok(SubscriptionRef {
            id: ResourceId::new(body.id),
            subscription_id: body.subscription_id,
            display_name: body.display_name,
        })
    }

    async fn create_resource_group(
        &self,
        subscription: &SubscriptionRef,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroupHandle> {
        let id = subscription.id.child("resourceGroups", name);
        let group: Resource<ResourceGroupProperties> = self
            .put_and_wait(&id, &ResourceGroupRequest { location })
            .await?;

        Ok(ResourceGroupHandle {
            id: ResourceId::new(group.id),
            name: group.name,
            location: group.location.unwrap_or_else(|| location.to_string()),
        })
    }

    async fn create_server(
        &self,
        group: &ResourceGroupHandle,
        name: &str,
        spec: &ServerSpec,
    ) -> Result<ServerHandle> {
        let id = group
            .id
            .child("providers", SQL_PROVIDER)
            .child("servers", name);
        let request = ServerRequest {
            location: &spec.location,
            properties: ServerRequestProperties {
                administrator_login: &spec.administrator_login,
                administrator_login_password: &spec.administrator_password,
            },
        };
        let server: Resource<ServerProperties> = self.put_and_wait(&id, &request).await?;

        Ok(ServerHandle {
            id: ResourceId::new(server.id),
            name: server.name,
            location: server.location.unwrap_or_else(|| spec.location.clone()),
            administrator_login: server.properties.administrator_login,
        })
    }

    async fn create_database(
        &self,
        server: &ServerHandle,
        name: &str,
        spec: &DatabaseSpec,
    ) -> Result<DatabaseHandle> {
        let id = server.id.child("databases", name);
        let request = DatabaseRequest {
            location: &spec.location,
            tags: &spec.tags,
            properties: DatabaseRequestProperties {
                create_mode: spec.create_mode,
                source_resource_id: spec.source_resource_id.as_ref().map(ResourceId::as_str),
                restore_point_in_time: spec.restore_point_in_time,
                max_size_bytes: spec.max_size_bytes,
            },
        };
        let database: Resource<DatabaseProperties> = self.put_and_wait(&id, &request).await?;

        Ok(DatabaseHandle {
            id: ResourceId::new(database.id),
            name: database.name,
            server: server.id.clone(),
            location: database.location.unwrap_or_else(|| spec.location.clone()),
            create_mode: spec.create_mode,
            source_resource_id: spec.source_resource_id.clone(),
            restore_point_in_time: spec.restore_point_in_time,
            max_size_bytes: database.properties.max_size_bytes.or(spec.max_size_bytes),
        })
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        let url = self.url(id.as_str(), api_version_for(id))?;
        let response = match self.send(Method::DELETE, url.clone(), None).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::debug!(%id, "Already deleted");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        self.wait_for_deletion(response, &url, id.name()).await
    }

    async fn list_restore_points(&self, database: &DatabaseHandle) -> Result<Vec<RestorePoint>> {
        let path = format!("{}/restorePoints", database.id);
        let points: Vec<Resource<RestorePointProperties>> =
            self.get_list(self.url(&path, SQL_API_VERSION)?).await?;

        Ok(points
            .into_iter()
            .map(|p| RestorePoint {
                id: ResourceId::new(p.id),
                location: p.location,
                restore_point_type: p.properties.restore_point_type,
                earliest_restore_date: p.properties.earliest_restore_date,
                latest_restore_date: p.properties.restore_point_creation_date,
            })
            .collect())
    }

    async fn list_dropped_databases(&self, server: &ServerHandle) -> Result<Vec<DroppedDatabase>> {
        let path = format!("{}/restorableDroppedDatabases", server.id);
        let records: Vec<Resource<DroppedDatabaseProperties>> =
            self.get_list(self.url(&path, SQL_API_VERSION)?).await?;

        Ok(records
            .into_iter()
            .map(|r| DroppedDatabase {
                id: ResourceId::new(r.id),
                location: r.location.unwrap_or_else(|| server.location.clone()),
                database_name: r.properties.database_name,
                max_size_bytes: r.properties.max_size_bytes,
                deletion_date: r.properties.deletion_date,
                earliest_restore_date: r.properties.earliest_restore_date,
            })
            .collect())
    }
}
