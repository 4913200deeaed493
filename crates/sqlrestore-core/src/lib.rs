//! # sqlrestore-core
//!
//! Shared engine for the SQL restore walkthrough: provision a SQL server with
//! two databases, wait for restore points and dropped-database backups to show
//! up, exercise point-in-time and dropped-database restores, then tear it all
//! down again.
//!
//! ## Layers
//!
//! - [`client::ResourceManager`] - the boundary to the control plane. Every
//!   call is awaited until the remote long-running operation finishes.
//! - [`arm::ArmClient`] - the Azure Resource Manager implementation of that
//!   boundary, built on `reqwest`.
//! - [`poll`] - bounded polling for eventually-consistent backend state.
//! - [`workflow::RestoreWorkflow`] - the fixed sequence of steps, with the
//!   resource group deleted on every exit path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlrestore_core::{ArmClient, Credentials, RestoreWorkflow, Settings};
//!
//! let settings = Settings::load()?;
//! let credentials = Credentials::new(client_id, client_secret, tenant_id, subscription_id);
//! let client = ArmClient::new(credentials, settings.client.clone())?;
//! let outcome = RestoreWorkflow::new(client, settings.workflow).run().await?;
//! println!("{outcome}");
//! ```

pub mod arm;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod names;
pub mod poll;
pub mod workflow;

pub use arm::ArmClient;
pub use client::ResourceManager;
pub use config::{ClientSettings, ConfigError, Credentials, Settings, WorkflowSettings};
pub use error::{CoreError, Result};
pub use model::{
    CreateMode, DatabaseHandle, DatabaseSpec, DroppedDatabase, ResourceGroupHandle, ResourceId,
    RestorePoint, ServerHandle, ServerSpec, SubscriptionRef,
};
pub use poll::{PollPolicy, ProgressCallback, ProgressEvent, poll_until, restore_wait};
pub use workflow::{RestoreWorkflow, WorkflowOutcome};
