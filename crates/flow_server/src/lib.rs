//! # flow_server
//!
//! Actix-web HTTP API for FlowMaster.
//!
//! The stateless generation endpoints accept the same JSON bodies the
//! browser front end sends. Session endpoints persist workflows, artifacts
//! and playback progress through [`flow_store::SessionStore`] and drive
//! playback tasks from [`flow_core`].
//!
//! # Example
//!
//! ```rust,ignore
//! use flow_server::{run, FlowConfig};
//!
//! let config = FlowConfig::load(None)?;
//! run(config).await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{FlowConfig, JobsConfig, PlaybackConfig, ServerConfig, StoreBackendKind, StoreConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use server::run;
pub use state::{AppState, PlaybackRegistry, PlaybackStart};
