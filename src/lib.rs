//! Hemmer provider for Authsignal
//!
//! This crate is a Hemmer provider plugin that manages Authsignal tenant
//! configuration through the Authsignal management API. It is spawned by the
//! Hemmer host and speaks the `hemmer.provider.v1` gRPC protocol.
//!
//! # Overview
//!
//! The provider serves five resources, each with a matching data source:
//!
//! - **`authsignal_action_configuration`**: default outcome and messaging templates of an action
//! - **`authsignal_rule`**: a rule evaluated when an action is tracked
//! - **`authsignal_theme`**: the tenant's pre-built UI theme (import, then update)
//! - **`authsignal_custom_data_point`**: a tenant-defined field usable in rule conditions
//! - **`authsignal_value_list`**: a named list of strings or numbers
//!
//! # Configuration
//!
//! ```text
//! provider "authsignal" {
//!   host       = "https://api.authsignal.com/v1/management"
//!   tenant_id  = "..."
//!   api_secret = "..."
//! }
//! ```
//!
//! Each setting falls back to `AUTHSIGNAL_HOST`, `AUTHSIGNAL_TENANT_ID` and
//! `AUTHSIGNAL_API_SECRET` when left unset.
//!
//! # Handshake Protocol
//!
//! On start the binary prints a handshake line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`
//!
//! # Testing
//!
//! [`testing::ProviderTester`] drives the provider without gRPC, and
//! [`testing::InMemoryApi`] stands in for the management API:
//!
//! ```
//! use std::sync::Arc;
//! use hemmer_provider_authsignal::{AuthsignalProvider, ProviderService};
//! use hemmer_provider_authsignal::testing::InMemoryApi;
//!
//! # tokio_test::block_on(async {
//! let provider = AuthsignalProvider::with_client(Arc::new(InMemoryApi::default()));
//! let names = provider.metadata().resources;
//! assert!(names.contains(&"authsignal_rule".to_string()));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

pub mod proto;

pub use client::{ApiError, HttpClient, ManagementApi};
pub use config::{Credentials, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::AuthsignalProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate};
