//! EVE-NG REST API Client
//!
//! A Rust client library for the EVE-NG network emulation platform.
//! Logs in with a username and password, keeps the session cookie, and
//! drives labs and their nodes through the REST API.
//!
//! # Example
//!
//! ```no_run
//! use eve_client::{EveClient, EveConfig, Protocol};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client and log in
//! let config = EveConfig::new("eve.lab.local")
//!     .with_credentials("admin", "eve")
//!     .with_protocol(Protocol::Https);
//! let client = EveClient::connect(config).await?;
//!
//! // List the nodes of a lab
//! let nodes = client.list_nodes("Team/Core Lab").await?;
//!
//! // Stop every node of the lab
//! let result = client.lab_action("Team/Core Lab", "stop", "get").await?;
//! for (name, outcome) in result.iter() {
//!     println!("{name}: {:?}", outcome.value());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Cookie session**: one login on connect, cookie sent on every call
//! - **Lab actions**: start, stop or wipe every node with bounded concurrency
//! - **Typed errors**: transport, decode, authentication and API failures
//! - **Mocking**: `MockEveClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod config;
pub mod error;
#[path = "trait.rs"]
pub mod eve_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod models;
pub mod session;

pub use client::EveClient;
pub use common::HttpClient;
pub use config::{EveConfig, Protocol};
pub use error::EveError;
pub use eve_trait::EveClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockEveClient};
pub use models::*;
pub use session::Session;
