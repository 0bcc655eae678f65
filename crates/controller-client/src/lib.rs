//! Controller REST API Client
//!
//! A Rust client library for the wireless network Controller intent API.
//! Provides type-safe models and methods for inventory, sites, SDA host
//! onboarding, access points, tags and asynchronous task tracking.
//!
//! # Example
//!
//! ```no_run
//! use controller_client::{ControllerClient, ControllerClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Authenticate and create a client
//! let client = ControllerClient::login(
//!     "https://controller.example.com".to_string(),
//!     "admin",
//!     "secret",
//!     true,
//! )
//! .await?;
//!
//! // Query devices by management IP
//! let devices = client
//!     .query_network_devices(&[("managementIpAddress", "10.0.0.1")], 1, 500)
//!     .await?;
//!
//! // Poll a task
//! let task = client.get_task_by_id("1f0e...").await?;
//! println!("{} devices, task terminal: {}", devices.len(), task.is_terminal());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed endpoints**: one trait method per Controller capability
//! - **Retry Logic**: transient failures retried with Fibonacci backoff
//! - **Mocking**: `test-util` feature exposes an in-memory `MockControllerClient`

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod controller_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::ControllerClient;
pub use common::HttpClient;
pub use error::ApiError;
pub use models::*;
pub use controller_trait::ControllerClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockControllerClient, WriteCall};
