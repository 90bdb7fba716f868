//! EveClient trait for mocking
//!
//! This trait abstracts the EveClient so code driving labs can be unit tested
//! against an in-memory implementation instead of a live EVE-NG server.

use crate::error::EveError;
use crate::models::{LabActionResult, NodeSummary};
use serde_json::Value;

/// Trait for EVE-NG API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait EveClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Whether login produced a session cookie
    fn is_authenticated(&self) -> bool;

    /// Raw node list of a lab
    async fn get_project_nodes(&self, project_path: &str) -> Result<Value, EveError>;

    /// Generic GET of any API-relative path
    async fn get_api_data(&self, uri: &str) -> Result<Value, EveError>;

    /// Run `action` on every node of a lab
    async fn lab_action(
        &self,
        project_path: &str,
        action: &str,
        method: &str,
    ) -> Result<LabActionResult, EveError>;

    /// Topology (links and networks) of a lab
    async fn lab_topology(&self, project_path: &str) -> Result<Value, EveError>;

    /// Typed node list of a lab, sorted by name
    async fn list_nodes(&self, project_path: &str) -> Result<Vec<NodeSummary>, EveError>;

    /// Start every node of a lab
    async fn start_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "start", "get").await
    }

    /// Stop every node of a lab
    async fn stop_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "stop", "get").await
    }

    /// Wipe the runtime state of every node of a lab
    async fn wipe_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "wipe", "get").await
    }
}
