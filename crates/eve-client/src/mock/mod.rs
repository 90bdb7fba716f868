//! Mock EveClient for unit testing
//!
//! This module provides a mock implementation of EveClientTrait that can be used
//! in unit tests without requiring a running EVE-NG server. Labs live in memory
//! and every call is recorded so tests can assert on what would have been sent.

use crate::common::uri::{lab_uri, node_action_uri};
use crate::error::EveError;
use crate::eve_trait::EveClientTrait;
use crate::models::{
    ActionMethod, LabActionResult, NodeActionOutcome, NodeList, NodeSummary, node_action_path,
};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A request the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// `GET` or `PUT`
    pub method: String,
    /// API-relative URI, without the cache buster
    pub uri: String,
}

/// In-memory lab
#[derive(Debug, Clone, Default)]
struct MockLab {
    nodes: Vec<NodeSummary>,
    topology: Option<Value>,
    // (node id, action path) -> response
    responses: HashMap<(u64, String), Value>,
    failing: HashSet<u64>,
}

/// Mock EveClient for testing
#[derive(Debug, Clone)]
pub struct MockEveClient {
    pub(crate) base_url: String,
    pub(crate) authenticated: bool,
    labs: Arc<Mutex<HashMap<String, MockLab>>>,
    api_data: Arc<Mutex<HashMap<String, Value>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lab_key(project_path: &str) -> String {
    lab_uri(project_path, "")
}

impl MockEveClient {
    /// Create a new, logged-in mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authenticated: true,
            labs: Arc::new(Mutex::new(HashMap::new())),
            api_data: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every call fail as if login had been rejected
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Add a lab with its nodes (for test setup)
    pub fn add_lab(&self, project_path: &str, nodes: Vec<NodeSummary>) {
        lock(&self.labs).entry(lab_key(project_path)).or_default().nodes = nodes;
    }

    /// Set the topology returned for a lab
    pub fn set_topology(&self, project_path: &str, topology: Value) {
        lock(&self.labs).entry(lab_key(project_path)).or_default().topology = Some(topology);
    }

    /// Set the body a node returns for an action (`stop` is translated as the client does)
    pub fn set_node_response(
        &self,
        project_path: &str,
        node_id: u64,
        action: &str,
        response: Value,
    ) {
        lock(&self.labs)
            .entry(lab_key(project_path))
            .or_default()
            .responses
            .insert((node_id, node_action_path(action)), response);
    }

    /// Make every action call on a node fail
    pub fn fail_node(&self, project_path: &str, node_id: u64) {
        lock(&self.labs).entry(lab_key(project_path)).or_default().failing.insert(node_id);
    }

    /// Set the body returned by `get_api_data(uri)`
    pub fn set_api_data(&self, uri: &str, data: Value) {
        lock(&self.api_data).insert(uri.trim_start_matches('/').to_string(), data);
    }

    /// Requests received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &str, uri: &str) -> Result<(), EveError> {
        lock(&self.calls).push(MockCall {
            method: method.to_string(),
            uri: uri.to_string(),
        });
        if self.authenticated {
            Ok(())
        } else {
            Err(EveError::Authentication(format!(
                "{uri}: 412 Precondition Failed - \
                 User is not authenticated or session timed out (90001)."
            )))
        }
    }

    fn lab(&self, project_path: &str) -> Result<MockLab, EveError> {
        lock(&self.labs)
            .get(&lab_key(project_path))
            .cloned()
            .ok_or_else(|| {
                EveError::NotFound(format!(
                    "{}: Lab does not exist (60038).",
                    lab_key(project_path)
                ))
            })
    }
}

#[async_trait::async_trait]
impl EveClientTrait for MockEveClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn get_project_nodes(&self, project_path: &str) -> Result<Value, EveError> {
        self.record("GET", &lab_uri(project_path, "/nodes"))?;
        let lab = self.lab(project_path)?;

        let data = if lab.nodes.is_empty() {
            Value::Array(Vec::new())
        } else {
            let mut data = Map::new();
            for node in &lab.nodes {
                data.insert(node.id.to_string(), serde_json::to_value(node)?);
            }
            Value::Object(data)
        };

        Ok(json!({
            "code": 200,
            "status": "success",
            "message": "Successfully listed nodes (60026).",
            "data": data,
        }))
    }

    async fn get_api_data(&self, uri: &str) -> Result<Value, EveError> {
        let uri = uri.trim_start_matches('/');
        self.record("GET", uri)?;
        lock(&self.api_data)
            .get(uri)
            .cloned()
            .ok_or_else(|| EveError::NotFound(uri.to_string()))
    }

    async fn lab_action(
        &self,
        project_path: &str,
        action: &str,
        method: &str,
    ) -> Result<LabActionResult, EveError> {
        let body = self.get_project_nodes(project_path).await?;
        let nodes = NodeList::from_response(&body)?;
        let action_path = node_action_path(action);

        let Some(method) = ActionMethod::parse(method) else {
            return Ok(nodes
                .nodes
                .into_values()
                .map(|node| (node.name, NodeActionOutcome::Unsupported))
                .collect());
        };

        let lab = self.lab(project_path)?;
        let mut result = LabActionResult::default();
        for node in nodes.nodes.into_values() {
            let uri = node_action_uri(project_path, node.id, &action_path);
            let outcome = match self.record(method.as_str(), &uri) {
                Err(e) => NodeActionOutcome::Failed(e),
                Ok(()) if lab.failing.contains(&node.id) => {
                    NodeActionOutcome::Failed(EveError::Api {
                        status: 500,
                        message: format!("node {} failed", node.id),
                    })
                }
                Ok(()) => NodeActionOutcome::Completed(
                    lab.responses
                        .get(&(node.id, action_path.clone()))
                        .cloned()
                        .unwrap_or_else(|| json!({"code": 200, "status": "success"})),
                ),
            };
            result.insert(node.name, outcome);
        }
        Ok(result)
    }

    async fn lab_topology(&self, project_path: &str) -> Result<Value, EveError> {
        self.record("GET", &lab_uri(project_path, "/topology"))?;
        let lab = self.lab(project_path)?;
        Ok(json!({
            "code": 200,
            "status": "success",
            "data": lab.topology.unwrap_or_else(|| Value::Array(Vec::new())),
        }))
    }

    async fn list_nodes(&self, project_path: &str) -> Result<Vec<NodeSummary>, EveError> {
        let body = self.get_project_nodes(project_path).await?;
        Ok(NodeList::from_response(&body)?.into_sorted())
    }
}
