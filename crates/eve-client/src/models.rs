//! EVE-NG API models
//!
//! EVE-NG wraps every response in `{code, status, message, data}`. Node lists
//! carry `data` as an object keyed by node label, or `[]` when the lab has no
//! nodes (the server serializes an empty PHP array).

use crate::error::EveError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Standard EVE-NG response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope {
    /// Status code echoed in the body
    #[serde(default)]
    pub code: Option<u16>,
    /// `success` or `fail`
    #[serde(default)]
    pub status: Option<String>,
    /// Human readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Payload
    #[serde(default)]
    pub data: Option<Value>,
}

/// A node as listed by `/api/labs/{path}.unl/nodes`
///
/// Only `id` and `name` are interpreted; everything else EVE-NG sends
/// (template, image, status, console, ...) is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Server-assigned node id
    #[serde(deserialize_with = "deserialize_node_id")]
    pub id: u64,
    /// Node name
    pub name: String,
    /// Remaining node attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeSummary {
    /// Node with only an id and a name
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// EVE-NG sends ids as numbers, older releases as numeric strings
fn deserialize_node_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Parsed node list of a lab
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeList {
    /// Nodes keyed by the label EVE-NG uses in `data`
    pub nodes: BTreeMap<String, NodeSummary>,
}

impl NodeList {
    /// Validate and parse a node-list response body
    ///
    /// `data` must be an object of label to node, or an empty array. Any other
    /// shape, or a node without a usable `id`/`name`, is a
    /// [`EveError::MalformedResponse`].
    pub fn from_response(body: &Value) -> Result<Self, EveError> {
        let data = body.get("data").ok_or_else(|| {
            EveError::MalformedResponse("node list has no 'data' field".to_string())
        })?;

        let mut nodes = BTreeMap::new();
        match data {
            Value::Object(entries) => {
                for (label, raw) in entries {
                    let node = NodeSummary::deserialize(raw).map_err(|e| {
                        EveError::MalformedResponse(format!("node '{label}': {e}"))
                    })?;
                    nodes.insert(label.clone(), node);
                }
            }
            Value::Array(items) if items.is_empty() => {}
            other => {
                return Err(EveError::MalformedResponse(format!(
                    "node list 'data' must be an object, got {}",
                    json_kind(other)
                )));
            }
        }

        Ok(Self { nodes })
    }

    /// Nodes sorted by name
    #[must_use]
    pub fn into_sorted(self) -> Vec<NodeSummary> {
        let mut nodes: Vec<NodeSummary> = self.nodes.into_values().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        nodes
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the lab has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a non-empty array",
        Value::Object(_) => "an object",
    }
}

/// Translate a node action token into the path segment EVE-NG expects
///
/// `stop` needs an explicit stop mode; other actions pass through unchanged.
#[must_use]
pub fn node_action_path(action: &str) -> String {
    let action = action.trim_matches('/');
    if action == "stop" {
        "stop/stopmode=1".to_string()
    } else {
        action.to_string()
    }
}

/// HTTP method for per-node actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMethod {
    /// GET
    Get,
    /// PUT
    Put,
}

impl ActionMethod {
    /// Parse a method name case-insensitively; only `get` and `put` are known
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "put" => Some(Self::Put),
            _ => None,
        }
    }

    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one node's action call
#[derive(Debug)]
pub enum NodeActionOutcome {
    /// The node answered with this JSON body
    Completed(Value),
    /// The call failed; the other nodes were still processed
    Failed(EveError),
    /// The requested method is neither GET nor PUT, so no call was made
    Unsupported,
}

impl NodeActionOutcome {
    /// JSON body of a completed call
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed(_) | Self::Unsupported => None,
        }
    }

    /// Consume into the JSON body of a completed call
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed(_) | Self::Unsupported => None,
        }
    }

    /// Error of a failed call
    #[must_use]
    pub fn error(&self) -> Option<&EveError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Completed(_) | Self::Unsupported => None,
        }
    }

    /// Whether the call completed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Per-node outcomes of a `lab_action`, keyed and ordered by node name
#[derive(Debug, Default)]
pub struct LabActionResult {
    outcomes: BTreeMap<String, NodeActionOutcome>,
}

impl LabActionResult {
    /// Record the outcome for a node, returning the outcome it replaced
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        outcome: NodeActionOutcome,
    ) -> Option<NodeActionOutcome> {
        self.outcomes.insert(name.into(), outcome)
    }

    /// Outcome for a node
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NodeActionOutcome> {
        self.outcomes.get(name)
    }

    /// JSON body returned for a node, `None` if it failed, was skipped or is unknown
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.outcomes.get(name).and_then(NodeActionOutcome::value)
    }

    /// Node names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(String::as_str)
    }

    /// Outcomes in node-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeActionOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    /// Number of nodes covered
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the lab had no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of nodes whose call completed
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_completed()).count()
    }

    /// Collapse into name -> optional JSON body
    #[must_use]
    pub fn into_values(self) -> BTreeMap<String, Option<Value>> {
        self.outcomes
            .into_iter()
            .map(|(name, outcome)| (name, outcome.into_value()))
            .collect()
    }
}

impl FromIterator<(String, NodeActionOutcome)> for LabActionResult {
    fn from_iter<I: IntoIterator<Item = (String, NodeActionOutcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LabActionResult {
    type Item = (String, NodeActionOutcome);
    type IntoIter = std::collections::btree_map::IntoIter<String, NodeActionOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
