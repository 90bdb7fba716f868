//! EVE-NG API client
//!
//! Implements the EVE-NG REST API client for lab and node operations.
//! Based on the EVE-NG API structure: /api/auth/login and /api/labs/{path}.unl/...

use crate::common::HttpClient;
use crate::common::uri::{lab_uri, node_action_uri};
use crate::config::EveConfig;
use crate::error::EveError;
use crate::eve_trait::EveClientTrait;
use crate::models::{
    ActionMethod, LabActionResult, NodeActionOutcome, NodeList, NodeSummary, node_action_path,
};
use crate::session::Session;
use futures::stream::{self, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// EVE-NG API client
///
/// Logs in once on [`EveClient::connect`] and sends the resulting session
/// cookie with every later request.
#[derive(Debug)]
pub struct EveClient {
    http: HttpClient,
    config: EveConfig,
}

impl EveClient {
    /// Create a client and log in
    ///
    /// A rejected login (non-200 status) or a transport failure during login is
    /// logged and leaves the client unauthenticated; later calls are still sent
    /// and fail on their own. Only a failure to build the HTTP client is returned.
    ///
    /// # Arguments
    /// * `config` - Server address, credentials and transport settings
    pub async fn connect(config: EveConfig) -> Result<Self, EveError> {
        debug!(
            "EVE-NG API server set to {} with username {}",
            config.server, config.username
        );

        let client = Self::with_session(config, Session::anonymous())?;
        let session = match client.login().await {
            Ok(session) => session,
            Err(e) => {
                error!("Login error to {}: {}", client.config.server, e);
                Session::anonymous()
            }
        };

        Ok(Self {
            http: client.http.with_session(session),
            config: client.config,
        })
    }

    /// Create a client around an existing session without logging in
    pub fn with_session(config: EveConfig, session: Session) -> Result<Self, EveError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(EveError::Http)?;

        let http = HttpClient::new(client, config.base_url(), session, config.browser_headers);
        Ok(Self { http, config })
    }

    /// Perform one login exchange and return the session it yields
    ///
    /// # Returns
    /// * `Ok(Session)` - Server answered 200; the session carries its cookies
    /// * `Err(EveError::Authentication)` - Server answered anything else
    /// * `Err(EveError::Http)` - Server unreachable
    pub async fn login(&self) -> Result<Session, EveError> {
        let url = self.http.api_url("auth/login");
        debug!("Logging in to {} as {}", url, self.config.username);

        let body = serde_json::json!({
            "username": self.config.username,
            "password": self.config.password,
            "html5": "-1",
        });

        let response = self
            .http
            .client()
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(EveError::Http)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(EveError::Authentication(format!(
                "login to {} returned status-code {} - {}",
                self.config.server,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let session = Session::from_set_cookie_headers(response.headers(), response.url());
        if session.is_authenticated() {
            info!("Logged in to {} as {}", self.config.server, self.config.username);
        } else {
            warn!("Login to {} succeeded but returned no session cookie", self.config.server);
        }
        Ok(session)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Get the configuration the client was built from
    pub fn config(&self) -> &EveConfig {
        &self.config
    }

    /// Get the session established at connect time
    pub fn session(&self) -> &Session {
        self.http.session()
    }

    /// Whether login produced a session cookie
    pub fn is_authenticated(&self) -> bool {
        self.http.session().is_authenticated()
    }

    /// Log request failures the way every public call reports them
    fn logged(uri: &str, result: Result<Value, EveError>) -> Result<Value, EveError> {
        if let Err(e) = &result {
            error!("Error requesting API data {}: {}", uri, e);
        }
        result
    }

    /// Get the node list of a lab
    ///
    /// # Arguments
    /// * `project_path` - Lab path without `.unl` (e.g. `"Team/Core Lab"`)
    pub async fn get_project_nodes(&self, project_path: &str) -> Result<Value, EveError> {
        let uri = lab_uri(project_path, "/nodes");
        Self::logged(&uri, self.http.get(&uri).await)
    }

    /// Generic GET of any API-relative path, mostly for diagnostics
    ///
    /// # Arguments
    /// * `uri` - Path below `/api/` (e.g. `"folders/"` or `"status"`)
    pub async fn get_api_data(&self, uri: &str) -> Result<Value, EveError> {
        Self::logged(uri, self.http.get(uri).await)
    }

    /// Generic PUT of any API-relative path
    pub async fn put_api_data(&self, uri: &str, body: Option<&Value>) -> Result<Value, EveError> {
        Self::logged(uri, self.http.put(uri, body).await)
    }

    /// Run an action on every node of a lab
    ///
    /// This method:
    /// 1. Fetches and validates the node list of the lab
    /// 2. Translates `action` (`stop` becomes `stop/stopmode=1`)
    /// 3. Calls `/api/labs/{path}.unl/nodes/{id}/{action}` for each node with
    ///    `method`, at most `max_concurrency` calls at a time
    ///
    /// A node whose call fails is recorded as [`NodeActionOutcome::Failed`] and
    /// does not stop the others. A `method` other than `get`/`put` makes no
    /// node calls and marks every node [`NodeActionOutcome::Unsupported`].
    ///
    /// # Returns
    /// * `Ok(LabActionResult)` - One outcome per node, ordered by node name
    /// * `Err(EveError)` - The node list could not be fetched or is malformed
    pub async fn lab_action(
        &self,
        project_path: &str,
        action: &str,
        method: &str,
    ) -> Result<LabActionResult, EveError> {
        let body = self.get_project_nodes(project_path).await?;
        let nodes = NodeList::from_response(&body)?;
        let action_path = node_action_path(action);

        let Some(method) = ActionMethod::parse(method) else {
            warn!(
                "Unsupported method '{}' for action '{}' on lab {}, no node calls made",
                method, action, project_path
            );
            let outcomes = nodes
                .nodes
                .into_values()
                .map(|node| (node.name, NodeActionOutcome::Unsupported));
            return Ok(Self::collect_outcomes(project_path, outcomes));
        };

        debug!(
            "{} {} on {} nodes of lab {}",
            method,
            action_path,
            nodes.len(),
            project_path
        );

        let action_path = action_path.as_str();
        let calls = nodes.nodes.into_values().map(|node| {
            let uri = node_action_uri(project_path, node.id, action_path);
            async move {
                let result = match method {
                    ActionMethod::Get => self.http.get(&uri).await,
                    ActionMethod::Put => self.http.put(&uri, None).await,
                };
                let outcome = match result {
                    Ok(value) => NodeActionOutcome::Completed(value),
                    Err(e) => {
                        warn!(
                            "{} {} on node {} ({}) failed: {}",
                            method, action_path, node.name, node.id, e
                        );
                        NodeActionOutcome::Failed(e)
                    }
                };
                (node.name, outcome)
            }
        });

        let outcomes: Vec<(String, NodeActionOutcome)> = stream::iter(calls)
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        Ok(Self::collect_outcomes(project_path, outcomes))
    }

    /// Key outcomes by node name; a repeated name keeps the last outcome
    fn collect_outcomes(
        project_path: &str,
        outcomes: impl IntoIterator<Item = (String, NodeActionOutcome)>,
    ) -> LabActionResult {
        let mut result = LabActionResult::default();
        for (name, outcome) in outcomes {
            if result.insert(name.as_str(), outcome).is_some() {
                warn!(
                    "Lab {} has more than one node named '{}', only one outcome is kept",
                    project_path, name
                );
            }
        }
        result
    }

    /// Get the topology (links and networks) of a lab
    pub async fn lab_topology(&self, project_path: &str) -> Result<Value, EveError> {
        let uri = lab_uri(project_path, "/topology");
        Self::logged(&uri, self.http.get(&uri).await)
    }

    /// Get the lab metadata (name, author, description, version)
    pub async fn get_lab(&self, project_path: &str) -> Result<Value, EveError> {
        let uri = lab_uri(project_path, "");
        Self::logged(&uri, self.http.get(&uri).await)
    }

    /// Typed node list of a lab, sorted by node name
    pub async fn list_nodes(&self, project_path: &str) -> Result<Vec<NodeSummary>, EveError> {
        let body = self.get_project_nodes(project_path).await?;
        Ok(NodeList::from_response(&body)?.into_sorted())
    }

    /// Start every node of a lab
    pub async fn start_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "start", "get").await
    }

    /// Stop every node of a lab
    pub async fn stop_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "stop", "get").await
    }

    /// Wipe the runtime state of every node of a lab
    pub async fn wipe_lab(&self, project_path: &str) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, "wipe", "get").await
    }

    /// Server version and resource usage
    pub async fn server_status(&self) -> Result<Value, EveError> {
        self.get_api_data("status").await
    }

    /// End the session on the server
    ///
    /// The client keeps its cookie; calls made afterwards are rejected by the server.
    pub async fn logout(&self) -> Result<Value, EveError> {
        self.get_api_data("auth/logout").await
    }
}

#[async_trait::async_trait]
impl EveClientTrait for EveClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    fn is_authenticated(&self) -> bool {
        self.is_authenticated()
    }

    async fn get_project_nodes(&self, project_path: &str) -> Result<Value, EveError> {
        self.get_project_nodes(project_path).await
    }

    async fn get_api_data(&self, uri: &str) -> Result<Value, EveError> {
        self.get_api_data(uri).await
    }

    async fn lab_action(
        &self,
        project_path: &str,
        action: &str,
        method: &str,
    ) -> Result<LabActionResult, EveError> {
        self.lab_action(project_path, action, method).await
    }

    async fn lab_topology(&self, project_path: &str) -> Result<Value, EveError> {
        self.lab_topology(project_path).await
    }

    async fn list_nodes(&self, project_path: &str) -> Result<Vec<NodeSummary>, EveError> {
        self.list_nodes(project_path).await
    }
}
