use super::{
    ConfigItemHandle, Engine, EngineEndpoint, EngineError, ExecutionConfigHandle,
    ExecutionStatusHandle, ProjectHandle, ScenarioNode, ScenarioRef, StatusSnapshot,
    TestSetHandle,
};
use crate::shared::TestSetName;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<RemoteFault>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct RemoteFault {
    #[serde(default)]
    message: String,
    #[serde(default)]
    log: Vec<String>,
}

/// Engine client speaking JSON over HTTP. Every call is
/// `POST http://host:port/<binding>/<method>` answered by an
/// `{ok, error, data}` envelope.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    endpoint: EngineEndpoint,
    agent: ureq::Agent,
}

impl HttpEngine {
    pub fn new(endpoint: EngineEndpoint, timeouts: HttpTimeouts) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeouts.connect)
            .timeout(timeouts.request)
            .build();
        Self { endpoint, agent }
    }

    pub fn endpoint(&self) -> &EngineEndpoint {
        &self.endpoint
    }

    /// Binding lookup. Succeeds only when the engine answers under the
    /// configured binding name.
    pub fn ping(&self) -> Result<(), EngineError> {
        self.call("ping", json!({}))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint.base_url(), method)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, EngineError> {
        let data = self.call_value(method, body)?;
        serde_json::from_value(data).map_err(|e| EngineError::Protocol {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    fn call_value(&self, method: &str, body: Value) -> Result<Value, EngineError> {
        let url = self.method_url(method);
        let response = match self.agent.post(&url).send_json(body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return match response.into_json::<Envelope>() {
                    Ok(envelope) if !envelope.ok => Err(application_error(method, envelope)),
                    _ => Err(EngineError::Communication {
                        method: method.to_string(),
                        reason: format!("http status {code}"),
                    }),
                };
            }
            Err(err) => {
                return Err(EngineError::Communication {
                    method: method.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let envelope = response
            .into_json::<Envelope>()
            .map_err(|e| EngineError::Protocol {
                method: method.to_string(),
                reason: e.to_string(),
            })?;
        if !envelope.ok {
            return Err(application_error(method, envelope));
        }
        Ok(envelope.data)
    }
}

fn application_error(method: &str, envelope: Envelope) -> EngineError {
    let fault = envelope.error.unwrap_or(RemoteFault {
        message: String::new(),
        log: Vec::new(),
    });
    let message = if fault.message.trim().is_empty() {
        "unspecified engine error".to_string()
    } else {
        fault.message
    };
    EngineError::Application {
        method: method.to_string(),
        message,
        log: fault.log,
    }
}

impl Engine for HttpEngine {
    fn open_project(&self, path: &Path) -> Result<ProjectHandle, EngineError> {
        self.call("project/open", json!({ "path": path.display().to_string() }))
    }

    fn open_projects(&self) -> Result<Vec<ProjectHandle>, EngineError> {
        self.call("project/list", json!({}))
    }

    fn close_project(&self, project: &ProjectHandle) -> Result<(), EngineError> {
        self.call("project/close", json!({ "project": project.id }))
    }

    fn execution_configs(
        &self,
        project: &ProjectHandle,
    ) -> Result<Vec<ExecutionConfigHandle>, EngineError> {
        self.call("project/execution-configs", json!({ "project": project.id }))
    }

    fn test_sets(&self, project: &ProjectHandle) -> Result<Vec<TestSetHandle>, EngineError> {
        self.call("project/test-sets", json!({ "project": project.id }))
    }

    fn scenario_tree(&self, project: &ProjectHandle) -> Result<Vec<ScenarioNode>, EngineError> {
        self.call("project/scenario-tree", json!({ "project": project.id }))
    }

    fn create_test_set(
        &self,
        project: &ProjectHandle,
        name: &TestSetName,
    ) -> Result<TestSetHandle, EngineError> {
        self.call(
            "project/create-test-set",
            json!({ "project": project.id, "name": name }),
        )
    }

    fn delete_test_set(
        &self,
        project: &ProjectHandle,
        test_set: &TestSetHandle,
    ) -> Result<(), EngineError> {
        self.call(
            "project/delete-test-set",
            json!({ "project": project.id, "test_set": test_set.id }),
        )
    }

    fn test_set_scenarios(
        &self,
        test_set: &TestSetHandle,
    ) -> Result<Vec<ScenarioRef>, EngineError> {
        self.call("test-set/scenarios", json!({ "test_set": test_set.id }))
    }

    fn add_scenarios(
        &self,
        test_set: &TestSetHandle,
        scenarios: &[ScenarioRef],
    ) -> Result<(), EngineError> {
        let ids: Vec<_> = scenarios.iter().map(|s| &s.id).collect();
        self.call(
            "test-set/add-scenarios",
            json!({ "test_set": test_set.id, "scenarios": ids }),
        )
    }

    fn config_items(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<Vec<ConfigItemHandle>, EngineError> {
        self.call("config/items", json!({ "config": config.id }))
    }

    fn data_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError> {
        self.call("config/data-dir", json!({ "config": config.id }))
    }

    fn set_data_dir(
        &self,
        config: &ExecutionConfigHandle,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.call(
            "config/set-data-dir",
            json!({ "config": config.id, "path": path.display().to_string() }),
        )
    }

    fn report_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError> {
        self.call("config/report-dir", json!({ "config": config.id }))
    }

    fn set_report_dir(
        &self,
        config: &ExecutionConfigHandle,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.call(
            "config/set-report-dir",
            json!({ "config": config.id, "path": path.display().to_string() }),
        )
    }

    fn item_active(&self, item: &ConfigItemHandle) -> Result<bool, EngineError> {
        self.call("item/active", json!({ "item": item.id }))
    }

    fn set_item_active(&self, item: &ConfigItemHandle, active: bool) -> Result<(), EngineError> {
        self.call(
            "item/set-active",
            json!({ "item": item.id, "active": active }),
        )
    }

    fn item_test_set(
        &self,
        item: &ConfigItemHandle,
    ) -> Result<Option<TestSetHandle>, EngineError> {
        self.call("item/test-set", json!({ "item": item.id }))
    }

    fn set_item_test_set(
        &self,
        item: &ConfigItemHandle,
        test_set: Option<&TestSetHandle>,
    ) -> Result<(), EngineError> {
        self.call(
            "item/set-test-set",
            json!({ "item": item.id, "test_set": test_set.map(|ts| &ts.id) }),
        )
    }

    fn run(&self, config: &ExecutionConfigHandle) -> Result<ExecutionStatusHandle, EngineError> {
        self.call("api/run", json!({ "config": config.id }))
    }

    fn regenerate_overview_report(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<ExecutionStatusHandle, EngineError> {
        self.call(
            "api/regenerate-overview-report",
            json!({ "config": config.id }),
        )
    }

    fn execution_status(
        &self,
        status: &ExecutionStatusHandle,
    ) -> Result<StatusSnapshot, EngineError> {
        self.call("status/get", json!({ "status": status.id }))
    }

    fn cancel(&self, status: &ExecutionStatusHandle) -> Result<(), EngineError> {
        self.call("status/cancel", json!({ "status": status.id }))
    }
}
