//! Contract with the external test-execution engine.
//!
//! Every type here is a handle into the engine's object graph. The engine owns
//! storage; callers borrow handles for the length of one orchestration call.

use crate::shared::{ConfigName, ObjectId, ScenarioName, TestSetName};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod connector;
pub mod http;

pub use connector::{
    connect, ensure_running, select_executable, spawn_engine, BootstrapOptions, ConnectError,
    EngineEndpoint,
};
pub use http::{HttpEngine, HttpTimeouts};

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("remote communication failed for `{method}`: {reason}")]
    Communication { method: String, reason: String },
    #[error("remote engine rejected `{method}`: {message}")]
    Application {
        method: String,
        message: String,
        log: Vec<String>,
    },
    #[error("malformed engine response for `{method}`: {reason}")]
    Protocol { method: String, reason: String },
}

impl EngineError {
    pub fn method(&self) -> &str {
        match self {
            Self::Communication { method, .. }
            | Self::Application { method, .. }
            | Self::Protocol { method, .. } => method,
        }
    }

    /// Log lines the engine attached to an application failure.
    pub fn remote_log(&self) -> &[String] {
        match self {
            Self::Application { log, .. } => log,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub id: ObjectId,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfigHandle {
    pub id: ObjectId,
    pub name: ConfigName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItemHandle {
    pub id: ObjectId,
    pub position: usize,
}

impl std::fmt::Display for ConfigItemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item #{}", self.position + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetHandle {
    pub id: ObjectId,
    pub name: TestSetName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRef {
    pub id: ObjectId,
    pub name: ScenarioName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioNode {
    Scenario(ScenarioRef),
    Group {
        name: String,
        #[serde(default)]
        children: Vec<ScenarioNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatusHandle {
    pub id: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub pending: bool,
}

impl StatusSnapshot {
    pub fn in_progress(self) -> bool {
        self.running || self.pending
    }
}

/// Remote engine API consumed by the orchestrators.
///
/// Calls are blocking; implementations are expected to map transport
/// failures to [`EngineError::Communication`] and engine-side exceptions to
/// [`EngineError::Application`].
pub trait Engine {
    fn open_project(&self, path: &Path) -> Result<ProjectHandle, EngineError>;
    fn open_projects(&self) -> Result<Vec<ProjectHandle>, EngineError>;
    fn close_project(&self, project: &ProjectHandle) -> Result<(), EngineError>;

    fn execution_configs(
        &self,
        project: &ProjectHandle,
    ) -> Result<Vec<ExecutionConfigHandle>, EngineError>;
    fn test_sets(&self, project: &ProjectHandle) -> Result<Vec<TestSetHandle>, EngineError>;
    fn scenario_tree(&self, project: &ProjectHandle) -> Result<Vec<ScenarioNode>, EngineError>;
    fn create_test_set(
        &self,
        project: &ProjectHandle,
        name: &TestSetName,
    ) -> Result<TestSetHandle, EngineError>;
    fn delete_test_set(
        &self,
        project: &ProjectHandle,
        test_set: &TestSetHandle,
    ) -> Result<(), EngineError>;

    fn test_set_scenarios(&self, test_set: &TestSetHandle)
        -> Result<Vec<ScenarioRef>, EngineError>;
    fn add_scenarios(
        &self,
        test_set: &TestSetHandle,
        scenarios: &[ScenarioRef],
    ) -> Result<(), EngineError>;

    fn config_items(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<Vec<ConfigItemHandle>, EngineError>;
    fn data_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError>;
    fn set_data_dir(&self, config: &ExecutionConfigHandle, path: &Path)
        -> Result<(), EngineError>;
    fn report_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError>;
    fn set_report_dir(
        &self,
        config: &ExecutionConfigHandle,
        path: &Path,
    ) -> Result<(), EngineError>;

    fn item_active(&self, item: &ConfigItemHandle) -> Result<bool, EngineError>;
    fn set_item_active(&self, item: &ConfigItemHandle, active: bool) -> Result<(), EngineError>;
    fn item_test_set(&self, item: &ConfigItemHandle)
        -> Result<Option<TestSetHandle>, EngineError>;
    fn set_item_test_set(
        &self,
        item: &ConfigItemHandle,
        test_set: Option<&TestSetHandle>,
    ) -> Result<(), EngineError>;

    fn run(&self, config: &ExecutionConfigHandle) -> Result<ExecutionStatusHandle, EngineError>;
    fn regenerate_overview_report(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<ExecutionStatusHandle, EngineError>;
    fn execution_status(
        &self,
        status: &ExecutionStatusHandle,
    ) -> Result<StatusSnapshot, EngineError>;
    fn cancel(&self, status: &ExecutionStatusHandle) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_tree_uses_kind_tag_on_the_wire() {
        let raw = r#"[
            {"kind": "group", "name": "Regression", "children": [
                {"kind": "scenario", "id": "s-1", "name": "TC1"},
                {"kind": "group", "name": "Nested"}
            ]}
        ]"#;
        let tree: Vec<ScenarioNode> = serde_json::from_str(raw).expect("parse tree");
        let ScenarioNode::Group { name, children } = &tree[0] else {
            panic!("expected group");
        };
        assert_eq!(name, "Regression");
        assert_eq!(
            children[0],
            ScenarioNode::Scenario(ScenarioRef {
                id: ObjectId::new("s-1"),
                name: ScenarioName::parse("TC1").expect("name"),
            })
        );
        assert_eq!(
            children[1],
            ScenarioNode::Group {
                name: "Nested".to_string(),
                children: Vec::new(),
            }
        );
    }

    #[test]
    fn pending_counts_as_in_progress() {
        assert!(StatusSnapshot {
            running: false,
            pending: true
        }
        .in_progress());
        assert!(!StatusSnapshot::default().in_progress());
    }

    #[test]
    fn only_application_errors_carry_remote_log() {
        let app = EngineError::Application {
            method: "project/open".to_string(),
            message: "locked".to_string(),
            log: vec!["project is locked by user x".to_string()],
        };
        assert_eq!(app.remote_log().len(), 1);
        assert_eq!(app.method(), "project/open");

        let comm = EngineError::Communication {
            method: "ping".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(comm.remote_log().is_empty());
        assert_eq!(
            comm.to_string(),
            "remote communication failed for `ping`: connection refused"
        );
    }
}
