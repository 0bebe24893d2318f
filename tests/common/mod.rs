#![allow(dead_code)]

use benchwarden::engine::{
    ConfigItemHandle, Engine, EngineError, ExecutionConfigHandle, ExecutionStatusHandle,
    ProjectHandle, ScenarioNode, ScenarioRef, StatusSnapshot, TestSetHandle,
};
use benchwarden::shared::{ConfigName, Interrupt, ObjectId, ScenarioName, TestSetName};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

pub const PROJECT: &str = "/work/demo.proj";
pub const ORIGINAL_DATA_DIR: &str = "/orig/data";
pub const ORIGINAL_REPORT_DIR: &str = "/orig/reports";

const MUTATING_METHODS: &[&str] = &[
    "project/create-test-set",
    "project/delete-test-set",
    "test-set/add-scenarios",
    "config/set-data-dir",
    "config/set-report-dir",
    "item/set-active",
    "item/set-test-set",
    "api/run",
    "api/regenerate-overview-report",
];

pub fn scenario(id: &str, name: &str) -> ScenarioRef {
    ScenarioRef {
        id: ObjectId::new(id),
        name: ScenarioName::parse(name).expect("scenario name"),
    }
}

pub fn names(raw: &[&str]) -> BTreeSet<ScenarioName> {
    raw.iter()
        .map(|n| ScenarioName::parse(n).expect("scenario name"))
        .collect()
}

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub id: String,
    pub active: bool,
    pub test_set: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FakeConfig {
    pub id: String,
    pub name: String,
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
    pub items: Vec<FakeItem>,
}

#[derive(Debug, Clone)]
pub struct FakeTestSet {
    pub name: String,
    pub scenarios: Vec<ScenarioRef>,
}

#[derive(Debug, Clone)]
struct Fault {
    method: String,
    skip: usize,
    error: EngineError,
}

/// Observable configuration state, compared before and after a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
    pub items: Vec<(bool, Option<String>)>,
    pub test_sets: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub known_projects: BTreeSet<PathBuf>,
    pub open_projects: Vec<ProjectHandle>,
    pub open_failure_log: Option<Vec<String>>,
    pub configs: Vec<FakeConfig>,
    pub test_sets: BTreeMap<String, FakeTestSet>,
    pub tree: Vec<ScenarioNode>,
    pub statuses: VecDeque<StatusSnapshot>,
    pub always_running: bool,
    pub raise_on_status: Option<(usize, Interrupt)>,
    pub ignore_null_test_set: bool,
    pub calls: Vec<String>,
    pub status_calls: usize,
    pub cancelled: usize,
    /// Item test set names captured when the engine was asked to run.
    pub assignments_at_run: Vec<(String, Option<String>)>,
    pub active_at_run: Vec<(String, bool)>,
    pub dirs_at_run: Option<(PathBuf, PathBuf)>,
    faults: Vec<Fault>,
    next_id: usize,
}

pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    /// Project with four scenarios spread over nested groups, test sets
    /// `Set A {TC1, TC3}`, `Set B {TC2}`, `Set C {TC4}`, `Full {TC1, TC2, TC3}`
    /// and configuration `Nightly` whose items are: active/Set A,
    /// active/Set B, inactive/Set C.
    pub fn standard() -> Self {
        let mut state = FakeState::default();
        state.known_projects.insert(PathBuf::from(PROJECT));
        state.tree = vec![
            ScenarioNode::Group {
                name: "Regression".to_string(),
                children: vec![
                    ScenarioNode::Scenario(scenario("tree-tc1", "TC1")),
                    ScenarioNode::Group {
                        name: "Payments".to_string(),
                        children: vec![
                            ScenarioNode::Scenario(scenario("tree-tc2", "TC2")),
                            ScenarioNode::Scenario(scenario("tree-tc3", "TC3")),
                        ],
                    },
                ],
            },
            ScenarioNode::Group {
                name: "Legacy".to_string(),
                children: vec![
                    ScenarioNode::Scenario(scenario("tree-tc4", "TC4")),
                    ScenarioNode::Scenario(scenario("tree-tcx", "TCX")),
                ],
            },
        ];
        for (id, name, members) in [
            ("ts-a", "Set A", vec!["TC1", "TC3"]),
            ("ts-b", "Set B", vec!["TC2"]),
            ("ts-c", "Set C", vec!["TC4"]),
            ("ts-full", "Full", vec!["TC1", "TC2", "TC3"]),
        ] {
            state.test_sets.insert(
                id.to_string(),
                FakeTestSet {
                    name: name.to_string(),
                    scenarios: members
                        .into_iter()
                        .map(|m| scenario(&format!("{id}-{m}"), m))
                        .collect(),
                },
            );
        }
        state.configs.push(FakeConfig {
            id: "cfg-nightly".to_string(),
            name: "Nightly".to_string(),
            data_dir: PathBuf::from(ORIGINAL_DATA_DIR),
            report_dir: PathBuf::from(ORIGINAL_REPORT_DIR),
            items: vec![
                FakeItem {
                    id: "item-1".to_string(),
                    active: true,
                    test_set: Some("ts-a".to_string()),
                },
                FakeItem {
                    id: "item-2".to_string(),
                    active: true,
                    test_set: Some("ts-b".to_string()),
                },
                FakeItem {
                    id: "item-3".to_string(),
                    active: false,
                    test_set: Some("ts-c".to_string()),
                },
            ],
        });
        state.statuses = VecDeque::from(vec![
            StatusSnapshot {
                running: false,
                pending: true,
            },
            StatusSnapshot {
                running: true,
                pending: false,
            },
        ]);
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("lock fake engine")
    }

    /// Fails every call of `method` after the first `skip` calls.
    pub fn fail_on(&self, method: &str, skip: usize, error: EngineError) {
        self.state().faults.push(Fault {
            method: method.to_string(),
            skip,
            error,
        });
    }

    pub fn snapshot(&self, config: &str) -> ConfigSnapshot {
        let state = self.state();
        let config = state
            .configs
            .iter()
            .find(|c| c.name == config)
            .expect("config exists");
        ConfigSnapshot {
            data_dir: config.data_dir.clone(),
            report_dir: config.report_dir.clone(),
            items: config
                .items
                .iter()
                .map(|item| {
                    (
                        item.active,
                        item.test_set
                            .as_ref()
                            .map(|id| state.set_name(id).unwrap_or_else(|| format!("<{id}>"))),
                    )
                })
                .collect(),
            test_sets: state.test_sets.values().map(|ts| ts.name.clone()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING_METHODS.contains(&c.as_str()))
            .collect()
    }

    fn enter(&self, method: &str) -> Result<MutexGuard<'_, FakeState>, EngineError> {
        let mut state = self.state();
        state.calls.push(method.to_string());
        for fault in state.faults.iter_mut().filter(|f| f.method == method) {
            if fault.skip > 0 {
                fault.skip -= 1;
            } else {
                return Err(fault.error.clone());
            }
        }
        Ok(state)
    }
}

impl FakeState {
    fn set_name(&self, id: &str) -> Option<String> {
        self.test_sets.get(id).map(|ts| ts.name.clone())
    }

    fn set_handle(&self, id: &str) -> Option<TestSetHandle> {
        self.test_sets.get(id).map(|ts| TestSetHandle {
            id: ObjectId::new(id),
            name: TestSetName::parse(&ts.name).expect("test set name"),
        })
    }

    fn config_mut(&mut self, id: &ObjectId) -> Result<&mut FakeConfig, EngineError> {
        self.configs
            .iter_mut()
            .find(|c| c.id == id.as_str())
            .ok_or_else(|| app_error("config", "unknown configuration"))
    }

    fn item_mut(&mut self, id: &ObjectId) -> Result<&mut FakeItem, EngineError> {
        self.configs
            .iter_mut()
            .flat_map(|c| c.items.iter_mut())
            .find(|i| i.id == id.as_str())
            .ok_or_else(|| app_error("item", "unknown item"))
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn capture_run(&mut self, config: &ObjectId) {
        let Some(cfg) = self.configs.iter().find(|c| c.id == config.as_str()) else {
            return;
        };
        let assignments = cfg
            .items
            .iter()
            .map(|i| {
                (
                    i.id.clone(),
                    i.test_set.as_ref().and_then(|id| self.set_name(id)),
                )
            })
            .collect();
        let active = cfg.items.iter().map(|i| (i.id.clone(), i.active)).collect();
        self.dirs_at_run = Some((cfg.data_dir.clone(), cfg.report_dir.clone()));
        self.assignments_at_run = assignments;
        self.active_at_run = active;
    }
}

pub fn app_error(method: &str, message: &str) -> EngineError {
    EngineError::Application {
        method: method.to_string(),
        message: message.to_string(),
        log: Vec::new(),
    }
}

pub fn connection_lost(method: &str) -> EngineError {
    EngineError::Communication {
        method: method.to_string(),
        reason: "connection reset by peer".to_string(),
    }
}

impl Engine for FakeEngine {
    fn open_project(&self, path: &Path) -> Result<ProjectHandle, EngineError> {
        let mut state = self.enter("project/open")?;
        if let Some(log) = state.open_failure_log.clone() {
            return Err(EngineError::Application {
                method: "project/open".to_string(),
                message: "project file is corrupt".to_string(),
                log,
            });
        }
        if !state.known_projects.contains(path) {
            return Err(app_error("project/open", "no such project"));
        }
        let project = ProjectHandle {
            id: ObjectId::new(state.next_id("proj")),
            path: path.to_path_buf(),
        };
        state.open_projects.push(project.clone());
        Ok(project)
    }

    fn open_projects(&self) -> Result<Vec<ProjectHandle>, EngineError> {
        Ok(self.enter("project/list")?.open_projects.clone())
    }

    fn close_project(&self, project: &ProjectHandle) -> Result<(), EngineError> {
        let mut state = self.enter("project/close")?;
        state.open_projects.retain(|p| p.id != project.id);
        Ok(())
    }

    fn execution_configs(
        &self,
        _project: &ProjectHandle,
    ) -> Result<Vec<ExecutionConfigHandle>, EngineError> {
        let state = self.enter("project/execution-configs")?;
        Ok(state
            .configs
            .iter()
            .map(|c| ExecutionConfigHandle {
                id: ObjectId::new(c.id.clone()),
                name: ConfigName::parse(&c.name).expect("config name"),
            })
            .collect())
    }

    fn test_sets(&self, _project: &ProjectHandle) -> Result<Vec<TestSetHandle>, EngineError> {
        let state = self.enter("project/test-sets")?;
        Ok(state
            .test_sets
            .keys()
            .filter_map(|id| state.set_handle(id))
            .collect())
    }

    fn scenario_tree(&self, _project: &ProjectHandle) -> Result<Vec<ScenarioNode>, EngineError> {
        Ok(self.enter("project/scenario-tree")?.tree.clone())
    }

    fn create_test_set(
        &self,
        _project: &ProjectHandle,
        name: &TestSetName,
    ) -> Result<TestSetHandle, EngineError> {
        let mut state = self.enter("project/create-test-set")?;
        if state.test_sets.values().any(|ts| ts.name == name.as_str()) {
            return Err(app_error("project/create-test-set", "duplicate name"));
        }
        let id = state.next_id("ts-tmp");
        state.test_sets.insert(
            id.clone(),
            FakeTestSet {
                name: name.to_string(),
                scenarios: Vec::new(),
            },
        );
        Ok(TestSetHandle {
            id: ObjectId::new(id),
            name: name.clone(),
        })
    }

    fn delete_test_set(
        &self,
        _project: &ProjectHandle,
        test_set: &TestSetHandle,
    ) -> Result<(), EngineError> {
        let mut state = self.enter("project/delete-test-set")?;
        state.test_sets.remove(test_set.id.as_str());
        Ok(())
    }

    fn test_set_scenarios(
        &self,
        test_set: &TestSetHandle,
    ) -> Result<Vec<ScenarioRef>, EngineError> {
        let state = self.enter("test-set/scenarios")?;
        state
            .test_sets
            .get(test_set.id.as_str())
            .map(|ts| ts.scenarios.clone())
            .ok_or_else(|| app_error("test-set/scenarios", "unknown test set"))
    }

    fn add_scenarios(
        &self,
        test_set: &TestSetHandle,
        scenarios: &[ScenarioRef],
    ) -> Result<(), EngineError> {
        let mut state = self.enter("test-set/add-scenarios")?;
        let target = state
            .test_sets
            .get_mut(test_set.id.as_str())
            .ok_or_else(|| app_error("test-set/add-scenarios", "unknown test set"))?;
        target.scenarios.extend(scenarios.iter().cloned());
        Ok(())
    }

    fn config_items(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<Vec<ConfigItemHandle>, EngineError> {
        let mut state = self.enter("config/items")?;
        Ok(state
            .config_mut(&config.id)?
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| ConfigItemHandle {
                id: ObjectId::new(item.id.clone()),
                position,
            })
            .collect())
    }

    fn data_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError> {
        let mut state = self.enter("config/data-dir")?;
        Ok(state.config_mut(&config.id)?.data_dir.clone())
    }

    fn set_data_dir(&self, config: &ExecutionConfigHandle, path: &Path) -> Result<(), EngineError> {
        let mut state = self.enter("config/set-data-dir")?;
        state.config_mut(&config.id)?.data_dir = path.to_path_buf();
        Ok(())
    }

    fn report_dir(&self, config: &ExecutionConfigHandle) -> Result<PathBuf, EngineError> {
        let mut state = self.enter("config/report-dir")?;
        Ok(state.config_mut(&config.id)?.report_dir.clone())
    }

    fn set_report_dir(
        &self,
        config: &ExecutionConfigHandle,
        path: &Path,
    ) -> Result<(), EngineError> {
        let mut state = self.enter("config/set-report-dir")?;
        state.config_mut(&config.id)?.report_dir = path.to_path_buf();
        Ok(())
    }

    fn item_active(&self, item: &ConfigItemHandle) -> Result<bool, EngineError> {
        let mut state = self.enter("item/active")?;
        Ok(state.item_mut(&item.id)?.active)
    }

    fn set_item_active(&self, item: &ConfigItemHandle, active: bool) -> Result<(), EngineError> {
        let mut state = self.enter("item/set-active")?;
        state.item_mut(&item.id)?.active = active;
        Ok(())
    }

    fn item_test_set(
        &self,
        item: &ConfigItemHandle,
    ) -> Result<Option<TestSetHandle>, EngineError> {
        let mut state = self.enter("item/test-set")?;
        let id = state.item_mut(&item.id)?.test_set.clone();
        Ok(id.and_then(|id| state.set_handle(&id)))
    }

    fn set_item_test_set(
        &self,
        item: &ConfigItemHandle,
        test_set: Option<&TestSetHandle>,
    ) -> Result<(), EngineError> {
        let mut state = self.enter("item/set-test-set")?;
        if test_set.is_none() && state.ignore_null_test_set {
            return Ok(());
        }
        state.item_mut(&item.id)?.test_set = test_set.map(|ts| ts.id.as_str().to_string());
        Ok(())
    }

    fn run(&self, config: &ExecutionConfigHandle) -> Result<ExecutionStatusHandle, EngineError> {
        let mut state = self.enter("api/run")?;
        state.capture_run(&config.id);
        Ok(ExecutionStatusHandle {
            id: ObjectId::new(state.next_id("status")),
        })
    }

    fn regenerate_overview_report(
        &self,
        config: &ExecutionConfigHandle,
    ) -> Result<ExecutionStatusHandle, EngineError> {
        let mut state = self.enter("api/regenerate-overview-report")?;
        state.capture_run(&config.id);
        Ok(ExecutionStatusHandle {
            id: ObjectId::new(state.next_id("status")),
        })
    }

    fn execution_status(
        &self,
        _status: &ExecutionStatusHandle,
    ) -> Result<StatusSnapshot, EngineError> {
        let mut state = self.enter("status/get")?;
        state.status_calls += 1;
        if let Some((after, interrupt)) = &state.raise_on_status {
            if state.status_calls >= *after {
                interrupt.raise();
            }
        }
        if state.always_running {
            return Ok(StatusSnapshot {
                running: true,
                pending: false,
            });
        }
        Ok(state.statuses.pop_front().unwrap_or_default())
    }

    fn cancel(&self, _status: &ExecutionStatusHandle) -> Result<(), EngineError> {
        let mut state = self.enter("status/cancel")?;
        state.cancelled += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: String,
}

pub enum MockResponse {
    Json { status: u16, body: String },
    Hangup,
}

pub fn ok_envelope(data: serde_json::Value) -> MockResponse {
    MockResponse::Json {
        status: 200,
        body: serde_json::json!({ "ok": true, "data": data }).to_string(),
    }
}

pub fn error_envelope(status: u16, message: &str, log: &[&str]) -> MockResponse {
    MockResponse::Json {
        status,
        body: serde_json::json!({
            "ok": false,
            "error": { "message": message, "log": log },
        })
        .to_string(),
    }
}

/// Minimal HTTP/1.1 engine stand-in. Serves connections until the test
/// process exits; `responder` sees each request and its zero-based index.
pub struct MockEngineServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockEngineServer {
    pub fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest, usize) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock engine");
        Self::serve(listener, responder)
    }

    pub fn serve<F>(listener: TcpListener, responder: F) -> Self
    where
        F: Fn(&RecordedRequest, usize) -> MockResponse + Send + Sync + 'static,
    {
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_for_thread = Arc::clone(&requests);

        thread::spawn(move || {
            for (index, stream) in listener.incoming().enumerate() {
                let Ok(mut stream) = stream else {
                    continue;
                };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();

                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_err() || line == "\r\n" || line.is_empty() {
                        break;
                    }
                    let lower = line.to_ascii_lowercase();
                    if lower.starts_with("content-length:") {
                        content_length = line
                            .split_once(':')
                            .map(|(_, v)| v.trim().parse::<usize>().unwrap_or(0))
                            .unwrap_or(0);
                    }
                }
                let mut body = vec![0_u8; content_length];
                if content_length > 0 && reader.read_exact(&mut body).is_err() {
                    continue;
                }
                let request = RecordedRequest {
                    path,
                    body: String::from_utf8_lossy(&body).to_string(),
                };
                requests_for_thread
                    .lock()
                    .expect("lock requests")
                    .push(request.clone());

                match responder(&request, index) {
                    MockResponse::Hangup => drop(stream),
                    MockResponse::Json { status, body } => {
                        let response = format!(
                            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            if status == 200 { "OK" } else { "Error" },
                            body.len(),
                            body
                        );
                        let _ = stream.write_all(response.as_bytes());
                    }
                }
            }
        });

        Self { port, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}
