#![allow(dead_code)]

use ideatown_core::db::open_db_in_memory;
use ideatown_core::registry::{HttpRequest, HttpResponse, HttpTransport};
use ideatown_core::{
    AllowedOrigins, BridgeError, ClientIdentity, DesiredState, ExperimentAgent,
    ExperimentRecord, ExperimentRegistry, HostError, HostPackageManager, HostResult,
    InstalledAddon, LoadReason, OutboundMessage, Reconciler, RegistryError, RegistryResult,
    SqliteInstallStore, SyncMethod, SyncOutcome, UiSurface,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

pub const ALLOWED_PAGE: &str = "http://localhost:8000/experiments";

pub fn experiment(addon_id: &str) -> ExperimentRecord {
    ExperimentRecord::new(
        addon_id,
        format!("http://localhost:8000/api/experiments/{addon_id}/installations/"),
    )
}

pub fn addon(addon_id: &str) -> InstalledAddon {
    InstalledAddon::new(addon_id, format!("{addon_id} name"), "1.0.0")
}

pub fn memory_store() -> SqliteInstallStore {
    SqliteInstallStore::new(open_db_in_memory().unwrap())
}

/// Host call observed by `FakeHost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    List,
    GetById(String),
    InstallFromUrl { url: String, mime_type: String },
    Uninstall(String),
}

#[derive(Default)]
pub struct FakeHost {
    pub packages: Vec<InstalledAddon>,
    pub calls: RefCell<Vec<HostCall>>,
    pub fail_listing: bool,
    pub failing_uninstalls: Vec<String>,
}

impl FakeHost {
    pub fn with_packages(ids: &[&str]) -> Self {
        Self {
            packages: ids.iter().map(|id| addon(id)).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Calls other than the listing done by a refresh.
    pub fn mutating_calls(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, HostCall::List | HostCall::GetById(_)))
            .collect()
    }
}

impl HostPackageManager for FakeHost {
    fn list_installed_packages(&self) -> HostResult<Vec<InstalledAddon>> {
        self.calls.borrow_mut().push(HostCall::List);
        if self.fail_listing {
            return Err(HostError::Unavailable("listing disabled".to_string()));
        }
        Ok(self.packages.clone())
    }

    fn get_by_id(&self, addon_id: &str) -> HostResult<Option<InstalledAddon>> {
        self.calls
            .borrow_mut()
            .push(HostCall::GetById(addon_id.to_string()));
        Ok(self
            .packages
            .iter()
            .find(|addon| addon.addon_id == addon_id)
            .cloned())
    }

    fn install_from_url(&mut self, url: &str, mime_type: &str) -> HostResult<()> {
        self.calls.borrow_mut().push(HostCall::InstallFromUrl {
            url: url.to_string(),
            mime_type: mime_type.to_string(),
        });
        Ok(())
    }

    fn uninstall(&mut self, addon: &InstalledAddon) -> HostResult<()> {
        self.calls
            .borrow_mut()
            .push(HostCall::Uninstall(addon.addon_id.clone()));
        if self.failing_uninstalls.contains(&addon.addon_id) {
            return Err(HostError::Rejected(format!("cannot remove {}", addon.addon_id)));
        }
        Ok(())
    }
}

/// Registry double recording every per-item sync.
pub struct FakeRegistry {
    pub catalog: RegistryResult<Vec<ExperimentRecord>>,
    pub statuses: BTreeMap<(String, SyncMethod), u16>,
    pub syncs: RefCell<Vec<(SyncOutcome, ClientIdentity)>>,
}

impl FakeRegistry {
    pub fn with_catalog(ids: &[&str]) -> Self {
        Self {
            catalog: Ok(ids.iter().map(|id| experiment(id)).collect()),
            statuses: BTreeMap::new(),
            syncs: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(error: RegistryError) -> Self {
        Self {
            catalog: Err(error),
            statuses: BTreeMap::new(),
            syncs: RefCell::new(Vec::new()),
        }
    }

    pub fn synced(&self) -> Vec<(String, SyncMethod)> {
        self.syncs
            .borrow()
            .iter()
            .map(|(outcome, _)| (outcome.addon_id.clone(), outcome.method))
            .collect()
    }
}

impl ExperimentRegistry for FakeRegistry {
    fn fetch_catalog(&self) -> RegistryResult<Vec<ExperimentRecord>> {
        self.catalog.clone()
    }

    fn sync_installation(
        &self,
        experiment: &ExperimentRecord,
        client: ClientIdentity,
        desired: DesiredState,
    ) -> SyncOutcome {
        let method = desired.method();
        let default_status = match method {
            SyncMethod::Put => 200,
            SyncMethod::Delete => 410,
        };
        let status = self
            .statuses
            .get(&(experiment.addon_id.clone(), method))
            .copied()
            .unwrap_or(default_status);
        let outcome = SyncOutcome {
            addon_id: experiment.addon_id.clone(),
            method,
            http_status: Some(status),
        };
        self.syncs.borrow_mut().push((outcome.clone(), client));
        outcome
    }
}

/// UI surface that keeps every delivered message.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub messages: Rc<RefCell<Vec<OutboundMessage>>>,
}

impl RecordingSurface {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.messages
            .borrow()
            .iter()
            .map(OutboundMessage::event_name)
            .collect()
    }
}

impl UiSurface for RecordingSurface {
    fn post(&mut self, message: &OutboundMessage) -> Result<(), BridgeError> {
        self.messages.borrow_mut().push(message.clone());
        Ok(())
    }
}

/// HTTP transport double with scripted responses.
#[derive(Default)]
pub struct ScriptedTransport {
    pub requests: RefCell<Vec<HttpRequest>>,
    pub responses: RefCell<VecDeque<Result<HttpResponse, String>>>,
}

impl ScriptedTransport {
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Err(message.to_string()));
        self
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response".to_string()))
    }
}

pub type TestAgent = ExperimentAgent<SqliteInstallStore, FakeHost, FakeRegistry>;

/// Agent over an in-memory store, attached to a recording surface.
pub fn attached_agent(
    catalog: &[&str],
    host_packages: &[&str],
    load_reason: LoadReason,
) -> (TestAgent, RecordingSurface) {
    let reconciler = Reconciler::new(
        memory_store(),
        FakeHost::with_packages(host_packages),
        FakeRegistry::with_catalog(catalog),
    );
    let origins = AllowedOrigins::parse_list("http://localhost:8000/*").unwrap();
    let mut agent = ExperimentAgent::start(reconciler, origins, load_reason).unwrap();
    let surface = RecordingSurface::default();
    agent
        .attach(ALLOWED_PAGE, Box::new(surface.clone()))
        .unwrap();
    (agent, surface)
}
