//! Composition root tying reconciler, lifecycle listener and bridge together.
//!
//! # Responsibility
//! - Gate UI attachment on the origin allow-list and a successful refresh.
//! - Route decoded UI commands and host events to their handlers.
//! - Run best-effort cleanup when the agent itself is uninstalled.
//!
//! # Invariants
//! - A surface becomes the bridge target only after a successful refresh;
//!   a failed refresh never notifies anything.
//! - UI commands naming ids outside the catalog never reach the host.

use crate::bridge::protocol::{LoadReason, SelfEvent, SyncInstalledResult, UnloadReason};
use crate::bridge::{AllowedOrigins, InboundCommand, MessageBridge, OutboundMessage, UiSurface};
use crate::host::{HostEvent, HostPackageManager};
use crate::model::addon::InstalledAddon;
use crate::registry::ExperimentRegistry;
use crate::repo::install_store::InstallStore;
use crate::service::listener::{handle_host_event, ListenerEffect};
use crate::service::reconciler::{HostAction, Reconciler, SyncReport};
use crate::service::{AgentError, AgentResult};
use log::{info, warn};

/// What a UI command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    Install(HostAction),
    Uninstall(HostAction),
    UninstallAll { requested: usize },
    SyncInstalled(SyncReport),
}

/// Long-lived agent state for one host session.
pub struct ExperimentAgent<S, H, R> {
    reconciler: Reconciler<S, H, R>,
    bridge: MessageBridge,
    origins: AllowedOrigins,
    load_reason: LoadReason,
}

impl<S, H, R> ExperimentAgent<S, H, R>
where
    S: InstallStore,
    H: HostPackageManager,
    R: ExperimentRegistry,
{
    /// Creates the agent and makes sure a client identity exists.
    pub fn start(
        mut reconciler: Reconciler<S, H, R>,
        origins: AllowedOrigins,
        load_reason: LoadReason,
    ) -> AgentResult<Self> {
        reconciler.client_identity()?;
        info!("event=agent_start module=agent status=ok load_reason={load_reason:?}");
        Ok(Self {
            reconciler,
            bridge: MessageBridge::new(),
            origins,
            load_reason,
        })
    }

    pub fn reconciler(&self) -> &Reconciler<S, H, R> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<S, H, R> {
        &mut self.reconciler
    }

    pub fn bridge(&self) -> &MessageBridge {
        &self.bridge
    }

    /// Attaches a UI page: checks its origin, runs a full refresh, then makes
    /// it the notification target and announces the load reason.
    pub fn attach(
        &mut self,
        page_url: &str,
        surface: Box<dyn UiSurface>,
    ) -> AgentResult<Vec<InstalledAddon>> {
        if !self.origins.allows(page_url) {
            warn!("event=surface_attach module=agent status=error reason=origin_not_allowed");
            return Err(AgentError::OriginNotAllowed(page_url.to_string()));
        }

        let installed = self.reconciler.refresh()?;
        self.bridge.attach(surface);
        if let Some(event) = self.load_reason.announcement() {
            self.bridge.notify(OutboundMessage::SelfLifecycle(event));
        }
        Ok(installed)
    }

    /// Decodes and dispatches one raw bridge message.
    pub fn handle_message(&mut self, raw: &str) -> AgentResult<CommandEffect> {
        let command = MessageBridge::decode(raw).map_err(|err| {
            warn!("event=bridge_message module=agent status=error error={err}");
            AgentError::from(err)
        })?;
        self.handle_command(command)
    }

    pub fn handle_command(&mut self, command: InboundCommand) -> AgentResult<CommandEffect> {
        info!(
            "event=bridge_command module=agent status=start type={}",
            command.name()
        );
        match command {
            InboundCommand::InstallExperiment(request) => Ok(CommandEffect::Install(
                self.reconciler
                    .install_experiment(&request.addon_id, &request.xpi_url)?,
            )),
            InboundCommand::UninstallExperiment(request) => Ok(CommandEffect::Uninstall(
                self.reconciler.uninstall_experiment(&request.addon_id)?,
            )),
            InboundCommand::UninstallAll => Ok(CommandEffect::UninstallAll {
                requested: self.reconciler.uninstall_all()?,
            }),
            InboundCommand::SyncInstalled(server_installed) => {
                let report = self.reconciler.sync_installed(&server_installed)?;
                self.bridge
                    .notify(OutboundMessage::SyncInstalledResult(SyncInstalledResult {
                        client_uuid: report.client,
                        installed: report
                            .installed
                            .iter()
                            .map(|addon| (addon.addon_id.clone(), addon.clone()))
                            .collect(),
                    }));
                Ok(CommandEffect::SyncInstalled(report))
            }
        }
    }

    pub fn handle_host_event(&mut self, event: HostEvent) -> AgentResult<ListenerEffect> {
        handle_host_event(&mut self.reconciler, &mut self.bridge, event)
    }

    /// Unload hook. Only `UnloadReason::Uninstall` touches persisted state:
    /// every tracked experiment is uninstalled and reported absent to the
    /// registry (best effort, no rollback), then the store is purged.
    pub fn shutdown(&mut self, reason: UnloadReason) -> AgentResult<()> {
        info!("event=agent_shutdown module=agent status=start reason={reason:?}");
        if reason != UnloadReason::Uninstall {
            return Ok(());
        }

        self.bridge
            .notify(OutboundMessage::SelfLifecycle(SelfEvent::Uninstalled));
        if let Err(err) = self.reconciler.uninstall_all() {
            warn!("event=agent_shutdown module=agent status=error stage=uninstall_all error={err}");
        }
        if let Err(err) = self.reconciler.retire_installed() {
            warn!("event=agent_shutdown module=agent status=error stage=retire error={err}");
        }
        self.reconciler.store_mut().purge()?;
        self.bridge.detach();
        info!("event=agent_shutdown module=agent status=ok reason={reason:?}");
        Ok(())
    }
}
