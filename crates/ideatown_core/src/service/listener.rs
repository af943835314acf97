//! Host lifecycle event handling.
//!
//! # Responsibility
//! - Translate host install/uninstall events into bridge notifications.
//! - Keep installed-set membership current and trigger per-item syncs.
//!
//! # Invariants
//! - Membership updates are upsert/remove, so replayed or reordered host
//!   events can only cause redundant sync calls.
//! - Uninstall events and `InstallEnded` act only on catalog experiments.

use crate::bridge::protocol::{InstallProgress, UninstallNotice};
use crate::bridge::{MessageBridge, OutboundMessage};
use crate::host::{HostEvent, HostPackageManager};
use crate::model::sync::SyncOutcome;
use crate::registry::ExperimentRegistry;
use crate::repo::install_store::{InstallStore, MembershipChange};
use crate::service::reconciler::Reconciler;
use crate::service::AgentResult;
use log::debug;

/// Observable effect of handling one host event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerEffect {
    pub notified: Option<&'static str>,
    pub membership: Option<MembershipChange>,
    pub sync: Option<SyncOutcome>,
}

/// Applies one host lifecycle event.
pub fn handle_host_event<S, H, R>(
    reconciler: &mut Reconciler<S, H, R>,
    bridge: &mut MessageBridge,
    event: HostEvent,
) -> AgentResult<ListenerEffect>
where
    S: InstallStore,
    H: HostPackageManager,
    R: ExperimentRegistry,
{
    if let Some(addon_id) = event.addon_id() {
        if !reconciler.is_known_experiment(addon_id)? {
            debug!(
                "event=host_event module=listener status=skip reason=unknown_addon addon_id={addon_id}"
            );
            return Ok(ListenerEffect::default());
        }
    }

    let mut effect = ListenerEffect::default();
    match event {
        HostEvent::Uninstalling(addon) => {
            notify(
                bridge,
                &mut effect,
                OutboundMessage::UninstallStarted(UninstallNotice::from(&addon)),
            );
        }
        HostEvent::Uninstalled(addon) => {
            notify(
                bridge,
                &mut effect,
                OutboundMessage::UninstallEnded(UninstallNotice::from(&addon)),
            );
            let change = reconciler.store_mut().remove_installed(&addon.addon_id)?;
            if change == MembershipChange::Removed {
                effect.sync = reconciler.sync_addon(&addon.addon_id)?;
            }
            effect.membership = Some(change);
        }
        HostEvent::Install { phase, install } => {
            notify(
                bridge,
                &mut effect,
                OutboundMessage::Install {
                    phase,
                    progress: InstallProgress::new(&install, None),
                },
            );
        }
        HostEvent::InstallEnded { install, addon } => {
            effect.membership = Some(reconciler.store_mut().upsert_installed(&addon)?);
            effect.sync = reconciler.sync_addon(&addon.addon_id)?;
            notify(
                bridge,
                &mut effect,
                OutboundMessage::InstallEnded(InstallProgress::new(&install, Some(&addon))),
            );
        }
    }

    Ok(effect)
}

fn notify(bridge: &mut MessageBridge, effect: &mut ListenerEffect, message: OutboundMessage) {
    effect.notified = Some(message.event_name());
    bridge.notify(message);
}
