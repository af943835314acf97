//! Reconciliation between host packages, the install store and the registry.
//!
//! # Responsibility
//! - Rebuild catalog and installed set from the registry and the host.
//! - Push per-item installed state to the registry.
//! - Run membership-checked install/uninstall actions on the host.
//!
//! # Invariants
//! - A failed refresh leaves catalog and installed set untouched.
//! - Sync method always follows local membership: installed => PUT,
//!   absent => DELETE.
//! - Per-item sync failures are returned as `SyncOutcome`s, never as errors.

use crate::host::{HostPackageManager, XPI_MIME_TYPE};
use crate::model::addon::InstalledAddon;
use crate::model::experiment::AddonId;
use crate::model::identity::ClientIdentity;
use crate::model::sync::{DesiredState, ServerInstallation, SyncOutcome};
use crate::registry::ExperimentRegistry;
use crate::repo::install_store::InstallStore;
use crate::service::AgentResult;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Experiment whose local and server records disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub addon_id: AddonId,
    pub desired: DesiredState,
}

/// Computes the mismatch set for one client.
///
/// An id is included iff exactly one of "installed locally" and "recorded on
/// the server for `client_id`" holds. Ids outside `catalog_ids` are ignored.
/// Output order follows `catalog_ids`.
pub fn mismatch_set<'a>(
    catalog_ids: impl IntoIterator<Item = &'a str>,
    installed_ids: &BTreeSet<&str>,
    server_installed: &[ServerInstallation],
    client_id: &str,
) -> Vec<Mismatch> {
    let server_ids = server_installed
        .iter()
        .filter(|item| item.client_id == client_id)
        .map(|item| item.addon_id.as_str())
        .collect::<BTreeSet<_>>();

    catalog_ids
        .into_iter()
        .filter_map(|addon_id| {
            let client_side = installed_ids.contains(addon_id);
            let server_side = server_ids.contains(addon_id);
            (client_side != server_side).then(|| Mismatch {
                addon_id: addon_id.to_string(),
                desired: DesiredState::from_membership(client_side),
            })
        })
        .collect()
}

/// Result of a `sync-installed` pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub client: ClientIdentity,
    pub installed: Vec<InstalledAddon>,
    pub outcomes: Vec<SyncOutcome>,
}

/// Effect of a membership-checked host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// The host accepted the action.
    Requested,
    /// The id is not in the catalog; nothing was sent to the host.
    UnknownAddon,
    /// The host has no package with this id.
    NotInstalled,
}

/// Owns the install store, host package manager and registry client.
pub struct Reconciler<S, H, R> {
    store: S,
    host: H,
    registry: R,
}

impl<S, H, R> Reconciler<S, H, R>
where
    S: InstallStore,
    H: HostPackageManager,
    R: ExperimentRegistry,
{
    pub fn new(store: S, host: H, registry: R) -> Self {
        Self {
            store,
            host,
            registry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Persisted client identity, created on first use.
    pub fn client_identity(&mut self) -> AgentResult<ClientIdentity> {
        Ok(self.store.ensure_client_identity()?)
    }

    pub fn is_known_experiment(&self, addon_id: &str) -> AgentResult<bool> {
        Ok(self.store.is_known_experiment(addon_id)?)
    }

    /// Full refresh: fetch the catalog, then rebuild the installed set from
    /// host packages whose id is in that catalog.
    ///
    /// Both remote reads complete before either collection is replaced.
    pub fn refresh(&mut self) -> AgentResult<Vec<InstalledAddon>> {
        info!("event=full_pass module=reconciler status=start");
        let catalog = match self.registry.fetch_catalog() {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!("event=full_pass module=reconciler status=error stage=catalog error={err}");
                return Err(err.into());
            }
        };
        let packages = match self.host.list_installed_packages() {
            Ok(packages) => packages,
            Err(err) => {
                warn!("event=full_pass module=reconciler status=error stage=host error={err}");
                return Err(err.into());
            }
        };

        let catalog_ids = catalog
            .iter()
            .map(|record| record.addon_id.as_str())
            .collect::<BTreeSet<_>>();
        let installed = packages
            .into_iter()
            .filter(|addon| catalog_ids.contains(addon.addon_id.as_str()))
            .collect::<Vec<_>>();

        self.store.replace_catalog(&catalog)?;
        self.store.replace_installed(&installed)?;

        info!(
            "event=full_pass module=reconciler status=ok experiments={} installed={}",
            catalog.len(),
            installed.len()
        );
        Ok(installed)
    }

    /// Resolves every catalog entry on which local and server records
    /// disagree, issuing one per-item sync each.
    pub fn sync_installed(
        &mut self,
        server_installed: &[ServerInstallation],
    ) -> AgentResult<SyncReport> {
        let client = self.client_identity()?;
        let catalog = self.store.catalog()?;
        let installed_ids = self.store.installed_ids()?;
        let installed_set = installed_ids
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>();

        let mismatches = mismatch_set(
            catalog.iter().map(|record| record.addon_id.as_str()),
            &installed_set,
            server_installed,
            &client.to_string(),
        );
        info!(
            "event=sync_installed module=reconciler status=start mismatches={}",
            mismatches.len()
        );

        let by_id = catalog
            .iter()
            .map(|record| (record.addon_id.as_str(), record))
            .collect::<BTreeMap<_, _>>();
        let outcomes = mismatches
            .iter()
            .filter_map(|mismatch| {
                by_id.get(mismatch.addon_id.as_str()).map(|record| {
                    self.registry
                        .sync_installation(record, client, mismatch.desired)
                })
            })
            .collect::<Vec<_>>();

        let failed = outcomes.iter().filter(|outcome| outcome.is_error()).count();
        info!(
            "event=sync_installed module=reconciler status=ok synced={} failed={}",
            outcomes.len(),
            failed
        );

        Ok(SyncReport {
            client,
            installed: self.store.installed()?,
            outcomes,
        })
    }

    /// Per-item sync of one experiment's current local membership.
    ///
    /// Returns `None` when the id is not in the catalog.
    pub fn sync_addon(&mut self, addon_id: &str) -> AgentResult<Option<SyncOutcome>> {
        let Some(experiment) = self.store.experiment(addon_id)? else {
            debug!(
                "event=addon_sync module=reconciler status=skip reason=unknown_addon addon_id={addon_id}"
            );
            return Ok(None);
        };
        let client = self.client_identity()?;
        let desired = DesiredState::from_membership(self.store.is_installed(addon_id)?);
        Ok(Some(
            self.registry.sync_installation(&experiment, client, desired),
        ))
    }

    /// Asks the host to install `xpi_url` when `addon_id` is a known experiment.
    pub fn install_experiment(&mut self, addon_id: &str, xpi_url: &str) -> AgentResult<HostAction> {
        if !self.store.is_known_experiment(addon_id)? {
            debug!(
                "event=install_experiment module=reconciler status=skip reason=unknown_addon addon_id={addon_id}"
            );
            return Ok(HostAction::UnknownAddon);
        }
        self.host.install_from_url(xpi_url, XPI_MIME_TYPE)?;
        info!("event=install_experiment module=reconciler status=ok addon_id={addon_id}");
        Ok(HostAction::Requested)
    }

    /// Asks the host to uninstall `addon_id` when it is a known experiment.
    pub fn uninstall_experiment(&mut self, addon_id: &str) -> AgentResult<HostAction> {
        if !self.store.is_known_experiment(addon_id)? {
            debug!(
                "event=uninstall_experiment module=reconciler status=skip reason=unknown_addon addon_id={addon_id}"
            );
            return Ok(HostAction::UnknownAddon);
        }
        let Some(addon) = self.host.get_by_id(addon_id)? else {
            debug!(
                "event=uninstall_experiment module=reconciler status=skip reason=not_installed addon_id={addon_id}"
            );
            return Ok(HostAction::NotInstalled);
        };
        self.host.uninstall(&addon)?;
        info!("event=uninstall_experiment module=reconciler status=ok addon_id={addon_id}");
        Ok(HostAction::Requested)
    }

    /// Uninstalls every tracked experiment, continuing past host failures.
    ///
    /// Returns the number of uninstalls the host accepted.
    pub fn uninstall_all(&mut self) -> AgentResult<usize> {
        let tracked = self.store.installed_ids()?;
        let mut requested = 0usize;
        for addon_id in &tracked {
            match self.uninstall_experiment(addon_id) {
                Ok(HostAction::Requested) => requested += 1,
                Ok(_) => {}
                Err(err) => warn!(
                    "event=uninstall_all module=reconciler status=error addon_id={addon_id} error={err}"
                ),
            }
        }
        info!(
            "event=uninstall_all module=reconciler status=ok tracked={} requested={}",
            tracked.len(),
            requested
        );
        Ok(requested)
    }

    /// Drops every tracked experiment from the installed set and reports
    /// each one as absent to the registry.
    ///
    /// Continues past store and registry failures; returns one outcome per
    /// experiment that reached the registry.
    pub fn retire_installed(&mut self) -> AgentResult<Vec<SyncOutcome>> {
        let tracked = self.store.installed_ids()?;
        let mut outcomes = Vec::with_capacity(tracked.len());
        for addon_id in &tracked {
            if let Err(err) = self.store.remove_installed(addon_id) {
                warn!(
                    "event=retire_installed module=reconciler status=error stage=remove addon_id={addon_id} error={err}"
                );
                continue;
            }
            match self.sync_addon(addon_id) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(err) => warn!(
                    "event=retire_installed module=reconciler status=error stage=sync addon_id={addon_id} error={err}"
                ),
            }
        }
        info!(
            "event=retire_installed module=reconciler status=ok tracked={} synced={}",
            tracked.len(),
            outcomes.len()
        );
        Ok(outcomes)
    }
}
