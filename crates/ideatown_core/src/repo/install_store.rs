//! Install Store contract and SQLite implementation.
//!
//! # Responsibility
//! - Own the client identity, the experiment catalog and the installed set.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Catalog and installed-set replacement run in one transaction: either the
//!   whole collection is swapped or the previous one is retained.
//! - The installed set never holds an id that is absent from the catalog.
//!   Replacing the catalog drops installed rows whose id disappeared.
//! - The client identity is immutable once written.

use crate::db::DbError;
use crate::model::addon::InstalledAddon;
use crate::model::experiment::{AddonId, ExperimentRecord};
use crate::model::identity::ClientIdentity;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error raised by install store operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
    IdentityConflict {
        existing: ClientIdentity,
        requested: ClientIdentity,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted store data: {message}"),
            Self::IdentityConflict {
                existing,
                requested,
            } => write!(
                f,
                "client identity already set to {existing}; refusing to replace with {requested}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::IdentityConflict { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Tagged change to installed-set membership, as applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// Row was inserted.
    Added,
    /// Row existed and its metadata was rewritten.
    Updated,
    /// Row existed and was deleted.
    Removed,
    /// Nothing changed (already absent, or id outside the catalog).
    Unchanged,
}

/// Durable record of identity, catalog and installed experiments.
pub trait InstallStore {
    fn client_identity(&self) -> StoreResult<Option<ClientIdentity>>;
    /// Writes the identity; rewriting the same value is a no-op, a different
    /// value is rejected with `IdentityConflict`.
    fn set_client_identity(&mut self, identity: ClientIdentity) -> StoreResult<()>;
    /// Returns the persisted identity, creating it on first use.
    fn ensure_client_identity(&mut self) -> StoreResult<ClientIdentity>;

    fn catalog(&self) -> StoreResult<Vec<ExperimentRecord>>;
    fn experiment(&self, addon_id: &str) -> StoreResult<Option<ExperimentRecord>>;
    fn is_known_experiment(&self, addon_id: &str) -> StoreResult<bool>;
    fn replace_catalog(&mut self, records: &[ExperimentRecord]) -> StoreResult<()>;

    fn installed(&self) -> StoreResult<Vec<InstalledAddon>>;
    fn installed_ids(&self) -> StoreResult<Vec<AddonId>>;
    fn is_installed(&self, addon_id: &str) -> StoreResult<bool>;
    /// Swaps the installed set; entries outside the catalog are skipped.
    fn replace_installed(&mut self, addons: &[InstalledAddon]) -> StoreResult<()>;
    fn upsert_installed(&mut self, addon: &InstalledAddon) -> StoreResult<MembershipChange>;
    fn remove_installed(&mut self, addon_id: &str) -> StoreResult<MembershipChange>;

    /// Deletes identity, catalog and installed set.
    fn purge(&mut self) -> StoreResult<()>;
}

/// SQLite-backed install store.
pub struct SqliteInstallStore {
    conn: Connection,
}

impl SqliteInstallStore {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn write_tx(&mut self) -> StoreResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

impl InstallStore for SqliteInstallStore {
    fn client_identity(&self) -> StoreResult<Option<ClientIdentity>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT uuid FROM client_identity WHERE slot = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|value| {
            ClientIdentity::parse(&value).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "invalid uuid `{value}` in client_identity.uuid"
                ))
            })
        })
        .transpose()
    }

    fn set_client_identity(&mut self, identity: ClientIdentity) -> StoreResult<()> {
        if let Some(existing) = self.client_identity()? {
            if existing == identity {
                return Ok(());
            }
            return Err(StoreError::IdentityConflict {
                existing,
                requested: identity,
            });
        }

        self.conn.execute(
            "INSERT INTO client_identity (slot, uuid) VALUES (1, ?1);",
            [identity.to_string()],
        )?;
        info!("event=identity_create module=store status=ok");
        Ok(())
    }

    fn ensure_client_identity(&mut self) -> StoreResult<ClientIdentity> {
        if let Some(existing) = self.client_identity()? {
            return Ok(existing);
        }
        let identity = ClientIdentity::generate();
        self.set_client_identity(identity)?;
        Ok(identity)
    }

    fn catalog(&self) -> StoreResult<Vec<ExperimentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT addon_id, installations_url, metadata
             FROM experiments
             ORDER BY addon_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_experiment_row(
                row.get("addon_id")?,
                row.get("installations_url")?,
                row.get("metadata")?,
            )?);
        }
        Ok(records)
    }

    fn experiment(&self, addon_id: &str) -> StoreResult<Option<ExperimentRecord>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT addon_id, installations_url, metadata
                 FROM experiments
                 WHERE addon_id = ?1;",
                [addon_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(id, url, metadata)| parse_experiment_row(id, url, metadata))
            .transpose()
    }

    fn is_known_experiment(&self, addon_id: &str) -> StoreResult<bool> {
        row_exists(&self.conn, "experiments", addon_id)
    }

    fn replace_catalog(&mut self, records: &[ExperimentRecord]) -> StoreResult<()> {
        let tx = self.write_tx()?;
        tx.execute("DELETE FROM experiments;", [])?;
        for record in records {
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|err| StoreError::InvalidData(err.to_string()))?;
            // Later duplicates win, matching an id-indexed catalog.
            tx.execute(
                "INSERT OR REPLACE INTO experiments (addon_id, installations_url, metadata)
                 VALUES (?1, ?2, ?3);",
                params![
                    record.addon_id.as_str(),
                    record.installations_url.as_str(),
                    metadata
                ],
            )?;
        }

        let dropped = tx.execute(
            "DELETE FROM installed_addons
             WHERE addon_id NOT IN (SELECT addon_id FROM experiments);",
            [],
        )?;
        tx.commit()?;

        info!(
            "event=catalog_replace module=store status=ok experiments={} dropped_installed={}",
            records.len(),
            dropped
        );
        Ok(())
    }

    fn installed(&self) -> StoreResult<Vec<InstalledAddon>> {
        let mut stmt = self.conn.prepare(
            "SELECT addon_id, metadata
             FROM installed_addons
             ORDER BY addon_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut addons = Vec::new();
        while let Some(row) = rows.next()? {
            addons.push(parse_installed_row(
                row.get("addon_id")?,
                row.get("metadata")?,
            )?);
        }
        Ok(addons)
    }

    fn installed_ids(&self) -> StoreResult<Vec<AddonId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT addon_id FROM installed_addons ORDER BY addon_id ASC;")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn is_installed(&self, addon_id: &str) -> StoreResult<bool> {
        row_exists(&self.conn, "installed_addons", addon_id)
    }

    fn replace_installed(&mut self, addons: &[InstalledAddon]) -> StoreResult<()> {
        let tx = self.write_tx()?;
        tx.execute("DELETE FROM installed_addons;", [])?;

        let mut kept = 0usize;
        for addon in addons {
            if !row_exists(&tx, "experiments", &addon.addon_id)? {
                debug!(
                    "event=installed_replace module=store status=skip reason=unknown_addon addon_id={}",
                    addon.addon_id
                );
                continue;
            }
            write_installed_row(&tx, addon)?;
            kept += 1;
        }
        tx.commit()?;

        info!("event=installed_replace module=store status=ok installed={kept}");
        Ok(())
    }

    fn upsert_installed(&mut self, addon: &InstalledAddon) -> StoreResult<MembershipChange> {
        let tx = self.write_tx()?;
        if !row_exists(&tx, "experiments", &addon.addon_id)? {
            warn!(
                "event=installed_upsert module=store status=skip reason=unknown_addon addon_id={}",
                addon.addon_id
            );
            return Ok(MembershipChange::Unchanged);
        }

        let existed = row_exists(&tx, "installed_addons", &addon.addon_id)?;
        write_installed_row(&tx, addon)?;
        tx.commit()?;

        Ok(if existed {
            MembershipChange::Updated
        } else {
            MembershipChange::Added
        })
    }

    fn remove_installed(&mut self, addon_id: &str) -> StoreResult<MembershipChange> {
        let changed = self
            .conn
            .execute("DELETE FROM installed_addons WHERE addon_id = ?1;", [addon_id])?;
        Ok(if changed == 0 {
            MembershipChange::Unchanged
        } else {
            MembershipChange::Removed
        })
    }

    fn purge(&mut self) -> StoreResult<()> {
        let tx = self.write_tx()?;
        tx.execute_batch(
            "DELETE FROM installed_addons;
             DELETE FROM experiments;
             DELETE FROM client_identity;",
        )?;
        tx.commit()?;
        info!("event=store_purge module=store status=ok");
        Ok(())
    }
}

fn row_exists(conn: &Connection, table: &'static str, addon_id: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE addon_id = ?1);"),
        [addon_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn write_installed_row(conn: &Connection, addon: &InstalledAddon) -> StoreResult<()> {
    let metadata =
        serde_json::to_string(addon).map_err(|err| StoreError::InvalidData(err.to_string()))?;
    conn.execute(
        "INSERT INTO installed_addons (addon_id, metadata) VALUES (?1, ?2)
         ON CONFLICT(addon_id) DO UPDATE SET metadata = excluded.metadata;",
        params![addon.addon_id.as_str(), metadata],
    )?;
    Ok(())
}

fn parse_experiment_row(
    addon_id: String,
    installations_url: String,
    metadata: String,
) -> StoreResult<ExperimentRecord> {
    let metadata: Map<String, Value> = serde_json::from_str(&metadata).map_err(|err| {
        StoreError::InvalidData(format!(
            "invalid metadata for experiment `{addon_id}`: {err}"
        ))
    })?;
    Ok(ExperimentRecord {
        addon_id,
        installations_url,
        metadata,
    })
}

fn parse_installed_row(addon_id: String, metadata: String) -> StoreResult<InstalledAddon> {
    let addon: InstalledAddon = serde_json::from_str(&metadata).map_err(|err| {
        StoreError::InvalidData(format!(
            "invalid metadata for installed addon `{addon_id}`: {err}"
        ))
    })?;
    if addon.addon_id != addon_id {
        return Err(StoreError::InvalidData(format!(
            "installed addon row `{addon_id}` holds metadata for `{}`",
            addon.addon_id
        )));
    }
    Ok(addon)
}
