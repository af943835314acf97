//! Operator probe for the experiment agent.
//!
//! # Responsibility
//! - Resolve configuration and open the install store the agent would use.
//! - Print identity, catalog and installed-set summaries.
//! - `catalog` subcommand: fetch the live registry catalog without writing.

use ideatown_core::db::open_db;
use ideatown_core::registry::{BlockingHttpTransport, CookieCredentials, InMemoryCookieJar};
use ideatown_core::{
    core_version, init_logging, AgentConfig, ExperimentRegistry, InstallStore, RegistryClient,
    SqliteInstallStore,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = AgentConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_ref().and_then(|dir| dir.to_str()) {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let result = match std::env::args().nth(1).as_deref() {
        None | Some("status") => print_status(&config),
        Some("catalog") => print_catalog(&config),
        Some(other) => Err(format!("unknown command `{other}`; expected status|catalog")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("event=cli_command module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_status(config: &AgentConfig) -> Result<(), String> {
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let store = SqliteInstallStore::new(conn);

    let identity = store.client_identity().map_err(|err| err.to_string())?;
    let catalog = store.catalog().map_err(|err| err.to_string())?;
    let installed = store.installed_ids().map_err(|err| err.to_string())?;

    println!("ideatown_core version={}", core_version());
    println!("registry base_url={}", config.base_url);
    println!("store path={}", config.db_path.display());
    match identity {
        Some(identity) => println!("client identity={identity}"),
        None => println!("client identity=<unset>"),
    }
    println!("catalog experiments={}", catalog.len());
    println!("installed experiments={}", installed.len());
    for addon_id in installed {
        println!("  {addon_id}");
    }
    Ok(())
}

fn print_catalog(config: &AgentConfig) -> Result<(), String> {
    let transport = BlockingHttpTransport::new()?;
    let client = RegistryClient::new(
        &config.base_url,
        transport,
        CookieCredentials::new(InMemoryCookieJar::new()),
    )
    .map_err(|err| err.to_string())?;

    let catalog = client.fetch_catalog().map_err(|err| err.to_string())?;
    println!("catalog url={} experiments={}", client.catalog_url(), catalog.len());
    for record in catalog {
        println!("  {} {}", record.addon_id, record.installations_url);
    }
    Ok(())
}
