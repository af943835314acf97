mod common;

use common::{
    attached_agent, memory_store, FakeHost, FakeRegistry, HostCall, RecordingSurface,
    ALLOWED_PAGE,
};
use ideatown_core::{
    AgentError, AllowedOrigins, BridgeError, CommandEffect, ExperimentAgent, HostAction,
    HostEvent, InstallStore, LoadReason, Reconciler, RegistryError, SyncMethod, UnloadReason,
};

#[test]
fn attach_refreshes_then_announces_load_reason() {
    let (agent, surface) = attached_agent(&["a@x"], &["a@x", "personal@x"], LoadReason::Install);

    assert!(agent.bridge().is_attached());
    assert_eq!(surface.event_names(), vec!["addon-self:installed"]);
    assert_eq!(
        agent.reconciler().store().installed_ids().unwrap(),
        vec!["a@x"]
    );
    let wire = surface.messages.borrow()[0].to_wire().unwrap();
    assert_eq!(wire, r#"{"type":"addon-self:installed"}"#);
}

#[test]
fn attach_from_foreign_origin_is_rejected_before_refresh() {
    let reconciler = Reconciler::new(
        memory_store(),
        FakeHost::with_packages(&["a@x"]),
        FakeRegistry::with_catalog(&["a@x"]),
    );
    let origins = AllowedOrigins::parse_list("http://localhost:8000/*").unwrap();
    let mut agent = ExperimentAgent::start(reconciler, origins, LoadReason::Enable).unwrap();
    let surface = RecordingSurface::default();

    let err = agent
        .attach(
            "https://evil.example.com/?next=http://localhost:8000/",
            Box::new(surface.clone()),
        )
        .unwrap_err();

    assert!(matches!(err, AgentError::OriginNotAllowed(_)));
    assert!(!agent.bridge().is_attached());
    assert!(agent.reconciler().host().calls().is_empty());
    assert!(surface.messages.borrow().is_empty());
}

#[test]
fn failed_refresh_attaches_nothing() {
    let reconciler = Reconciler::new(
        memory_store(),
        FakeHost::with_packages(&[]),
        FakeRegistry::failing(RegistryError::Network("offline".to_string())),
    );
    let origins = AllowedOrigins::parse_list("http://localhost:8000/*").unwrap();
    let mut agent = ExperimentAgent::start(reconciler, origins, LoadReason::Upgrade).unwrap();
    let surface = RecordingSurface::default();

    let err = agent
        .attach(ALLOWED_PAGE, Box::new(surface.clone()))
        .unwrap_err();

    assert!(matches!(err, AgentError::Registry(RegistryError::Network(_))));
    assert!(!agent.bridge().is_attached());
    assert!(surface.messages.borrow().is_empty());
}

#[test]
fn latest_surface_receives_notifications() {
    let (mut agent, first) = attached_agent(&["a@x"], &[], LoadReason::Enable);
    let second = RecordingSurface::default();

    agent
        .attach(ALLOWED_PAGE, Box::new(second.clone()))
        .unwrap();

    assert_eq!(first.event_names(), vec!["addon-self:enabled"]);
    assert_eq!(second.event_names(), vec!["addon-self:enabled"]);

    agent.handle_message(r#"{"type":"sync-installed","data":[]}"#).unwrap();
    assert_eq!(first.messages.borrow().len(), 1);
    assert_eq!(second.messages.borrow().len(), 2);
}

#[test]
fn install_command_for_known_experiment_reaches_host() {
    let (mut agent, _surface) = attached_agent(&["a@x"], &[], LoadReason::Startup);

    let effect = agent
        .handle_message(
            r#"{"type":"install-experiment","data":{"addon_id":"a@x","xpi_url":"https://cdn.example.com/a.xpi","title":"Alpha"}}"#,
        )
        .unwrap();

    assert_eq!(effect, CommandEffect::Install(HostAction::Requested));
    assert_eq!(
        agent.reconciler().host().mutating_calls(),
        vec![HostCall::InstallFromUrl {
            url: "https://cdn.example.com/a.xpi".to_string(),
            mime_type: "application/x-xpinstall".to_string(),
        }]
    );
}

#[test]
fn install_command_for_unknown_addon_makes_no_host_call() {
    let (mut agent, _surface) = attached_agent(&["a@x"], &[], LoadReason::Startup);

    let effect = agent
        .handle_message(
            r#"{"type":"install-experiment","data":{"addon_id":"evil@x","xpi_url":"https://evil.example.com/e.xpi"}}"#,
        )
        .unwrap();

    assert_eq!(effect, CommandEffect::Install(HostAction::UnknownAddon));
    assert!(agent.reconciler().host().mutating_calls().is_empty());
}

#[test]
fn uninstall_all_uninstalls_each_tracked_experiment() {
    let (mut agent, _surface) =
        attached_agent(&["a@x", "b@x"], &["a@x", "b@x", "personal@x"], LoadReason::Startup);

    let effect = agent.handle_message(r#"{"type":"uninstall-all"}"#).unwrap();

    assert_eq!(effect, CommandEffect::UninstallAll { requested: 2 });
    assert_eq!(
        agent.reconciler().host().mutating_calls(),
        vec![
            HostCall::Uninstall("a@x".to_string()),
            HostCall::Uninstall("b@x".to_string()),
        ]
    );
}

#[test]
fn uninstall_command_for_unknown_addon_is_ignored() {
    let (mut agent, _surface) = attached_agent(&["a@x"], &["personal@x"], LoadReason::Startup);

    let effect = agent
        .handle_message(r#"{"type":"uninstall-experiment","data":{"addon_id":"personal@x"}}"#)
        .unwrap();

    assert_eq!(effect, CommandEffect::Uninstall(HostAction::UnknownAddon));
    assert!(agent.reconciler().host().mutating_calls().is_empty());
}

#[test]
fn sync_installed_replies_with_identity_and_installed_map() {
    let (mut agent, surface) = attached_agent(&["a@x", "b@x"], &["a@x"], LoadReason::Startup);
    let identity = agent.reconciler_mut().client_identity().unwrap();
    let message = format!(
        r#"{{"type":"sync-installed","data":[{{"client_id":"{identity}","addon_id":"b@x"}}]}}"#
    );

    let effect = agent.handle_message(&message).unwrap();

    let CommandEffect::SyncInstalled(report) = effect else {
        panic!("expected sync report");
    };
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(
        agent.reconciler().registry().synced(),
        vec![
            ("a@x".to_string(), SyncMethod::Put),
            ("b@x".to_string(), SyncMethod::Delete),
        ]
    );

    let wire = surface.messages.borrow().last().unwrap().to_wire().unwrap();
    let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
    assert_eq!(value["type"], "sync-installed-result");
    assert_eq!(value["data"]["clientUUID"], identity.to_string());
    assert_eq!(value["data"]["installed"]["a@x"]["id"], "a@x");
    assert!(value["data"]["installed"].get("b@x").is_none());
}

#[test]
fn malformed_message_is_rejected() {
    let (mut agent, surface) = attached_agent(&["a@x"], &[], LoadReason::Startup);

    let err = agent.handle_message(r#"{"type":"format-disk"}"#).unwrap_err();

    assert!(matches!(
        err,
        AgentError::Bridge(BridgeError::MalformedMessage(_))
    ));
    assert!(surface.messages.borrow().is_empty());
}

#[test]
fn shutdown_for_uninstall_cleans_up_and_purges() {
    let (mut agent, surface) = attached_agent(&["a@x", "b@x"], &["a@x", "b@x"], LoadReason::Startup);

    agent.shutdown(UnloadReason::Uninstall).unwrap();

    assert_eq!(surface.event_names(), vec!["addon-self:uninstalled"]);
    assert_eq!(agent.reconciler().host().mutating_calls().len(), 2);
    assert_eq!(
        agent.reconciler().registry().synced(),
        vec![
            ("a@x".to_string(), SyncMethod::Delete),
            ("b@x".to_string(), SyncMethod::Delete),
        ]
    );
    let store = agent.reconciler().store();
    assert_eq!(store.client_identity().unwrap(), None);
    assert!(store.catalog().unwrap().is_empty());
    assert!(!agent.bridge().is_attached());
}

#[test]
fn shutdown_for_other_reasons_keeps_state() {
    let (mut agent, surface) = attached_agent(&["a@x"], &["a@x"], LoadReason::Startup);

    agent.shutdown(UnloadReason::Disable).unwrap();

    assert!(surface.messages.borrow().is_empty());
    assert!(agent.reconciler().host().mutating_calls().is_empty());
    assert_eq!(
        agent.reconciler().store().installed_ids().unwrap(),
        vec!["a@x"]
    );
}

#[test]
fn late_uninstall_events_after_teardown_send_nothing_more() {
    let (mut agent, _surface) =
        attached_agent(&["a@x", "b@x"], &["a@x", "b@x"], LoadReason::Startup);

    agent.shutdown(UnloadReason::Uninstall).unwrap();
    for addon_id in ["a@x", "b@x"] {
        agent
            .handle_host_event(HostEvent::Uninstalled(common::addon(addon_id)))
            .unwrap();
    }

    assert_eq!(agent.reconciler().registry().synced().len(), 2);
}
