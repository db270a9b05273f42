//! Connection manager scenarios under virtual time.

use std::time::Duration;

use relaychat_core::{
    BackoffConfig, ConnectionManager, ConnectionStatus, Direction, EndpointConfig, Environment,
    ManagerAction, MemoryStorage, Message, MessageKind, SessionEvent, SessionId, Storage,
    store::{DISPLAY_NAME_KEY, MESSAGES_KEY},
};
use relaychat_harness::{InvariantRegistry, ManagerSnapshot, SimEnv};

type Manager = ConnectionManager<SimEnv, MemoryStorage>;

fn manager_with(env: &SimEnv, storage: &MemoryStorage, url: &str) -> Manager {
    let endpoint = EndpointConfig::new(url, "Alice").unwrap();
    ConnectionManager::new(env.clone(), storage.clone(), endpoint, BackoffConfig::default())
}

fn open_session(manager: &mut Manager) -> SessionId {
    let actions = manager.connect();
    let Some(ManagerAction::OpenSession { session, .. }) = actions.last() else {
        panic!("expected OpenSession, got {actions:?}");
    };
    *session
}

fn connected(env: &SimEnv, storage: &MemoryStorage) -> (Manager, SessionId) {
    let mut manager = manager_with(env, storage, "ws://localhost:8080");
    let session = open_session(&mut manager);
    manager.handle_session_event(SessionEvent::opened(session));
    (manager, session)
}

/// Fail the current session and fire the reconnect, returning the delay
/// that was waited.
fn fail_and_retry(manager: &mut Manager, env: &SimEnv, session: SessionId) -> (Duration, SessionId) {
    manager.handle_session_event(SessionEvent::closed(session, "gone"));
    let delay = manager.reconnect_delay().unwrap();

    env.advance(delay);
    let actions = manager.tick();
    let Some(ManagerAction::OpenSession { session, .. }) = actions.last() else {
        panic!("expected reconnect, got {actions:?}");
    };
    (delay, *session)
}

fn check(manager: &Manager, context: &str) {
    InvariantRegistry::standard().assert_all(&ManagerSnapshot::capture(manager), context);
}

#[test]
fn send_while_connected_echoes_and_transmits_once() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());
    let before = manager.messages().len();

    let actions = manager.send("hi");

    let [ManagerAction::Transmit { session: target, payload }] = actions.as_slice() else {
        panic!("expected a single transmit, got {actions:?}");
    };
    assert_eq!(*target, session);
    assert_eq!(
        payload,
        &format!(r#"{{"type":"chat","user":"Alice","text":"hi","ts":{}}}"#, env.wall_clock_millis())
    );

    assert_eq!(manager.messages().len(), before + 1);
    let echoed = manager.messages().last().unwrap();
    assert_eq!(echoed.kind, MessageKind::Chat);
    assert_eq!(echoed.author.as_deref(), Some("Alice"));
    assert_eq!(echoed.text, "hi");
    assert_eq!(echoed.direction, Direction::Outbound);
}

#[test]
fn send_while_disconnected_changes_nothing() {
    let env = SimEnv::new();
    let mut manager = manager_with(&env, &MemoryStorage::new(), "ws://localhost:8080");

    assert!(manager.send("hi").is_empty());
    assert!(manager.messages().is_empty());
}

#[test]
fn structured_chat_is_logged_unchanged() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());

    manager.handle_session_event(SessionEvent::message(
        session,
        r#"{"type":"chat","user":"Bob","text":"yo","ts":5}"#,
    ));

    assert_eq!(manager.messages().last(), Some(&Message::inbound("Bob", "yo", 5)));
}

#[test]
fn plain_text_is_logged_as_server_message() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());

    manager.handle_session_event(SessionEvent::message(session, "plain text"));

    let logged = manager.messages().last().unwrap();
    assert_eq!(logged.kind, MessageKind::Chat);
    assert_eq!(logged.author.as_deref(), Some("Server"));
    assert_eq!(logged.text, "plain text");
    assert_eq!(logged.direction, Direction::Inbound);
}

#[test]
fn consecutive_closes_back_off() {
    let env = SimEnv::new();
    let (mut manager, mut session) = connected(&env, &MemoryStorage::new());

    let mut delays = Vec::new();
    for _ in 0..3 {
        let (delay, next) = fail_and_retry(&mut manager, &env, session);
        check(&manager, "after retry");
        delays.push(delay.as_millis());
        session = next;
    }

    assert_eq!(delays, vec![1_000, 1_600, 2_560]);
    assert!(delays.iter().all(|d| *d <= 15_000));
}

#[test]
fn delays_cap_at_ceiling() {
    let env = SimEnv::new();
    let (mut manager, mut session) = connected(&env, &MemoryStorage::new());

    let mut last = Duration::ZERO;
    for _ in 0..12 {
        let (delay, next) = fail_and_retry(&mut manager, &env, session);
        assert!(delay >= last);
        assert!(delay <= Duration::from_millis(15_000));
        last = delay;
        session = next;
    }

    assert_eq!(last, Duration::from_millis(15_000));
}

#[test]
fn success_resets_backoff() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());

    let (_, session) = fail_and_retry(&mut manager, &env, session);
    let (_, session) = fail_and_retry(&mut manager, &env, session);
    manager.handle_session_event(SessionEvent::opened(session));

    assert_eq!(manager.status(), ConnectionStatus::Connected);
    assert_eq!(manager.backoff().current(), Duration::from_millis(1_000));

    manager.handle_session_event(SessionEvent::errored(session, "reset"));
    assert_eq!(manager.reconnect_delay(), Some(Duration::from_millis(1_000)));
}

#[test]
fn change_endpoint_cancels_pending_reconnect() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());
    manager.handle_session_event(SessionEvent::closed(session, "gone"));
    assert!(manager.reconnect_deadline().is_some());

    let actions = manager.change_endpoint("wss://new");

    assert!(manager.reconnect_deadline().is_none());
    assert!(matches!(
        actions.as_slice(),
        [ManagerAction::OpenSession { url, .. }] if url == "wss://new"
    ));
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
    assert_eq!(manager.endpoint().url, "wss://new");
    check(&manager, "after endpoint change");

    env.advance(Duration::from_secs(60));
    assert!(manager.tick().is_empty());
}

#[test]
fn late_failure_from_dead_session_is_ignored() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());

    manager.handle_session_event(SessionEvent::errored(session, "boom"));
    let deadline = manager.reconnect_deadline();
    let delay = manager.backoff().current();

    let actions = manager.handle_session_event(SessionEvent::closed(session, "boom again"));

    assert!(actions.is_empty());
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    assert_eq!(manager.reconnect_deadline(), deadline);
    assert_eq!(manager.backoff().current(), delay);
}

#[test]
fn superseded_session_events_are_ignored() {
    let env = SimEnv::new();
    let (mut manager, old) = connected(&env, &MemoryStorage::new());
    let new = open_session(&mut manager);
    let log_len = manager.messages().len();

    for event in [
        SessionEvent::opened(old),
        SessionEvent::message(old, "late"),
        SessionEvent::closed(old, "late"),
        SessionEvent::errored(old, "late"),
    ] {
        assert!(manager.handle_session_event(event).is_empty());
    }

    assert_eq!(manager.status(), ConnectionStatus::Connecting);
    assert_eq!(manager.current_session(), Some(new));
    assert_eq!(manager.messages().len(), log_len);
    assert!(manager.reconnect_deadline().is_none());
}

#[test]
fn shutdown_cancels_timer_and_goes_quiet() {
    let env = SimEnv::new();
    let (mut manager, session) = connected(&env, &MemoryStorage::new());
    manager.handle_session_event(SessionEvent::closed(session, "gone"));

    assert!(manager.shutdown().is_empty());
    check(&manager, "after shutdown");

    env.advance(Duration::from_secs(60));
    assert!(manager.tick().is_empty());
    assert!(manager.handle_session_event(SessionEvent::opened(session)).is_empty());
    assert!(manager.set_display_name("Bob").is_empty());
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
}

#[test]
fn log_survives_restart() {
    let env = SimEnv::new();
    let storage = MemoryStorage::new();

    let (mut manager, session) = connected(&env, &storage);
    manager.send("hello");
    manager.handle_session_event(SessionEvent::message(session, "welcome"));
    let before = manager.messages().to_vec();
    drop(manager);

    let restarted = manager_with(&env, &storage, "ws://localhost:8080");
    assert_eq!(restarted.messages(), before.as_slice());
    assert!(storage.get(MESSAGES_KEY).unwrap().is_some());
}

#[test]
fn clear_empties_memory_and_storage() {
    let env = SimEnv::new();
    let storage = MemoryStorage::new();
    let (mut manager, _) = connected(&env, &storage);

    manager.clear();

    assert!(manager.messages().is_empty());
    assert_eq!(storage.get(MESSAGES_KEY).unwrap(), None);
    assert!(manager_with(&env, &storage, "ws://localhost:8080").messages().is_empty());
}

#[test]
fn display_name_is_resolved_once_and_remembered() {
    let env = SimEnv::with_seed(7);
    let storage = MemoryStorage::new();

    let first = EndpointConfig::resolve("ws://relay", None, &storage, &env).unwrap();
    assert!(first.display_name.starts_with("guest-"));
    assert_eq!(first.display_name.len(), "guest-".len() + 4);

    let second = EndpointConfig::resolve("ws://relay", None, &storage, &env).unwrap();
    assert_eq!(second.display_name, first.display_name);

    let explicit = EndpointConfig::resolve("ws://relay", Some("Carol".into()), &storage, &env).unwrap();
    assert_eq!(explicit.display_name, "Carol");
    assert_eq!(storage.get(DISPLAY_NAME_KEY).unwrap(), Some("Carol".to_string()));
}

#[test]
fn blank_url_is_rejected() {
    let env = SimEnv::new();
    assert!(EndpointConfig::resolve("   ", None, &MemoryStorage::new(), &env).is_err());
}
