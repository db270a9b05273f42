//! End-to-end runtime tests over the scripted transport.
//!
//! The production [`Runtime`] runs against `SimTransport` and `SimFrontend`
//! with tokio time paused, so reconnect delays elapse instantly but in order.

use std::time::Duration;

use relaychat_client::{Command, RedbStorage, Runtime, SystemEnv};
use relaychat_core::{
    BackoffConfig, ConnectionManager, ConnectionStatus, Direction, EndpointConfig, MemoryStorage,
    MessageKind, SessionId, Storage,
};
use relaychat_harness::{FrontendHandle, SimFrontend, SimTransport};
use tempfile::tempdir;

fn manager<S: Storage>(storage: S) -> ConnectionManager<SystemEnv, S> {
    let endpoint = EndpointConfig::new("ws://localhost:8080", "Alice").unwrap();
    ConnectionManager::new(SystemEnv::new(), storage, endpoint, BackoffConfig::default())
}

/// Yield to the runtime until `condition` holds. Does not move the clock.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

async fn wait_for_status(handle: &FrontendHandle, status: ConnectionStatus) {
    wait_until(|| handle.status() == Some(status)).await;
}

fn joins(handle: &FrontendHandle) -> usize {
    handle.last().map_or(0, |view| {
        view.messages.iter().filter(|m| m.kind == MessageKind::System).count()
    })
}

#[tokio::test(start_paused = true)]
async fn connects_and_announces_join() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        let view = handle.last().unwrap();
        assert_eq!(view.url, "ws://localhost:8080");
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].text, "Alice joined");

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();

    assert_eq!(transport.opened(), vec![(SessionId(1), "ws://localhost:8080".to_string())]);
    assert_eq!(transport.closed(), vec![SessionId(1)]);
    assert_eq!(handle.status(), Some(ConnectionStatus::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_backoff_delay() {
    let transport = SimTransport::new();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_until(|| transport.open_count() == 1).await;
        transport.accept(SessionId(1));
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        transport.drop_connection(SessionId(1), "relay restarted");
        wait_for_status(&handle, ConnectionStatus::Disconnected).await;

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(transport.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        wait_until(|| transport.open_count() == 2).await;
        assert_eq!(handle.status(), Some(ConnectionStatus::Connecting));

        transport.accept(SessionId(2));
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        assert_eq!(joins(&handle), 2);

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();

    assert_eq!(handle.status_history(), vec![
        ConnectionStatus::Connecting,
        ConnectionStatus::Connected,
        ConnectionStatus::Disconnected,
        ConnectionStatus::Connecting,
        ConnectionStatus::Connected,
        ConnectionStatus::Disconnected,
    ]);
}

#[tokio::test(start_paused = true)]
async fn synchronous_open_failure_is_retried() {
    let transport = SimTransport::auto_open();
    transport.fail_next_opens(2);
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Disconnected).await;
        assert_eq!(transport.open_count(), 0);

        // 1000ms for the first failure, 1600ms for the second.
        tokio::time::sleep(Duration::from_millis(2_600)).await;
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        assert_eq!(transport.open_count(), 1);
        assert_eq!(transport.latest(), Some(SessionId(3)));

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn send_goes_out_on_live_session() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        handle.send("hi");
        wait_until(|| transport.sent().len() == 1).await;

        let (session, payload) = transport.sent().remove(0);
        assert_eq!(session, SessionId(1));
        assert!(payload.starts_with(r#"{"type":"chat","user":"Alice","text":"hi","ts":"#));

        wait_until(|| handle.last().is_some_and(|view| view.messages.len() == 2)).await;
        let echoed = handle.last().unwrap().messages[1].clone();
        assert_eq!(echoed.direction, Direction::Outbound);
        assert_eq!(echoed.text, "hi");

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn inbound_frames_reach_the_view() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        transport.deliver(SessionId(1), r#"{"type":"chat","user":"Bob","text":"yo","ts":5}"#);
        transport.deliver(SessionId(1), "maintenance at noon");
        wait_until(|| handle.last().is_some_and(|view| view.messages.len() == 3)).await;

        let messages = handle.last().unwrap().messages;
        assert_eq!(messages[1].author.as_deref(), Some("Bob"));
        assert_eq!(messages[1].timestamp_millis, 5);
        assert_eq!(messages[2].author.as_deref(), Some("Server"));
        assert_eq!(messages[2].text, "maintenance at noon");

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn endpoint_change_replaces_session() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        handle.command(Command::ChangeEndpoint("wss://other.example".into()));
        wait_until(|| transport.open_count() == 2).await;

        assert_eq!(transport.opened()[1], (SessionId(2), "wss://other.example".to_string()));
        assert_eq!(transport.closed(), vec![SessionId(1)]);
        assert!(transport.is_live(SessionId(2)));

        // The old session is closed, so its late events go nowhere.
        assert!(!transport.drop_connection(SessionId(1), "late"));

        wait_until(|| handle.last().is_some_and(|view| view.url == "wss://other.example")).await;
        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn quit_cancels_pending_reconnect() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    let script = async {
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        transport.fail(SessionId(1), "reset by peer");
        wait_for_status(&handle, ConnectionStatus::Disconnected).await;

        handle.command(Command::Quit);
    };

    let (result, ()) = tokio::join!(runtime.run(), script);
    result.unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn end_of_input_shuts_down() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    handle.end_input();

    runtime.run().await.unwrap();

    assert_eq!(transport.closed(), vec![SessionId(1)]);
    assert_eq!(handle.status(), Some(ConnectionStatus::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn frontend_error_still_closes_session() {
    let transport = SimTransport::auto_open();
    let (frontend, handle) = SimFrontend::new();
    handle.fail_renders();
    let runtime = Runtime::new(manager(MemoryStorage::new()), transport.clone(), frontend);

    assert!(runtime.run().await.is_err());
    assert_eq!(transport.closed(), vec![SessionId(1)]);
}

#[tokio::test(start_paused = true)]
async fn log_and_name_persist_across_runs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relaychat.redb");

    {
        let transport = SimTransport::auto_open();
        let (frontend, handle) = SimFrontend::new();
        let runtime = Runtime::new(manager(RedbStorage::open(&path).unwrap()), transport, frontend);

        let script = async {
            wait_for_status(&handle, ConnectionStatus::Connected).await;
            handle.command(Command::SetDisplayName("Carol".into()));
            handle.send("remember me");
            handle.command(Command::Quit);
        };

        let (result, ()) = tokio::join!(runtime.run(), script);
        result.unwrap();
    }

    let storage = RedbStorage::open(&path).unwrap();
    let env = SystemEnv::new();
    let endpoint = EndpointConfig::resolve("ws://localhost:8080", None, &storage, &env).unwrap();
    assert_eq!(endpoint.display_name, "Carol");

    let restarted = ConnectionManager::new(env, storage, endpoint, BackoffConfig::default());
    let texts: Vec<_> = restarted.messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["Alice joined", "remember me"]);
    assert_eq!(restarted.messages()[1].author.as_deref(), Some("Carol"));
}
