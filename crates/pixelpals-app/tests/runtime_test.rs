//! Runtime tests against the simulation driver.
//!
//! The runtime owns one `SimDriver` clone; the test keeps another to inject
//! input and inspect what the runtime asked the platform to do.

use std::time::Duration;

use pixelpals_app::{Notice, Runtime};
use pixelpals_client::{
    AuthToken, ClientEvent, ConnectionState, Identity, Request, Response, SessionConfig,
};
use pixelpals_harness::{SimBroker, SimDriver, SimEnv};
use pixelpals_proto::{Command, Destination};

type SimRuntime = Runtime<SimDriver, SimEnv>;

fn setup() -> (SimEnv, SimDriver, SimRuntime) {
    let env = SimEnv::new();
    let driver = SimDriver::new(env.clone());
    let runtime = Runtime::new(driver.clone(), env.clone(), SessionConfig::default());
    (env, driver, runtime)
}

/// Process cycles until nothing is queued.
async fn drain(runtime: &mut SimRuntime, driver: &SimDriver) {
    while driver.has_pending() {
        let quit = runtime.process_cycle().await.unwrap();
        assert!(!quit, "unexpected quit");
    }
}

/// Log in through the command line and complete the handshake.
async fn login_and_connect(runtime: &mut SimRuntime, driver: &SimDriver) {
    driver.inject_line("/login A alice tok");
    drain(runtime, driver).await;
    driver.inject_event(ClientEvent::TransportOpened { attempt: 1 });
    driver.inject_data(1, SimBroker::connected());
    drain(runtime, driver).await;
}

fn error_messages(driver: &SimDriver) -> Vec<String> {
    driver
        .notices()
        .into_iter()
        .filter_map(|n| match n {
            Notice::Error { message } => Some(message),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn run_logs_in_and_out() {
    let (_env, driver, runtime) = setup();
    driver.inject_quit();

    runtime
        .run(Some((Identity::new("A", "alice"), AuthToken::new("tok"))))
        .await
        .unwrap();

    assert_eq!(driver.opened(), vec![1]);
    assert_eq!(driver.closed(), vec![1]);
    assert!(driver.is_stopped());

    let notices = driver.notices();
    assert!(notices.contains(&Notice::Connection(ConnectionState::Connecting)));
    assert_eq!(notices.last(), Some(&Notice::Connection(ConnectionState::Disconnected)));
}

#[tokio::test]
async fn quit_command_ends_the_loop() {
    let (_env, driver, mut runtime) = setup();
    driver.inject_line("/quit");

    assert!(runtime.process_cycle().await.unwrap());
}

#[tokio::test]
async fn handshake_sends_connect_then_subscriptions() {
    let (_env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;

    let frames = driver.take_sent_frames();
    assert_eq!(frames[0].command, Command::Connect);
    assert_eq!(frames[0].header("Authorization"), Some("Bearer tok"));

    let subscribed: Vec<_> = frames[1..].iter().filter_map(|f| f.destination()).collect();
    assert_eq!(subscribed.len(), 5);
    assert!(subscribed.contains(&"/topic/status"));
    assert!(subscribed.contains(&"/user/alice/queue/unread-updates"));

    let fetches = driver.take_fetches();
    assert_eq!(fetches.len(), 5);
    assert!(fetches.iter().all(|(epoch, _)| *epoch == 1));
    assert!(driver.fetch_tokens().iter().all(|token| token.expose() == "tok"));

    let overview = driver.last_overview().unwrap();
    assert_eq!(overview.connection, ConnectionState::Connected);
}

#[tokio::test]
async fn fetched_snapshot_is_rendered() {
    let (_env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;

    driver.inject_fetched(1, Request::UnreadTotal, Ok(Response::UnreadTotal(4)));
    drain(&mut runtime, &driver).await;

    assert_eq!(driver.last_overview().map(|o| o.total_unread), Some(4));
    assert_eq!(runtime.client().unread().total(), 4);
}

#[tokio::test]
async fn bad_commands_become_notices() {
    let (_env, driver, mut runtime) = setup();
    driver.inject_line("/dance");
    driver.inject_line("/read");
    driver.inject_line("/ack m1 maybe");
    drain(&mut runtime, &driver).await;

    assert_eq!(
        error_messages(&driver),
        vec![
            "unknown command: /dance".to_string(),
            "no conversation is open".to_string(),
            "unknown notification kind: maybe".to_string(),
        ]
    );
}

#[tokio::test]
async fn message_before_connect_asks_to_retry() {
    let (_env, driver, mut runtime) = setup();
    driver.inject_line("/login A alice tok");
    driver.inject_line("/chat B bob");
    driver.inject_line("hello");
    drain(&mut runtime, &driver).await;

    assert_eq!(
        error_messages(&driver),
        vec!["not connected yet, try again in a moment".to_string()]
    );
    assert_eq!(driver.last_transcript_len(), 0);
}

#[tokio::test]
async fn chat_round_trip() {
    let (_env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;
    driver.take_fetches();

    driver.inject_line("/chat B bob");
    drain(&mut runtime, &driver).await;

    let fetches = driver.take_fetches();
    assert_eq!(fetches.len(), 1);
    let (epoch, request) = fetches[0].clone();
    driver.inject_fetched(epoch, request, Ok(Response::History(Vec::new())));
    drain(&mut runtime, &driver).await;

    let room = Destination::ChatRoom("A_B".into()).path();
    let frames = driver.take_sent_frames();
    assert!(
        frames
            .iter()
            .any(|f| f.command == Command::Subscribe && f.destination() == Some(room.as_str()))
    );

    driver.inject_line("hello bob");
    drain(&mut runtime, &driver).await;

    let frames = driver.take_sent_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].destination(), Some("/app/chat.sendMessage"));
    assert_eq!(driver.last_transcript_len(), 1);
}

#[tokio::test]
async fn idle_ticks_do_not_render() {
    let (_env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;
    let renders = driver.render_count();

    runtime.process_cycle().await.unwrap();
    runtime.process_cycle().await.unwrap();

    assert_eq!(driver.render_count(), renders);
}

#[tokio::test]
async fn heartbeat_after_interval() {
    let (env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;
    driver.take_sent();

    env.advance(Duration::from_secs(10));
    runtime.process_cycle().await.unwrap();

    assert_eq!(driver.take_sent(), vec!["\n".to_string()]);
}

#[tokio::test]
async fn dropped_transport_reconnects_after_delay() {
    let (env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;

    driver.inject_event(ClientEvent::TransportClosed { attempt: 1 });
    drain(&mut runtime, &driver).await;
    assert_eq!(driver.opened(), vec![1]);

    env.advance(Duration::from_secs(1));
    runtime.process_cycle().await.unwrap();

    assert_eq!(driver.opened(), vec![1, 2]);
    assert!(driver.notices().contains(&Notice::Connection(ConnectionState::Disconnected)));
}

#[tokio::test]
async fn unauthorized_handshake_expires_session() {
    let (_env, driver, mut runtime) = setup();
    driver.inject_line("/login A alice tok");
    drain(&mut runtime, &driver).await;

    driver.inject_event(ClientEvent::TransportOpened { attempt: 1 });
    driver.inject_data(1, SimBroker::error("Unauthorized", "invalid token"));
    drain(&mut runtime, &driver).await;

    assert!(driver.notices().iter().any(|n| matches!(n, Notice::SessionExpired { .. })));
    assert!(runtime.client().identity().is_none());
    assert_eq!(driver.closed(), vec![1]);
}

#[tokio::test]
async fn presence_is_polled_while_logged_in() {
    let (env, driver, mut runtime) = setup();
    login_and_connect(&mut runtime, &driver).await;
    driver.take_fetches();

    env.advance(Duration::from_secs(4));
    runtime.process_cycle().await.unwrap();
    assert!(driver.take_fetches().is_empty());

    env.advance(Duration::from_secs(1));
    runtime.process_cycle().await.unwrap();
    let fetches = driver.take_fetches();
    assert_eq!(fetches, vec![(1, Request::FriendStatus)]);
    assert_eq!(fetches[0].1.path(), "/friends");

    // Oracle: the next poll is a full interval later.
    env.advance(Duration::from_secs(4));
    runtime.process_cycle().await.unwrap();
    assert!(driver.take_fetches().is_empty());
}

#[tokio::test]
async fn presence_is_not_polled_when_logged_out() {
    let (env, driver, mut runtime) = setup();

    env.advance(Duration::from_secs(30));
    runtime.process_cycle().await.unwrap();
    runtime.process_cycle().await.unwrap();

    assert!(driver.take_fetches().is_empty());
    assert!(error_messages(&driver).is_empty());
}

#[tokio::test]
async fn zero_interval_disables_presence_polling() {
    let env = SimEnv::new();
    let driver = SimDriver::new(env.clone());
    let mut runtime = Runtime::new(driver.clone(), env.clone(), SessionConfig::default())
        .with_presence_poll(Duration::ZERO);
    login_and_connect(&mut runtime, &driver).await;
    driver.take_fetches();

    env.advance(Duration::from_secs(60));
    runtime.process_cycle().await.unwrap();

    assert!(driver.take_fetches().iter().all(|(_, request)| *request != Request::FriendStatus));
}
