//! Property-based tests for the session state machine.
//!
//! A model of the driver tracks which transports are open. Under arbitrary
//! interleavings of opens, handshakes, drops, rejections and ticks the
//! session must never ask for a second live transport.

use std::{collections::BTreeSet, time::Duration};

use pixelpals_core::{AuthToken, ConnectionState, Identity, Session, SessionAction, SessionConfig};
use pixelpals_proto::{Command, Frame};
use proptest::prelude::*;

const CONNECTED: &str = "CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0";
const USERS: [&str; 2] = ["alice", "bob"];

#[derive(Debug, Clone)]
enum Op {
    Open(usize),
    TransportOpened,
    Handshake,
    Reject { unauthorized: bool },
    PeerClose,
    StaleClose,
    Advance(u64),
    Tick,
    Visibility,
    Close,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0..USERS.len()).prop_map(Op::Open),
        3 => Just(Op::TransportOpened),
        3 => Just(Op::Handshake),
        1 => any::<bool>().prop_map(|unauthorized| Op::Reject { unauthorized }),
        2 => Just(Op::PeerClose),
        1 => Just(Op::StaleClose),
        2 => (0u64..3_000).prop_map(Op::Advance),
        2 => Just(Op::Tick),
        1 => Just(Op::Visibility),
        1 => Just(Op::Close),
    ]
}

/// Transports the driver believes are open.
#[derive(Default)]
struct DriverModel {
    live: BTreeSet<u64>,
    last_opened: u64,
}

impl DriverModel {
    fn execute(&mut self, actions: &[SessionAction]) -> Result<(), TestCaseError> {
        for action in actions {
            match action {
                SessionAction::OpenTransport { attempt } => {
                    prop_assert!(*attempt > self.last_opened, "attempt {} reused", attempt);
                    self.last_opened = *attempt;
                    self.live.insert(*attempt);
                },
                SessionAction::CloseTransport { attempt } => {
                    self.live.remove(attempt);
                },
                _ => {},
            }
        }
        Ok(())
    }
}

fn user_identity(user: usize) -> Identity {
    Identity::new(format!("id-{user}"), USERS[user])
}

fn rejection(unauthorized: bool) -> String {
    let reason = if unauthorized { "Unauthorized" } else { "broker busy" };
    Frame::new(Command::Error).with_header("message", reason).encode()
}

proptest! {
    #[test]
    fn prop_single_live_transport(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut session: Session<Duration> = Session::new(SessionConfig::default());
        let mut driver = DriverModel::default();
        let mut now = Duration::ZERO;

        for op in &ops {
            let attempt = session.attempt();
            let actions = match op {
                Op::Open(user) => session
                    .open(user_identity(*user), AuthToken::new("tok"), now)
                    .unwrap_or_default(),
                Op::TransportOpened => session.transport_opened(attempt),
                Op::Handshake => session.handle_data(attempt, CONNECTED, now),
                Op::Reject { unauthorized } => {
                    session.handle_data(attempt, &rejection(*unauthorized), now)
                },
                Op::PeerClose => {
                    driver.live.remove(&attempt);
                    session.transport_closed(attempt, now)
                },
                Op::StaleClose => session.transport_closed(attempt.saturating_sub(1), now),
                Op::Advance(ms) => {
                    now += Duration::from_millis(*ms);
                    Vec::new()
                },
                Op::Tick => session.tick(now),
                Op::Visibility => session.visibility_regained(now),
                Op::Close => session.close(),
            };
            driver.execute(&actions)?;

            // PROPERTY: never more than one open transport.
            prop_assert!(
                driver.live.len() <= 1,
                "live transports {:?} after {:?}",
                driver.live,
                op
            );

            // PROPERTY: the open transport is exactly the session's current attempt.
            match session.state() {
                ConnectionState::Disconnected => prop_assert!(driver.live.is_empty()),
                ConnectionState::Connecting | ConnectionState::Connected => {
                    let live: Vec<u64> = driver.live.iter().copied().collect();
                    prop_assert_eq!(live, vec![session.attempt()]);
                },
            }
        }
    }

    #[test]
    fn prop_close_is_idempotent(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut session: Session<Duration> = Session::new(SessionConfig::default());
        let mut now = Duration::ZERO;
        for op in &ops {
            let attempt = session.attempt();
            match op {
                Op::Open(user) => {
                    let _ = session.open(user_identity(*user), AuthToken::new("tok"), now);
                },
                Op::Handshake => {
                    session.transport_opened(attempt);
                    session.handle_data(attempt, CONNECTED, now);
                },
                Op::Advance(ms) => now += Duration::from_millis(*ms),
                Op::Tick => {
                    session.tick(now);
                },
                _ => {},
            }
        }

        session.close();
        let again = session.close();

        // PROPERTY: a second close has nothing left to tear down.
        prop_assert!(again.is_empty());
        prop_assert_eq!(session.state(), ConnectionState::Disconnected);
        prop_assert!(session.identity().is_none());
        prop_assert_eq!(session.subscriptions().count(), 0);
    }
}
