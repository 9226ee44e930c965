//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`Command`]: parsed user input
//! - [`Client`]: real-time state machine
//! - [`Driver`]: platform-specific I/O

use std::time::Duration;

use pixelpals_client::{
    AuthToken, Client, ClientAction, ClientError, ClientEvent, Environment, Identity,
    SessionConfig,
};

use crate::{Command, Driver, DriverEvent, Notice};

/// Friend presence is re-fetched this often while logged in.
pub const DEFAULT_PRESENCE_POLL: Duration = Duration::from_secs(5);

/// Generic runtime that orchestrates a Client and a Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    client: Client<E>,
    presence_poll: Duration,
    next_presence_poll: Option<E::Instant>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(driver: D, env: E, config: SessionConfig) -> Self {
        Self {
            driver,
            client: Client::new(env, config),
            presence_poll: DEFAULT_PRESENCE_POLL,
            next_presence_poll: None,
        }
    }

    /// Re-fetch presence every `interval` while logged in. Zero disables.
    #[must_use]
    pub fn with_presence_poll(mut self, interval: Duration) -> Self {
        self.presence_poll = interval;
        self
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Logs in with `login`, if given
    /// 2. Polls the driver for input lines and I/O completions
    /// 3. Feeds them through the client and executes the resulting actions
    /// 4. Ticks the client so heart-beats and reconnects happen on time
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self, login: Option<(Identity, AuthToken)>) -> Result<(), D::Error> {
        if let Some((identity, token)) = login {
            self.dispatch(ClientEvent::Login { identity, token }).await?;
        }
        self.render()?;

        loop {
            let should_quit = self.process_cycle().await?;
            if should_quit {
                break;
            }
        }

        self.dispatch(ClientEvent::Logout).await?;
        self.driver.stop();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        match self.driver.poll_event().await? {
            Some(DriverEvent::Quit) => return Ok(true),
            Some(DriverEvent::Line(line)) => {
                if self.handle_line(&line).await? {
                    return Ok(true);
                }
            },
            Some(DriverEvent::Client(event)) => self.dispatch(event).await?,
            None => {},
        }

        let now = self.driver.now();
        self.poll_presence(now).await?;
        self.dispatch(ClientEvent::Tick { now }).await?;
        Ok(false)
    }

    /// Dispatch `RefreshPresence` once per poll interval.
    ///
    /// The first interval starts on the first cycle after login; the
    /// handshake already fetches a presence snapshot.
    async fn poll_presence(&mut self, now: E::Instant) -> Result<(), D::Error> {
        if self.presence_poll.is_zero() || self.client.identity().is_none() {
            self.next_presence_poll = None;
            return Ok(());
        }

        match self.next_presence_poll {
            Some(due) if now >= due => {
                self.next_presence_poll = Some(now + self.presence_poll);
                self.dispatch(ClientEvent::RefreshPresence).await
            },
            Some(_) => Ok(()),
            None => {
                self.next_presence_poll = Some(now + self.presence_poll);
                Ok(())
            },
        }
    }

    /// Handle one input line.
    ///
    /// Returns `true` if the line asked to quit.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool, D::Error> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(false),
            Err(error) => {
                self.driver.notify(&Notice::Error { message: error.to_string() })?;
                return Ok(false);
            },
        };

        if command == Command::Quit {
            return Ok(true);
        }

        let open = self.client.transcript().conversation_id().cloned();
        match command.into_event(open.as_ref()) {
            Some(event) => self.dispatch(event).await?,
            None => self.driver.notify(&Notice::Error {
                message: "no conversation is open".to_string(),
            })?,
        }
        Ok(false)
    }

    /// Feed one event through the client and execute the resulting actions.
    ///
    /// Local precondition failures are shown as notices, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails while executing an action.
    pub async fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Result<(), D::Error> {
        let is_tick = matches!(event, ClientEvent::Tick { .. });

        let actions = match self.client.handle(event) {
            Ok(actions) => actions,
            Err(error) => {
                tracing::debug!(%error, "event rejected");
                self.driver.notify(&Notice::Error { message: describe(&error) })?;
                return Ok(());
            },
        };

        if is_tick && actions.is_empty() {
            return Ok(());
        }

        self.execute(actions).await?;
        self.render()
    }

    async fn execute(&mut self, actions: Vec<ClientAction>) -> Result<(), D::Error> {
        for action in actions {
            if let Some(notice) = Notice::from_action(&action) {
                self.driver.notify(&notice)?;
                continue;
            }

            match action {
                ClientAction::OpenTransport { attempt } => {
                    self.driver.open_transport(attempt).await?;
                },
                ClientAction::Send(frame) => self.driver.send_text(frame.encode()).await?,
                ClientAction::SendHeartbeat => self.driver.send_text("\n".to_string()).await?,
                ClientAction::CloseTransport { attempt } => self.driver.close_transport(attempt),
                ClientAction::Fetch { epoch, request } => match self.client.token() {
                    Some(token) => self.driver.fetch(epoch, request, token.clone()),
                    None => tracing::debug!(?request, "dropping fetch without credential"),
                },
                ClientAction::ConnectionChanged(_)
                | ClientAction::MatchUpdate(_)
                | ClientAction::SessionExpired { .. }
                | ClientAction::Error { .. } => {},
            }
        }
        Ok(())
    }

    fn render(&mut self) -> Result<(), D::Error> {
        let overview = self.client.overview();
        self.driver.render(&overview, self.client.transcript())
    }

    /// Get a reference to the Client
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

fn describe(error: &ClientError) -> String {
    match error {
        ClientError::Session(session) if session.is_transient() => {
            "not connected yet, try again in a moment".to_string()
        },
        other => other.to_string(),
    }
}
