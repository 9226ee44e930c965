//! Tokio driver for the command-line frontend.
//!
//! Implements the [`Driver`] trait with stdin lines for input,
//! tokio-tungstenite for the push channel, reqwest for REST and plain stdout
//! writes for output. Every I/O completion is funneled into one channel that
//! [`Driver::poll_event`] drains.

use std::{
    io::{self, Stdout, Write, stdout},
    time::{Duration, Instant},
};

use pixelpals_app::{Driver, DriverEvent, Notice};
use pixelpals_client::{
    AuthToken, ClientEvent, Environment, FetchError, Overview, Request, Transcript,
    transport::{
        PushChannel, RestClient, TransportConfig, TransportError, TransportEvent,
        open_push_channel,
    },
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

use crate::{
    SystemEnv,
    render::{TranscriptView, notice_line, status_line},
};

/// How long `poll_event` waits before letting the runtime tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// CLI driver errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error writing to the terminal.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Driver backed by stdin/stdout and real sockets.
pub struct CliDriver {
    env: SystemEnv,
    config: TransportConfig,
    out: Stdout,

    /// Lines and REST completions.
    events_tx: mpsc::UnboundedSender<DriverEvent<Instant>>,
    events_rx: mpsc::UnboundedReceiver<DriverEvent<Instant>>,

    /// Push-channel events of every attempt.
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,

    channel: Option<PushChannel>,
    rest: Option<RestClient>,
    rest_token: Option<AuthToken>,
    stdin: Option<JoinHandle<()>>,

    last_status: String,
    transcript: TranscriptView,
}

impl CliDriver {
    /// Create a driver and start reading stdin.
    pub fn new(env: SystemEnv, config: TransportConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let stdin = tokio::spawn(read_lines(events_tx.clone()));

        Self {
            env,
            config,
            out: stdout(),
            events_tx,
            events_rx,
            transport_tx,
            transport_rx,
            channel: None,
            rest: None,
            rest_token: None,
            stdin: Some(stdin),
            last_status: String::new(),
            transcript: TranscriptView::default(),
        }
    }

    /// REST client for `token`, rebuilt when the credential changes.
    fn rest_client(&mut self, token: AuthToken) -> Result<RestClient, TransportError> {
        if let (Some(rest), Some(current)) = (&self.rest, &self.rest_token)
            && *current == token
        {
            return Ok(rest.clone());
        }

        let rest = RestClient::new(&self.config, token.clone())?;
        self.rest = Some(rest.clone());
        self.rest_token = Some(token);
        Ok(rest)
    }

    fn write_lines(&mut self, lines: &[String]) -> Result<(), CliError> {
        let mut out = self.out.lock();
        for line in lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Forward stdin lines until EOF, then ask the runtime to quit.
async fn read_lines(events: mpsc::UnboundedSender<DriverEvent<Instant>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => DriverEvent::Line(line),
            Ok(None) => DriverEvent::Quit,
            Err(error) => {
                tracing::error!(%error, "stdin failed");
                DriverEvent::Quit
            },
        };

        let quit = matches!(event, DriverEvent::Quit);
        if events.send(event).is_err() || quit {
            return;
        }
    }
}

impl Driver for CliDriver {
    type Error = CliError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent<Instant>>, Self::Error> {
        tokio::select! {
            biased;

            Some(event) = self.transport_rx.recv() => {
                Ok(Some(DriverEvent::Client(event.into_client_event())))
            }

            Some(event) = self.events_rx.recv() => Ok(Some(event)),

            () = tokio::time::sleep(TICK_INTERVAL) => Ok(None),
        }
    }

    async fn open_transport(&mut self, attempt: u64) -> Result<(), Self::Error> {
        if let Some(previous) = self.channel.take() {
            previous.stop();
        }

        tracing::debug!(attempt, url = %self.config.ws_url, "opening push channel");
        let events = self.transport_tx.clone();
        self.channel = Some(open_push_channel(&self.config.ws_url, attempt, events));
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let Some(channel) = &self.channel else {
            tracing::debug!("send without push channel dropped");
            return Ok(());
        };

        // The socket task reports its own close; the session reconnects then.
        if let Err(error) = channel.send(text) {
            tracing::debug!(attempt = channel.attempt(), %error, "send on closed push channel");
        }
        Ok(())
    }

    fn close_transport(&mut self, attempt: u64) {
        if self.channel.as_ref().is_some_and(|c| c.attempt() == attempt)
            && let Some(channel) = self.channel.take()
        {
            channel.stop();
        }
    }

    fn fetch(&mut self, epoch: u64, request: Request, token: AuthToken) {
        let events = self.events_tx.clone();
        let rest = match self.rest_client(token) {
            Ok(rest) => rest,
            Err(error) => {
                tracing::error!(%error, "cannot build REST client");
                let result = Err(FetchError::Transport(error.to_string()));
                let event = ClientEvent::Fetched { epoch, request, result };
                if events.send(DriverEvent::Client(event)).is_err() {
                    tracing::debug!("runtime gone before fetch failure was reported");
                }
                return;
            },
        };

        tokio::spawn(async move {
            let result = rest.execute(&request).await;
            let event = ClientEvent::Fetched { epoch, request, result };
            if events.send(DriverEvent::Client(event)).is_err() {
                tracing::debug!("runtime gone before fetch completed");
            }
        });
    }

    fn now(&self) -> Instant {
        self.env.now()
    }

    fn render(&mut self, overview: &Overview, transcript: &Transcript) -> Result<(), Self::Error> {
        let mut lines = Vec::new();

        let status = status_line(overview);
        if status != self.last_status {
            lines.push(status.clone());
            self.last_status = status;
        }
        lines.extend(self.transcript.update(transcript));

        self.write_lines(&lines)
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error> {
        self.write_lines(&[notice_line(notice)])
    }

    fn stop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.stop();
        }
        if let Some(stdin) = self.stdin.take() {
            stdin.abort();
        }
    }
}
