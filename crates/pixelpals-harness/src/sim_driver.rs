//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the CLI's tokio driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`pixelpals_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Clones share state: keep one clone in the test to inject input and inspect
//! what the runtime did, and hand the other to the runtime.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use pixelpals_app::{Driver, DriverEvent, Notice};
use pixelpals_client::{
    AuthToken, ClientEvent, Environment, FetchError, Overview, Request, Response, Transcript,
};
use pixelpals_proto::Frame;

use crate::SimEnv;

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

#[derive(Default)]
struct SharedState {
    pending: VecDeque<DriverEvent<Duration>>,
    sent: Vec<String>,
    opened: Vec<u64>,
    closed: Vec<u64>,
    fetches: Vec<(u64, Request)>,
    tokens: Vec<AuthToken>,
    notices: Vec<Notice>,
    renders: usize,
    last_overview: Option<Overview>,
    last_transcript_len: usize,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
#[derive(Clone)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    env: SimEnv,
}

impl SimDriver {
    /// Driver reading time from `env`.
    pub fn new(env: SimEnv) -> Self {
        Self { state: Arc::new(Mutex::new(SharedState::default())), env }
    }

    /// Queue a user input line.
    pub fn inject_line(&self, line: impl Into<String>) {
        self.lock().pending.push_back(DriverEvent::Line(line.into()));
    }

    /// Queue an I/O completion.
    pub fn inject_event(&self, event: ClientEvent<Duration>) {
        self.lock().pending.push_back(DriverEvent::Client(event));
    }

    /// Queue a server text message on transport `attempt`.
    pub fn inject_data(&self, attempt: u64, text: impl Into<String>) {
        self.inject_event(ClientEvent::TransportData { attempt, text: text.into() });
    }

    /// Queue the result of a fetch.
    pub fn inject_fetched(
        &self,
        epoch: u64,
        request: Request,
        result: Result<Response, FetchError>,
    ) {
        self.inject_event(ClientEvent::Fetched { epoch, request, result });
    }

    /// Queue end of input.
    pub fn inject_quit(&self) {
        self.lock().pending.push_back(DriverEvent::Quit);
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    /// Take all text sent on the push channel.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Take all sent text that decodes to a frame (heart-beats dropped).
    pub fn take_sent_frames(&self) -> Vec<Frame> {
        self.take_sent().iter().filter_map(|text| Frame::decode(text).ok().flatten()).collect()
    }

    /// Take all requested fetches.
    pub fn take_fetches(&self) -> Vec<(u64, Request)> {
        std::mem::take(&mut self.lock().fetches)
    }

    /// Credentials the fetches were authorized with, in order.
    pub fn fetch_tokens(&self) -> Vec<AuthToken> {
        self.lock().tokens.clone()
    }

    /// Attempts the runtime asked to open.
    pub fn opened(&self) -> Vec<u64> {
        self.lock().opened.clone()
    }

    /// Attempts the runtime asked to close.
    pub fn closed(&self) -> Vec<u64> {
        self.lock().closed.clone()
    }

    /// Every notice shown so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    /// Number of renders.
    pub fn render_count(&self) -> usize {
        self.lock().renders
    }

    /// Overview passed to the latest render.
    pub fn last_overview(&self) -> Option<Overview> {
        self.lock().last_overview.clone()
    }

    /// Transcript length at the latest render.
    pub fn last_transcript_len(&self) -> usize {
        self.lock().last_transcript_len
    }

    /// Whether the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = Duration;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent<Duration>>, Self::Error> {
        Ok(self.lock().pending.pop_front())
    }

    async fn open_transport(&mut self, attempt: u64) -> Result<(), Self::Error> {
        self.lock().opened.push(attempt);
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.stopped {
            return Err(SimDriverError("send after stop".to_string()));
        }
        state.sent.push(text);
        Ok(())
    }

    fn close_transport(&mut self, attempt: u64) {
        self.lock().closed.push(attempt);
    }

    fn fetch(&mut self, epoch: u64, request: Request, token: AuthToken) {
        tracing::trace!(epoch, path = %request.path(), "sim fetch");
        let mut state = self.lock();
        state.fetches.push((epoch, request));
        state.tokens.push(token);
    }

    fn now(&self) -> Duration {
        self.env.now()
    }

    fn render(&mut self, overview: &Overview, transcript: &Transcript) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.renders += 1;
        state.last_overview = Some(overview.clone());
        state.last_transcript_len = transcript.entries().len();
        Ok(())
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error> {
        self.lock().notices.push(notice.clone());
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_events_are_pending() {
        let driver = SimDriver::new(SimEnv::new());
        driver.inject_line("/refresh");

        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn poll_pops_in_order() {
        let mut driver = SimDriver::new(SimEnv::new());
        driver.inject_line("first");
        driver.inject_quit();

        assert!(matches!(
            driver.poll_event().await,
            Ok(Some(DriverEvent::Line(l))) if l == "first"
        ));
        assert!(matches!(driver.poll_event().await, Ok(Some(DriverEvent::Quit))));
        assert!(matches!(driver.poll_event().await, Ok(None)));
    }
}
