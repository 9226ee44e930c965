//! Platform side of the runtime.
//!
//! A [`Driver`] owns the sockets, the HTTP client and the terminal. The
//! generic [`crate::Runtime`] owns the client state and tells the driver what
//! to do; completions flow back through [`Driver::poll_event`].

use std::{future::Future, ops::Sub, time::Duration};

use pixelpals_client::{AuthToken, ClientEvent, Overview, Request, Transcript};

use crate::Notice;

/// Input the driver hands to the runtime.
#[derive(Debug, Clone)]
pub enum DriverEvent<I> {
    /// The user entered a line.
    Line(String),
    /// An I/O completion (transport or REST) for the client.
    Client(ClientEvent<I>),
    /// Input ended; shut down.
    Quit,
}

/// I/O the runtime delegates to a frontend.
///
/// The CLI implements it with stdin lines, a tokio-tungstenite WebSocket and
/// reqwest; the harness implements it with scripted events and captured
/// output.
pub trait Driver: Send {
    /// Fatal frontend failure; ends the run loop.
    type Error: std::error::Error + Send + 'static;

    /// Must match the environment's instant.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next input event.
    ///
    /// Returns an event or `None` if nothing is ready. Implementations wait at
    /// most one tick interval so the runtime keeps ticking.
    fn poll_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<DriverEvent<Self::Instant>>, Self::Error>> + Send;

    /// Open the push-channel WebSocket for `attempt`.
    ///
    /// The outcome is reported later as `TransportOpened` or
    /// `TransportClosed` for the same attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot start the connection at all.
    fn open_transport(
        &mut self,
        attempt: u64,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send text on the current WebSocket.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver's I/O is broken beyond this socket.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the WebSocket of `attempt`. No-op for unknown attempts.
    fn close_transport(&mut self, attempt: u64);

    /// Start a REST request authorized with `token`. The result comes back
    /// as `Fetched` with the same epoch and request.
    fn fetch(&mut self, epoch: u64, request: Request, token: AuthToken);

    /// Time stamped on ticks.
    fn now(&self) -> Self::Instant;

    /// Render the views.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, overview: &Overview, transcript: &Transcript) -> Result<(), Self::Error>;

    /// Show an announcement.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error>;

    /// Close the socket and stop reading input.
    fn stop(&mut self);
}
