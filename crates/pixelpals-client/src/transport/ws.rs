//! Push-channel WebSocket.
//!
//! Each attempt gets its own task and its own [`PushChannel`] handle. Every
//! event the task reports carries the attempt number, so events from a
//! superseded socket can be told apart by the session.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{TransportError, TransportEvent};

/// Handle to one push-channel attempt.
#[derive(Debug)]
pub struct PushChannel {
    attempt: u64,
    to_server: mpsc::UnboundedSender<String>,
    abort_handle: tokio::task::AbortHandle,
}

impl PushChannel {
    /// Attempt this socket belongs to.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Queue a text message for the socket.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.to_server.send(text).map_err(|_| TransportError::Closed)
    }

    /// Stop the socket task. No further events are reported.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Open the push channel for `attempt`.
///
/// Returns immediately. The outcome arrives on `events`: `Opened` once the
/// handshake completes, `Data` per text message, and exactly one `Closed`
/// when the socket ends or cannot be opened (unless the handle is stopped
/// first).
pub fn open_push_channel(
    url: &str,
    attempt: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> PushChannel {
    let (to_server, outgoing) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_socket(url.to_string(), attempt, outgoing, events));

    PushChannel { attempt, to_server, abort_handle: handle.abort_handle() }
}

async fn run_socket(
    url: String,
    attempt: u64,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(error) => {
            tracing::warn!(attempt, %url, %error, "push channel connect failed");
            let _ = events.send(TransportEvent::Closed { attempt });
            return;
        },
    };

    tracing::debug!(attempt, "push channel open");
    if events.send(TransportEvent::Opened { attempt }).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            text = outgoing.recv() => {
                let Some(text) = text else { break };
                if let Err(error) = sink.send(Message::text(text)).await {
                    tracing::warn!(attempt, %error, "push channel send failed");
                    break;
                }
            }

            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let event =
                            TransportEvent::Data { attempt, text: text.as_str().to_owned() };
                        if events.send(event).is_err() {
                            break;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {},
                    Some(Err(error)) => {
                        tracing::warn!(attempt, %error, "push channel read failed");
                        break;
                    },
                }
            }
        }
    }

    let _ = sink.close().await;
    tracing::debug!(attempt, "push channel closed");
    let _ = events.send(TransportEvent::Closed { attempt });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_reports_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = open_push_channel("ws://127.0.0.1:1/ws", 7, tx);

        assert_eq!(channel.attempt(), 7);
        assert_eq!(rx.recv().await, Some(TransportEvent::Closed { attempt: 7 }));
    }
}
