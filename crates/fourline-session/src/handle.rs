//! The transport contract the registry delivers through.
//!
//! The registry never touches sockets. It holds an `Arc<dyn PlayerHandle>`
//! per connected player and calls [`send`](PlayerHandle::send) after it
//! has released its lock. Whatever sits behind the handle (a WebSocket
//! writer task, a test channel) is someone else's business.

use fourline_protocol::ServerMessage;
use tokio::sync::mpsc;

use crate::HandleError;

/// A player's outbound connection.
///
/// Implementations must not block: `send` is called from async code and
/// should hand the message off (to a channel, a buffer) and return.
pub trait PlayerHandle: Send + Sync + 'static {
    /// Queues `message` for delivery.
    ///
    /// # Errors
    /// Returns a [`HandleError`] if the message cannot be queued. The
    /// registry treats every failure as "drop and move on".
    fn send(&self, message: ServerMessage) -> Result<(), HandleError>;

    /// Asks the transport to shut the connection down. Called when a newer
    /// handle replaces this one for the same player.
    fn close(&self) {}
}

impl PlayerHandle for mpsc::UnboundedSender<ServerMessage> {
    fn send(&self, message: ServerMessage) -> Result<(), HandleError> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| HandleError::Closed)
    }
}

/// Bounded channels give backpressure without blocking the game: a full
/// outbox drops the message rather than waiting.
impl PlayerHandle for mpsc::Sender<ServerMessage> {
    fn send(&self, message: ServerMessage) -> Result<(), HandleError> {
        self.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HandleError::Full,
            mpsc::error::TrySendError::Closed(_) => HandleError::Closed,
        })
    }
}
