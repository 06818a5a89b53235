use chrono::Utc;
use fg_location::{LocationError, PositionSource};
use fg_schemas::{Coordinate, PositionSample};
use tokio::sync::{mpsc, oneshot};

type ReadResult = Result<PositionSample, LocationError>;

/// A source whose reads park until the test resolves them.
///
/// Each `read` hands a [`PendingRead`] to the paired [`ReadController`].
/// Dropping a pending read without resolving it fails the read with
/// `PositionUnavailable`.
#[derive(Debug, Clone)]
pub struct GatedSource {
    tx: mpsc::UnboundedSender<oneshot::Sender<ReadResult>>,
}

#[derive(Debug)]
pub struct ReadController {
    rx: mpsc::UnboundedReceiver<oneshot::Sender<ReadResult>>,
}

/// A read currently parked inside a [`GatedSource`].
#[derive(Debug)]
pub struct PendingRead {
    reply: oneshot::Sender<ReadResult>,
}

impl GatedSource {
    pub fn new() -> (Self, ReadController) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ReadController { rx })
    }
}

impl ReadController {
    /// Wait for the next read to arrive. `None` once every source is gone.
    pub async fn next_read(&mut self) -> Option<PendingRead> {
        self.rx.recv().await.map(|reply| PendingRead { reply })
    }
}

impl PendingRead {
    /// Resolve with a fix. Returns `false` if the reader was already
    /// cancelled (its future dropped).
    pub fn resolve_at(self, coordinate: Coordinate) -> bool {
        self.resolve(Ok(PositionSample::new(coordinate, 5.0, Utc::now())))
    }

    pub fn fail(self, err: LocationError) -> bool {
        self.resolve(Err(err))
    }

    pub fn resolve(self, result: ReadResult) -> bool {
        self.reply.send(result).is_ok()
    }

    /// `true` if the reading future has been dropped.
    pub fn is_cancelled(&self) -> bool {
        self.reply.is_closed()
    }
}

#[async_trait::async_trait]
impl PositionSource for GatedSource {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn read(&self, _high_accuracy: bool) -> Result<PositionSample, LocationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(reply_tx).is_err() {
            return Err(LocationError::PositionUnavailable);
        }
        reply_rx
            .await
            .unwrap_or(Err(LocationError::PositionUnavailable))
    }
}
