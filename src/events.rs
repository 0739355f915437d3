// Inconclusive-scan channel
//
// The scan processor is the only producer and the disambiguation prompt the
// only consumer. The receiver cannot be cloned, so a second consumer is a
// compile error rather than a silent double-handling.

use crate::models::Game;
use tokio::sync::mpsc;

/// A scan the server could not resolve on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconclusiveScan {
    pub barcode: String,
    pub game: Game,
}

#[derive(Debug, Clone)]
pub struct InconclusiveSender {
    tx: mpsc::UnboundedSender<InconclusiveScan>,
}

#[derive(Debug)]
pub struct InconclusiveReceiver {
    rx: mpsc::UnboundedReceiver<InconclusiveScan>,
}

/// Create the linked producer/consumer pair
pub fn inconclusive_channel() -> (InconclusiveSender, InconclusiveReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InconclusiveSender { tx }, InconclusiveReceiver { rx })
}

impl InconclusiveSender {
    /// Hand an ambiguous scan to the consumer.
    ///
    /// Returns false if the consumer has gone away.
    pub fn send(&self, scan: InconclusiveScan) -> bool {
        match self.tx.send(scan) {
            Ok(()) => true,
            Err(mpsc::error::SendError(scan)) => {
                tracing::warn!(
                    barcode = %scan.barcode,
                    game_id = scan.game.id,
                    "No disambiguation consumer, dropping inconclusive scan"
                );
                false
            }
        }
    }
}

impl InconclusiveReceiver {
    pub async fn recv(&mut self) -> Option<InconclusiveScan> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<InconclusiveScan> {
        self.rx.try_recv().ok()
    }
}
