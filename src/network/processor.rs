//! Processing Stage
//!
//! Single thread that applies every received unit to the hub in queue order.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::hub::Hub;

use super::Received;

/// Depth of the hand-off queue between receive loops and the processing stage
pub const QUEUE_DEPTH: usize = 1;

/// Create the hand-off queue
pub fn queue() -> (Sender<Received>, Receiver<Received>) {
    channel::bounded(QUEUE_DEPTH)
}

/// Start the processing thread
///
/// It runs until every sender of the queue has been dropped.
pub fn spawn(hub: Arc<Hub>, rx: Receiver<Received>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hub-processor".to_string())
        .spawn(move || {
            for received in rx.iter() {
                hub.handle(received.socket, &received.data);
            }
            tracing::debug!("Processing stage stopped");
        })
}
