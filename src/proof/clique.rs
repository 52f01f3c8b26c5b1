//! In-process broadcast clique for running multi-party protocols locally.
//!
//! A router task collects one message per live participant each round and
//! hands the full set back to everyone. A participant leaves by dropping its
//! [`CliqueHandle`]; from then on it contributes empty messages.

use tokio::sync::mpsc;

use super::deniable::StepContext;
use super::error::ProofError;

const LOG_TARGET: &str = "zk_mix::proof::clique";

/// One participant's connection to a [`LocalClique`].
///
/// [`StepContext::step`] blocks the calling thread, so protocols should run on
/// a blocking thread such as one from `tokio::task::spawn_blocking`.
pub struct CliqueHandle {
    index: usize,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    inbox: mpsc::UnboundedReceiver<Vec<Vec<u8>>>,
}

impl CliqueHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl StepContext for CliqueHandle {
    fn step(&mut self, msg: Vec<u8>) -> Result<Vec<Vec<u8>>, ProofError> {
        self.outbox
            .send(msg)
            .map_err(|_| ProofError::Stream("clique router stopped".into()))?;
        self.inbox
            .blocking_recv()
            .ok_or_else(|| ProofError::Stream("clique router stopped".into()))
    }
}

pub struct LocalClique;

impl LocalClique {
    /// Starts a router for `participants` nodes on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(participants: usize) -> Vec<CliqueHandle> {
        let mut handles = Vec::with_capacity(participants);
        let mut inboxes = Vec::with_capacity(participants);
        let mut outboxes = Vec::with_capacity(participants);
        for index in 0..participants {
            let (msg_tx, msg_rx) = mpsc::unbounded_channel();
            let (round_tx, round_rx) = mpsc::unbounded_channel();
            inboxes.push(Some(msg_rx));
            outboxes.push(Some(round_tx));
            handles.push(CliqueHandle {
                index,
                outbox: msg_tx,
                inbox: round_rx,
            });
        }
        tokio::spawn(route(inboxes, outboxes));
        handles
    }
}

async fn route(
    mut inboxes: Vec<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    mut outboxes: Vec<Option<mpsc::UnboundedSender<Vec<Vec<u8>>>>>,
) {
    let mut round = 0usize;
    loop {
        let mut msgs = vec![Vec::new(); inboxes.len()];
        for (i, slot) in inboxes.iter_mut().enumerate() {
            let Some(inbox) = slot else { continue };
            match inbox.recv().await {
                Some(msg) => msgs[i] = msg,
                None => {
                    tracing::debug!(target: LOG_TARGET, round, participant = i, "participant left");
                    *slot = None;
                    outboxes[i] = None;
                }
            }
        }
        if inboxes.iter().all(Option::is_none) {
            break;
        }

        for slot in outboxes.iter_mut() {
            if let Some(outbox) = slot {
                if outbox.send(msgs.clone()).is_err() {
                    *slot = None;
                }
            }
        }
        round += 1;
    }
    tracing::debug!(target: LOG_TARGET, rounds = round, "clique closed");
}
