//! The presentation gate between the turn buffer and the debate state.
//!
//! Peeking is idempotent and side-effect free from the caller's point of
//! view; consumption is a separate, explicit operation. The gate never
//! mutates `DebateState` itself, which keeps the single-writer rule in
//! the orchestrator.

use tokio::sync::mpsc;

use crate::error::DebateError;
use crate::state::Message;

pub struct PresentationGate {
    rx: mpsc::Receiver<Message>,
    /// The buffer head, staged so repeated peeks see the same turn.
    staged: Option<Message>,
    /// Next turn index the consumer expects.
    next_index: usize,
}

impl PresentationGate {
    pub fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self {
            rx,
            staged: None,
            next_index: 0,
        }
    }

    /// True iff the next expected turn has arrived. Never blocks and
    /// never discards a turn; callers may poll freely.
    pub fn has_ready_turn(&mut self) -> bool {
        if self.staged.is_none() {
            if let Ok(message) = self.rx.try_recv() {
                self.staged = Some(message);
            }
        }
        matches!(&self.staged, Some(message) if message.turn_index == self.next_index)
    }

    /// Remove and return the head turn. The caller appends it to the
    /// debate state.
    pub fn consume_next(&mut self, debate_complete: bool) -> Result<Message, DebateError> {
        if debate_complete {
            return Err(DebateError::AlreadyComplete);
        }
        if !self.has_ready_turn() {
            return Err(DebateError::NotReady);
        }
        let message = self.staged.take().ok_or(DebateError::NotReady)?;
        self.next_index += 1;
        Ok(message)
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Speaker, TokenUsage};

    fn message(turn_index: usize) -> Message {
        Message {
            turn_index,
            speaker: Speaker::for_turn(turn_index),
            text: format!("argument {turn_index}"),
            audio: None,
            usage: TokenUsage::default(),
            degraded: false,
        }
    }

    fn gate_with(messages: Vec<Message>) -> (PresentationGate, mpsc::Sender<Message>) {
        let (tx, rx) = mpsc::channel(8);
        for m in messages {
            tx.try_send(m).expect("buffer has room");
        }
        (PresentationGate::new(rx), tx)
    }

    #[test]
    fn peek_is_idempotent() {
        let (mut gate, _tx) = gate_with(vec![message(0), message(1)]);
        for _ in 0..5 {
            assert!(gate.has_ready_turn());
        }
        let first = gate.consume_next(false).expect("turn 0 ready");
        assert_eq!(first.turn_index, 0);
        let second = gate.consume_next(false).expect("turn 1 ready");
        assert_eq!(second.turn_index, 1);
    }

    #[test]
    fn empty_buffer_is_not_ready() {
        let (mut gate, _tx) = gate_with(vec![]);
        assert!(!gate.has_ready_turn());
        assert!(matches!(
            gate.consume_next(false),
            Err(DebateError::NotReady)
        ));
    }

    #[test]
    fn consume_rejects_completed_debates() {
        let (mut gate, _tx) = gate_with(vec![message(0)]);
        assert!(matches!(
            gate.consume_next(true),
            Err(DebateError::AlreadyComplete)
        ));
        // The buffered turn was not discarded by the rejection.
        assert!(gate.has_ready_turn());
    }

    #[test]
    fn consumption_advances_expected_index() {
        let (mut gate, _tx) = gate_with(vec![message(0)]);
        assert_eq!(gate.next_index(), 0);
        gate.consume_next(false).expect("ready");
        assert_eq!(gate.next_index(), 1);
        assert!(!gate.has_ready_turn());
    }

    #[test]
    fn mismatched_head_index_is_not_ready() {
        // A turn with the wrong index must never be exposed as ready.
        let (mut gate, _tx) = gate_with(vec![message(3)]);
        assert!(!gate.has_ready_turn());
        assert!(matches!(
            gate.consume_next(false),
            Err(DebateError::NotReady)
        ));
    }
}
