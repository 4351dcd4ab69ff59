//! Debate orchestration.
//!
//! Composes the debate state, background producer, and presentation gate
//! into the request/response surface the UI polls: start, advance, stop,
//! status. `advance` and `status` never block on the network; "not
//! ready" is a normal synchronous answer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::DebateConfig;
use crate::error::DebateError;
use crate::gate::PresentationGate;
use crate::generator::TurnGenerator;
use crate::producer::{self, RetryPolicy};
use crate::state::{DebateState, Message, Speaker};

/// Result of one `advance` call.
#[derive(Debug)]
pub enum Advance {
    /// The next turn has not finished generating; poll again later.
    NotReady,
    /// A turn was released and appended to the transcript.
    Delivered(Message),
}

/// Read-only snapshot of a debate for the UI.
#[derive(Debug, Clone, Copy)]
pub struct DebateStatus {
    pub is_active: bool,
    pub is_complete: bool,
    pub turns_done: usize,
    pub turns_total: usize,
    pub current_speaker: Speaker,
}

/// One live debate: state, gate, and the producer retirement handles.
struct DebateSession {
    state: DebateState,
    gate: PresentationGate,
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Orchestrates a single debate at a time over a shared turn generator.
pub struct DebateOrchestrator {
    generator: Arc<dyn TurnGenerator>,
    retry: RetryPolicy,
    session: Option<DebateSession>,
}

impl DebateOrchestrator {
    pub fn new(generator: Arc<dyn TurnGenerator>) -> Self {
        Self::with_retry(generator, RetryPolicy::default())
    }

    pub fn with_retry(generator: Arc<dyn TurnGenerator>, retry: RetryPolicy) -> Self {
        Self {
            generator,
            retry,
            session: None,
        }
    }

    /// Start a new debate, fully retiring any previous one first. No
    /// turn from an earlier debate can reach the new transcript: the
    /// old producer is stopped and its buffer dropped before the new
    /// state and buffer exist.
    pub fn start(&mut self, config: DebateConfig) -> Result<(), DebateError> {
        config.validate()?;
        self.retire_session();

        let state = DebateState::start(config.clone())?;
        let stop = Arc::new(AtomicBool::new(false));
        let (rx, worker) = producer::spawn(
            config.clone(),
            Arc::clone(&self.generator),
            self.retry.clone(),
            Arc::clone(&stop),
        );

        info!(
            topic = %config.topic,
            max_turns = config.max_turns,
            format = config.format.display_name(),
            "debate started"
        );

        self.session = Some(DebateSession {
            state,
            gate: PresentationGate::new(rx),
            stop,
            worker,
        });
        Ok(())
    }

    /// Release the next ready turn, if any, and append it to the state.
    pub fn advance(&mut self) -> Result<Advance, DebateError> {
        let session = self.session.as_mut().ok_or(DebateError::NotStarted)?;

        if session.state.is_complete() {
            return Err(DebateError::AlreadyComplete);
        }
        if !session.gate.has_ready_turn() {
            return Ok(Advance::NotReady);
        }

        let message = session.gate.consume_next(false)?;
        if let Err(err) = session.state.append(message.clone()) {
            // Single-producer, single-index discipline makes this
            // unreachable in normal operation; an occurrence means a
            // broken invariant and halts this debate.
            error!(error = %err, "buffer delivered a turn the state rejected");
            return Err(DebateError::Internal(err.to_string()));
        }

        info!(
            turn_index = message.turn_index,
            degraded = message.degraded,
            turns_done = session.state.turns_done(),
            "turn delivered"
        );
        Ok(Advance::Delivered(message))
    }

    /// Stop the debate. Generation ends promptly between turns; turns
    /// already buffered may still be drained with `advance`.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.stop.store(true, Ordering::SeqCst);
            session.state.stop();
            info!("debate stopped");
        }
    }

    pub fn status(&self) -> Result<DebateStatus, DebateError> {
        let session = self.session.as_ref().ok_or(DebateError::NotStarted)?;
        Ok(DebateStatus {
            is_active: session.state.is_active(),
            is_complete: session.state.is_complete(),
            turns_done: session.state.turns_done(),
            turns_total: session.state.turns_total(),
            current_speaker: session.state.current_speaker(),
        })
    }

    /// The live debate state, if any.
    pub fn state(&self) -> Option<&DebateState> {
        self.session.as_ref().map(|session| &session.state)
    }

    /// Ordered transcript of the current debate.
    pub fn transcript(&self) -> &[Message] {
        self.session
            .as_ref()
            .map(|session| session.state.messages())
            .unwrap_or(&[])
    }

    /// Plain-text transcript export with speaker labels.
    pub fn export_transcript(&self) -> Result<String, DebateError> {
        let session = self.session.as_ref().ok_or(DebateError::NotStarted)?;
        Ok(session.state.export_transcript())
    }

    fn retire_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop.store(true, Ordering::SeqCst);
            session.worker.abort();
            // Dropping the session drops the gate and with it the
            // buffer; a blocked producer send fails immediately.
        }
    }
}

impl Drop for DebateOrchestrator {
    fn drop(&mut self) {
        self.retire_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scripted::ScriptedGenerator;
    use std::time::Duration;

    fn test_config(max_turns: u32, lookahead: usize) -> DebateConfig {
        let mut config = DebateConfig::new("Topic X", "Pro", "Con");
        config.max_turns = max_turns;
        config.lookahead = lookahead;
        config
    }

    fn orchestrator(tag: &str) -> (DebateOrchestrator, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(tag));
        let shared: Arc<dyn TurnGenerator> = generator.clone();
        let orchestrator = DebateOrchestrator::with_retry(
            shared,
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
            },
        );
        (orchestrator, generator)
    }

    /// Poll `advance` until a turn is delivered, yielding to the
    /// producer task in between.
    async fn advance_until_delivered(orchestrator: &mut DebateOrchestrator) -> Message {
        loop {
            match orchestrator.advance().expect("advance should not fail") {
                Advance::Delivered(message) => return message,
                Advance::NotReady => tokio::task::yield_now().await,
            }
        }
    }

    #[tokio::test]
    async fn full_debate_runs_to_completion() {
        let (mut orchestrator, _) = orchestrator("d");
        orchestrator
            .start(test_config(4, 16))
            .expect("valid config starts");

        let first = advance_until_delivered(&mut orchestrator).await;
        assert_eq!(first.turn_index, 0);
        assert_eq!(first.speaker, Speaker::DebaterA);

        for _ in 1..8 {
            advance_until_delivered(&mut orchestrator).await;
        }

        let status = orchestrator.status().expect("debate exists");
        assert!(status.is_complete);
        assert_eq!(status.turns_done, 8);
        assert_eq!(status.turns_total, 8);

        // Every further advance is rejected; no extra message appears.
        assert!(matches!(
            orchestrator.advance(),
            Err(DebateError::AlreadyComplete)
        ));
        assert_eq!(orchestrator.transcript().len(), 8);
    }

    #[tokio::test]
    async fn speakers_alternate_across_the_transcript() {
        let (mut orchestrator, _) = orchestrator("d");
        orchestrator.start(test_config(2, 8)).expect("starts");
        for _ in 0..4 {
            advance_until_delivered(&mut orchestrator).await;
        }
        for (i, message) in orchestrator.transcript().iter().enumerate() {
            assert_eq!(message.turn_index, i);
            assert_eq!(message.speaker, Speaker::for_turn(i));
        }
    }

    #[tokio::test]
    async fn advance_when_not_ready_mutates_nothing() {
        let (mut orchestrator, _) = orchestrator("d");
        orchestrator.start(test_config(4, 4)).expect("starts");

        // The producer task has not been polled yet on this runtime, so
        // nothing can be ready.
        assert!(matches!(
            orchestrator.advance().expect("no error"),
            Advance::NotReady
        ));
        let status = orchestrator.status().expect("debate exists");
        assert_eq!(status.turns_done, 0);
        assert_eq!(status.current_speaker, Speaker::DebaterA);
        assert!(orchestrator.transcript().is_empty());
    }

    #[tokio::test]
    async fn advance_without_start_is_rejected() {
        let (mut orchestrator, _) = orchestrator("d");
        assert!(matches!(
            orchestrator.advance(),
            Err(DebateError::NotStarted)
        ));
        assert!(matches!(
            orchestrator.status(),
            Err(DebateError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn stop_halts_generation_but_drains_buffered_turns() {
        let (mut orchestrator, _) = orchestrator("d");
        orchestrator.start(test_config(8, 2)).expect("starts");

        let first = advance_until_delivered(&mut orchestrator).await;
        assert_eq!(first.turn_index, 0);

        orchestrator.stop();
        let status = orchestrator.status().expect("debate exists");
        assert!(!status.is_active);

        // Drain whatever was buffered before the stop was observed.
        let mut idle_polls = 0;
        while idle_polls < 10 {
            match orchestrator.advance().expect("no error") {
                Advance::Delivered(_) => idle_polls = 0,
                Advance::NotReady => {
                    idle_polls += 1;
                    tokio::task::yield_now().await;
                }
            }
        }

        let status = orchestrator.status().expect("debate exists");
        assert!(status.turns_done < status.turns_total);
        assert!(!status.is_complete);
    }

    #[tokio::test]
    async fn restart_discards_previous_debate_entirely() {
        let (mut orchestrator, generator) = orchestrator("d");
        orchestrator.start(test_config(4, 8)).expect("starts");

        let mut first_debate_texts = Vec::new();
        for _ in 0..2 {
            first_debate_texts.push(advance_until_delivered(&mut orchestrator).await.text);
        }

        orchestrator.start(test_config(2, 8)).expect("restarts");
        assert!(orchestrator.transcript().is_empty());

        for _ in 0..4 {
            advance_until_delivered(&mut orchestrator).await;
        }
        let status = orchestrator.status().expect("debate exists");
        assert!(status.is_complete);
        assert_eq!(status.turns_done, 4);

        // The scripted generator emits unique text per call, so any
        // leaked turn from the first debate would show up verbatim.
        for message in orchestrator.transcript() {
            assert!(!first_debate_texts.contains(&message.text));
        }
        assert!(generator.text_calls() >= 6);
    }

    #[tokio::test]
    async fn invalid_config_never_spawns_work() {
        let (mut orchestrator, generator) = orchestrator("d");
        let err = orchestrator
            .start(test_config(0, 4))
            .expect_err("zero turns rejected");
        assert!(matches!(err, DebateError::InvalidConfig(_)));
        tokio::task::yield_now().await;
        assert_eq!(generator.text_calls(), 0);
        assert!(matches!(
            orchestrator.status(),
            Err(DebateError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn degraded_turns_flow_through_to_the_transcript() {
        let (mut orchestrator, generator) = orchestrator("d");
        for _ in 0..3 {
            generator.push_text(Err(crate::error::RemoteError::RateLimited(
                "slow down".into(),
            )));
        }
        orchestrator.start(test_config(1, 4)).expect("starts");

        let first = advance_until_delivered(&mut orchestrator).await;
        assert!(first.degraded);
        let second = advance_until_delivered(&mut orchestrator).await;
        assert!(!second.degraded);
        assert!(orchestrator.status().expect("debate exists").is_complete);
    }
}
