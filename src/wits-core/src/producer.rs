//! Background turn production.
//!
//! One task per debate generates turns ahead of consumption, up to the
//! configured look-ahead depth, and never past the total turn count.
//! Remote failures are retried with backoff and then degraded to a
//! placeholder so a bad API call never halts the debate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DebateConfig;
use crate::error::RemoteError;
use crate::generator::{SpeechRequest, TextRequest, TurnGenerator};
use crate::prompts;
use crate::state::{Message, Speaker, TokenUsage};

/// Bounded retry with doubling backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (1-based attempt that just failed).
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// End state of one turn's text generation.
enum TextOutcome {
    Succeeded { text: String, usage: TokenUsage },
    Degraded { text: String },
}

/// Spawn the background producer for a debate. Returns the ordered turn
/// buffer (capacity = look-ahead depth) and the worker handle.
pub fn spawn(
    config: DebateConfig,
    generator: Arc<dyn TurnGenerator>,
    retry: RetryPolicy,
    stop: Arc<AtomicBool>,
) -> (mpsc::Receiver<Message>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.lookahead);
    let worker = tokio::spawn(async move {
        run(config, generator, retry, stop, tx).await;
    });
    (rx, worker)
}

async fn run(
    config: DebateConfig,
    generator: Arc<dyn TurnGenerator>,
    retry: RetryPolicy,
    stop: Arc<AtomicBool>,
    tx: mpsc::Sender<Message>,
) {
    let total = config.total_messages();
    // The producer's own view of the debate, including turns the consumer
    // has not yet taken. Later prompts depend on it.
    let mut transcript: Vec<Message> = Vec::with_capacity(total);

    info!(total_turns = total, lookahead = config.lookahead, "turn production started");

    for turn_index in 0..total {
        if stop.load(Ordering::SeqCst) {
            info!(turn_index, "stop observed, ending production");
            break;
        }

        let message = produce_turn(&config, generator.as_ref(), &retry, turn_index, &transcript)
            .await;
        transcript.push(message.clone());

        // Bounded send is the backpressure point; a closed channel means
        // the consumer retired this debate.
        if tx.send(message).await.is_err() {
            debug!(turn_index, "buffer closed, ending production");
            break;
        }
    }

    info!(produced = transcript.len(), "turn production finished");
}

async fn produce_turn(
    config: &DebateConfig,
    generator: &dyn TurnGenerator,
    retry: &RetryPolicy,
    turn_index: usize,
    transcript: &[Message],
) -> Message {
    let speaker = Speaker::for_turn(turn_index);
    debug!(turn_index, ?speaker, "generating turn");

    let request = TextRequest {
        system_prompt: prompts::system_prompt(config, turn_index),
        user_prompt: prompts::user_prompt(config, transcript),
        model: config.model.clone(),
        temperature: config.temperature,
    };

    let (text, usage, mut degraded) =
        match generate_with_retry(config, generator, retry, turn_index, &request).await {
            TextOutcome::Succeeded { text, usage } => (text, usage, false),
            TextOutcome::Degraded { text } => (text, TokenUsage::default(), true),
        };

    let voice = match speaker {
        Speaker::DebaterA => config.persona_a.voice.clone(),
        Speaker::DebaterB => config.persona_b.voice.clone(),
    };
    let speech = SpeechRequest {
        text: text.clone(),
        voice,
        speed: config.tts_speed,
    };

    // Audio failure never fails the turn; the message proceeds without it.
    let audio = match generator.synthesize_speech(&speech).await {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(turn_index, error = %err, "speech synthesis failed, delivering turn without audio");
            degraded = true;
            None
        }
    };

    Message {
        turn_index,
        speaker,
        text,
        audio,
        usage,
        degraded,
    }
}

/// Retry-then-degrade state loop for one turn's text. An empty response
/// counts as a failure.
async fn generate_with_retry(
    config: &DebateConfig,
    generator: &dyn TurnGenerator,
    retry: &RetryPolicy,
    turn_index: usize,
    request: &TextRequest,
) -> TextOutcome {
    let mut last_error: Option<RemoteError> = None;

    for attempt in 1..=retry.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(retry.delay_after(attempt - 1)).await;
        }

        match generator.generate_text(request).await {
            Ok(response) if !response.text.trim().is_empty() => {
                return TextOutcome::Succeeded {
                    text: response.text,
                    usage: response.usage,
                };
            }
            Ok(_) => {
                warn!(turn_index, attempt, "empty response from generator");
                last_error = Some(RemoteError::Connection("empty response".into()));
            }
            Err(err) => {
                warn!(turn_index, attempt, error = %err, "text generation failed");
                last_error = Some(err);
            }
        }
    }

    warn!(
        turn_index,
        attempts = retry.max_attempts,
        error = last_error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
        "retries exhausted, delivering degraded turn"
    );
    TextOutcome::Degraded {
        text: prompts::fallback_text(config, turn_index),
    }
}
