//! Debate state: the authoritative record of a debate instance.

use serde::{Deserialize, Serialize};

use crate::config::DebateConfig;
use crate::error::DebateError;

/// Which debater speaks a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    DebaterA,
    DebaterB,
}

impl Speaker {
    /// Fixed alternation: A on even indices, B on odd.
    pub fn for_turn(turn_index: usize) -> Self {
        if turn_index % 2 == 0 {
            Speaker::DebaterA
        } else {
            Speaker::DebaterB
        }
    }

    pub fn other(self) -> Self {
        match self {
            Speaker::DebaterA => Speaker::DebaterB,
            Speaker::DebaterB => Speaker::DebaterA,
        }
    }
}

/// Phase of the debate a turn belongs to. Shapes the prompt for that turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Opening,
    Rebuttal,
    Closing,
}

impl TurnKind {
    /// Derive the turn kind from the 0-based message index. Both debaters
    /// in a round share the same kind; the first two rounds are openings
    /// and the last two are closings.
    pub fn for_turn(turn_index: usize, max_turns: u32) -> Self {
        let round = turn_index / 2 + 1;
        if round <= 2 {
            TurnKind::Opening
        } else if round >= max_turns as usize - 1 {
            TurnKind::Closing
        } else {
            TurnKind::Rebuttal
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TurnKind::Opening => "opening",
            TurnKind::Rebuttal => "rebuttal",
            TurnKind::Closing => "closing",
        }
    }
}

/// Token accounting for a generated turn. Informational only; never
/// drives control flow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// A single message in the debate transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic, 0-based position in the debate.
    pub turn_index: usize,
    pub speaker: Speaker,
    pub text: String,
    /// Synthesized speech; `None` when synthesis failed.
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
    #[serde(default)]
    pub usage: TokenUsage,
    /// True when the text is a fallback placeholder or the audio is
    /// missing after exhausting retries.
    #[serde(default)]
    pub degraded: bool,
}

/// Current state of an ongoing debate.
///
/// Mutated only by the orchestrator's `advance` path; the background
/// generator never touches it.
#[derive(Debug, Clone)]
pub struct DebateState {
    config: DebateConfig,
    messages: Vec<Message>,
    current_speaker: Speaker,
    is_active: bool,
    is_complete: bool,
}

impl DebateState {
    /// Start a fresh debate from a validated configuration.
    pub fn start(config: DebateConfig) -> Result<Self, DebateError> {
        config.validate()?;
        Ok(Self {
            config,
            messages: Vec::new(),
            current_speaker: Speaker::DebaterA,
            is_active: true,
            is_complete: false,
        })
    }

    /// Append the next message. The message must carry exactly the next
    /// expected turn index; anything else means the buffer delivered out
    /// of sequence.
    pub fn append(&mut self, message: Message) -> Result<(), DebateError> {
        let expected = self.messages.len();
        if message.turn_index != expected {
            return Err(DebateError::OutOfOrder {
                expected,
                actual: message.turn_index,
            });
        }
        self.messages.push(message);
        self.current_speaker = self.current_speaker.other();
        self.is_complete = self.messages.len() == self.config.total_messages();
        Ok(())
    }

    /// Stop the debate. Idempotent; the transcript is kept so a stopped
    /// or completed debate remains displayable.
    pub fn stop(&mut self) {
        self.is_active = false;
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_speaker(&self) -> Speaker {
        self.current_speaker
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn turns_done(&self) -> usize {
        self.messages.len()
    }

    pub fn turns_total(&self) -> usize {
        self.config.total_messages()
    }

    /// Persona speaking a given side.
    pub fn persona(&self, speaker: Speaker) -> &crate::config::Persona {
        match speaker {
            Speaker::DebaterA => &self.config.persona_a,
            Speaker::DebaterB => &self.config.persona_b,
        }
    }

    /// Plain-text transcript with speaker labels, for export.
    pub fn export_transcript(&self) -> String {
        let mut out = format!("Topic: {}\n", self.config.topic);
        out.push_str(&format!(
            "{}: {}\n{}: {}\n\n",
            self.config.persona_a.name,
            self.config.persona_a.stance,
            self.config.persona_b.name,
            self.config.persona_b.stance
        ));
        for message in &self.messages {
            let persona = self.persona(message.speaker);
            let marker = if message.degraded { " [degraded]" } else { "" };
            out.push_str(&format!(
                "[Turn {}] {}{}:\n{}\n\n",
                message.turn_index + 1,
                persona.name,
                marker,
                message.text
            ));
        }
        out
    }

    /// Structured transcript export (audio omitted).
    pub fn export_transcript_json(&self) -> Result<String, DebateError> {
        serde_json::to_string_pretty(&self.messages)
            .map_err(|e| DebateError::Internal(format!("transcript serialization failed: {e}")))
    }
}
