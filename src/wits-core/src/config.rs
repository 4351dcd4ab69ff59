//! Debate configuration: personas, formats, and validation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DebateError;

/// Voices the speech endpoint accepts.
pub const AVAILABLE_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Upper bound on tokens per generated turn.
pub const MAX_RESPONSE_TOKENS: u32 = 500;

/// A named debate participant with a fixed stance and TTS voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    /// The position this persona defends, in plain text.
    pub stance: String,
    /// Voice identifier for speech synthesis.
    pub voice: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        stance: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stance: stance.into(),
            voice: voice.into(),
        }
    }
}

/// Debate format. Shapes the prompts only; the pipeline behaves
/// identically for every format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DebateFormat {
    #[default]
    Formal,
    Casual,
    RapidFire,
    Roleplay,
}

impl DebateFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "formal" => Some(Self::Formal),
            "casual" => Some(Self::Casual),
            "rapid-fire" | "rapid_fire" | "rapidfire" => Some(Self::RapidFire),
            "roleplay" => Some(Self::Roleplay),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Formal => "Formal",
            Self::Casual => "Casual",
            Self::RapidFire => "Rapid-Fire",
            Self::Roleplay => "Roleplay",
        }
    }

    /// Style block inserted into the system prompt.
    pub fn style_instructions(&self) -> &'static str {
        match self {
            Self::Formal => {
                "STYLE: This is a formal structured debate. Use measured, professional \
                 language befitting a podium. Build arguments with clear premises and \
                 conclusions."
            }
            Self::Casual => {
                "STYLE: This is a casual conversational debate. Speak naturally, as if \
                 discussing over coffee. Contractions and plain language are welcome; \
                 keep it friendly but pointed."
            }
            Self::RapidFire => {
                "STYLE: This is a rapid-fire debate. Keep every response short and \
                 punchy. One or two sharp points per turn, no preamble."
            }
            Self::Roleplay => {
                "STYLE: This is a roleplay debate. Fully embody your persona's \
                 character, mannerisms, and worldview in every response."
            }
        }
    }

    pub fn all() -> &'static [DebateFormat] {
        &[
            Self::Formal,
            Self::Casual,
            Self::RapidFire,
            Self::Roleplay,
        ]
    }
}

/// Configuration for a debate session. Immutable once the debate starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// The debate topic.
    pub topic: String,
    pub persona_a: Persona,
    pub persona_b: Persona,
    #[serde(default)]
    pub format: DebateFormat,
    /// Turns per debater; total messages = max_turns * 2.
    pub max_turns: u32,
    /// Chat model identifier.
    pub model: String,
    pub temperature: f32,
    /// Speech playback speed, 0.25..=4.0.
    pub tts_speed: f32,
    /// How many turns the generator may run ahead of consumption.
    pub lookahead: usize,
}

impl DebateConfig {
    /// Build a config with the stock defaults for everything beyond
    /// topic and stances.
    pub fn new(
        topic: impl Into<String>,
        stance_a: impl Into<String>,
        stance_b: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            persona_a: Persona::new("Debater A", stance_a, "alloy"),
            persona_b: Persona::new("Debater B", stance_b, "echo"),
            format: DebateFormat::Formal,
            max_turns: 8,
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            tts_speed: 1.0,
            lookahead: 3,
        }
    }

    /// Total number of messages in a complete debate.
    pub fn total_messages(&self) -> usize {
        self.max_turns as usize * 2
    }

    /// Validate the configuration before any background work begins.
    pub fn validate(&self) -> Result<(), DebateError> {
        if self.topic.trim().is_empty() {
            return Err(DebateError::InvalidConfig("topic must not be empty".into()));
        }
        if self.persona_a.stance.trim().is_empty() {
            return Err(DebateError::InvalidConfig(format!(
                "{} has an empty stance",
                self.persona_a.name
            )));
        }
        if self.persona_b.stance.trim().is_empty() {
            return Err(DebateError::InvalidConfig(format!(
                "{} has an empty stance",
                self.persona_b.name
            )));
        }
        if self.max_turns < 1 {
            return Err(DebateError::InvalidConfig(
                "max_turns must be at least 1".into(),
            ));
        }
        if self.lookahead < 1 {
            return Err(DebateError::InvalidConfig(
                "lookahead must be at least 1".into(),
            ));
        }
        if !(0.25..=4.0).contains(&self.tts_speed) {
            return Err(DebateError::InvalidConfig(format!(
                "tts_speed {} outside supported range 0.25-4.0",
                self.tts_speed
            )));
        }
        for persona in [&self.persona_a, &self.persona_b] {
            if !AVAILABLE_VOICES.contains(&persona.voice.as_str()) {
                return Err(DebateError::InvalidConfig(format!(
                    "unknown voice '{}' for {}. Available voices: {}",
                    persona.voice,
                    persona.name,
                    AVAILABLE_VOICES.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// API endpoint settings for the generation service.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    pub api_key: String,
}

impl ApiSettings {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

/// Optional defaults file, merged under CLI flags.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Defaults {
    #[serde(default)]
    pub debate: DebateDefaults,
    #[serde(default)]
    pub voices: VoiceDefaults,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DebateDefaults {
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub format: Option<String>,
    pub temperature: Option<f32>,
    pub lookahead: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VoiceDefaults {
    pub voice_a: Option<String>,
    pub voice_b: Option<String>,
    pub speed: Option<f32>,
}

impl Defaults {
    /// Load defaults from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::InvalidConfig(format!("failed to read defaults: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| DebateError::InvalidConfig(format!("failed to parse defaults: {e}")))
    }

    /// Apply these defaults to a config, leaving already-set fields alone
    /// only where the caller passes them explicitly; here we simply
    /// overwrite the stock values.
    pub fn apply(&self, config: &mut DebateConfig) {
        if let Some(model) = &self.debate.model {
            config.model = model.clone();
        }
        if let Some(turns) = self.debate.max_turns {
            config.max_turns = turns;
        }
        if let Some(format) = self.debate.format.as_deref().and_then(DebateFormat::parse) {
            config.format = format;
        }
        if let Some(temperature) = self.debate.temperature {
            config.temperature = temperature;
        }
        if let Some(lookahead) = self.debate.lookahead {
            config.lookahead = lookahead;
        }
        if let Some(voice) = &self.voices.voice_a {
            config.persona_a.voice = voice.clone();
        }
        if let Some(voice) = &self.voices.voice_b {
            config.persona_b.voice = voice.clone();
        }
        if let Some(speed) = self.voices.speed {
            config.tts_speed = speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DebateConfig {
        DebateConfig::new(
            "Should AI be open source?",
            "AI should be open source",
            "AI should remain proprietary",
        )
    }

    #[test]
    fn stock_config_is_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_topic_rejected() {
        let mut config = valid_config();
        config.topic = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(DebateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_stance_rejected() {
        let mut config = valid_config();
        config.persona_b.stance = String::new();
        assert!(matches!(
            config.validate(),
            Err(DebateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_turns_rejected() {
        let mut config = valid_config();
        config.max_turns = 0;
        assert!(matches!(
            config.validate(),
            Err(DebateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_voice_rejected() {
        let mut config = valid_config();
        config.persona_a.voice = "hal9000".to_string();
        assert!(matches!(
            config.validate(),
            Err(DebateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn speed_out_of_range_rejected() {
        let mut config = valid_config();
        config.tts_speed = 5.0;
        assert!(matches!(
            config.validate(),
            Err(DebateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn total_messages_doubles_turns() {
        let mut config = valid_config();
        config.max_turns = 4;
        assert_eq!(config.total_messages(), 8);
    }

    #[test]
    fn format_parse_accepts_aliases() {
        assert_eq!(
            DebateFormat::parse("rapid-fire"),
            Some(DebateFormat::RapidFire)
        );
        assert_eq!(DebateFormat::parse("FORMAL"), Some(DebateFormat::Formal));
        assert_eq!(DebateFormat::parse("oxford"), None);
    }

    #[test]
    fn defaults_file_overrides_stock_values() {
        let defaults: Defaults = toml::from_str(
            r#"
            [debate]
            model = "gpt-4o-mini"
            max_turns = 4
            format = "casual"

            [voices]
            voice_a = "nova"
            speed = 1.25
            "#,
        )
        .expect("defaults should parse");

        let mut config = valid_config();
        defaults.apply(&mut config);

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_turns, 4);
        assert_eq!(config.format, DebateFormat::Casual);
        assert_eq!(config.persona_a.voice, "nova");
        assert_eq!(config.persona_b.voice, "echo");
        assert_eq!(config.tts_speed, 1.25);
    }
}
