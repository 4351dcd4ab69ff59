//! The turn generation service boundary.
//!
//! `TurnGenerator` is the opaque remote collaborator that turns a prompt
//! into argument text and text into speech. `OpenAiGenerator` is the
//! production implementation over an OpenAI-compatible API.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::audio::{CreateSpeechRequestArgs, SpeechModel, Voice};
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

use crate::config::{ApiSettings, MAX_RESPONSE_TOKENS};
use crate::error::RemoteError;
use crate::state::TokenUsage;

/// A text generation request for one debate turn.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
}

/// Generated text plus its token accounting.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// A speech synthesis request for one turn's text.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
}

/// The black-box generation service. Both calls may fail with any
/// `RemoteError`; retry policy is the caller's concern.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse, RemoteError>;

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, RemoteError>;
}

/// Production generator backed by an OpenAI-compatible API.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
}

impl OpenAiGenerator {
    /// Build a generator from API settings. The HTTP client carries
    /// explicit timeouts and tolerates self-signed certificates so local
    /// gateways work.
    pub fn new(settings: &ApiSettings) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RemoteError::Connection(format!("failed to create HTTP client: {e}")))?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
        })
    }
}

#[async_trait]
impl TurnGenerator for OpenAiGenerator {
    async fn generate_text(&self, request: &TextRequest) -> Result<TextResponse, RemoteError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: request.system_prompt.clone().into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: request.user_prompt.clone().into(),
                name: None,
            }),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .max_completion_tokens(MAX_RESPONSE_TOKENS)
            .temperature(request.temperature)
            .messages(messages)
            .build()
            .map_err(|e| RemoteError::from_openai(&e))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| RemoteError::from_openai(&e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        debug!(
            model = %request.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "chat completion finished"
        );

        Ok(TextResponse {
            text: sanitize_response(&content),
            usage,
        })
    }

    async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, RemoteError> {
        let voice = voice_from_id(&request.voice).ok_or_else(|| {
            RemoteError::Connection(format!("unknown speech voice '{}'", request.voice))
        })?;

        let speech_request = CreateSpeechRequestArgs::default()
            .model(SpeechModel::Tts1)
            .voice(voice)
            .input(&request.text)
            .speed(request.speed)
            .build()
            .map_err(|e| RemoteError::from_openai(&e))?;

        let response = self
            .client
            .audio()
            .speech()
            .create(speech_request)
            .await
            .map_err(|e| RemoteError::from_openai(&e))?;

        debug!(
            voice = %request.voice,
            characters = request.text.len(),
            bytes = response.bytes.len(),
            "speech synthesis finished"
        );

        Ok(response.bytes.to_vec())
    }
}

/// Map a voice identifier to the API's voice enum.
fn voice_from_id(id: &str) -> Option<Voice> {
    match id {
        "alloy" => Some(Voice::Alloy),
        "echo" => Some(Voice::Echo),
        "fable" => Some(Voice::Fable),
        "onyx" => Some(Voice::Onyx),
        "nova" => Some(Voice::Nova),
        "shimmer" => Some(Voice::Shimmer),
        _ => None,
    }
}

/// Strip reasoning tags and markdown from model output before it is
/// spoken aloud.
pub fn sanitize_response(response: &str) -> String {
    let tags_to_strip = ["thinking", "think", "reflection", "reasoning", "analysis"];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>");
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Orphaned opening or closing tags left behind.
    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result = result.replace('*', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}

#[cfg(test)]
pub(crate) mod scripted {
    //! An in-memory generator for pipeline tests: plays back a queue of
    //! scripted outcomes, then produces tagged filler text.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct ScriptedGenerator {
        tag: String,
        text_outcomes: Mutex<VecDeque<Result<String, RemoteError>>>,
        speech_outcomes: Mutex<VecDeque<Result<Vec<u8>, RemoteError>>>,
        text_calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        pub fn new(tag: impl Into<String>) -> Self {
            Self {
                tag: tag.into(),
                text_outcomes: Mutex::new(VecDeque::new()),
                speech_outcomes: Mutex::new(VecDeque::new()),
                text_calls: AtomicUsize::new(0),
            }
        }

        pub fn push_text(&self, outcome: Result<String, RemoteError>) {
            self.text_outcomes
                .lock()
                .expect("lock poisoned")
                .push_back(outcome);
        }

        pub fn push_speech(&self, outcome: Result<Vec<u8>, RemoteError>) {
            self.speech_outcomes
                .lock()
                .expect("lock poisoned")
                .push_back(outcome);
        }

        pub fn text_calls(&self) -> usize {
            self.text_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TurnGenerator for ScriptedGenerator {
        async fn generate_text(&self, _request: &TextRequest) -> Result<TextResponse, RemoteError> {
            let call = self.text_calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self
                .text_outcomes
                .lock()
                .expect("lock poisoned")
                .pop_front();
            match scripted {
                Some(Ok(text)) => Ok(TextResponse {
                    text,
                    usage: TokenUsage {
                        input_tokens: 10,
                        output_tokens: 20,
                        total_tokens: 30,
                    },
                }),
                Some(Err(err)) => Err(err),
                None => Ok(TextResponse {
                    text: format!("{} argument {}", self.tag, call),
                    usage: TokenUsage::default(),
                }),
            }
        }

        async fn synthesize_speech(
            &self,
            request: &SpeechRequest,
        ) -> Result<Vec<u8>, RemoteError> {
            let scripted = self
                .speech_outcomes
                .lock()
                .expect("lock poisoned")
                .pop_front();
            match scripted {
                Some(outcome) => outcome,
                None => Ok(request.text.as_bytes().to_vec()),
            }
        }
    }
}
