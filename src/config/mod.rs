//! Configuration management for the Parley widget
//!
//! Layering is env > TOML file > default. Capability enablement is resolved
//! here, once, at process start; the speech wrappers then treat a missing
//! backend as a permanent "unsupported" flag rather than re-probing per call.

pub mod file;

use crate::Result;

/// Default STT model
const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Default TTS model
const DEFAULT_TTS_MODEL: &str = "tts-1";

/// Parley widget configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice configuration
    pub voice: VoiceConfig,

    /// Speak replies aloud automatically
    pub auto_speak: bool,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice processing configuration
#[derive(Debug, Clone, Default)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// Preferred TTS voice identifier; None picks the default chain
    pub voice: Option<String>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper STT and TTS)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        // Load optional TOML config file (env > toml > default)
        let fc = file::load_config_file();

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
        };

        let voice_enabled = if disable_voice {
            false
        } else {
            std::env::var("PARLEY_VOICE_ENABLED")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.voice.enabled)
                .unwrap_or(true)
        };

        let voice = VoiceConfig {
            enabled: voice_enabled,
            stt_model: std::env::var("PARLEY_STT_MODEL")
                .ok()
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            tts_model: std::env::var("PARLEY_TTS_MODEL")
                .ok()
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            voice: std::env::var("PARLEY_TTS_VOICE").ok().or(fc.voice.voice),
        };

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        let auto_speak = std::env::var("PARLEY_AUTO_SPEAK")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(fc.chat.auto_speak)
            .unwrap_or(true);

        Ok(Self {
            voice,
            auto_speak,
            api_keys,
        })
    }
}
