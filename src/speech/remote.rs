//! Hosted speech services
//!
//! Whisper turns WAV segments into text and the speech endpoint turns reply
//! text into MP3 audio. Both return the provider's status and body verbatim
//! on failure so the cause is visible in the error field upstream.

use async_trait::async_trait;

use super::{Synthesizer, Transcriber, Voice};
use crate::{Error, Result};

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV segments via the `OpenAI` Whisper API
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    /// Create a Whisper transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Recognition(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Recognition(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Whisper response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

/// Synthesizes reply text to MP3 via the `OpenAI` speech API
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSynthesizer {
    /// Create a speech synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }

    /// The provider's fixed voice catalog
    ///
    /// The speech API has no enumeration endpoint, so the known voice names
    /// are listed here. All are English-leaning multilingual voices.
    #[must_use]
    pub fn provider_voices() -> Vec<Voice> {
        ["alloy", "echo", "fable", "onyx", "nova", "shimmer"]
            .into_iter()
            .map(|id| Voice {
                id: id.to_string(),
                name: id.to_string(),
                lang: "en-US".to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str, voice: Option<&Voice>) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let voice_id = voice.map_or("alloy", |v| v.id.as_str());
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: voice_id,
        };

        tracing::debug!(voice = voice_id, chars = text.len(), "starting synthesis");

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech API error");
            return Err(Error::Synthesis(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_rejected() {
        assert!(WhisperTranscriber::new(String::new(), "whisper-1".to_string()).is_err());
        assert!(OpenAiSynthesizer::new(String::new(), "tts-1".to_string()).is_err());
    }

    #[test]
    fn provider_catalog_is_english() {
        let voices = OpenAiSynthesizer::provider_voices();
        assert!(!voices.is_empty());
        assert!(voices.iter().all(|v| v.lang == "en-US"));
    }
}
