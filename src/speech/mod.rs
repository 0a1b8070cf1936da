//! Speech capture and output
//!
//! The platform speech capabilities live behind two traits:
//! [`RecognitionBackend`] (live speech-to-text with start/stop and an event
//! stream) and [`SynthesisBackend`] (text-to-speech with a voice catalog and
//! an utterance lifecycle). The [`SpeechCapture`] and [`SpeechOutput`]
//! wrappers own the observable state the conversation layer reads.
//!
//! Backends are probed once at startup; a wrapper constructed without a
//! backend reports itself as unsupported and turns its controls into no-ops.

pub mod capture;
pub mod endpoint;
pub mod mic;
pub mod playback;
pub mod recognition;
pub mod remote;
pub mod speaker;
pub mod synthesis;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{SegmenterState, UtteranceSegmenter};
pub use mic::MicRecognition;
pub use playback::AudioPlayback;
pub use recognition::SpeechCapture;
pub use remote::{OpenAiSynthesizer, WhisperTranscriber};
pub use speaker::SpeakerSynthesis;
pub use synthesis::{SpeechOutput, choose_default_voice};

/// A synthesis voice in the platform catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Stable identifier within the catalog
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// BCP 47 language tag (e.g. "en-US")
    pub lang: String,
}

/// Events emitted by an active recognition session
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// Full best-guess transcript so far (replaces any previous value)
    Transcript(String),
    /// Session ended on its own (e.g. silence timeout)
    Ended,
    /// Session terminated with an error
    Error(String),
}

/// Events emitted over an utterance's lifetime
#[derive(Debug, Clone)]
pub enum SynthesisEvent {
    /// Audio started for the tagged utterance
    Started { utterance: u64 },
    /// Audio finished for the tagged utterance
    Ended { utterance: u64 },
    /// The tagged utterance failed
    Error { utterance: u64, message: String },
}

/// Live speech-to-text capability with start/stop/event semantics
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Begin a listening session, delivering events to `events`
    ///
    /// The session runs until [`stop`](Self::stop) or until the backend ends
    /// it on its own (sending [`RecognitionEvent::Ended`]).
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot start (e.g. device busy)
    async fn start(&self, events: mpsc::Sender<RecognitionEvent>) -> Result<()>;

    /// End the current session; safe to call when not listening
    async fn stop(&self);
}

/// Text-to-speech capability with a voice catalog and one-utterance queue
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Enumerate available voices; may be empty until the catalog loads
    async fn voices(&self) -> Vec<Voice>;

    /// Synthesize and play `text`, tagging lifecycle events with `utterance`
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be enqueued
    async fn speak(
        &self,
        utterance: u64,
        text: &str,
        voice: Option<&Voice>,
        events: mpsc::Sender<SynthesisEvent>,
    ) -> Result<()>;

    /// Stop any in-flight utterance immediately; idempotent
    async fn cancel(&self);

    /// Pause in-flight audio without discarding it
    async fn pause(&self);

    /// Resume paused audio
    async fn resume(&self);
}

/// Turns a WAV utterance segment into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Turns reply text into playable audio
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, voice: Option<&Voice>) -> Result<Vec<u8>>;
}
