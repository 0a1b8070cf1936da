//! Speaker synthesis backend
//!
//! Bridges a hosted [`Synthesizer`] to local playback: reply text becomes
//! MP3, the MP3 becomes mono samples, and the playback thread reports the
//! utterance lifecycle back through the event channel.

use std::sync::Arc;

use async_trait::async_trait;

use super::playback::{AudioPlayback, decode_mp3};
use super::{SynthesisBackend, SynthesisEvent, Synthesizer, Voice};
use crate::Result;

/// Synthesis backend built on a hosted synthesizer plus the speaker
pub struct SpeakerSynthesis {
    synthesizer: Arc<dyn Synthesizer>,
    playback: AudioPlayback,
    voices: Vec<Voice>,
}

impl SpeakerSynthesis {
    /// Probe the speaker and build the backend
    ///
    /// `voices` is the provider's catalog; it is fixed for the life of the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns error if no usable output device is present
    pub fn probe(synthesizer: Arc<dyn Synthesizer>, voices: Vec<Voice>) -> Result<Self> {
        let playback = AudioPlayback::new()?;
        Ok(Self {
            synthesizer,
            playback,
            voices,
        })
    }
}

#[async_trait]
impl SynthesisBackend for SpeakerSynthesis {
    async fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    async fn speak(
        &self,
        utterance: u64,
        text: &str,
        voice: Option<&Voice>,
        events: tokio::sync::mpsc::Sender<SynthesisEvent>,
    ) -> Result<()> {
        let audio = self.synthesizer.synthesize(text, voice).await?;
        let samples = decode_mp3(&audio)?;

        tracing::debug!(utterance, samples = samples.len(), "starting playback");
        self.playback.play(samples, utterance, events);
        Ok(())
    }

    async fn cancel(&self) {
        self.playback.cancel();
    }

    async fn pause(&self) {
        self.playback.pause();
    }

    async fn resume(&self) {
        self.playback.resume();
    }
}
