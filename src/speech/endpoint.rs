//! Utterance endpointing
//!
//! Splits a live microphone feed into utterance segments using RMS energy:
//! speech starts when energy crosses a threshold and the segment completes
//! after a trailing stretch of silence. Sustained silence with no speech at
//! all ends the listening session.

/// Minimum RMS energy to count as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum segment length to hand to transcription (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that completes a segment (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Idle silence that ends the session (8s at 16kHz)
const SESSION_IDLE_SAMPLES: usize = 128_000;

/// Where the segmenter is in the utterance cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating a speech segment
    Speech,
}

/// Energy-based utterance segmenter
pub struct UtteranceSegmenter {
    state: SegmenterState,
    segment: Vec<f32>,
    silence_counter: usize,
    idle_counter: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            segment: Vec::new(),
            silence_counter: 0,
            idle_counter: 0,
        }
    }

    /// Feed captured samples; returns a completed segment when one ends
    ///
    /// A burst shorter than the minimum segment length is treated as noise
    /// and discarded.
    pub fn process(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.segment.clear();
                    self.segment.extend_from_slice(samples);
                    self.silence_counter = 0;
                    self.idle_counter = 0;
                    tracing::trace!(energy, "speech onset");
                } else {
                    self.idle_counter += samples.len();
                }
            }
            SegmenterState::Speech => {
                self.segment.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    let trailing_silence = self.silence_counter;
                    self.state = SegmenterState::Idle;
                    self.silence_counter = 0;
                    self.idle_counter = 0;

                    // The segment carries its trailing silence; only the
                    // speech portion counts toward the minimum
                    let segment = std::mem::take(&mut self.segment);
                    let speech_len = segment.len().saturating_sub(trailing_silence);
                    if speech_len > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = segment.len(), "utterance segment complete");
                        return Some(segment);
                    }
                    tracing::trace!(samples = speech_len, "segment too short, discarded");
                }
            }
        }

        None
    }

    /// Whether the session has sat in silence long enough to end
    #[must_use]
    pub const fn session_idle(&self) -> bool {
        matches!(self.state, SegmenterState::Idle) && self.idle_counter > SESSION_IDLE_SAMPLES
    }

    /// Reset to a fresh idle state
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.segment.clear();
        self.silence_counter = 0;
        self.idle_counter = 0;
    }

    /// Current segmenter state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

/// RMS energy of a sample slice
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
