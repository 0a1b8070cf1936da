//! Microphone recognition backend
//!
//! Drives live speech-to-text from the default microphone: a capture thread
//! owns the cpal input stream and segments the feed into utterances, and an
//! async session task transcribes each segment and republishes the running
//! transcript. Each transcript event carries the full text so far, so a
//! consumer can always replace rather than append.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::endpoint::UtteranceSegmenter;
use super::{RecognitionBackend, RecognitionEvent, Transcriber};
use crate::{Error, Result};

/// How often the capture thread drains the microphone buffer
const CAPTURE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Buffered utterance segments between capture thread and session task
const SEGMENT_CHANNEL_CAPACITY: usize = 8;

/// What the capture thread hands to the session task
enum CaptureMessage {
    /// A completed utterance segment
    Segment(Vec<f32>),
    /// The session went idle (sustained silence)
    Idle,
}

/// Recognition backend built on the microphone plus a hosted transcriber
pub struct MicRecognition {
    transcriber: Arc<dyn Transcriber>,
    session_stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl MicRecognition {
    /// Probe the microphone and build the backend
    ///
    /// # Errors
    ///
    /// Returns error if no usable input device is present
    pub fn probe(transcriber: Arc<dyn Transcriber>) -> Result<Self> {
        // Open and drop once so a missing device surfaces at startup
        drop(AudioCapture::new()?);

        Ok(Self {
            transcriber,
            session_stop: Mutex::new(None),
        })
    }

    fn replace_session(&self, stop: Arc<AtomicBool>) {
        if let Ok(mut slot) = self.session_stop.lock() {
            if let Some(previous) = slot.replace(stop) {
                previous.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[async_trait]
impl RecognitionBackend for MicRecognition {
    async fn start(&self, events: mpsc::Sender<RecognitionEvent>) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        self.replace_session(Arc::clone(&stop));

        let (segments_tx, mut segments_rx) = mpsc::channel(SEGMENT_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread_stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("parley-capture".to_string())
            .spawn(move || {
                capture_thread(&thread_stop, &segments_tx, &ready_tx);
            })
            .map_err(|e| Error::Audio(e.to_string()))?;

        // The capture thread opens the device; wait for its verdict
        tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| Error::Recognition(e.to_string()))?
            .map_err(|_| Error::Audio("capture thread died during init".to_string()))??;

        let transcriber = Arc::clone(&self.transcriber);
        let session_stop = Arc::clone(&stop);
        tokio::spawn(async move {
            let mut transcript = String::new();

            while let Some(message) = segments_rx.recv().await {
                match message {
                    CaptureMessage::Segment(samples) => {
                        let text = match transcribe_segment(&transcriber, &samples).await {
                            Ok(text) => text,
                            Err(e) => {
                                session_stop.store(true, Ordering::SeqCst);
                                let _ = events
                                    .send(RecognitionEvent::Error(e.to_string()))
                                    .await;
                                return;
                            }
                        };

                        let text = text.trim();
                        if text.is_empty() {
                            continue;
                        }
                        if !transcript.is_empty() {
                            transcript.push(' ');
                        }
                        transcript.push_str(text);

                        if events
                            .send(RecognitionEvent::Transcript(transcript.clone()))
                            .await
                            .is_err()
                        {
                            session_stop.store(true, Ordering::SeqCst);
                            return;
                        }
                    }
                    CaptureMessage::Idle => {
                        tracing::debug!("listening session idle, ending");
                        let _ = events.send(RecognitionEvent::Ended).await;
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    async fn stop(&self) {
        if let Ok(slot) = self.session_stop.lock() {
            if let Some(stop) = slot.as_ref() {
                stop.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Encode a segment as WAV and transcribe it
async fn transcribe_segment(transcriber: &Arc<dyn Transcriber>, samples: &[f32]) -> Result<String> {
    let wav = samples_to_wav(samples, SAMPLE_RATE)?;
    transcriber.transcribe(wav).await
}

/// Capture thread: drain the microphone and emit utterance segments
fn capture_thread(
    stop: &AtomicBool,
    segments: &mpsc::Sender<CaptureMessage>,
    ready: &std::sync::mpsc::Sender<Result<()>>,
) {
    let mut capture = match AudioCapture::new().and_then(|mut c| {
        c.start()?;
        Ok(c)
    }) {
        Ok(capture) => {
            let _ = ready.send(Ok(()));
            capture
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut segmenter = UtteranceSegmenter::new();

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(CAPTURE_POLL_INTERVAL);

        let samples = capture.take_buffer();
        if let Some(segment) = segmenter.process(&samples) {
            if segments
                .blocking_send(CaptureMessage::Segment(segment))
                .is_err()
            {
                break;
            }
        }

        if segmenter.session_idle() {
            let _ = segments.blocking_send(CaptureMessage::Idle);
            break;
        }
    }

    capture.stop();
    tracing::debug!("capture thread exiting");
}
