//! Speech capture wrapper
//!
//! [`SpeechCapture`] owns the observable recognition state: a listening flag,
//! the live transcript, and a string error field. Failures never surface as
//! panics or returned errors; callers read the error field, so start/stop
//! are safe to call unconditionally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{RecognitionBackend, RecognitionEvent};

/// Buffered recognition events per session
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// State of one listening session
#[derive(Debug, Default, Clone)]
struct RecognitionState {
    listening: bool,
    transcript: String,
    error: Option<String>,
}

/// Wraps a recognition backend into observable conversation-facing state
///
/// Each recognition event replaces the exposed transcript with the full
/// best-guess text so far. Starting a new session supersedes the previous
/// one: a generation counter makes late events from a replaced session
/// harmless.
pub struct SpeechCapture {
    backend: Option<Arc<dyn RecognitionBackend>>,
    state: Arc<Mutex<RecognitionState>>,
    generation: Arc<AtomicU64>,
}

impl SpeechCapture {
    /// Create a new capture wrapper; `None` means recognition is unsupported
    #[must_use]
    pub fn new(backend: Option<Arc<dyn RecognitionBackend>>) -> Self {
        if backend.is_none() {
            tracing::info!("speech recognition unsupported, text entry only");
        }
        Self {
            backend,
            state: Arc::new(Mutex::new(RecognitionState::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a recognition backend is available
    ///
    /// Computed once at construction; when false, start/stop are no-ops.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    /// Begin a listening session
    ///
    /// Clears the transcript and error, then asks the backend to start. A
    /// start failure is recorded in the error field; nothing is thrown.
    pub fn start(&self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Ok(mut state) = self.state.lock() {
            state.transcript.clear();
            state.error = None;
            state.listening = true;
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.spawn_session_pump(generation, rx);

        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            if let Err(e) = backend.start(tx).await {
                tracing::warn!(error = %e, "recognition failed to start");
                if current.load(Ordering::SeqCst) == generation {
                    if let Ok(mut s) = state.lock() {
                        s.error = Some(e.to_string());
                        s.listening = false;
                    }
                }
            } else {
                tracing::debug!(generation, "recognition session started");
            }
        });
    }

    /// End the current session; idempotent, safe when not listening
    pub fn stop(&self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        if let Ok(mut state) = self.state.lock() {
            if !state.listening {
                return;
            }
            state.listening = false;
        }

        tokio::spawn(async move {
            backend.stop().await;
        });
        tracing::debug!("recognition session stopped");
    }

    /// Apply session events to observable state, dropping stale generations
    fn spawn_session_pump(&self, generation: u64, mut rx: mpsc::Receiver<RecognitionEvent>) {
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if current.load(Ordering::SeqCst) != generation {
                    // A newer session replaced this one
                    return;
                }

                let Ok(mut s) = state.lock() else { return };
                match event {
                    RecognitionEvent::Transcript(text) => {
                        s.transcript = text;
                    }
                    RecognitionEvent::Ended => {
                        // Transcript stays intact so the caller can submit it
                        s.listening = false;
                        tracing::debug!(generation, "recognition session ended on its own");
                        return;
                    }
                    RecognitionEvent::Error(message) => {
                        tracing::warn!(generation, error = %message, "recognition error");
                        s.error = Some(message);
                        s.listening = false;
                        return;
                    }
                }
            }
        });
    }

    /// Current best-guess transcript of the active (or last) session
    #[must_use]
    pub fn transcript(&self) -> String {
        self.state
            .lock()
            .map(|s| s.transcript.clone())
            .unwrap_or_default()
    }

    /// Whether a session is currently active
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state.lock().map(|s| s.listening).unwrap_or_default()
    }

    /// Last recognition error, if any
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state
            .lock()
            .map(|s| s.error.clone())
            .unwrap_or_default()
    }
}
