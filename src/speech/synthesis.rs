//! Speech output wrapper
//!
//! [`SpeechOutput`] owns the observable synthesis state: the voice catalog
//! and selection, the speaking and paused flags, and a string error field.
//! At most one utterance is ever audible: a new speak request cancels the
//! previous one, and lifecycle events are tagged with an utterance id so a
//! superseded utterance cannot flip the flags.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use super::{SynthesisBackend, SynthesisEvent, Voice};

/// Buffered synthesis lifecycle events
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Observable synthesis state
#[derive(Debug, Default, Clone)]
struct SynthesisState {
    voices: Vec<Voice>,
    selected: Option<String>,
    speaking: bool,
    paused: bool,
    error: Option<String>,
}

/// Wraps a synthesis backend into observable conversation-facing state
pub struct SpeechOutput {
    backend: Option<Arc<dyn SynthesisBackend>>,
    state: Arc<Mutex<SynthesisState>>,
    utterance_seq: Arc<AtomicU64>,
    events_tx: mpsc::Sender<SynthesisEvent>,
    changed_tx: Arc<watch::Sender<u64>>,
}

impl SpeechOutput {
    /// Create a new output wrapper; `None` means synthesis is unsupported
    ///
    /// The voice catalog is queried immediately; backends that load voices
    /// lazily report an empty catalog first and the wrapper picks up the rest
    /// via [`reload_voices`](Self::reload_voices).
    #[must_use]
    pub fn new(backend: Option<Arc<dyn SynthesisBackend>>) -> Self {
        if backend.is_none() {
            tracing::info!("speech synthesis unsupported, replies are text only");
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (changed_tx, _) = watch::channel(0);

        let output = Self {
            backend,
            state: Arc::new(Mutex::new(SynthesisState::default())),
            utterance_seq: Arc::new(AtomicU64::new(0)),
            events_tx,
            changed_tx: Arc::new(changed_tx),
        };

        output.spawn_event_pump(events_rx);
        output.reload_voices();
        output
    }

    /// Whether a synthesis backend is available
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    /// Subscribe to state-change notifications
    ///
    /// The value is an opaque change counter; read the accessors after each
    /// change to see what moved.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    /// Request speech for `text`, cancelling any in-flight utterance
    ///
    /// Fire-and-forget: rejections (empty text, unsupported synthesis) land
    /// in the error field. Prosody is fixed; only the voice varies.
    pub fn speak(&self, text: &str) {
        let Some(backend) = self.backend.clone() else {
            self.set_error("speech synthesis is not supported");
            return;
        };

        if text.is_empty() {
            self.set_error("no text provided to speak");
            return;
        }

        let utterance = self.utterance_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let voice = self.selected_voice();
        let text = text.to_string();
        let events = self.events_tx.clone();
        let state = Arc::clone(&self.state);
        let seq = Arc::clone(&self.utterance_seq);
        let changed = Arc::clone(&self.changed_tx);

        if let Ok(mut s) = self.state.lock() {
            s.paused = false;
        }

        tokio::spawn(async move {
            // Only one utterance is ever audible
            backend.cancel().await;

            // Another request may have arrived while cancelling; the newest
            // one wins, so a stale task never reaches the backend
            if seq.load(Ordering::SeqCst) != utterance {
                tracing::debug!(utterance, "speak request superseded before synthesis");
                return;
            }

            if let Err(e) = backend.speak(utterance, &text, voice.as_ref(), events).await {
                tracing::warn!(utterance, error = %e, "speak request failed");
                if seq.load(Ordering::SeqCst) == utterance {
                    if let Ok(mut s) = state.lock() {
                        s.error = Some(e.to_string());
                        s.speaking = false;
                    }
                    changed.send_modify(|v| *v += 1);
                }
            }
        });
    }

    /// Stop any in-flight utterance immediately; idempotent
    pub fn cancel(&self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        if let Ok(mut s) = self.state.lock() {
            s.speaking = false;
            s.paused = false;
        }
        self.changed_tx.send_modify(|v| *v += 1);

        tokio::spawn(async move {
            backend.cancel().await;
        });
    }

    /// Reload the voice catalog from the backend
    ///
    /// Called at construction and whenever the platform signals a catalog
    /// change. A selection that no longer names a catalog voice is treated
    /// as invalid and defaulted.
    pub fn reload_voices(&self) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        let state = Arc::clone(&self.state);
        let changed = Arc::clone(&self.changed_tx);
        tokio::spawn(async move {
            let voices = backend.voices().await;
            tracing::debug!(count = voices.len(), "voice catalog loaded");

            if let Ok(mut s) = state.lock() {
                let selection_valid = s
                    .selected
                    .as_ref()
                    .is_some_and(|id| voices.iter().any(|v| &v.id == id));
                if !selection_valid {
                    s.selected = choose_default_voice(&voices).map(|v| v.id.clone());
                }
                s.voices = voices;
            }
            changed.send_modify(|v| *v += 1);
        });
    }

    /// Record a configured voice preference ahead of the catalog load
    ///
    /// Unlike [`select_voice`](Self::select_voice) this does not validate
    /// against the catalog; the next catalog load keeps the preference if it
    /// names a real voice and defaults otherwise.
    pub fn set_preferred(&self, id: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.selected = Some(id.to_string());
        }
    }

    /// Select a voice by catalog id; returns false if the id is unknown
    pub fn select_voice(&self, id: &str) -> bool {
        let mut found = false;
        if let Ok(mut s) = self.state.lock() {
            if s.voices.iter().any(|v| v.id == id) {
                s.selected = Some(id.to_string());
                found = true;
            }
        }
        if found {
            self.changed_tx.send_modify(|v| *v += 1);
        }
        found
    }

    /// Auto-pause/resume with the host's visibility signal
    ///
    /// Speech pauses when the host reports hidden and resumes when it
    /// becomes visible again; paused is tracked separately from speaking.
    pub fn watch_visibility(&self, mut visibility: watch::Receiver<bool>) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        let state = Arc::clone(&self.state);
        let changed = Arc::clone(&self.changed_tx);
        tokio::spawn(async move {
            while visibility.changed().await.is_ok() {
                let visible = *visibility.borrow();

                let action = {
                    let Ok(mut s) = state.lock() else { return };
                    if !visible && s.speaking && !s.paused {
                        s.paused = true;
                        Some(false)
                    } else if visible && s.paused {
                        s.paused = false;
                        Some(true)
                    } else {
                        None
                    }
                };

                match action {
                    Some(false) => {
                        tracing::debug!("host hidden, pausing speech");
                        backend.pause().await;
                        changed.send_modify(|v| *v += 1);
                    }
                    Some(true) => {
                        tracing::debug!("host visible, resuming speech");
                        backend.resume().await;
                        changed.send_modify(|v| *v += 1);
                    }
                    None => {}
                }
            }
        });
    }

    /// Apply utterance lifecycle events, ignoring superseded utterances
    fn spawn_event_pump(&self, mut rx: mpsc::Receiver<SynthesisEvent>) {
        let state = Arc::clone(&self.state);
        let seq = Arc::clone(&self.utterance_seq);
        let changed = Arc::clone(&self.changed_tx);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let current = seq.load(Ordering::SeqCst);
                let Ok(mut s) = state.lock() else { return };
                match event {
                    SynthesisEvent::Started { utterance } if utterance == current => {
                        s.speaking = true;
                        s.error = None;
                    }
                    SynthesisEvent::Ended { utterance } if utterance == current => {
                        s.speaking = false;
                        s.paused = false;
                    }
                    SynthesisEvent::Error { utterance, message } if utterance == current => {
                        tracing::warn!(utterance, error = %message, "synthesis error");
                        s.error = Some(message);
                        s.speaking = false;
                        s.paused = false;
                    }
                    _ => {
                        // Stale utterance, already superseded
                    }
                }
                drop(s);
                changed.send_modify(|v| *v += 1);
            }
        });
    }

    fn set_error(&self, message: &str) {
        tracing::warn!(message, "speak request rejected");
        if let Ok(mut s) = self.state.lock() {
            s.error = Some(message.to_string());
        }
        self.changed_tx.send_modify(|v| *v += 1);
    }

    /// Available voices, in catalog order
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.state.lock().map(|s| s.voices.clone()).unwrap_or_default()
    }

    /// Currently selected voice, if any
    #[must_use]
    pub fn selected_voice(&self) -> Option<Voice> {
        self.state
            .lock()
            .ok()
            .and_then(|s| {
                let id = s.selected.as_ref()?;
                s.voices.iter().find(|v| &v.id == id).cloned()
            })
    }

    /// Whether an utterance is currently audible
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state.lock().map(|s| s.speaking).unwrap_or_default()
    }

    /// Whether speech is paused by the host visibility signal
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().map(|s| s.paused).unwrap_or_default()
    }

    /// Last synthesis error, if any
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state
            .lock()
            .map(|s| s.error.clone())
            .unwrap_or_default()
    }
}

/// Pick a default voice from a freshly loaded catalog
///
/// Best-effort chain: an en-US voice whose name suggests elevated quality,
/// then any en-US voice, then the first catalog entry. The name heuristic is
/// marketing-term matching and may mean nothing on a given platform.
#[must_use]
pub fn choose_default_voice(voices: &[Voice]) -> Option<&Voice> {
    let is_en_us = |v: &&Voice| v.lang.eq_ignore_ascii_case("en-US");
    let sounds_premium = |v: &&Voice| {
        let name = v.name.to_lowercase();
        name.contains("premium") || name.contains("enhanced")
    };

    voices
        .iter()
        .find(|v| is_en_us(v) && sounds_premium(v))
        .or_else(|| voices.iter().find(is_en_us))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, name: &str, lang: &str) -> Voice {
        Voice {
            id: id.to_string(),
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[test]
    fn default_prefers_premium_en_us() {
        let voices = vec![
            voice("a", "Plain", "en-US"),
            voice("b", "Samantha Enhanced", "en-US"),
            voice("c", "Premium Claire", "fr-FR"),
        ];
        assert_eq!(choose_default_voice(&voices).unwrap().id, "b");
    }

    #[test]
    fn default_falls_back_to_any_en_us() {
        let voices = vec![
            voice("a", "Claire", "fr-FR"),
            voice("b", "Plain", "en-US"),
        ];
        assert_eq!(choose_default_voice(&voices).unwrap().id, "b");
    }

    #[test]
    fn default_falls_back_to_first_voice() {
        let voices = vec![
            voice("a", "Claire", "fr-FR"),
            voice("b", "Hana", "ja-JP"),
        ];
        assert_eq!(choose_default_voice(&voices).unwrap().id, "a");
    }

    #[test]
    fn empty_catalog_has_no_default() {
        assert!(choose_default_voice(&[]).is_none());
    }
}
