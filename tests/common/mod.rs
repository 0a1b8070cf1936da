//! Shared test doubles and helpers
//!
//! Scripted speech backends let the tests drive recognition and synthesis
//! events by hand, with no audio hardware or network involved.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};

use parley::{
    ChatTurn, Error, RecognitionBackend, RecognitionEvent, Responder, Result, SynthesisBackend,
    SynthesisEvent, Voice,
};

/// Poll `condition` until it holds or a second passes
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Build a catalog voice
pub fn voice(id: &str, name: &str, lang: &str) -> Voice {
    Voice {
        id: id.to_string(),
        name: name.to_string(),
        lang: lang.to_string(),
    }
}

/// Recognition backend driven entirely by the test
#[derive(Default)]
pub struct ScriptedRecognition {
    sender: Mutex<Option<mpsc::Sender<RecognitionEvent>>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl ScriptedRecognition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an event into the active session
    pub async fn emit(&self, event: RecognitionEvent) {
        self.session_sender()
            .send(event)
            .await
            .expect("session pump gone");
    }

    /// The active session's event sender; lets a test hold a stale handle
    pub fn session_sender(&self) -> mpsc::Sender<RecognitionEvent> {
        self.sender
            .lock()
            .ok()
            .and_then(|s| s.clone())
            .expect("no active session")
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionBackend for ScriptedRecognition {
    async fn start(&self, events: mpsc::Sender<RecognitionEvent>) -> Result<()> {
        if let Ok(mut sender) = self.sender.lock() {
            *sender = Some(events);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A speak call recorded by [`ScriptedSynthesis`]
#[derive(Debug, Clone)]
pub struct SpeakCall {
    pub utterance: u64,
    pub text: String,
    pub voice: Option<String>,
}

/// Synthesis backend driven entirely by the test
pub struct ScriptedSynthesis {
    voices: Mutex<Vec<Voice>>,
    calls: Mutex<Vec<SpeakCall>>,
    current: Mutex<Option<(u64, mpsc::Sender<SynthesisEvent>)>>,
    cancels: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    cancels_held: AtomicBool,
    cancel_gate: Semaphore,
}

impl ScriptedSynthesis {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self {
            voices: Mutex::new(voices),
            calls: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            cancels: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            cancels_held: AtomicBool::new(false),
            cancel_gate: Semaphore::new(0),
        }
    }

    /// Make subsequent `cancel` calls block until released
    pub fn hold_cancels(&self) {
        self.cancels_held.store(true, Ordering::SeqCst);
    }

    /// Let one held `cancel` call through
    pub fn release_cancel(&self) {
        self.cancel_gate.add_permits(1);
    }

    /// Swap the catalog, as a platform voice-list change would
    pub fn set_voices(&self, voices: Vec<Voice>) {
        if let Ok(mut v) = self.voices.lock() {
            *v = voices;
        }
    }

    /// Report the latest utterance as audible
    pub async fn begin_current(&self) {
        let (utterance, sender) = self.current_channel();
        sender
            .send(SynthesisEvent::Started { utterance })
            .await
            .expect("event pump gone");
    }

    /// Report the latest utterance as finished
    pub async fn end_current(&self) {
        let (utterance, sender) = self.current_channel();
        sender
            .send(SynthesisEvent::Ended { utterance })
            .await
            .expect("event pump gone");
    }

    /// Report a failure for the latest utterance
    pub async fn fail_current(&self, message: &str) {
        let (utterance, sender) = self.current_channel();
        sender
            .send(SynthesisEvent::Error {
                utterance,
                message: message.to_string(),
            })
            .await
            .expect("event pump gone");
    }

    /// Re-send a Started event for an utterance that has been superseded
    pub async fn emit_started_for(&self, utterance: u64) {
        let (_, sender) = self.current_channel();
        sender
            .send(SynthesisEvent::Started { utterance })
            .await
            .expect("event pump gone");
    }

    pub fn speak_calls(&self) -> Vec<SpeakCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    fn current_channel(&self) -> (u64, mpsc::Sender<SynthesisEvent>) {
        self.current
            .lock()
            .ok()
            .and_then(|c| c.clone())
            .expect("no speak call recorded")
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedSynthesis {
    async fn voices(&self) -> Vec<Voice> {
        self.voices.lock().map(|v| v.clone()).unwrap_or_default()
    }

    async fn speak(
        &self,
        utterance: u64,
        text: &str,
        voice: Option<&Voice>,
        events: mpsc::Sender<SynthesisEvent>,
    ) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SpeakCall {
                utterance,
                text: text.to_string(),
                voice: voice.map(|v| v.id.clone()),
            });
        }
        if let Ok(mut current) = self.current.lock() {
            *current = Some((utterance, events));
        }
        Ok(())
    }

    async fn cancel(&self) {
        if self.cancels_held.load(Ordering::SeqCst) {
            let permit = self.cancel_gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    async fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Responder that always fails
pub struct FailingResponder;

#[async_trait]
impl Responder for FailingResponder {
    async fn reply(&self, _history: &[ChatTurn]) -> Result<String> {
        Err(Error::Responder("scripted failure".to_string()))
    }
}

/// Responder that blocks until released, for busy-gate tests
#[derive(Default)]
pub struct GatedResponder {
    gate: tokio::sync::Notify,
}

impl GatedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Responder for GatedResponder {
    async fn reply(&self, history: &[ChatTurn]) -> Result<String> {
        self.gate.notified().await;
        Ok(format!("reply to: {}", history.last().map_or("", |t| t.content.as_str())))
    }
}
