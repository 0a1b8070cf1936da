//! Conversation orchestration
//!
//! [`Conversation`] coordinates input (typed or dictated), reply generation,
//! and speech output. One exchange is in flight at a time: submitting while a
//! reply is pending is a silent no-op, so the transcript always alternates
//! user/assistant for each accepted submission.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::responder::{ChatRole, ChatTurn, Responder, replies};
use crate::speech::{SpeechCapture, SpeechOutput};

/// Buffered orchestration events
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Who authored a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique id, stable for the life of the message
    pub id: Uuid,
    /// Message text
    pub text: String,
    /// Who authored it
    pub sender: Sender,
    /// When it was appended
    pub timestamp: DateTime<Local>,
}

impl Message {
    fn new(text: String, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            sender,
            timestamp: Local::now(),
        }
    }
}

/// A transient user-facing notice (errors, mostly)
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: DateTime<Local>,
}

/// Events delivered back to the conversation loop
#[derive(Debug)]
pub enum ConversationEvent {
    /// The spawned responder task finished
    ReplyReady(crate::Result<String>),
}

/// Where the conversation is in the exchange cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Ready to accept a submission
    Idle,
    /// A reply is being generated; submissions are ignored
    AwaitingReply,
}

/// The conversation orchestrator
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    phase: Phase,
    text_mode: bool,
    settings_open: bool,
    auto_speak: bool,
    notifications: Vec<Notification>,
    seen_capture_error: Option<String>,
    responder: Arc<dyn Responder>,
    capture: SpeechCapture,
    output: SpeechOutput,
    events_tx: mpsc::Sender<ConversationEvent>,
}

impl Conversation {
    /// Create a conversation and the receiver its events arrive on
    ///
    /// The caller owns the event loop: it reads [`ConversationEvent`]s off
    /// the receiver and feeds them back through
    /// [`handle_event`](Self::handle_event).
    #[must_use]
    pub fn with_receiver(
        responder: Arc<dyn Responder>,
        capture: SpeechCapture,
        output: SpeechOutput,
        auto_speak: bool,
    ) -> (Self, mpsc::Receiver<ConversationEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let conversation = Self {
            messages: Vec::new(),
            input: String::new(),
            phase: Phase::Idle,
            text_mode: false,
            settings_open: false,
            auto_speak,
            notifications: Vec::new(),
            seen_capture_error: None,
            responder,
            capture,
            output,
            events_tx,
        };

        (conversation, events_rx)
    }

    /// Submit the current input as a user message
    ///
    /// Blank input and submission while a reply is pending are both silent
    /// no-ops. An accepted submission stops any listening session, appends
    /// the user message, and kicks off reply generation.
    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.phase == Phase::AwaitingReply {
            tracing::debug!("submission ignored, reply already pending");
            return;
        }

        self.input.clear();
        self.capture.stop();

        tracing::info!(chars = text.len(), "user message submitted");
        self.messages.push(Message::new(text, Sender::User));
        self.phase = Phase::AwaitingReply;

        let history: Vec<ChatTurn> = self.messages.iter().map(to_chat_turn).collect();
        let responder = Arc::clone(&self.responder);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let reply = responder.reply(&history).await;
            let _ = events.send(ConversationEvent::ReplyReady(reply)).await;
        });
    }

    /// Apply an orchestration event
    pub fn handle_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::ReplyReady(result) => {
                self.phase = Phase::Idle;
                match result {
                    Ok(text) => self.append_reply(text),
                    Err(e) => {
                        tracing::warn!(error = %e, "reply generation failed");
                        self.notify(replies::APOLOGY.to_string());
                    }
                }
            }
        }
    }

    fn append_reply(&mut self, text: String) {
        if self.auto_speak && self.output.is_supported() {
            self.output.speak(&text);
        }
        self.messages.push(Message::new(text, Sender::Assistant));
    }

    /// Mirror the live transcript into the input field while dictating
    ///
    /// The input buffer belongs to the pending submission while a reply is
    /// being generated, so reconciliation only runs while idle.
    pub fn sync_transcript(&mut self) {
        if !self.text_mode && !self.is_busy() && self.capture.is_listening() {
            self.input = self.capture.transcript();
        }

        // Notify once per distinct error, not once per poll
        let error = self.capture.error();
        if error != self.seen_capture_error {
            if let Some(e) = &error {
                self.notify(format!("speech recognition error: {e}"));
            }
            self.seen_capture_error = error;
        }
    }

    /// Toggle dictation: start listening, or stop and submit the transcript
    ///
    /// Inert while a reply is pending, like every other submission path.
    pub fn toggle_listening(&mut self) {
        if self.is_busy() {
            tracing::debug!("dictation toggle ignored, reply already pending");
            return;
        }

        if self.capture.is_listening() {
            self.capture.stop();
            let transcript = self.capture.transcript();
            if !transcript.trim().is_empty() {
                self.input = transcript;
                self.submit();
            }
        } else {
            self.input.clear();
            self.capture.start();
        }
    }

    /// Toggle speech output: cancel if audible, else replay the last reply
    pub fn toggle_speaking(&mut self) {
        if self.output.is_speaking() {
            self.output.cancel();
            return;
        }

        let last_reply = self
            .messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
            .map(|m| m.text.clone());
        match last_reply {
            Some(text) => self.output.speak(&text),
            None => self.notify("nothing to speak yet".to_string()),
        }
    }

    /// Switch between typed and spoken input; text mode stops listening
    pub fn set_text_mode(&mut self, text_mode: bool) {
        self.text_mode = text_mode;
        if text_mode {
            self.capture.stop();
        }
    }

    /// Enable or disable speaking replies aloud automatically
    pub const fn set_auto_speak(&mut self, auto_speak: bool) {
        self.auto_speak = auto_speak;
    }

    /// Open or close the settings panel
    pub const fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
    }

    /// Replace the typed input
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    fn notify(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Local::now(),
        });
    }

    /// Transcript so far, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current input field contents
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether a reply is pending
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase == Phase::AwaitingReply
    }

    /// Whether typed input mode is active
    #[must_use]
    pub const fn is_text_mode(&self) -> bool {
        self.text_mode
    }

    /// Whether the settings panel is open
    #[must_use]
    pub const fn is_settings_open(&self) -> bool {
        self.settings_open
    }

    /// Whether replies are spoken aloud automatically
    #[must_use]
    pub const fn auto_speak(&self) -> bool {
        self.auto_speak
    }

    /// Drain pending notifications for display
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Speech capture side
    #[must_use]
    pub const fn capture(&self) -> &SpeechCapture {
        &self.capture
    }

    /// Speech output side
    #[must_use]
    pub const fn output(&self) -> &SpeechOutput {
        &self.output
    }
}

fn to_chat_turn(message: &Message) -> ChatTurn {
    ChatTurn {
        role: match message.sender {
            Sender::User => ChatRole::User,
            Sender::Assistant => ChatRole::Assistant,
        },
        content: message.text.clone(),
    }
}
