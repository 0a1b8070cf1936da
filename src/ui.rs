//! Terminal presentation
//!
//! Plain-text rendering for the conversation transcript, notifications, and
//! the settings/voice listings. Rendering is pure string building so it can
//! be tested without a terminal.

use crate::conversation::{Conversation, Message, Notification, Sender};
use crate::speech::Voice;

/// Notice shown when speech recognition is unavailable
pub const UNSUPPORTED_NOTICE: &str =
    "Speech recognition is not supported on this device. Please use the text input instead.";

/// Label for the user side of the transcript
const USER_LABEL: &str = "You";

/// Label for the assistant side of the transcript
const ASSISTANT_LABEL: &str = "Parley";

/// Render one transcript message as a line
#[must_use]
pub fn render_message(message: &Message) -> String {
    let label = match message.sender {
        Sender::User => USER_LABEL,
        Sender::Assistant => ASSISTANT_LABEL,
    };
    let time = message.timestamp.format("%l:%M %p");
    format!("[{time}] {label}: {}", message.text)
}

/// Render a transient notification as a toast line
#[must_use]
pub fn render_notification(notification: &Notification) -> String {
    format!("! {}", notification.message)
}

/// The indicator shown while a reply is pending
#[must_use]
pub const fn busy_indicator() -> &'static str {
    "..."
}

/// Render the voice catalog, marking the selection
#[must_use]
pub fn render_voices(voices: &[Voice], selected: Option<&Voice>) -> String {
    if voices.is_empty() {
        return "no voices available".to_string();
    }

    let mut out = String::new();
    for voice in voices {
        let marker = if selected.is_some_and(|s| s.id == voice.id) {
            "*"
        } else {
            " "
        };
        out.push_str(&format!("{marker} {} ({})\n", voice.id, voice.lang));
    }
    out.pop();
    out
}

/// Render the settings panel
#[must_use]
pub fn render_settings(conversation: &Conversation) -> String {
    let voice = conversation
        .output()
        .selected_voice()
        .map_or_else(|| "none".to_string(), |v| v.id);

    format!(
        "settings:\n  \
         input mode: {}\n  \
         auto-speak: {}\n  \
         recognition: {}\n  \
         synthesis: {}\n  \
         voice: {voice}",
        if conversation.is_text_mode() {
            "text"
        } else {
            "voice"
        },
        if conversation.auto_speak() { "on" } else { "off" },
        if conversation.capture().is_supported() {
            "available"
        } else {
            "unavailable"
        },
        if conversation.output().is_supported() {
            "available"
        } else {
            "unavailable"
        },
    )
}

/// Render the slash-command help text
#[must_use]
pub const fn render_help() -> &'static str {
    "commands:\n  \
     /mic        toggle dictation (stopping submits the transcript)\n  \
     /speak      speak the last reply, or stop speaking\n  \
     /voices     list synthesis voices\n  \
     /voice ID   select a synthesis voice\n  \
     /autospeak  toggle speaking replies aloud\n  \
     /text       switch to text-only input\n  \
     /settings   show current settings\n  \
     /help       show this help\n  \
     /quit       exit"
}
