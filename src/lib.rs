//! Parley - voice and text conversation widget
//!
//! This library provides the core functionality of the Parley widget:
//! - Speech capture (microphone dictation with live transcript)
//! - Speech output (synthesized replies with a selectable voice)
//! - Canned reply generation from conversation history
//! - Conversation orchestration (one exchange in flight at a time)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Presentation                        │
//! │        transcript │ input │ settings │ toasts        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Conversation                        │
//! │   submit │ reply events │ auto-speak │ mode toggles  │
//! └──────┬──────────────────┬───────────────────┬───────┘
//!        │                  │                   │
//! ┌──────▼───────┐  ┌───────▼────────┐  ┌───────▼───────┐
//! │ SpeechCapture│  │   Responder    │  │ SpeechOutput  │
//! │  mic + STT   │  │ canned replies │  │  TTS + voices │
//! └──────────────┘  └────────────────┘  └───────────────┘
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod responder;
pub mod speech;
pub mod ui;

pub use config::Config;
pub use conversation::{Conversation, ConversationEvent, Message, Notification, Sender};
pub use error::{Error, Result};
pub use responder::{CannedResponder, ChatRole, ChatTurn, Responder};
pub use speech::{
    MicRecognition, OpenAiSynthesizer, RecognitionBackend, RecognitionEvent, SpeakerSynthesis,
    SpeechCapture, SpeechOutput, SynthesisBackend, SynthesisEvent, Synthesizer, Transcriber,
    Voice, WhisperTranscriber, choose_default_voice,
};
