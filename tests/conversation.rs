//! Conversation orchestration

mod common;

use std::sync::Arc;

use tokio::sync::mpsc;

use common::{FailingResponder, GatedResponder, ScriptedRecognition, ScriptedSynthesis, voice,
    wait_until};
use parley::responder::replies;
use parley::{
    CannedResponder, Conversation, ConversationEvent, RecognitionEvent, Responder, Sender,
    SpeechCapture, SpeechOutput,
};

fn plain_conversation(
    responder: Arc<dyn Responder>,
) -> (Conversation, mpsc::Receiver<ConversationEvent>) {
    Conversation::with_receiver(
        responder,
        SpeechCapture::new(None),
        SpeechOutput::new(None),
        false,
    )
}

#[tokio::test]
async fn an_exchange_appends_user_then_assistant() {
    let (mut conversation, mut events) = plain_conversation(Arc::new(CannedResponder::new()));

    conversation.set_input("What should we know about your life story?");
    conversation.submit();
    assert!(conversation.is_busy());
    assert!(conversation.input().is_empty());

    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(
        messages[0].text,
        "What should we know about your life story?"
    );
    assert_eq!(messages[1].sender, Sender::Assistant);
    assert_eq!(messages[1].text, replies::LIFE_STORY);
    assert!(!conversation.is_busy());
}

#[tokio::test]
async fn blank_input_is_a_silent_noop() {
    let (mut conversation, _events) = plain_conversation(Arc::new(CannedResponder::new()));

    conversation.set_input("   ");
    conversation.submit();

    assert!(conversation.messages().is_empty());
    assert!(!conversation.is_busy());
}

#[tokio::test]
async fn submitting_while_busy_is_ignored() {
    let responder = Arc::new(GatedResponder::new());
    let (mut conversation, mut events) = plain_conversation(responder.clone());

    conversation.set_input("first");
    conversation.submit();
    assert!(conversation.is_busy());

    conversation.set_input("second");
    conversation.submit();
    assert_eq!(conversation.messages().len(), 1);

    responder.release();
    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    // Only the first submission went through
    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "first");
    assert!(!conversation.is_busy());

    // And the orchestrator accepts submissions again
    conversation.set_input("third");
    conversation.submit();
    assert_eq!(conversation.messages().len(), 3);
}

#[tokio::test]
async fn dictation_is_inert_while_a_reply_is_pending() {
    let responder = Arc::new(GatedResponder::new());
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, mut events) = Conversation::with_receiver(
        responder.clone(),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.set_input("first");
    conversation.submit();
    assert!(conversation.is_busy());

    // The mic toggle is refused until the reply lands
    conversation.toggle_listening();
    assert!(!wait_until(|| backend.start_count() > 0).await);

    // Even with a live session, the transcript cannot overwrite the input
    conversation.capture().start();
    assert!(wait_until(|| backend.start_count() == 1).await);
    backend
        .emit(RecognitionEvent::Transcript("stray dictation".to_string()))
        .await;
    assert!(wait_until(|| !conversation.capture().transcript().is_empty()).await);
    conversation.sync_transcript();
    assert!(conversation.input().is_empty());

    responder.release();
    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    // Back to idle, reconciliation resumes
    conversation.sync_transcript();
    assert_eq!(conversation.input(), "stray dictation");
}

#[tokio::test]
async fn responder_failure_notifies_and_returns_to_idle() {
    let (mut conversation, mut events) = plain_conversation(Arc::new(FailingResponder));

    conversation.set_input("anything");
    conversation.submit();

    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    assert!(!conversation.is_busy());

    // The user message survives; no assistant message is fabricated
    let messages = conversation.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "anything");

    let notifications = conversation.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, replies::APOLOGY);
}

#[tokio::test]
async fn submitting_stops_an_active_listening_session() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, _events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);
    assert!(conversation.capture().is_listening());

    conversation.set_input("typed while listening");
    conversation.submit();

    assert!(!conversation.capture().is_listening());
    assert!(wait_until(|| backend.stop_count() == 1).await);
}

#[tokio::test]
async fn stopping_dictation_submits_the_transcript() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, mut events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);

    backend
        .emit(RecognitionEvent::Transcript(
            "what's your superpower".to_string(),
        ))
        .await;
    assert!(wait_until(|| !conversation.capture().transcript().is_empty()).await);

    conversation.toggle_listening();
    assert!(conversation.is_busy());

    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    let messages = conversation.messages();
    assert_eq!(messages[0].text, "what's your superpower");
    assert_eq!(messages[1].text, replies::SUPERPOWER);
}

#[tokio::test]
async fn stopping_dictation_with_no_speech_submits_nothing() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, _events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);
    conversation.toggle_listening();

    assert!(conversation.messages().is_empty());
    assert!(!conversation.is_busy());
}

#[tokio::test]
async fn text_mode_stops_listening() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, _events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);

    conversation.set_text_mode(true);
    assert!(conversation.is_text_mode());
    assert!(!conversation.capture().is_listening());
}

#[tokio::test]
async fn auto_speak_speaks_each_reply() {
    let synthesis = Arc::new(ScriptedSynthesis::new(vec![voice("alloy", "alloy", "en-US")]));
    let (mut conversation, mut events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        SpeechCapture::new(None),
        SpeechOutput::new(Some(synthesis.clone())),
        true,
    );

    conversation.set_input("what's your superpower");
    conversation.submit();
    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    assert!(wait_until(|| synthesis.speak_calls().len() == 1).await);
    assert_eq!(synthesis.speak_calls()[0].text, replies::SUPERPOWER);
}

#[tokio::test]
async fn auto_speak_off_keeps_replies_silent() {
    let synthesis = Arc::new(ScriptedSynthesis::new(vec![voice("alloy", "alloy", "en-US")]));
    let (mut conversation, mut events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        SpeechCapture::new(None),
        SpeechOutput::new(Some(synthesis.clone())),
        false,
    );

    conversation.set_input("what's your superpower");
    conversation.submit();
    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    assert!(!wait_until(|| !synthesis.speak_calls().is_empty()).await);
}

#[tokio::test]
async fn toggle_speaking_replays_the_last_reply() {
    let synthesis = Arc::new(ScriptedSynthesis::new(vec![voice("alloy", "alloy", "en-US")]));
    let (mut conversation, mut events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        SpeechCapture::new(None),
        SpeechOutput::new(Some(synthesis.clone())),
        false,
    );

    conversation.set_input("what's your superpower");
    conversation.submit();
    let event = events.recv().await.unwrap();
    conversation.handle_event(event);

    conversation.toggle_speaking();
    assert!(wait_until(|| synthesis.speak_calls().len() == 1).await);
    assert_eq!(synthesis.speak_calls()[0].text, replies::SUPERPOWER);
}

#[tokio::test]
async fn dictation_mirrors_the_live_transcript_into_the_input() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, _events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);

    backend
        .emit(RecognitionEvent::Transcript("partial dicta".to_string()))
        .await;
    assert!(wait_until(|| !conversation.capture().transcript().is_empty()).await);

    conversation.sync_transcript();
    assert_eq!(conversation.input(), "partial dicta");
}

#[tokio::test]
async fn recognition_errors_become_one_notification() {
    let backend = Arc::new(ScriptedRecognition::new());
    let capture = SpeechCapture::new(Some(backend.clone()));
    let (mut conversation, _events) = Conversation::with_receiver(
        Arc::new(CannedResponder::new()),
        capture,
        SpeechOutput::new(None),
        false,
    );

    conversation.toggle_listening();
    assert!(wait_until(|| backend.start_count() == 1).await);
    backend
        .emit(RecognitionEvent::Error("device lost".to_string()))
        .await;
    assert!(wait_until(|| conversation.capture().error().is_some()).await);

    conversation.sync_transcript();
    conversation.sync_transcript();

    let notifications = conversation.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.contains("device lost"));
}
