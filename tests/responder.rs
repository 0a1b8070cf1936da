//! Canned responder behavior

use parley::responder::{CannedResponder, ChatTurn, Responder, replies};

#[tokio::test]
async fn life_story_question_gets_the_life_story_reply() {
    let responder = CannedResponder::new();
    let history = vec![ChatTurn::user("What should we know about your life story?")];

    let reply = responder.reply(&history).await.unwrap();
    assert_eq!(reply, replies::LIFE_STORY);
}

#[tokio::test]
async fn superpower_question_gets_the_superpower_reply() {
    let responder = CannedResponder::new();
    let history = vec![ChatTurn::user("So, what's your #1 superpower?")];

    let reply = responder.reply(&history).await.unwrap();
    assert_eq!(reply, replies::SUPERPOWER);
}

#[tokio::test]
async fn unrelated_question_gets_the_fallback() {
    let responder = CannedResponder::new();
    let history = vec![ChatTurn::user("What is the weather like today?")];

    let reply = responder.reply(&history).await.unwrap();
    assert_eq!(reply, replies::UNSUPPORTED_QUESTION);
}

#[tokio::test]
async fn earlier_rules_win_when_keywords_overlap() {
    let responder = CannedResponder::new();
    let history = vec![ChatTurn::user(
        "Is your life story the source of your superpower?",
    )];

    let reply = responder.reply(&history).await.unwrap();
    assert_eq!(reply, replies::LIFE_STORY);
}

#[tokio::test]
async fn empty_history_asks_for_a_question() {
    let responder = CannedResponder::new();

    let reply = responder.reply(&[]).await.unwrap();
    assert_eq!(reply, replies::NO_QUESTION);
}

#[tokio::test]
async fn prior_turns_do_not_leak_into_the_match() {
    let responder = CannedResponder::new();
    let history = vec![
        ChatTurn::user("tell me your life story"),
        ChatTurn::assistant(replies::LIFE_STORY),
        ChatTurn::user("what misconception do people have?"),
    ];

    let reply = responder.reply(&history).await.unwrap();
    assert_eq!(reply, replies::MISCONCEPTION);
}
