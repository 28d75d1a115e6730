//! Unit tests for Langbase request/response types.

use super::*;

#[test]
fn test_message_constructors() {
    assert_eq!(Message::system("s").role, MessageRole::System);
    assert_eq!(Message::user("u").role, MessageRole::User);
    assert_eq!(Message::assistant("a").content, "a");
}

#[test]
fn test_message_role_serializes_lowercase() {
    let json = serde_json::to_value(Message::new(MessageRole::Assistant, "What stops you?")).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "What stops you?");
}

#[test]
fn test_transcript_request_orders_messages() {
    let turns = vec!["work is heavy".to_string(), "I want out".to_string()];
    let req = PipeRequest::with_transcript("aspiral-question-v1", "guide", &turns);
    assert_eq!(req.name, "aspiral-question-v1");
    assert_eq!(
        req.messages,
        vec![
            Message::system("guide"),
            Message::user("work is heavy"),
            Message::user("I want out"),
        ]
    );
    assert!(!req.stream);
}

#[test]
fn test_pipe_request_serialization_skips_empty_optionals() {
    let req = PipeRequest::new("p", vec![Message::user("hi")]);
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["role"], "user");
    assert!(json.get("variables").is_none());
}

#[test]
fn test_pipe_request_variables() {
    let req = PipeRequest::new("p", vec![]).with_variable("stage", "desire");
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["variables"]["stage"], "desire");
}

#[test]
fn test_pipe_response_deserialization() {
    let json = r#"{
        "success": true,
        "completion": "What would change?",
        "threadId": "t-9",
        "raw": {"model": "gpt-4o-mini", "usage": {"total_tokens": 42}}
    }"#;
    let resp: PipeResponse = serde_json::from_str(json).unwrap();
    assert!(resp.success);
    assert_eq!(resp.thread_id.as_deref(), Some("t-9"));
    assert_eq!(resp.total_tokens(), Some(42));
}

#[test]
fn test_pipe_response_minimal() {
    let resp: PipeResponse =
        serde_json::from_str(r#"{"success": false, "completion": "", "threadId": null, "raw": null}"#)
            .unwrap();
    assert!(!resp.success);
    assert_eq!(resp.total_tokens(), None);
}

#[test]
fn test_pipe_response_tolerates_missing_fields() {
    let resp: PipeResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
    assert_eq!(resp.completion, "");
    assert_eq!(resp.thread_id, None);
}
