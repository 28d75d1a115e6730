//! Integration tests for the Langbase client and generator
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use aspiral_reflection::config::{GenerationConfig, LangbaseConfig, RequestConfig};
use aspiral_reflection::error::{GenerationError, LangbaseError};
use aspiral_reflection::generation::{LangbaseGenerator, QuestionGenerator};
use aspiral_reflection::langbase::{LangbaseClient, Message, PipeRequest};
use aspiral_reflection::patterns::QuestionCategory;
use aspiral_reflection::stage::{get_stage_question, BreakthroughReady, Stage, StopReason};

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str, max_retries: u32) -> LangbaseClient {
    let config = LangbaseConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 1,
    };

    LangbaseClient::new(&config, request_config).expect("Failed to create client")
}

fn create_test_generator(base_url: &str) -> LangbaseGenerator {
    LangbaseGenerator::new(create_test_client(base_url, 0), &GenerationConfig::default())
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "completion": text,
        "threadId": null,
        "raw": null
    }))
}

fn history(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_pipe_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(json!({"name": "test-pipe", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "completion": "What keeps pulling you back?",
                "threadId": "thread-123",
                "raw": {
                    "model": "gpt-4o-mini",
                    "usage": {"prompt_tokens": 100, "completion_tokens": 8, "total_tokens": 108}
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        let request = PipeRequest::new("test-pipe", vec![Message::user("I feel stuck")]);
        let response = client.call_pipe(request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.completion, "What keeps pulling you back?");
        assert_eq!(response.thread_id.as_deref(), Some("thread-123"));
        assert_eq!(response.total_tokens(), Some(108));
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2);
        let result = client
            .call_pipe(PipeRequest::new("test-pipe", vec![]))
            .await;

        assert!(matches!(result, Err(LangbaseError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_server_error_retried_then_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2);
        let result = client
            .call_pipe(PipeRequest::new("test-pipe", vec![]))
            .await;

        assert!(matches!(
            result,
            Err(LangbaseError::Unavailable { retries: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_rejects_unsuccessful_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "completion": ""
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        let result = client
            .complete(PipeRequest::new("test-pipe", vec![]))
            .await;

        assert!(matches!(result, Err(LangbaseError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 3);
        let result = client
            .call_pipe(PipeRequest::new("test-pipe", vec![]))
            .await;

        assert!(matches!(result, Err(LangbaseError::InvalidResponse { .. })));
    }
}

#[cfg(test)]
mod generator_tests {
    use super::*;

    #[tokio::test]
    async fn test_question_uses_question_pipe_and_truncates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({
                "name": "aspiral-question-v1",
                "variables": {"stage": "friction", "category": "contrast"}
            })))
            .respond_with(completion(
                "What would change if you stopped carrying every single thing your team drops on you all week?",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generator = create_test_generator(&mock_server.uri());
        let question = generator
            .generate_question(
                &get_stage_question(Stage::Friction),
                QuestionCategory::Contrast,
                &history(&["My team keeps dumping work on me"]),
            )
            .await
            .unwrap();

        assert_eq!(question.split_whitespace().count(), 15);
        assert!(question.ends_with('?'));
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(completion("   "))
            .mount(&mock_server)
            .await;

        let generator = create_test_generator(&mock_server.uri());
        let result = generator
            .generate_question(
                &get_stage_question(Stage::Desire),
                QuestionCategory::Hypothetical,
                &history(&["x"]),
            )
            .await;

        assert!(matches!(result, Err(GenerationError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_breakthrough_parses_fenced_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({
                "name": "aspiral-breakthrough-v1",
                "variables": {"reason": "user_stuck"}
            })))
            .respond_with(completion(
                "```json\n{\"friction\": \"Wanting out vs needing the salary\", \"grease\": \"Price one month of freedom\", \"insight\": \"The number is smaller than the fear\"}\n```",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generator = create_test_generator(&mock_server.uri());
        let ready = BreakthroughReady {
            reason: StopReason::UserStuck,
            patterns: vec![],
            prompt: "synthesize".to_string(),
            questions_asked: 2,
        };
        let insight = generator
            .synthesize_breakthrough(&ready, &history(&["idk", "not sure"]))
            .await
            .unwrap();

        assert_eq!(insight.grease, "Price one month of freedom");
    }

    #[tokio::test]
    async fn test_breakthrough_over_word_limit_fails_validation() {
        let mock_server = MockServer::start().await;
        let long = vec!["word"; 30].join(" ");

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(completion(
                &json!({"friction": "a", "grease": "b", "insight": long}).to_string(),
            ))
            .mount(&mock_server)
            .await;

        let generator = create_test_generator(&mock_server.uri());
        let ready = BreakthroughReady {
            reason: StopReason::MaxQuestionsReached,
            patterns: vec![],
            prompt: "synthesize".to_string(),
            questions_asked: 3,
        };
        let result = generator.synthesize_breakthrough(&ready, &[]).await;

        assert!(matches!(
            result,
            Err(GenerationError::Validation { ref field, .. }) if field == "insight"
        ));
    }
}
