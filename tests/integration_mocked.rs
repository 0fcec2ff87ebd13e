/// Integration tests with mocked external APIs
/// Exercises the model and messaging clients without hitting real services
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use study_abroad_crm::config::{LlmConfig, NotifierConfig};
use study_abroad_crm::llm::{fallback_summary, OllamaClient};
use study_abroad_crm::models::{CrmStatus, Lead};
use study_abroad_crm::notify::WhatsAppNotifier;
use study_abroad_crm::scoring::{Destination, LeadQuality, Qualification};
use uuid::Uuid;
use wiremock::matchers::{basic_auth, body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        endpoint: format!("{}/api/generate", server.uri()),
        model: "qwen2.5:0.5b".to_string(),
        timeout_secs: 5,
    }
}

fn notifier_config(server: &MockServer) -> NotifierConfig {
    NotifierConfig {
        base_url: server.uri(),
        account_sid: "AC_test".to_string(),
        auth_token: "test_token".to_string(),
        from: "+14155238886".to_string(),
        to: "+917605021990".to_string(),
    }
}

fn stored_lead() -> Lead {
    Lead {
        id: Uuid::new_v4(),
        name: "Ananya".to_string(),
        email: Some("ananya@example.com".to_string()),
        phone: "+919876543210".to_string(),
        country_interest: "UK".to_string(),
        course_interest: "Data Science".to_string(),
        ielts_score: Some(7.5),
        budget: Some(32),
        qualification: Qualification::Graduation,
        backlogs: false,
        intake: "September".to_string(),
        lead_score: 100,
        recommended_country: Destination::Australia,
        lead_quality: LeadQuality::Hot,
        crm_status: CrmStatus::New,
        assigned_to: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_llm_summary_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "qwen2.5:0.5b",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "qwen2.5:0.5b",
            "response": "  📋 Student Profile Summary\n\nAnanya wants Data Science.  ",
            "done": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OllamaClient::new(&llm_config(&mock_server)).unwrap();
    let reply = client.summarize(&stored_lead(), "I want to study data science").await;

    assert_eq!(reply, "📋 Student Profile Summary\n\nAnanya wants Data Science.");
}

#[tokio::test]
async fn test_llm_prompt_carries_computed_analysis() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Score: 100"))
        .and(body_string_contains("USER_SUMMARY:"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "ok"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OllamaClient::new(&llm_config(&mock_server)).unwrap();
    assert_eq!(client.summarize(&stored_lead(), "hello").await, "ok");
}

#[tokio::test]
async fn test_llm_server_error_falls_back_to_template() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let lead = stored_lead();
    let client = OllamaClient::new(&llm_config(&mock_server)).unwrap();

    assert!(client.generate("prompt").await.is_err());
    assert_eq!(client.summarize(&lead, "hello").await, fallback_summary(&lead));
}

#[tokio::test]
async fn test_llm_empty_response_falls_back_to_template() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "   "})),
        )
        .mount(&mock_server)
        .await;

    let lead = stored_lead();
    let client = OllamaClient::new(&llm_config(&mock_server)).unwrap();
    assert_eq!(client.summarize(&lead, "hello").await, fallback_summary(&lead));
}

#[tokio::test]
async fn test_llm_circuit_opens_after_repeated_failures() {
    let mock_server = MockServer::start().await;

    // Only the five calls that trip the breaker reach the server
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = OllamaClient::new(&llm_config(&mock_server)).unwrap();
    for _ in 0..8 {
        assert!(client.generate("prompt").await.is_err());
    }
}

#[tokio::test]
async fn test_llm_unreachable_falls_back() {
    let config = LlmConfig {
        endpoint: "http://127.0.0.1:9/api/generate".to_string(),
        model: "qwen2.5:0.5b".to_string(),
        timeout_secs: 1,
    };
    let lead = stored_lead();
    let client = OllamaClient::new(&config).unwrap();
    assert_eq!(client.summarize(&lead, "hello").await, fallback_summary(&lead));
}

#[tokio::test]
async fn test_whatsapp_notification_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC_test/Messages.json"))
        .and(basic_auth("AC_test", "test_token"))
        .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
        .and(body_string_contains("To=whatsapp%3A%2B917605021990"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM123",
            "status": "queued"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = WhatsAppNotifier::new(&notifier_config(&mock_server)).unwrap();
    let result = notifier.send("New lead: Ananya").await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_whatsapp_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Authenticate"))
        .mount(&mock_server)
        .await;

    let notifier = WhatsAppNotifier::new(&notifier_config(&mock_server)).unwrap();
    assert!(notifier.send("hello").await.is_err());
}

#[tokio::test]
async fn test_whatsapp_unreachable_is_external_api_error() {
    let config = NotifierConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        account_sid: "AC_test".to_string(),
        auth_token: "test_token".to_string(),
        from: "+14155238886".to_string(),
        to: "+917605021990".to_string(),
    };
    let notifier = WhatsAppNotifier::new(&config).unwrap();

    let err = notifier.send("hello").await.unwrap_err();
    assert!(err.to_string().starts_with("Twilio request failed: External API error"));
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_whatsapp_dispatch_swallows_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = WhatsAppNotifier::new(&notifier_config(&mock_server)).unwrap();
    let handle = notifier.dispatch("hello".to_string());

    // The background task completes without panicking even though Twilio failed
    assert!(handle.await.is_ok());
}
