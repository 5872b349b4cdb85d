use std::sync::Arc;

use agentchat::{
    AgentOrchestrator, HttpAgentClient, ReplyOrder, SendState, SessionIdentity, SessionStatus,
    TranscriptRole, SEND_ERROR_TEXT, SESSION_ERROR_TEXT,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_PATH: &str = "/apps/doc-test-model/users/0/sessions/1";

fn orchestrator(server: &MockServer) -> AgentOrchestrator {
    let client = HttpAgentClient::with_client(&server.uri(), reqwest::Client::new());
    let identity = SessionIdentity::new("doc-test-model", "0", "1").unwrap();
    AgentOrchestrator::new(Arc::new(client), identity, ReplyOrder::Reversed)
}

fn text_event(text: &str) -> serde_json::Value {
    json!({
        "author": "doc_agent",
        "content": { "parts": [{ "text": text }], "role": "model" },
        "id": "evt-1",
        "invocationId": "inv-1",
        "timestamp": 1718000000.5
    })
}

async fn mount_session(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_run(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn hello_round_trip() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_json(json!({
            "appName": "doc-test-model",
            "userId": "0",
            "sessionId": "1",
            "newMessage": { "parts": [{ "text": "Hello" }], "role": "user" },
            "streaming": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([text_event("Hi there")])))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = orchestrator(&server);
    assert_eq!(agent.initialize().await, Ok(SessionStatus::Created));
    assert_eq!(agent.send("Hello").await, Some(SendState::Succeeded));

    let entries = agent.transcript().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, TranscriptRole::User);
    assert_eq!(entries[0].text, "Hello");
    assert_eq!(entries[1].role, TranscriptRole::Agent);
    assert_eq!(entries[1].text, "Hi there\n");
}

#[tokio::test]
async fn existing_session_adds_nothing() {
    let server = MockServer::start().await;
    mount_session(&server, 400).await;

    let mut agent = orchestrator(&server);
    assert_eq!(agent.initialize().await, Ok(SessionStatus::AlreadyExists));
    assert!(agent.transcript().is_empty());
}

#[tokio::test]
async fn rejected_session_is_reported_once() {
    let server = MockServer::start().await;
    mount_session(&server, 500).await;
    mount_run(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([text_event("still here")])),
    )
    .await;

    let mut agent = orchestrator(&server);
    assert!(agent.initialize().await.is_err());
    assert_eq!(agent.send("Hello").await, Some(SendState::Succeeded));

    let texts: Vec<_> = agent.transcript().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec![SESSION_ERROR_TEXT, "Hello", "still here\n"]);
}

#[tokio::test]
async fn multiple_events_are_joined_newest_first() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_run(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([text_event("A"), text_event("B")])),
    )
    .await;

    let mut agent = orchestrator(&server);
    agent.send("Hello").await;

    assert_eq!(agent.transcript().last().unwrap().text, "BA\n\n");
}

#[tokio::test]
async fn empty_event_list_gives_empty_reply() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_run(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

    let mut agent = orchestrator(&server);
    assert_eq!(agent.send("Hello").await, Some(SendState::Succeeded));

    let last = agent.transcript().last().unwrap();
    assert_eq!(last.role, TranscriptRole::Agent);
    assert_eq!(last.text, "");
}

#[tokio::test]
async fn server_error_shows_generic_text() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_run(&server, ResponseTemplate::new(500).set_body_string("boom")).await;

    let mut agent = orchestrator(&server);
    assert_eq!(agent.send("Hello").await, Some(SendState::Failed));
    assert_eq!(agent.transcript().last().unwrap().text, SEND_ERROR_TEXT);
    assert!(!agent.is_busy());
}

#[tokio::test]
async fn malformed_body_shows_generic_text() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_run(&server, ResponseTemplate::new(200).set_body_string("not json")).await;

    let mut agent = orchestrator(&server);
    assert_eq!(agent.send("Hello").await, Some(SendState::Failed));
    assert_eq!(agent.transcript().last().unwrap().text, SEND_ERROR_TEXT);
}

#[tokio::test]
async fn unreachable_server_fails_both_calls() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let uri = format!("http://127.0.0.1:{port}");
    let client = HttpAgentClient::with_client(&uri, reqwest::Client::new());
    let identity = SessionIdentity::new("doc-test-model", "0", "1").unwrap();
    let mut agent = AgentOrchestrator::new(Arc::new(client), identity, ReplyOrder::Reversed);

    assert!(agent.initialize().await.is_err());
    assert_eq!(agent.send("Hello").await, Some(SendState::Failed));

    let texts: Vec<_> = agent.transcript().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec![SESSION_ERROR_TEXT, "Hello", SEND_ERROR_TEXT]);
}

#[tokio::test]
async fn blank_input_is_never_sent() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut agent = orchestrator(&server);
    agent.initialize().await.unwrap();
    assert_eq!(agent.send("   ").await, None);
    assert!(agent.transcript().is_empty());
}
