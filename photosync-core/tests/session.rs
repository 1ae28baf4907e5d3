use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use photosync_core::{Session, SessionClient, SessionError, TrustedDevice};

fn session(token: &str) -> Session {
    Session {
        session_token: token.to_string(),
        requires_2sa: true,
    }
}

fn device() -> TrustedDevice {
    TrustedDevice {
        id: "dev-1".to_string(),
        device_name: Some("Phone".to_string()),
        phone_number: None,
    }
}

#[tokio::test]
async fn sign_in_posts_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/session"))
        .and(body_json(json!({ "username": "user@example.com", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_token": "sess-1",
            "requires_2sa": true
        })))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let session = client
        .sign_in("user@example.com", "secret")
        .await
        .unwrap();

    assert_eq!(session.session_token, "sess-1");
    assert!(session.requires_2sa);
}

#[tokio::test]
async fn sign_in_reports_rejected_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/session"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad password"))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let err = client.sign_in("user", "wrong").await.unwrap_err();

    match err {
        SessionError::Api { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "bad password");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn trusted_devices_lists_devices() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/session/devices"))
        .and(header("authorization", "Session sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [
                { "id": "dev-1", "device_name": "Phone" },
                { "id": "dev-2", "phone_number": "+1 555 0100" }
            ]
        })))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let devices = client.trusted_devices(&session("sess-1")).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].label(), "Phone");
    assert_eq!(devices[1].label(), "SMS to +1 555 0100");
}

#[tokio::test]
async fn send_verification_code_targets_device() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/session/verification"))
        .and(body_json(json!({ "device_id": "dev-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sent": true })))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let sent = client
        .send_verification_code(&session("sess-1"), &device())
        .await
        .unwrap();

    assert!(sent);
}

#[tokio::test]
async fn validate_verification_code_upgrades_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/session/verification/validate"))
        .and(body_json(json!({ "device_id": "dev-1", "code": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "verified": true,
            "session_token": "sess-2"
        })))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let upgraded = client
        .validate_verification_code(&session("sess-1"), &device(), "123456")
        .await
        .unwrap()
        .expect("code should be accepted");

    assert_eq!(upgraded.session_token, "sess-2");
    assert!(!upgraded.requires_2sa);
}

#[tokio::test]
async fn validate_verification_code_rejects_wrong_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/session/verification/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verified": false })))
        .mount(&server)
        .await;

    let client = SessionClient::with_base_url(&server.uri()).unwrap();
    let result = client
        .validate_verification_code(&session("sess-1"), &device(), "000000")
        .await
        .unwrap();

    assert!(result.is_none());
}
