//! SendGrid delivery against a mocked API.

use httpmock::prelude::*;
use medflow_clinic::mail::{invite_email, SendGridMailer};
use medflow_clinic::{MailError, Mailer};
use medflow_config::EmailConfig;

fn mailer_for(server: &MockServer) -> SendGridMailer {
    let config = EmailConfig {
        sendgrid_api_key: Some("SG.test".into()),
        from: "noreply@medflow.test".into(),
        api_base: server.base_url(),
    };
    SendGridMailer::new(&config, "SG.test").unwrap()
}

fn message() -> medflow_clinic::EmailMessage {
    invite_email(
        "new@clinic.test",
        "http://app.test/auth/invite/accept?token=abc",
        "Sunrise Clinic",
        "admin@clinic.test",
    )
}

#[tokio::test]
async fn send_posts_both_parts_with_bearer_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v3/mail/send")
                .header("authorization", "Bearer SG.test")
                .body_contains("\"email\":\"new@clinic.test\"")
                .body_contains("\"email\":\"noreply@medflow.test\"")
                .body_contains("text/plain")
                .body_contains("text/html");
            then.status(202);
        })
        .await;

    mailer_for(&server).send(message()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_message_is_a_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(400)
                .body(r#"{"errors":[{"message":"bad from address"}]}"#);
        })
        .await;

    let err = mailer_for(&server).send(message()).await.unwrap_err();
    match err {
        MailError::Provider { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("bad from address"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
