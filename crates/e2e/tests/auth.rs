use std::sync::Arc;
use std::time::Duration;

use shoplist_api_client::{ApiClient, AuthEvent, HttpSession, SessionProvider};
use shoplist_e2e::spawn;

fn session_for(base_url: &str) -> HttpSession {
    let api = Arc::new(ApiClient::new(base_url, Duration::from_secs(5)).unwrap());
    HttpSession::new(api)
}

#[tokio::test]
async fn password_sign_in_round_trip() {
    let (url, stub) = spawn().await.unwrap();
    stub.add_user("alice@example.com", "hunter2");

    let session = session_for(&url);
    assert_eq!(session.current_user().await.unwrap(), None);

    let resp = session.sign_in("alice@example.com", "hunter2").await.unwrap();
    assert_eq!(resp.user.email, "alice@example.com");
    assert!(!resp.access_token.is_empty());

    let user = session.current_user().await.unwrap().unwrap();
    assert_eq!(user.id, resp.user.id);

    session.sign_out().await;
    assert_eq!(session.current_user().await.unwrap(), None);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (url, stub) = spawn().await.unwrap();
    stub.add_user("alice@example.com", "hunter2");

    let session = session_for(&url);
    let err = session
        .sign_in("alice@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn sign_in_and_out_emit_auth_events() {
    let (url, stub) = spawn().await.unwrap();
    stub.add_user("alice@example.com", "hunter2");

    let session = session_for(&url);
    let mut events = session.subscribe();

    session.sign_in("alice@example.com", "hunter2").await.unwrap();
    match events.recv().await.unwrap() {
        AuthEvent::SignedIn(user) => assert_eq!(user.email, "alice@example.com"),
        other => panic!("expected SignedIn, got {other:?}"),
    }

    session.sign_out().await;
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
}

#[tokio::test]
async fn stale_token_is_not_a_session() {
    let (url, stub) = spawn().await.unwrap();
    stub.add_user("alice@example.com", "hunter2");

    let session = session_for(&url);
    session.restore("not-a-real-token".to_string());
    assert_eq!(session.current_user().await.unwrap(), None);
}
