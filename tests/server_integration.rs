//! End-to-end tests: the API client talking to a live server
//!
//! The server runs on an ephemeral local port with in-process providers.

mod common;

use common::{create_temp_storage, seed_user, StaticProvider};
use creditchat::client::{ApiClient, Phase};
use creditchat::config::Config;
use creditchat::providers::{GenerationMode, Providers};
use creditchat::server::{build_router, AppState};
use creditchat::storage::{ChatStore, SqliteStorage, UserDirectory};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    storage: Arc<SqliteStorage>,
    _tmp: TempDir,
}

async fn start_server() -> TestServer {
    let (storage, tmp) = create_temp_storage();
    let providers = Providers::new(
        StaticProvider::new("Hello from the model"),
        StaticProvider::new("https://cdn.example/img.png"),
    );
    let state = AppState::from_storage(storage.clone(), providers, &Config::default());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        storage,
        _tmp: tmp,
    }
}

fn client(server: &TestServer, token: &str) -> ApiClient {
    ApiClient::new(&server.base_url, token, Duration::from_secs(5)).expect("api client")
}

#[tokio::test]
async fn test_client_round_trip_commits_reply_and_balance() {
    let server = start_server().await;
    let (user, token) = server.storage.create_user("Alice", 3).unwrap();
    let api = client(&server, &token);

    let mut state = api.bootstrap(None).await.expect("bootstrap");
    assert_eq!(state.balance(), 3);
    assert_eq!(state.chats().len(), 1);

    let submission = state
        .submit("Hello?", GenerationMode::Text, false)
        .expect("submission");
    let failures = api.drive(&mut state, submission).await;

    assert!(failures.is_empty());
    assert_eq!(state.phase(), Phase::Committed);
    assert_eq!(state.balance(), 2);
    assert_eq!(state.messages().len(), 2);
    assert_eq!(state.messages()[1].content, "Hello from the model");

    let chat_id = state.active_chat().unwrap().to_string();
    let stored = server.storage.get(&chat_id, &user.id).unwrap().unwrap();
    assert_eq!(stored.messages, state.messages());
}

#[tokio::test]
async fn test_insufficient_credits_rolls_back_client_state() {
    let server = start_server().await;
    let (user, chat, token) = seed_user(&server.storage, "Alice", 1);
    let api = client(&server, &token);

    let mut state = api.bootstrap(Some(&chat.id)).await.expect("bootstrap");
    let submission = state
        .submit("a dragon", GenerationMode::Image, true)
        .expect("submission");
    let failures = api.drive(&mut state, submission).await;

    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("enough credits"));
    assert_eq!(
        state.phase(),
        Phase::RolledBack {
            prompt_recorded: false
        }
    );
    assert!(state.messages().is_empty());
    assert_eq!(state.input(), "a dragon");
    assert_eq!(state.balance(), 1);
    assert_eq!(server.storage.find_user(&user.id).unwrap().unwrap().credits, 1);
}

#[tokio::test]
async fn test_published_image_is_visible_without_token() {
    let server = start_server().await;
    let (_, chat, token) = seed_user(&server.storage, "Alice", 2);
    let api = client(&server, &token);

    let mut state = api.bootstrap(Some(&chat.id)).await.expect("bootstrap");
    let submission = state
        .submit("a lighthouse", GenerationMode::Image, true)
        .expect("submission");
    assert!(api.drive(&mut state, submission).await.is_empty());
    assert_eq!(state.balance(), 0);

    let anonymous = client(&server, "");
    let gallery = anonymous.published_images().await.expect("gallery");
    assert_eq!(gallery.images.len(), 1);
    assert_eq!(gallery.images[0].image_url, "https://cdn.example/img.png");
    assert_eq!(gallery.images[0].owner_name, "Alice");
}

#[tokio::test]
async fn test_deleted_chat_cannot_be_opened() {
    let server = start_server().await;
    let (_, chat, token) = seed_user(&server.storage, "Alice", 0);
    let api = client(&server, &token);

    api.delete_chat(&chat.id).await.expect("delete");

    assert!(api.open_chat(&chat.id).await.is_err());
    assert!(api.list_chats().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_token_is_an_authentication_error() {
    let server = start_server().await;
    let api = client(&server, "not-a-real-token");

    let err = api.user().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<creditchat::CreditChatError>(),
        Some(creditchat::CreditChatError::Authentication(_))
    ));
}
