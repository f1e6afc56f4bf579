// Entity-store behavior against the in-memory backend: round trips, the
// live-client invariant, scope merging, optimistic concurrency, and
// cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use granary::{
    Application, ApplicationKind, ApplicationStore, Authorization, AuthorizationStore, DeviceCode,
    DeviceCodeStore, Provider, ProviderOptions, StoreClient, StoreError, Token, TokenKind,
    WaitOptions,
};
use granary_memory::MemoryStore;

async fn provider() -> (MemoryStore, Provider, CancellationToken) {
    let memory = MemoryStore::new();
    let client: Arc<dyn StoreClient> = Arc::new(memory.clone());
    let provider = Provider::new(client, ProviderOptions::default());
    let cancel = CancellationToken::new();
    provider.initialize(&cancel).await.unwrap();
    (memory, provider, cancel)
}

#[tokio::test]
async fn application_round_trip() {
    let (_memory, provider, cancel) = provider().await;

    let app = Application::new("web-client", "Web portal", ApplicationKind::Confidential)
        .with_client_secret("hashed-secret")
        .with_redirect_uri("https://example.com/cb")
        .with_logout_redirect_uri("https://example.com/bye");
    provider.create_application(&app, &cancel).await.unwrap();

    let found = provider.find_application(&app.id, &cancel).await.unwrap();
    assert_eq!(found, app);

    let by_client = provider
        .find_application_by_client_id("web-client", &cancel)
        .await
        .unwrap();
    assert_eq!(by_client.id, app.id);

    let by_logout = provider
        .find_application_by_logout_redirect_uri("https://example.com/bye", &cancel)
        .await
        .unwrap();
    assert_eq!(by_logout.id, app.id);
}

#[tokio::test]
async fn authorization_round_trip() {
    let memory = MemoryStore::new();
    let client: Arc<dyn StoreClient> = Arc::new(memory.clone());
    let store = AuthorizationStore::new(client, "authorizations");
    let cancel = CancellationToken::new();
    store.initialize(&WaitOptions::default(), &cancel).await.unwrap();

    let auth = Authorization::new("alice", "app-1", ["openid", "email"]);
    store.create(&auth, &cancel).await.unwrap();

    let found = store.find_by_id(&auth.id, &cancel).await.unwrap();
    assert_eq!(found, auth);

    assert!(matches!(
        store.find_by_id("missing", &cancel).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn device_code_round_trip() {
    let memory = MemoryStore::new();
    let client: Arc<dyn StoreClient> = Arc::new(memory.clone());
    let store = DeviceCodeStore::new(client, "deviceCodes");
    let cancel = CancellationToken::new();
    store.initialize(&WaitOptions::default(), &cancel).await.unwrap();

    let code = DeviceCode::new(
        "app-1",
        vec!["openid".into()],
        Duration::from_secs(300),
        8,
        40,
    );
    store.create(&code, &cancel).await.unwrap();

    let found = store.find_by_id(&code.id, &cancel).await.unwrap();
    assert_eq!(found, code);

    assert!(matches!(
        store.find_by_id("missing", &cancel).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn one_live_client_per_client_id() {
    let (_memory, provider, cancel) = provider().await;

    let mut first = Application::new("shared-id", "First", ApplicationKind::Public);
    provider.create_application(&first, &cancel).await.unwrap();
    provider.delete_application(&mut first, &cancel).await.unwrap();

    let second = Application::new("shared-id", "Second", ApplicationKind::Public);
    provider.create_application(&second, &cancel).await.unwrap();

    let found = provider
        .find_application_by_client_id("shared-id", &cancel)
        .await
        .unwrap();
    assert_eq!(found.id, second.id, "deleted row must not shadow the live one");

    // Both rows still exist physically: deletion is soft.
    assert_eq!(provider.list_applications(&cancel).await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleted_client_id_is_not_found() {
    let (_memory, provider, cancel) = provider().await;

    let mut app = Application::new("gone", "Gone", ApplicationKind::Public);
    provider.create_application(&app, &cancel).await.unwrap();
    provider.delete_application(&mut app, &cancel).await.unwrap();

    assert!(matches!(
        provider.find_application_by_client_id("gone", &cancel).await,
        Err(StoreError::NotFound(_))
    ));
    // FindById still resolves the tombstoned row.
    assert!(provider.find_application(&app.id, &cancel).await.unwrap().is_deleted());
}

#[tokio::test]
async fn delete_twice_is_a_conflict() {
    let (_memory, provider, cancel) = provider().await;

    let mut app = Application::new("once", "Once", ApplicationKind::Public);
    provider.create_application(&app, &cancel).await.unwrap();
    provider.delete_application(&mut app, &cancel).await.unwrap();

    assert!(matches!(
        provider.delete_application(&mut app, &cancel).await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn stale_update_is_rejected() {
    let (_memory, provider, cancel) = provider().await;

    let mut app = Application::new("cli", "CLI", ApplicationKind::Public);
    provider.create_application(&app, &cancel).await.unwrap();

    let mut stale = app.clone();
    app.display_name = "CLI v2".into();
    provider.update_application(&mut app, &cancel).await.unwrap();

    stale.display_name = "CLI v3".into();
    let result = provider.update_application(&mut stale, &cancel).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    // The winning write is intact and the loser's version was not bumped.
    let current = provider.find_application(&app.id, &cancel).await.unwrap();
    assert_eq!(current.display_name, "CLI v2");
    assert_eq!(current.version, 1);
    assert_eq!(stale.version, 0);
}

#[tokio::test]
async fn authorization_scopes_merge_into_one_row() {
    let (_memory, provider, cancel) = provider().await;

    let first = provider
        .find_or_create_authorization("alice", "app-1", vec!["a".into(), "b".into()], &cancel)
        .await
        .unwrap();
    let second = provider
        .find_or_create_authorization("alice", "app-1", vec!["b".into(), "c".into()], &cancel)
        .await
        .unwrap();

    assert_eq!(second.id, first.id, "second consent must reuse the row");
    assert_eq!(second.scopes, vec!["a", "b", "c"]);

    let found = provider
        .find_authorization("alice", "app-1", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.scopes, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn authorization_pairs_are_independent() {
    let (_memory, provider, cancel) = provider().await;

    provider
        .find_or_create_authorization("alice", "app-1", vec!["a".into()], &cancel)
        .await
        .unwrap();
    provider
        .find_or_create_authorization("alice", "app-2", vec!["b".into()], &cancel)
        .await
        .unwrap();
    provider
        .find_or_create_authorization("bob", "app-1", vec!["c".into()], &cancel)
        .await
        .unwrap();

    let alice_app1 = provider
        .find_authorization("alice", "app-1", &cancel)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice_app1.scopes, vec!["a"]);
}

#[tokio::test]
async fn revoked_authorization_is_gone() {
    let (_memory, provider, cancel) = provider().await;

    let auth = provider
        .find_or_create_authorization("alice", "app-1", vec!["a".into()], &cancel)
        .await
        .unwrap();
    provider.revoke_authorization(&auth.id, &cancel).await.unwrap();

    assert!(provider
        .find_authorization("alice", "app-1", &cancel)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        provider.revoke_authorization(&auth.id, &cancel).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn token_round_trip_and_lookups() {
    let (_memory, provider, cancel) = provider().await;

    let access = Token::new("alice", TokenKind::Access)
        .with_application("app-1")
        .with_authorization("auth-1");
    let refresh = Token::new("alice", TokenKind::Refresh).with_application("app-2");
    let other = Token::new("bob", TokenKind::Access).with_application("app-1");
    for token in [&access, &refresh, &other] {
        provider.create_token(token, &cancel).await.unwrap();
    }

    let by_subject = provider.find_tokens_by_subject("alice", &cancel).await.unwrap();
    assert_eq!(by_subject.len(), 2);

    let by_application = provider
        .find_tokens_by_application("app-1", &cancel)
        .await
        .unwrap();
    assert_eq!(by_application.len(), 2);

    let by_authorization = provider
        .find_tokens_by_authorization("auth-1", &cancel)
        .await
        .unwrap();
    assert_eq!(by_authorization.len(), 1);
    assert_eq!(by_authorization[0], access);
}

#[tokio::test]
async fn token_association_after_issuance() {
    let (_memory, provider, cancel) = provider().await;

    let mut token = Token::new("alice", TokenKind::Access);
    provider.create_token(&token, &cancel).await.unwrap();
    assert!(provider
        .find_tokens_by_application("app-1", &cancel)
        .await
        .unwrap()
        .is_empty());

    token.application = Some("app-1".into());
    provider.update_token(&mut token, &cancel).await.unwrap();

    let found = provider
        .find_tokens_by_application("app-1", &cancel)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn revoked_token_is_hard_deleted() {
    let (memory, provider, cancel) = provider().await;

    let token = Token::new("alice", TokenKind::Access);
    provider.create_token(&token, &cancel).await.unwrap();
    provider.revoke_token(&token.id, &cancel).await.unwrap();

    assert_eq!(memory.item_count("tokens").await, 0);
}

#[tokio::test]
async fn empty_identifiers_are_invalid_arguments() {
    let (_memory, provider, cancel) = provider().await;

    assert!(matches!(
        provider.find_application_by_client_id("", &cancel).await,
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        provider.find_tokens_by_subject("", &cancel).await,
        Err(StoreError::InvalidArgument(_))
    ));

    let app = Application::new("", "No client id", ApplicationKind::Public);
    assert!(matches!(
        provider.create_application(&app, &cancel).await,
        Err(StoreError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn cancelled_operation_writes_nothing() {
    let memory = MemoryStore::new();
    let client: Arc<dyn StoreClient> = Arc::new(memory.clone());
    let store = ApplicationStore::new(client, "applications");
    let cancel = CancellationToken::new();
    store
        .initialize(&WaitOptions::default(), &cancel)
        .await
        .unwrap();

    cancel.cancel();
    let app = Application::new("cli", "CLI", ApplicationKind::Public);
    assert!(matches!(
        store.create(&app, &cancel).await,
        Err(StoreError::Cancelled)
    ));
    assert_eq!(memory.item_count("applications").await, 0);
}
