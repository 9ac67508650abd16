//! Sign-in flows against a mock identity provider and token exchange.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use common::{Recorder, serve};
use polyfact_client::{
    AuthClient, Credentials, IdentityProvider, LoginInput, LoginOutcome, OAuthProvider,
    PolyfactClient,
};
use polyfact_core::{Error, InMemorySessionStore, REFRESH_TOKEN_KEY, SessionStore};
use serde_json::{Value, json};
use std::collections::HashMap;

const ANON_KEY: &str = "anon-key";

#[derive(Clone, Copy)]
enum Refresh {
    /// Answer with `at-{n}` / `rt-{n}`, counting from 1.
    Rotate,
    Reject,
}

/// Identity provider (`/auth/v1/token`) plus the project token exchange on
/// one mock server.
fn service(recorder: Recorder, refresh: Refresh, exchange_body: &'static str) -> Router {
    let idp = recorder.clone();
    let exchange = recorder;
    let issued = Arc::new(AtomicUsize::new(1));

    Router::new()
        .route(
            "/auth/v1/token",
            post(
                move |Query(query): Query<HashMap<String, String>>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    let idp = idp.clone();
                    let issued = issued.clone();
                    async move {
                        assert_eq!(
                            query.get("grant_type").map(String::as_str),
                            Some("refresh_token")
                        );
                        idp.record("/auth/v1/token", &headers, body);
                        match refresh {
                            Refresh::Reject => (
                                StatusCode::BAD_REQUEST,
                                Json(json!({ "error": "invalid_grant" })),
                            )
                                .into_response(),
                            Refresh::Rotate => {
                                let n = issued.fetch_add(1, Ordering::SeqCst);
                                Json(json!({
                                    "access_token": format!("at-{n}"),
                                    "refresh_token": format!("rt-{n}"),
                                    "token_type": "bearer"
                                }))
                                .into_response()
                            }
                        }
                    }
                },
            ),
        )
        .route(
            "/project/{project_id}/auth/{kind}",
            get(
                move |Path((project_id, kind)): Path<(String, String)>, headers: HeaderMap| {
                    let exchange = exchange.clone();
                    async move {
                        exchange.record(
                            &format!("/project/{project_id}/auth/{kind}"),
                            &headers,
                            Value::Null,
                        );
                        exchange_body
                    }
                },
            ),
        )
}

struct Harness {
    auth: AuthClient,
    client: PolyfactClient,
    store: Arc<InMemorySessionStore>,
    recorder: Recorder,
    url: String,
}

async fn harness(refresh: Refresh, exchange_body: &'static str) -> Harness {
    let recorder = Recorder::default();
    let url = serve(service(recorder.clone(), refresh, exchange_body)).await;
    let client = PolyfactClient::new(Credentials::new(url.clone())).unwrap();
    let store = Arc::new(InMemorySessionStore::new());
    let auth = AuthClient::new(
        client.clone(),
        "proj-1",
        Some(IdentityProvider::new(url.clone(), ANON_KEY)),
        store.clone(),
    );
    Harness {
        auth,
        client,
        store,
        recorder,
        url,
    }
}

#[tokio::test]
async fn callback_tokens_are_used_and_persisted() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;

    let session = h
        .auth
        .get_session(Some(
            "http://localhost:3000/#access_token=at-cb&refresh_token=rt-cb&token_type=bearer",
        ))
        .await
        .unwrap();

    assert_eq!(session.token.as_deref(), Some("at-cb"));
    assert_eq!(
        h.store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("rt-cb")
    );
    assert!(h.recorder.at("/auth/v1/token").is_empty());
}

#[tokio::test]
async fn stored_refresh_token_is_rotated() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;
    h.store.set(REFRESH_TOKEN_KEY, "rt-stored").await.unwrap();

    let session = h.auth.get_session(None).await.unwrap();
    assert_eq!(session.token.as_deref(), Some("at-1"));
    assert_eq!(
        h.store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("rt-1")
    );

    let calls = h.recorder.at("/auth/v1/token");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body, json!({ "refresh_token": "rt-stored" }));
    assert_eq!(calls[0].header("apikey").as_deref(), Some(ANON_KEY));
    assert_eq!(
        calls[0].header("authorization").as_deref(),
        Some("Bearer anon-key")
    );
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let h = harness(Refresh::Reject, "\"pf-token\"").await;
    h.store.set(REFRESH_TOKEN_KEY, "rt-revoked").await.unwrap();

    let session = h.auth.get_session(None).await.unwrap();
    assert!(!session.is_signed_in());
    assert_eq!(h.store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn nothing_stored_means_signed_out() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;

    assert!(!h.auth.get_session(None).await.unwrap().is_signed_in());
    assert!(!h.auth.init(None).await.unwrap());
    assert!(h.recorder.all().is_empty());
    assert!(!h.client.credentials().is_authenticated());
}

#[tokio::test]
async fn init_exchanges_the_session_token() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;
    h.store.set(REFRESH_TOKEN_KEY, "rt-stored").await.unwrap();

    assert!(h.auth.init(None).await.unwrap());
    assert_eq!(h.client.credentials().token().unwrap(), "pf-token");

    let exchanges = h.recorder.at("/project/proj-1/auth/token");
    assert_eq!(exchanges.len(), 1);
    assert_eq!(
        exchanges[0].header("authorization").as_deref(),
        Some("Bearer at-1")
    );
    assert_eq!(exchanges[0].header("x-access-token"), None);
}

#[tokio::test]
async fn firebase_login_signs_in_directly() {
    let h = harness(Refresh::Rotate, "pf-plain\n").await;

    let outcome = h
        .auth
        .login(
            LoginInput::Firebase {
                token: "fb-id-token".into(),
            },
            "http://localhost:3000",
        )
        .await
        .unwrap();

    assert_eq!(outcome, LoginOutcome::SignedIn);
    assert_eq!(h.client.credentials().token().unwrap(), "pf-plain");
    let exchanges = h.recorder.at("/project/proj-1/auth/firebase");
    assert_eq!(
        exchanges[0].header("authorization").as_deref(),
        Some("Bearer fb-id-token")
    );
}

#[tokio::test]
async fn oauth_login_returns_the_provider_redirect() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;

    let outcome = h
        .auth
        .login(OAuthProvider::Github, "http://localhost:3000")
        .await
        .unwrap();

    let LoginOutcome::Redirect { url } = outcome else {
        panic!("expected a redirect");
    };
    assert!(url.starts_with(&format!("{}/auth/v1/authorize?", h.url)));
    assert!(url.contains("provider=github"));
    assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000"));
    assert!(!h.client.credentials().is_authenticated());
}

#[tokio::test]
async fn logout_forgets_everything() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;
    h.store.set(REFRESH_TOKEN_KEY, "rt-stored").await.unwrap();
    assert!(h.auth.init(None).await.unwrap());

    h.auth.logout().await.unwrap();

    assert_eq!(h.store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);
    assert!(matches!(
        h.client.credentials().token(),
        Err(Error::NotAuthenticated(_))
    ));
}

#[tokio::test]
async fn concurrent_sessions_refresh_one_at_a_time() {
    let h = harness(Refresh::Rotate, "\"pf-token\"").await;
    h.store.set(REFRESH_TOKEN_KEY, "rt-0").await.unwrap();

    let (a, b) = tokio::join!(h.auth.get_session(None), h.auth.get_session(None));
    let mut tokens = vec![a.unwrap().token.unwrap(), b.unwrap().token.unwrap()];
    tokens.sort();
    assert_eq!(tokens, vec!["at-1", "at-2"]);

    let sent: Vec<Value> = h.recorder.bodies("/auth/v1/token");
    assert_eq!(
        sent,
        vec![
            json!({ "refresh_token": "rt-0" }),
            json!({ "refresh_token": "rt-1" }),
        ]
    );
    assert_eq!(
        h.store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("rt-2")
    );
}
