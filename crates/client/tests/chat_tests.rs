//! Chat lifecycle against an in-process mock service.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use common::{Recorder, serve, sse_body};
use futures::StreamExt;
use polyfact_client::{Chat, ChatOptions, DataSource, LoadProgress, PolyfactClient};
use polyfact_core::GenerationOptions;
use serde_json::{Value, json};

/// Failure and timing switches for the mock service.
#[derive(Debug, Clone, Copy, Default)]
struct Mode {
    /// `POST /memory` answers 500.
    create_memory_fails: bool,
    /// `PUT /memory` answers 500.
    add_memory_fails: bool,
    /// Streamed replies send one chunk, then hold the end marker back.
    slow_end: bool,
}

/// A mock service with chats, generation (complete and streamed), memory,
/// and history. Memory ids are handed out as `mem-1`, `mem-2`, ...
fn service(recorder: Recorder, mode: Mode) -> Router {
    let chats = recorder.clone();
    let generate = recorder.clone();
    let create_memory = recorder.clone();
    let add_memory = recorder;
    let next_memory = Arc::new(AtomicUsize::new(1));

    Router::new()
        .route(
            "/chats",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let chats = chats.clone();
                async move {
                    chats.record("/chats", &headers, body);
                    Json(json!({ "id": "chat-9" }))
                }
            }),
        )
        .route(
            "/generate",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let generate = generate.clone();
                async move {
                    let stream = body["stream"] == true;
                    generate.record("/generate", &headers, body);
                    if stream && mode.slow_end {
                        let frames = futures::stream::iter([
                            ("data: partial\n\n", 0),
                            ("data: [END]\n\n", 300),
                        ])
                        .then(|(frame, delay_ms)| async move {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                            Ok::<_, std::io::Error>(frame)
                        });
                        (
                            [(header::CONTENT_TYPE, "text/event-stream")],
                            Body::from_stream(frames),
                        )
                            .into_response()
                    } else if stream {
                        (
                            [(header::CONTENT_TYPE, "text/event-stream")],
                            sse_body(&["Hi", " human"]),
                        )
                            .into_response()
                    } else {
                        Json(json!({
                            "result": "Hi human",
                            "token_usage": { "input": 2, "output": 2 }
                        }))
                        .into_response()
                    }
                }
            }),
        )
        .route(
            "/memory",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let create_memory = create_memory.clone();
                let next_memory = next_memory.clone();
                async move {
                    create_memory.record("POST /memory", &headers, body);
                    if mode.create_memory_fails {
                        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
                    }
                    let n = next_memory.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "id": format!("mem-{n}") })).into_response()
                }
            })
            .put(move |headers: HeaderMap, Json(body): Json<Value>| {
                let add_memory = add_memory.clone();
                async move {
                    add_memory.record("PUT /memory", &headers, body);
                    if mode.add_memory_fails {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        )
        .route(
            "/chat/{id}/history",
            get(|Path(id): Path<String>| async move { history(&id) }),
        )
}

fn history(chat_id: &str) -> Response {
    Json(json!([
        {
            "id": "m1",
            "chat_id": chat_id,
            "is_user_message": true,
            "content": "Hello",
            "created_at": "2024-01-01T00:00:00Z"
        },
        { "id": "broken" },
        {
            "id": "m2",
            "chat_id": chat_id,
            "is_user_message": false,
            "content": "Hi human",
            "created_at": "2024-01-01T00:00:01Z"
        }
    ]))
    .into_response()
}

async fn client_for(recorder: &Recorder, mode: Mode) -> PolyfactClient {
    let url = serve(service(recorder.clone(), mode)).await;
    PolyfactClient::with_token(url, "pf-token").unwrap()
}

#[tokio::test]
async fn new_chat_sends_system_prompt_and_forces_chat_options() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let chat = Chat::new(
        &client,
        ChatOptions::default().with_system_prompt("You are terse."),
    )
    .await
    .unwrap();
    assert_eq!(chat.id(), "chat-9");
    assert_eq!(
        recorder.bodies("/chats"),
        vec![json!({ "system_prompt": "You are terse." })]
    );

    let reply = chat
        .send_message("Hello", GenerationOptions::default().with_web(true))
        .await
        .unwrap();
    assert_eq!(reply, "Hi human");

    let body = &recorder.bodies("/generate")[0];
    assert_eq!(body["task"], "Hello");
    assert_eq!(body["chat_id"], "chat-9");
    assert_eq!(body["web"], false);
    assert_eq!(body["infos"], true);
    assert!(body.get("memory_id").is_none());
    assert!(recorder.at("POST /memory").is_empty());
}

#[tokio::test]
async fn auto_memory_records_each_exchange() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let chat = Chat::new(&client, ChatOptions::default().with_auto_memory(true))
        .await
        .unwrap();
    assert_eq!(chat.auto_memory().map(|m| m.id()), Some("mem-1"));

    let result = chat
        .send_message_with_usage("Hello", GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(result.token_usage.total(), 4);

    assert_eq!(recorder.bodies("/generate")[0]["memory_id"], "mem-1");
    assert_eq!(
        recorder.bodies("PUT /memory"),
        vec![
            json!({ "id": "mem-1", "input": "Human: Hello", "max_token": 0 }),
            json!({ "id": "mem-1", "input": "AI: Hi human", "max_token": 0 }),
        ]
    );
}

#[tokio::test]
async fn streamed_reply_is_recorded_after_it_ends() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let chat = Chat::new(&client, ChatOptions::default().with_auto_memory(true))
        .await
        .unwrap();
    let text = chat
        .send_message_stream("Hello", GenerationOptions::default())
        .await
        .unwrap()
        .collect_text()
        .await
        .unwrap();
    assert_eq!(text, "Hi human");

    let added = recorder.wait_for("PUT /memory", 2).await;
    assert_eq!(added.len(), 2);
    assert_eq!(added[0]["input"], "Human: Hello");
    assert_eq!(added[1]["input"], "AI: Hi human");
}

#[tokio::test]
async fn streamed_reply_without_auto_memory() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let chat = Chat::resume(&client, "chat-3", ChatOptions::default())
        .await
        .unwrap();
    let text = chat
        .send_message_stream("Hello", GenerationOptions::default())
        .await
        .unwrap()
        .collect_text()
        .await
        .unwrap();
    assert_eq!(text, "Hi human");
    assert!(recorder.at("/chats").is_empty());
    assert_eq!(recorder.bodies("/generate")[0]["chat_id"], "chat-3");
    assert!(recorder.at("PUT /memory").is_empty());
}

#[tokio::test]
async fn history_skips_malformed_entries() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let chat = Chat::resume(&client, "chat-3", ChatOptions::default())
        .await
        .unwrap();
    let messages = chat.get_messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].chat_id, "chat-3");
    assert_eq!(messages[0].author(), "Human");
    assert_eq!(messages[1].content, "Hi human");
    assert_eq!(messages[1].author(), "AI");
}

#[tokio::test]
async fn data_loader_reports_progress_and_sets_memory() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let mut chat = Chat::new(&client, ChatOptions::default()).await.unwrap();
    let mut progress = Vec::new();
    chat.data_loader(
        &[
            DataSource::Text("Paris is the capital of France.".into()),
            DataSource::Text("Berlin is the capital of Germany.".into()),
        ],
        |step| progress.push(step),
    )
    .await;

    assert_eq!(
        progress,
        vec![
            LoadProgress::StartLoading,
            LoadProgress::GetMemoryId,
            LoadProgress::FullyLoaded,
        ]
    );
    assert_eq!(chat.memory_id(), Some("mem-1"));
    assert_eq!(recorder.at("PUT /memory").len(), 2);

    chat.send_message("Capital of France?", GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(recorder.bodies("/generate")[0]["memory_id"], "mem-1");
}

#[tokio::test]
async fn loaded_memory_wins_over_auto_memory() {
    let recorder = Recorder::default();
    let client = client_for(&recorder, Mode::default()).await;

    let mut chat = Chat::new(&client, ChatOptions::default().with_auto_memory(true))
        .await
        .unwrap();
    chat.data_loader(&[DataSource::Text("facts".into())], |_| {})
        .await;
    assert_eq!(chat.memory_id(), Some("mem-2"));

    chat.send_message("Hello", GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(recorder.bodies("/generate")[0]["memory_id"], "mem-2");
}

#[tokio::test]
async fn data_loader_failure_is_reported_not_returned() {
    let recorder = Recorder::default();
    let client = client_for(
        &recorder,
        Mode {
            create_memory_fails: true,
            ..Mode::default()
        },
    ).await;

    let mut chat = Chat::new(&client, ChatOptions::default()).await.unwrap();
    let mut progress = Vec::new();
    chat.data_loader(&[DataSource::Text("facts".into())], |step| {
        progress.push(step)
    })
    .await;

    assert_eq!(
        progress,
        vec![LoadProgress::StartLoading, LoadProgress::LoadError]
    );
    assert_eq!(chat.memory_id(), None);
}

#[tokio::test]
async fn stream_stopped_before_its_end_marker_is_not_recorded() {
    let recorder = Recorder::default();
    let client = client_for(
        &recorder,
        Mode {
            slow_end: true,
            ..Mode::default()
        },
    )
    .await;

    let chat = Chat::new(&client, ChatOptions::default().with_auto_memory(true))
        .await
        .unwrap();
    let mut stream = chat
        .send_message_stream("Hello", GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(stream.next_chunk().await.unwrap().unwrap(), "partial");
    stream.stop();

    // Long enough for the held end marker to arrive and be relayed.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(recorder.at("PUT /memory").is_empty());
}

#[tokio::test]
async fn memory_write_failures_do_not_fail_the_reply() {
    let recorder = Recorder::default();
    let client = client_for(
        &recorder,
        Mode {
            add_memory_fails: true,
            ..Mode::default()
        },
    )
    .await;

    let chat = Chat::new(&client, ChatOptions::default().with_auto_memory(true))
        .await
        .unwrap();

    let reply = chat
        .send_message("Hello", GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(reply, "Hi human");
    // The first failed write ends the recording of that exchange.
    assert_eq!(
        recorder.bodies("PUT /memory"),
        vec![json!({ "id": "mem-1", "input": "Human: Hello", "max_token": 0 })]
    );

    let text = chat
        .send_message_stream("Hello again", GenerationOptions::default())
        .await
        .unwrap()
        .collect_text()
        .await
        .unwrap();
    assert_eq!(text, "Hi human");
    let attempts = recorder.wait_for("PUT /memory", 2).await;
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1]["input"], "Human: Hello again");
}
