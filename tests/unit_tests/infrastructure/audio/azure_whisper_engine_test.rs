use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::Multipart;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use speech_gateway::application::ports::{TranscriptionEngine, TranscriptionError};
use speech_gateway::domain::{AudioInput, TranscriptionRequest};
use speech_gateway::infrastructure::audio::AzureWhisperEngine;

type Captured = Arc<Mutex<Vec<(String, String)>>>;

async fn start_mock_azure_server(
    response_status: u16,
    response_body: &'static str,
) -> (String, Captured, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    let app = Router::new().route(
        "/openai/deployments/my-deployment/audio/transcriptions",
        post(move |headers: HeaderMap, mut multipart: Multipart| {
            let sink = Arc::clone(&sink);
            async move {
                if headers.get("api-key").is_none() {
                    return (StatusCode::UNAUTHORIZED, "missing key").into_response();
                }
                while let Ok(Some(field)) = multipart.next_field().await {
                    let name = field.name().unwrap_or_default().to_string();
                    let value = if name == "file" {
                        field.file_name().unwrap_or_default().to_string()
                    } else {
                        field.text().await.unwrap_or_default()
                    };
                    sink.lock().unwrap().push((name, value));
                }
                let status = StatusCode::from_u16(response_status).unwrap();
                (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    response_body,
                )
                    .into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, captured, shutdown_tx)
}

fn request() -> TranscriptionRequest {
    TranscriptionRequest::new(AudioInput::from_upload(
        b"fake audio bytes".to_vec(),
        Some("meeting.m4a".to_string()),
    ))
}

fn field(captured: &Captured, name: &str) -> Option<String> {
    captured
        .lock()
        .unwrap()
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}

#[tokio::test]
async fn given_verbose_response_when_transcribing_then_keeps_segment_statistics() {
    let body = r#"{
        "task": "transcribe",
        "language": "japanese",
        "duration": 2.5,
        "text": " こんにちは 世界 ",
        "segments": [
            {
                "id": 0, "seek": 0, "start": 0.0, "end": 1.2, "text": "こんにちは",
                "tokens": [50364, 38088], "temperature": 0.2, "avg_logprob": -0.3,
                "compression_ratio": 0.9, "no_speech_prob": 0.01
            },
            {"id": 1, "start": 1.2, "end": 2.5, "text": "世界"}
        ]
    }"#;
    let (base_url, _, shutdown_tx) = start_mock_azure_server(200, body).await;
    let engine = AzureWhisperEngine::new(&base_url, "my-deployment", "test-key", "2024-06-01");

    let result = engine.transcribe(request()).await.unwrap();

    assert_eq!(result.text, "こんにちは 世界");
    assert_eq!(result.duration_seconds, 2.5);
    assert_eq!(result.language, "japanese");
    assert_eq!(result.segments.len(), 2);

    let first = &result.segments[0];
    assert_eq!(first.tokens, vec![50364, 38088]);
    assert_eq!(first.temperature, 0.2);
    assert_eq!(first.avg_logprob, -0.3);
    assert_eq!(first.compression_ratio, 0.9);
    assert_eq!(first.no_speech_prob, 0.01);

    let second = &result.segments[1];
    assert_eq!(second.id, 1);
    assert_eq!(second.start, 1.2);
    assert_eq!(second.end, 2.5);
    assert_eq!(second.seek, 0);
    assert!(second.tokens.is_empty());
    assert_eq!(second.avg_logprob, 0.0);
    assert_eq!(second.no_speech_prob, 0.0);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_hints_when_transcribing_then_forwards_them_with_verbose_format() {
    let (base_url, captured, shutdown_tx) = start_mock_azure_server(200, r#"{"text": "ok"}"#).await;
    let engine = AzureWhisperEngine::new(&base_url, "my-deployment", "test-key", "2024-06-01");

    engine
        .transcribe(
            request()
                .with_language(Some("ja".to_string()))
                .with_prompt(Some("用語集".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(field(&captured, "response_format").as_deref(), Some("verbose_json"));
    assert_eq!(field(&captured, "language").as_deref(), Some("ja"));
    assert_eq!(field(&captured, "prompt").as_deref(), Some("用語集"));
    assert_eq!(field(&captured, "file").as_deref(), Some("meeting.m4a"));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_response_without_duration_when_transcribing_then_uses_last_chunk_end() {
    let body = r#"{"text": "a b", "segments": [{"start": 0.0, "end": 0.8, "text": "a"}, {"start": 0.8, "end": 1.9, "text": "b"}]}"#;
    let (base_url, _, shutdown_tx) = start_mock_azure_server(200, body).await;
    let engine = AzureWhisperEngine::new(&base_url, "my-deployment", "test-key", "2024-06-01");

    let result = engine
        .transcribe(request().with_language(Some("ja".to_string())))
        .await
        .unwrap();

    assert_eq!(result.duration_seconds, 1.9);
    assert_eq!(result.language, "ja");
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_plain_text_response_when_transcribing_then_has_no_segments() {
    let (base_url, _, shutdown_tx) = start_mock_azure_server(200, r#"{"text": ""}"#).await;
    let engine = AzureWhisperEngine::new(&base_url, "my-deployment", "test-key", "2024-06-01");

    let result = engine.transcribe(request()).await.unwrap();

    assert_eq!(result.text, "");
    assert_eq!(result.duration_seconds, 0.0);
    assert_eq!(result.language, "unknown");
    assert!(result.segments.is_empty());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_azure_api_returns_error_status_when_transcribing_then_returns_api_error() {
    let body = r#"{"error": {"code": "InvalidRequest", "message": "bad audio"}}"#;
    let (base_url, _, shutdown_tx) = start_mock_azure_server(400, body).await;
    let engine = AzureWhisperEngine::new(&base_url, "my-deployment", "test-key", "2024-06-01");

    let result = engine.transcribe(request()).await;

    match result {
        Err(TranscriptionError::ApiRequestFailed(message)) => assert!(message.contains("400")),
        other => panic!("expected api error, got {:?}", other),
    }
    shutdown_tx.send(()).ok();
}

#[test]
fn given_trailing_slash_when_building_endpoint_then_it_is_normalized() {
    let engine = AzureWhisperEngine::new("https://example.openai.azure.com/", "whisper", "k", "2024-06-01");

    assert_eq!(
        engine.endpoint(),
        "https://example.openai.azure.com/openai/deployments/whisper/audio/transcriptions?api-version=2024-06-01"
    );
    assert!(!engine.runs_locally());
}
