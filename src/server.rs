//! HTTP chat server

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{Agent, ChatResponse, InvokeRequest};
use crate::error::Result;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>Análise de Reclamações</title>
<style>
body { font-family: sans-serif; max-width: 760px; margin: 2rem auto; }
#log { border: 1px solid #ccc; height: 420px; overflow-y: auto; padding: .5rem; white-space: pre-wrap; }
.user { color: #1a365d; font-weight: bold; }
form { display: flex; gap: .5rem; margin-top: .5rem; }
input { flex: 1; padding: .4rem; }
</style>
</head>
<body>
<h1>Análise de Reclamações</h1>
<div id="log"></div>
<form id="chat">
<input id="message" autocomplete="off" placeholder="Ex.: analisar reclamações e enviar para cliente@empresa.com">
<button>Enviar</button>
</form>
<script>
const log = document.getElementById('log');
function append(text, cls) {
  const div = document.createElement('div');
  if (cls) div.className = cls;
  div.textContent = text;
  log.appendChild(div);
  log.scrollTop = log.scrollHeight;
}
document.getElementById('chat').addEventListener('submit', async (e) => {
  e.preventDefault();
  const input = document.getElementById('message');
  const message = input.value.trim();
  if (!message) return;
  input.value = '';
  append(message, 'user');
  const res = await fetch('/api/chat', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ message })
  });
  const data = await res.json();
  append(data.response || data.error);
  if (data.pdf_filename) {
    const a = document.createElement('a');
    a.href = '/download/' + encodeURIComponent(data.pdf_filename);
    a.textContent = 'Baixar ' + data.pdf_filename;
    log.appendChild(a);
  }
  if (data.email_message) append(data.email_message);
});
</script>
</body>
</html>
"#;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub results_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Flattened response for the chat page
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_message: Option<String>,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        match response {
            ChatResponse::Conversational { response, .. } => Self {
                response,
                kind: "conversational",
                pdf_filename: None,
                email_sent: None,
                email_message: None,
            },
            ChatResponse::Success {
                ai_insights,
                pdf_filename,
                email_sent,
                email_message,
                ..
            } => Self {
                response: ai_insights,
                kind: "analysis",
                pdf_filename,
                email_sent,
                email_message,
            },
            ChatResponse::Error { result } => Self {
                response: result,
                kind: "error",
                pdf_filename: None,
                email_sent: None,
                email_message: None,
            },
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

pub fn router(agent: Arc<Agent>) -> Router {
    let state = AppState {
        results_dir: agent.results_dir().to_path_buf(),
        agent,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/api/chat", post(chat))
        .route("/invocations", post(invocations))
        .route("/download/:filename", get(download))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(agent: Arc<Agent>, addr: &str) -> Result<()> {
    let app = router(agent);

    tracing::info!("Chat server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<ChatReply>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Mensagem vazia"));
    }

    let response = state.agent.invoke(InvokeRequest::new(message)).await;
    Ok(Json(ChatReply::from(response)))
}

async fn invocations(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Json<ChatResponse> {
    Json(state.agent.invoke(request).await)
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> std::result::Result<Response, ApiError> {
    if !is_plain_filename(&filename) {
        tracing::warn!("Refused download of {:?}", filename);
        return Err(api_error(StatusCode::NOT_FOUND, "Arquivo não encontrado"));
    }

    let path = state.results_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Arquivo não encontrado"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// A single path component with no traversal
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.contains('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename() {
        assert!(is_plain_filename("relatorio_reclamacoes_20251001_140509.pdf"));
        assert!(!is_plain_filename("../secret.pdf"));
        assert!(!is_plain_filename("a/b.pdf"));
        assert!(!is_plain_filename("a\\b.pdf"));
        assert!(!is_plain_filename(""));
    }

    #[test]
    fn test_reply_kinds() {
        let reply = ChatReply::from(ChatResponse::Error {
            result: "falhou".to_string(),
        });
        assert_eq!(reply.kind, "error");
        assert_eq!(reply.response, "falhou");

        let json = serde_json::to_value(ChatReply::from(ChatResponse::Conversational {
            response: "Olá".to_string(),
            context_available: false,
        }))
        .unwrap();
        assert_eq!(json["type"], "conversational");
        assert!(json.get("pdf_filename").is_none());
    }
}
