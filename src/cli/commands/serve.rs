//! Web interface: a single-page form plus a small JSON API.

use crate::cli::Output;
use crate::completion::SummaryModel;
use crate::config::{Prompts, Settings};
use crate::error::{ErrorKind, TldwError};
use crate::fewshot;
use crate::markdown::to_html;
use crate::summarizer::{SummaryRequest, Summarizer};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    summarizer: Summarizer,
    index_html: String,
}

/// Run the web server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let summarizer = Summarizer::new(settings)?;
    let app = router(summarizer);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("tldw web interface");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Form", "GET  /");
    Output::kv("Summarize", "POST /summarize");
    Output::kv("Models", "GET  /models");
    Output::kv("Examples", "GET  /examples");
    Output::kv("Health", "GET  /health");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(summarizer: Summarizer) -> Router {
    let index_html = render_index(summarizer.settings());
    let state = Arc::new(AppState {
        summarizer,
        index_html,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/summarize", post(summarize))
        .route("/models", get(models))
        .route("/examples", get(list_examples))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct SummarizeResponse {
    title: Option<String>,
    author: Option<String>,
    source: Option<String>,
    markdown: String,
    html: String,
    model: SummaryModel,
    /// Model name reported by the API.
    answered_by: String,
    examples: Vec<UsedExample>,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Serialize)]
struct UsedExample {
    distance: f32,
    summary: String,
}

#[derive(Serialize)]
struct ModelInfo {
    name: SummaryModel,
    context_window: u32,
    default: bool,
}

#[derive(Serialize)]
struct ExampleInfo {
    link: String,
    title: Option<String>,
    summary: String,
}

#[derive(Serialize)]
struct ExamplesResponse {
    path: String,
    exists: bool,
    examples: Vec<ExampleInfo>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

/// HTTP status for a pipeline error.
fn status_for(error: &TldwError) -> StatusCode {
    match error {
        TldwError::MissingApiKey(_) | TldwError::Authentication(_) => StatusCode::UNAUTHORIZED,
        TldwError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        TldwError::ContextLengthExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
        other => match other.kind() {
            ErrorKind::InputValidation => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn error_response(error: TldwError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (
        status,
        Json(ErrorResponse {
            kind: error.kind().to_string(),
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let default = state.summarizer.settings().summary.model;
    let models: Vec<ModelInfo> = SummaryModel::ALL
        .into_iter()
        .map(|m| ModelInfo {
            name: m,
            context_window: m.context_window(),
            default: m == default,
        })
        .collect();
    Json(models)
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(TldwError::InvalidInput(rejection.body_text())),
    };

    match state.summarizer.summarize(&req).await {
        Ok(result) => Json(SummarizeResponse {
            title: result.video.info.title.clone(),
            author: result.video.info.author.clone(),
            source: result.video.info.source.as_deref().map(crate::video::watch_url),
            html: to_html(&result.markdown),
            markdown: result.markdown,
            model: result.model,
            answered_by: result.completion.model,
            examples: result
                .neighbors
                .into_iter()
                .map(|n| UsedExample {
                    distance: n.distance,
                    summary: n.example.summary_text,
                })
                .collect(),
            prompt_tokens: result.completion.prompt_tokens,
            completion_tokens: result.completion.completion_tokens,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_examples(State(state): State<Arc<AppState>>) -> Response {
    let path = state.summarizer.settings().examples_path();
    let examples = match fewshot::load(&path) {
        Ok(examples) => examples,
        Err(TldwError::NotFound(_)) => Vec::new(),
        Err(e) => return error_response(e),
    };

    Json(ExamplesResponse {
        path: path.display().to_string(),
        exists: path.exists(),
        examples: examples
            .into_iter()
            .map(|e| ExampleInfo {
                title: e.metadata().title().map(str::to_string),
                summary: e.summary().to_string(),
                link: e.link,
            })
            .collect(),
    })
    .into_response()
}

fn render_index(settings: &Settings) -> String {
    let options: String = SummaryModel::ALL
        .iter()
        .map(|m| {
            let selected = if *m == settings.summary.model { " selected" } else { "" };
            format!("<option value=\"{0}\"{1}>{0}</option>", m, selected)
        })
        .collect();

    let vars = HashMap::from([
        ("model_options".to_string(), options),
        ("temperature".to_string(), settings.summary.temperature.to_string()),
        ("k".to_string(), settings.summary.k.max(1).to_string()),
    ]);
    Prompts::render(INDEX_HTML, &vars)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Too Long; Didn't Watch</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; }
form { display: grid; gap: .75rem; }
label { font-weight: 600; }
input[type=text], input[type=password], select { width: 100%; padding: .4rem; }
#status { color: #666; }
#error { color: #b00020; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>Too Long; Didn't Watch 🎬</h1>
<form id="form">
  <label>YouTube URL <input type="text" name="link" required placeholder="https://www.youtube.com/watch?v=..."></label>
  <label>Model <select name="model">{{model_options}}</select></label>
  <label>Temperature <output id="tval">{{temperature}}</output>
    <input type="range" name="temperature" min="0" max="1" step="0.05" value="{{temperature}}"
      oninput="document.getElementById('tval').value = this.value"></label>
  <label>Few-shot examples <input type="number" name="k" min="1" value="{{k}}"></label>
  <label><input type="checkbox" name="skip_examples"> Summarize without examples</label>
  <label>OpenAI API key (optional if the server has one) <input type="password" name="api_key" autocomplete="off"></label>
  <button type="submit">Summarize</button>
</form>
<p id="status"></p>
<p id="error"></p>
<h2 id="title"></h2>
<div id="summary"></div>
<script>
document.getElementById('form').addEventListener('submit', async (event) => {
  event.preventDefault();
  const data = new FormData(event.target);
  const body = {
    link: data.get('link'),
    model: data.get('model'),
    temperature: parseFloat(data.get('temperature')),
    k: parseInt(data.get('k'), 10),
    skip_examples: data.get('skip_examples') === 'on',
  };
  if (data.get('api_key')) body.api_key = data.get('api_key');

  const status = document.getElementById('status');
  const error = document.getElementById('error');
  status.textContent = 'Summarizing...';
  error.textContent = '';
  document.getElementById('title').textContent = '';
  document.getElementById('summary').innerHTML = '';

  try {
    const response = await fetch('/summarize', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(body),
    });
    const result = await response.json();
    if (!response.ok) {
      error.textContent = result.error || response.statusText;
      status.textContent = '';
      return;
    }
    document.getElementById('title').textContent = result.title || '';
    document.getElementById('summary').innerHTML = result.html;
    status.textContent = `${result.answered_by}, ${result.examples.length} example(s)`;
  } catch (e) {
    error.textContent = String(e);
    status.textContent = '';
  }
});
</script>
</body>
</html>
"#;
