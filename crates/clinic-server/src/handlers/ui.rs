use axum::{response::Html, Json};
use serde_json::{json, Value};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `GET /`: the bundled browser UI.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
