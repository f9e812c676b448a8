//! Embedded static assets
//!
//! Falls back to the `ui` directory on disk so the page can be edited
//! without a rebuild.

use axum::{
    body::Body,
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;
use std::path::PathBuf;

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

/// Serve embedded static files, with filesystem fallback for development
pub async fn serve_static(Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');

    // Try embedded assets first
    if let Some(content) = Assets::get(path) {
        return asset_response(path, content.data.into_owned());
    }

    // Fallback to filesystem in development; no escaping the ui directory
    if !path.split('/').any(|segment| segment == "..") {
        let fs_path = PathBuf::from("ui").join(path);
        if let Ok(content) = tokio::fs::read(&fs_path).await {
            return asset_response(path, content);
        }
    }

    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn asset_response(path: &str, content: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        Body::from(content),
    )
        .into_response()
}

/// Get the index.html content (embedded or from filesystem)
pub fn get_index_html() -> Option<String> {
    // Try embedded first
    if let Some(content) = Assets::get("index.html") {
        return String::from_utf8(content.data.into_owned()).ok();
    }

    // Fallback to filesystem
    std::fs::read_to_string("ui/index.html").ok()
}
