// Static fallback
// Serves the built web UI; unknown paths get the SPA entry document

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::proxy::server::AppState;

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    fallback: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, fallback_document: &str) -> Self {
        let root = root.into();
        let fallback = root.join(fallback_document);
        Self { root, fallback }
    }

    /// Map a request path onto a file under the root. `None` for paths that
    /// try to leave it.
    pub fn sanitize_path(&self, tail: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(tail).decode_utf8().ok()?;
        let mut buf = self.root.clone();

        for seg in decoded.split('/') {
            if seg.is_empty() || seg == "." {
                continue;
            }
            if seg.starts_with("..") || seg.contains('\\') || seg.contains(':') {
                warn!("Rejecting static path segment {:?}", seg);
                return None;
            }
            buf.push(seg);
        }

        Some(buf)
    }

    /// File to serve for `path`: the matching file, else the fallback document
    pub async fn resolve(&self, path: &str) -> Option<PathBuf> {
        if let Some(candidate) = self.sanitize_path(path) {
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        if is_file(&self.fallback).await {
            return Some(self.fallback.clone());
        }
        None
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Router fallback handler
pub async fn serve(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(path) = state.static_files.resolve(uri.path()).await else {
        debug!("No static file or fallback document for {}", uri.path());
        return StatusCode::NOT_FOUND.into_response();
    };

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read static file {:?}: {}", path, e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut response = Response::new(if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(content)
    });
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
