use std::path::{Component, Path, PathBuf};

use hyper::{header, Body, Method, Request, Response, StatusCode};
use serde_json::json;

use common::http::ext::RequestGlobalExt;
use common::make_response;

use super::error::Result;
use crate::global::GlobalState;

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Maps a request path to a file inside the frontend build directory. Paths
/// with any non-normal component (`..` and friends) resolve to nothing.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let rel = Path::new(uri_path.trim_start_matches('/'));

    if rel
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }

    Some(root.join(rel))
}

/// Fallback for routes no API handler claimed. GETs serve the single-page
/// frontend, with index.html standing in for client-side routes. Everything
/// else is a JSON 404.
pub async fn fallback(req: Request<Body>) -> Result<Response<Body>> {
    if req.method() != Method::GET {
        return Ok(make_response!(
            StatusCode::NOT_FOUND,
            json!({ "success": false, "message": "Not Found" })
        ));
    }

    let global = req.get_global::<GlobalState>()?;
    let root = PathBuf::from(&global.config.frontend_dir);

    let file = match resolve(&root, req.uri().path()) {
        Some(file) => match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => file,
            _ => root.join("index.html"),
        },
        None => root.join("index.html"),
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            let mut resp = Response::new(Body::from(bytes));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                content_type(&file).parse().expect("failed to parse header"),
            );
            Ok(resp)
        }
        Err(_) => Ok(make_response!(
            StatusCode::NOT_FOUND,
            json!({ "success": false, "message": "Not Found" })
        )),
    }
}
