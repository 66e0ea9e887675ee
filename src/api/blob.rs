/// Upload and blob serving endpoints
use crate::{
    blob_store::{FetchedBlob, UploadRequest, UploadResponse},
    context::AppContext,
    error::{VaultError, VaultResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::ops::RangeInclusive;

/// Blobs never change once written
const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build blob routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_blob))
        .route("/:file", get(get_blob))
}

/// Upload an image
///
/// Accepts `{ "data": "<base64>" }`, where the base64 may carry a
/// `data:<mime>;base64,` prefix. Responds with the digest of the canonical
/// bytes.
async fn upload_blob(
    State(ctx): State<AppContext>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> VaultResult<Json<UploadResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            VaultError::RequestTooLarge {
                limit: ctx.config.body_limit(),
            }
        } else {
            VaultError::MissingInput(format!(
                "Expected JSON body with a data field: {}",
                rejection.body_text()
            ))
        }
    })?;

    let data = request
        .data
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| VaultError::MissingInput("No data provided".to_string()))?;

    let stored = ctx.blob_store.ingest(&data).await?;

    Ok(Json(UploadResponse {
        hash: stored.key.digest.to_string(),
    }))
}

/// Get a blob by file name (`{digest}.{ext}`)
///
/// Serves blob content with its content type, caching headers, and Range
/// request support.
async fn get_blob(
    State(ctx): State<AppContext>,
    file: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> VaultResult<Response> {
    let Path(file) =
        file.map_err(|_| VaultError::InvalidKey("Filename is not valid UTF-8".to_string()))?;

    let blob = ctx.blob_store.get(&file).await?;

    // The digest already identifies the content
    let etag = format!("\"{}\"", blob.key.digest);

    if let Some(if_none_match) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if if_none_match.split(',').any(|tag| {
            let tag = tag.trim();
            tag == etag || tag == "*"
        }) {
            return Ok((
                StatusCode::NOT_MODIFIED,
                [
                    (header::ETAG, etag),
                    (header::CACHE_CONTROL, IMMUTABLE.to_string()),
                ],
            )
                .into_response());
        }
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| parse_range(r, blob.data.len()));

    match range {
        Some(range) => Ok(partial_response(blob, range, etag)),
        None => Ok(full_response(blob, etag)),
    }
}

fn full_response(blob: FetchedBlob, etag: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, blob.content_type().to_string()),
            (header::CONTENT_LENGTH, blob.data.len().to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, IMMUTABLE.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        blob.data,
    )
        .into_response()
}

fn partial_response(blob: FetchedBlob, range: RangeInclusive<usize>, etag: String) -> Response {
    let total = blob.data.len();
    let content_range = format!("bytes {}-{}/{}", range.start(), range.end(), total);
    let content_type = blob.content_type().to_string();
    let body = blob.data[range].to_vec();

    (
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, body.len().to_string()),
            (header::CONTENT_RANGE, content_range),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, IMMUTABLE.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response()
}

/// Parse a single `bytes=` range against a body of `total` bytes
///
/// Supports `a-b`, `a-` and `-n`. Returns `None` for anything unsatisfiable
/// or unparseable, in which case the full body is served.
fn parse_range(header: &str, total: usize) -> Option<RangeInclusive<usize>> {
    if total == 0 {
        return None;
    }

    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let last = total - 1;

    match (start.trim(), end.trim()) {
        ("", suffix) => {
            let suffix: usize = suffix.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            Some(total.saturating_sub(suffix)..=last)
        }
        (start, "") => {
            let start: usize = start.parse().ok()?;
            (start <= last).then_some(start..=last)
        }
        (start, end) => {
            let start: usize = start.parse().ok()?;
            let end: usize = end.parse::<usize>().ok()?.min(last);
            (start <= end).then_some(start..=end)
        }
    }
}
