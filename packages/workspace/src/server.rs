//! HTTP surface: one route per editor operation, nested under the
//! per-account prefix. Handlers stay thin — parameter plumbing, session
//! lookup, and the error-to-status mapping live here; everything else is
//! the editor service.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Form, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use xmlwright_common::resolve_under_root;
use xmlwright_editor::{EditorError, EditorService, Fields, UserCtx};

use crate::events::SaveHooks;
use crate::sessions::SessionStore;

pub const SESSION_COOKIE: &str = "xmlwright_session";

pub struct AppState {
    pub service: EditorService,
    pub sessions: Arc<SessionStore>,
    pub hooks: SaveHooks,
    /// Per-account roots live directly below this directory.
    pub accounts_root: PathBuf,
}

/// Editor error ready to leave as HTTP: 400 for anything the client
/// caused, 500 for engine and DTD failures. The body is the bare message
/// as a JSON string.
pub struct ApiError(pub EditorError);

impl From<EditorError> for ApiError {
    fn from(err: EditorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        json_response(status, &self.0.to_string())
    }
}

/// Serialize `body` with the charset-qualified content type every client
/// of this API expects.
fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    let body = serde_json::to_string(body).unwrap_or_default();
    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=UTF-8")],
        body,
    )
        .into_response()
}

/// Session id from the request cookie, if any.
pub struct SessionId(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_from_headers(&parts.headers)))
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn user_ctx(state: &AppState, login: &str) -> Result<UserCtx, ApiError> {
    let root = resolve_under_root(&state.accounts_root, login)
        .map_err(|_| ApiError(EditorError::BadParameter))?;
    Ok(UserCtx {
        login: login.to_string(),
        root,
    })
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

/// Query-string truthiness: present and non-empty.
fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).map(|v| !v.is_empty()).unwrap_or(false)
}

fn value_of<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let xml = Router::new()
        .route("/edit.json", get(edit))
        .route("/edit-text.json", get(edit_text))
        .route("/get-tags.json", get(get_tags))
        .route("/new.json", get(new_document).post(new_document_form))
        .route("/update.json", post(update))
        .route("/update-text.json", post(update_text))
        .route("/add-element.json", get(add_element))
        .route("/copy.json", post(copy))
        .route("/paste.json", post(paste))
        .route("/get-comment-modal.json", get(comment_modal));

    Router::new()
        .nest("/account/:login/xml", xml)
        .with_state(state)
}

async fn edit(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    SessionId(session): SessionId,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let ctx = user_ctx(&state, &login)?;
    let path = param(&params, "path");
    let response = state.service.open(&ctx, path, flag(&params, "iframe"))?;
    if let (Some(id), Some(path)) = (&session, path) {
        state.sessions.record_opened(id, path);
    }
    Ok(json_response(StatusCode::OK, &response))
}

async fn edit_text(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let ctx = user_ctx(&state, &login)?;
    let response = state.service.open_as_text(&ctx, param(&params, "path"))?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn get_tags(
    State(state): State<Arc<AppState>>,
    Path(_login): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let response = state
        .service
        .list_tags(param(&params, "dtd_url"), flag(&params, "text"))?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn new_document(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    create_document(
        &state,
        &login,
        param(&params, "path"),
        param(&params, "dtd_url"),
        param(&params, "dtd_tag"),
    )
}

async fn new_document_form(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Response, ApiError> {
    create_document(
        &state,
        &login,
        value_of(&fields, "path"),
        value_of(&fields, "dtd_url"),
        value_of(&fields, "dtd_tag"),
    )
}

fn create_document(
    state: &AppState,
    login: &str,
    path: Option<&str>,
    dtd_url: Option<&str>,
    dtd_tag: Option<&str>,
) -> Result<Response, ApiError> {
    let ctx = user_ctx(state, login)?;
    let response = state.service.create_new(&ctx, path, dtd_url, dtd_tag)?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Response, ApiError> {
    let ctx = user_ctx(&state, &login)?;
    let response = state.service.save(&ctx, &fields)?;

    if let Some(filename) = value_of(&fields, "_xml_filename") {
        if let Ok(absolute) = resolve_under_root(&ctx.root, filename) {
            state.hooks.document_updated(&login, filename, absolute);
        }
    }
    Ok(json_response(StatusCode::OK, &response))
}

async fn update_text(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Response, ApiError> {
    let ctx = user_ctx(&state, &login)?;
    let filename = value_of(&fields, "filename");
    let response = state.service.save_text(
        &ctx,
        filename,
        value_of(&fields, "filecontent"),
        value_of(&fields, "commit").map(|v| !v.is_empty()).unwrap_or(false),
    )?;

    if let Some(filename) = filename {
        if let Ok(absolute) = resolve_under_root(&ctx.root, filename) {
            state.hooks.document_updated(&login, filename, absolute);
        }
    }
    Ok(json_response(StatusCode::OK, &response))
}

async fn add_element(
    State(state): State<Arc<AppState>>,
    Path(_login): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let fields: Fields = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let response = state.service.add_element(
        param(&params, "elt_id"),
        param(&params, "dtd_url"),
        &fields,
    )?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn copy(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    SessionId(session): SessionId,
    Form(fields): Form<Fields>,
) -> Result<Response, ApiError> {
    user_ctx(&state, &login)?;
    let (entry, response) = state
        .service
        .copy_element(value_of(&fields, "elt_id"), &fields)?;

    let (id, created) = match session {
        Some(id) => (id, false),
        None => (state.sessions.create(), true),
    };
    state.sessions.set_clipboard(&id, entry);

    let mut response = json_response(StatusCode::OK, &response);
    if created {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

async fn paste(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
    SessionId(session): SessionId,
    Form(fields): Form<Fields>,
) -> Result<Response, ApiError> {
    user_ctx(&state, &login)?;
    let elt_id = value_of(&fields, "elt_id");
    let dtd_url = value_of(&fields, "_xml_dtd_url");
    let body: Fields = fields
        .iter()
        .filter(|(k, _)| k != "elt_id" && k != "_xml_dtd_url")
        .cloned()
        .collect();

    let entry = session
        .as_deref()
        .and_then(|id| state.sessions.clipboard(id));
    let response = state
        .service
        .paste_element(elt_id, dtd_url, &body, entry.as_ref())?;
    Ok(json_response(StatusCode::OK, &response))
}

async fn comment_modal(
    State(state): State<Arc<AppState>>,
    Path(_login): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let response = state.service.comment_modal(param(&params, "comment"));
    Ok(json_response(StatusCode::OK, &response))
}
