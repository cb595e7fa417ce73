//! HTTP routes.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | Home page with the three steps |
//! | `GET /login` | Start OAuth: store PKCE verifier, redirect to the platform |
//! | `GET /oauth/callback` | Exchange the code for an access token |
//! | `POST /upload` | Save the spreadsheet and request one template per participant |
//! | `POST /rename` | Rename exported `N.png` files to `Name_Event.png` |
//!
//! Every step can be repeated. Nothing stops a rename before templates were
//! requested, or against a spreadsheet other than the one used for them.

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{DefaultBodyLimit, Form, Multipart, Query, State};
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::{debug, info};

use certgen_core::{load_participants, rename_certificates};

use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Value a checked HTML checkbox submits.
const CHECKBOX_ON: &str = "on";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(home))
        .route("/login", get(login))
        .route("/oauth/callback", get(oauth_callback))
        .route("/upload", post(upload))
        .route("/rename", post(rename))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// A `302 Found` redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Attaches a session cookie to a response, if one needs setting.
fn with_cookie(cookie: Option<HeaderValue>, mut response: Response) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn login(State(state): State<AppState>, mut session: Session) -> Response {
    let (pkce, auth_url) = state.oauth.begin();
    session.set_code_verifier(pkce.verifier);
    let cookie = state.sessions.save(&mut session).await;

    info!("redirecting to authorization page");
    with_cookie(cookie, found(&auth_url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    mut session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AppError::MissingAuthorizationCode)?;
    let verifier = session
        .code_verifier()
        .map(str::to_owned)
        .ok_or(AppError::MissingCodeVerifier)?;

    match state.oauth.exchange_code(&code, &verifier).await {
        Ok(token) => {
            session.set_access_token(Some(token.access_token));
            let cookie = state.sessions.save(&mut session).await;
            info!("login complete");
            Ok(with_cookie(cookie, found("/")))
        }
        Err(e) => {
            session.set_access_token(None);
            state.sessions.save(&mut session).await;
            Err(AppError::TokenExchange(e))
        }
    }
}

async fn upload(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut template_url: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                file = Some((filename, field.bytes().await?));
            }
            Some("template_url") => template_url = Some(field.text().await?),
            other => debug!(field = ?other, "ignoring form field"),
        }
    }

    let (filename, data) = file.ok_or(AppError::NoFilePart)?;
    if filename.is_empty() {
        return Err(AppError::NoSelectedFile);
    }

    let path = state.config.participants_path();
    tokio::fs::write(&path, &data)
        .await
        .map_err(|source| AppError::SaveUpload {
            path: path.clone(),
            source,
        })?;
    info!(filename = %filename, bytes = data.len(), "saved participant spreadsheet");

    let template_url = template_url.ok_or(AppError::MissingTemplateUrl)?;
    let Some(access_token) = session.access_token() else {
        info!("no access token in session, redirecting to login");
        return Ok(found("/login"));
    };

    let participants = tokio::task::spawn_blocking(move || load_participants(path)).await??;
    state
        .design
        .generate_templates(&participants, &template_url, access_token)
        .await;

    Ok(found("/"))
}

#[derive(Debug, Deserialize)]
struct RenameForm {
    confirm_downloads: Option<String>,
}

async fn rename(
    State(state): State<AppState>,
    form: Result<Form<RenameForm>, FormRejection>,
) -> Result<&'static str, AppError> {
    // A body that is not a form cannot carry the confirmation either.
    let confirmed = match form {
        Ok(Form(form)) => form.confirm_downloads.as_deref() == Some(CHECKBOX_ON),
        Err(rejection) => {
            debug!(%rejection, "rename request without a readable form");
            false
        }
    };
    if !confirmed {
        return Err(AppError::DownloadsNotConfirmed);
    }

    let spreadsheet = state.config.participants_path();
    let certificates_dir = state.config.certificates_dir.clone();
    let report =
        tokio::task::spawn_blocking(move || rename_certificates(spreadsheet, certificates_dir))
            .await??;
    info!(
        renamed = report.renamed.len(),
        skipped = report.skipped.len(),
        "certificates renamed"
    );

    Ok("Certificates renamed successfully!")
}

#[cfg(test)]
mod tests;
