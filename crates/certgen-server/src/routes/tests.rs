use super::*;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::http::HeaderMap;
use reqwest::multipart;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

use certgen_providers::canva::PkceFlow;

use crate::config::{ConfigOverrides, ServerConfig};
use crate::session::{SESSION_COOKIE, SessionStore};

/// Requests seen by the fake customization endpoint, as `(authorization, body)`.
type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{}", addr)
}

/// Fake platform: `/token` accepts the code "good", `/v1/templates/customize`
/// records every request and accepts it.
async fn fake_platform() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/token",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                if params.get("code").map(String::as_str) == Some("good") {
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({"access_token": "tok-xyz", "token_type": "Bearer"})),
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({
                            "error": "invalid_grant",
                            "error_description": "Code expired",
                        })),
                    )
                }
            }),
        )
        .route(
            "/v1/templates/customize",
            post(
                |State(seen): State<Seen>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((auth, body));
                    StatusCode::OK
                },
            ),
        )
        .with_state(seen.clone());
    (serve(router).await, seen)
}

struct TestApp {
    base: String,
    client: reqwest::Client,
    sessions: Arc<SessionStore>,
    config: Arc<ServerConfig>,
    seen: Seen,
    _root: TempDir,
}

impl TestApp {
    async fn start() -> Self {
        let root = TempDir::new().unwrap();
        let (platform, seen) = fake_platform().await;

        let mut config = ServerConfig::default().with_overrides(ConfigOverrides {
            upload_dir: Some(root.path().join("uploads")),
            certificates_dir: Some(root.path().join("certificates")),
            client_id: Some("client-123".into()),
            ..Default::default()
        });
        config.canva.auth_url = format!("{platform}/authorize");
        config.canva.token_url = format!("{platform}/token");
        config.canva.api_base = format!("{platform}/v1");
        config.ensure_dirs().unwrap();

        let state = AppState::new(config).unwrap();
        let sessions = state.sessions.clone();
        let config = state.config.clone();
        let base = serve(router(state)).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base,
            client,
            sessions,
            config,
            seen,
            _root: root,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Runs `/login` and returns the browser cookie and the redirect target.
    async fn login(&self) -> (String, String) {
        let response = self.client.get(self.url("/login")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        (cookie, location)
    }

    async fn callback(&self, cookie: Option<&str>, query: &str) -> reqwest::Response {
        let mut request = self.client.get(self.url(&format!("/oauth/callback{query}")));
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    async fn upload(&self, cookie: Option<&str>, form: multipart::Form) -> reqwest::Response {
        let mut request = self.client.post(self.url("/upload")).multipart(form);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    async fn rename(&self, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url("/rename"))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Session id carried by a browser cookie.
    fn session_id(cookie: &str) -> String {
        let value = cookie
            .strip_prefix(&format!("{SESSION_COOKIE}="))
            .unwrap();
        value.rsplit_once('.').unwrap().0.to_string()
    }
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
    })
}

fn spreadsheet(rows: &[(&str, &str)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Event").unwrap();
    for (i, (name, event)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, value) in [(0, *name), (1, *event)] {
            if !value.is_empty() {
                sheet.write_string(row, col, value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn upload_form(data: Vec<u8>, filename: &str) -> multipart::Form {
    multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(data).file_name(filename.to_string()),
        )
        .text("template_url", "https://www.canva.com/design/DAF123/view")
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"png").unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn home_page_has_all_three_steps() {
    let app = TestApp::start().await;
    let response = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("href=\"/login\""));
    assert!(body.contains("action=\"/upload\""));
    assert!(body.contains("name=\"template_url\""));
    assert!(body.contains("action=\"/rename\""));
    assert!(body.contains("name=\"confirm_downloads\""));
}

#[tokio::test]
async fn login_redirects_with_pkce_challenge() {
    let app = TestApp::start().await;
    let (cookie, location) = app.login().await;

    assert!(location.starts_with(&app.config.canva.auth_url));
    assert_eq!(query_param(&location, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&location, "client_id").as_deref(), Some("client-123"));
    assert_eq!(
        query_param(&location, "code_challenge_method").as_deref(),
        Some("S256")
    );

    let stored = app
        .sessions
        .get(&TestApp::session_id(&cookie))
        .await
        .expect("login stores the session");
    let verifier = stored.code_verifier.expect("verifier stored");
    assert_eq!(
        query_param(&location, "code_challenge"),
        Some(PkceFlow::compute_challenge(&verifier))
    );
}

#[tokio::test]
async fn second_login_replaces_verifier() {
    let app = TestApp::start().await;
    let (cookie, _) = app.login().await;
    let id = TestApp::session_id(&cookie);
    let first = app.sessions.get(&id).await.unwrap().code_verifier;

    let response = app
        .client
        .get(app.url("/login"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let second = app.sessions.get(&id).await.unwrap().code_verifier;
    assert_ne!(first, second);
}

#[tokio::test]
async fn callback_without_code_is_rejected() {
    let app = TestApp::start().await;
    let (cookie, _) = app.login().await;

    for query in ["", "?code="] {
        let response = app.callback(Some(&cookie), query).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text().await.unwrap(),
            "Authorization failed. Please try again."
        );
    }
}

#[tokio::test]
async fn callback_without_login_is_rejected() {
    let app = TestApp::start().await;
    let response = app.callback(None, "?code=good").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Code verifier not found. Restart the login process."
    );
}

#[tokio::test]
async fn failed_exchange_reports_description() {
    let app = TestApp::start().await;
    let (cookie, _) = app.login().await;

    let response = app.callback(Some(&cookie), "?code=stale").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.text().await.unwrap(),
        "Failed to obtain access token: Code expired"
    );

    let stored = app.sessions.get(&TestApp::session_id(&cookie)).await.unwrap();
    assert!(stored.access_token.is_none());
    assert!(stored.code_verifier.is_some());
}

#[tokio::test]
async fn login_then_upload_customizes_every_participant() {
    let app = TestApp::start().await;
    let (cookie, _) = app.login().await;

    let response = app.callback(Some(&cookie), "?code=good").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let stored = app.sessions.get(&TestApp::session_id(&cookie)).await.unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("tok-xyz"));

    let data = spreadsheet(&[("Alice Smith", "5K Run"), ("Bob Lee", "10K Run")]);
    let response = app.upload(Some(&cookie), upload_form(data, "runners.xlsx")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert!(app.config.participants_path().is_file());

    let seen = app.seen.lock().unwrap();
    let names: Vec<_> = seen
        .iter()
        .map(|(_, body)| body["customizations"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Alice Smith", "Bob Lee"]);
    assert!(seen
        .iter()
        .all(|(auth, _)| auth.as_deref() == Some("Bearer tok-xyz")));
    assert_eq!(
        seen[0].1["template_url"],
        "https://www.canva.com/design/DAF123/view"
    );
}

#[tokio::test]
async fn upload_without_token_saves_file_and_redirects_to_login() {
    let app = TestApp::start().await;
    let data = spreadsheet(&[("Alice Smith", "5K Run")]);

    let response = app.upload(None, upload_form(data.clone(), "p.xlsx")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    assert_eq!(std::fs::read(app.config.participants_path()).unwrap(), data);
    assert!(app.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_without_file_part_is_rejected() {
    let app = TestApp::start().await;
    let form = multipart::Form::new().text("template_url", "t");

    let response = app.upload(None, form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "No file part");
}

#[tokio::test]
async fn upload_with_empty_file_name_is_rejected() {
    let app = TestApp::start().await;

    let response = app.upload(None, upload_form(Vec::new(), "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "No selected file");
    assert!(!app.config.participants_path().exists());
}

#[tokio::test]
async fn upload_of_incomplete_spreadsheet_sends_nothing() {
    let app = TestApp::start().await;
    let (cookie, _) = app.login().await;
    app.callback(Some(&cookie), "?code=good").await;

    let data = spreadsheet(&[("Alice Smith", "5K Run"), ("Bob Lee", "")]);
    let response = app.upload(Some(&cookie), upload_form(data, "p.xlsx")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("row 3"));
    assert!(app.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rename_requires_confirmation() {
    let app = TestApp::start().await;
    let certificates = &app.config.certificates_dir;
    touch(certificates, "1.png");

    let response = app.rename(&[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Please confirm downloads before renaming."
    );
    assert_eq!(file_names(certificates), vec!["1.png"]);
}

#[tokio::test]
async fn rename_without_form_body_asks_for_confirmation() {
    let app = TestApp::start().await;
    touch(&app.config.certificates_dir, "1.png");

    let response = app.client.post(app.url("/rename")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Please confirm downloads before renaming."
    );

    let response = app
        .client
        .post(app.url("/rename"))
        .header(header::CONTENT_TYPE, "text/plain")
        .body("confirm_downloads=on")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(file_names(&app.config.certificates_dir), vec!["1.png"]);
}

#[tokio::test]
async fn rename_after_upload_uses_participant_names() {
    let app = TestApp::start().await;
    let data = spreadsheet(&[("Alice Smith", "5K Run"), ("Bob Lee", "10K Run")]);
    app.upload(None, upload_form(data, "p.xlsx")).await;

    let certificates = &app.config.certificates_dir;
    touch(certificates, "1.png");
    touch(certificates, "2.png");

    let response = app.rename(&[("confirm_downloads", "on")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        "Certificates renamed successfully!"
    );
    assert_eq!(
        file_names(certificates),
        vec!["Alice_Smith_5K_Run.png", "Bob_Lee_10K_Run.png"]
    );
}

#[tokio::test]
async fn rename_without_spreadsheet_fails() {
    let app = TestApp::start().await;
    touch(&app.config.certificates_dir, "1.png");

    let response = app.rename(&[("confirm_downloads", "on")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .text()
        .await
        .unwrap()
        .starts_with("Failed to rename certificates"));
    assert_eq!(file_names(&app.config.certificates_dir), vec!["1.png"]);
}
