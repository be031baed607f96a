//! Shared harness: the full router over in-memory models and the shipped
//! templates, plus a client that carries the session cookie.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use snippetbox_db::memory::{MemorySessionStore, MemorySnippetModel, MemoryUserModel};
use snippetbox_db::{SnippetModel, UserModel};
use snippetbox_web::{AppStateInner, TemplateCache, router, session_layer};
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
    pub snippets: Arc<MemorySnippetModel>,
    pub users: Arc<MemoryUserModel>,
    pub sessions: Arc<MemorySessionStore>,
    cookie: Option<String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn ui_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../ui")
}

impl TestApp {
    pub fn new() -> Self {
        let snippets = Arc::new(MemorySnippetModel::new());
        let users = Arc::new(MemoryUserModel::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let templates = TemplateCache::load(&ui_dir().join("html")).unwrap();
        let state = Arc::new(AppStateInner {
            snippets: snippets.clone(),
            users: users.clone(),
            templates,
            sessions: session_layer(sessions.clone(), false),
        });

        Self {
            router: router(state, &ui_dir().join("static")),
            snippets,
            users,
            sessions,
            cookie: None,
        }
    }

    /// Current session token, if the server has issued one.
    pub fn session_token(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_session_token(&mut self, token: &str) {
        self.cookie = Some(token.to_string());
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&mut self, uri: &str, content_type: &str, body: &str) -> TestResponse {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub fn insert_snippet(&self, title: &str, content: &str, days: u32) -> i64 {
        self.snippets.insert(title, content, days).unwrap()
    }

    pub fn insert_user(&self, name: &str, email: &str, password: &str) {
        self.users.insert(name, email, password).unwrap();
    }

    /// Create an account and log in as it.
    pub async fn login_as(&mut self, email: &str, password: &str) {
        self.insert_user("Test User", email, password);
        let response = self
            .post_form("/user/login", &[("email", email), ("password", password)])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.cookie {
            builder = builder.header(header::COOKIE, format!("session={}", token));
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let pair = value.split(';').next().unwrap_or_default();
            if let Some(token) = pair.strip_prefix("session=") {
                self.cookie = (!token.is_empty()).then(|| token.to_string());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
