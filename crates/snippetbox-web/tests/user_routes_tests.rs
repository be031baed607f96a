//! Signup, login, logout and the account page over HTTP.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use snippetbox_crypto::token::token_digest;
use snippetbox_db::SessionStore;

#[tokio::test]
async fn signup_form_renders() {
    let mut app = TestApp::new();
    let response = app.get("/user/signup").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<form action='/user/signup'"));
    assert!(response.body.contains("<a href='/user/login'>Login</a>"));
}

#[tokio::test]
async fn invalid_signup_is_redisplayed_without_the_password() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/user/signup",
            &[("name", ""), ("email", "bob@"), ("password", "short77")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("This field cannot be blank"));
    assert!(response.body.contains("This field must be a valid email address"));
    assert!(response.body.contains("This field must be at least 8 characters long"));
    assert!(response.body.contains("value='bob@'"));
    assert!(!response.body.contains("short77"));
}

#[tokio::test]
async fn signup_then_login_page_shows_flash() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/user/signup",
            &[
                ("name", "Bob"),
                ("email", "bob@example.com"),
                ("password", "validPa$$word"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let response = app.get("/user/login").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Your signup was successful. Please log in."));
}

#[tokio::test]
async fn duplicate_email_is_a_field_error() {
    let mut app = TestApp::new();
    app.insert_user("Alice", "alice@example.com", "pa55word!");

    let response = app
        .post_form(
            "/user/signup",
            &[
                ("name", "Other Alice"),
                ("email", "ALICE@example.com"),
                ("password", "anotherPassword"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Email address is already in use"));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let mut app = TestApp::new();
    app.insert_user("Alice", "alice@example.com", "pa55word!");

    let wrong_password = app
        .post_form(
            "/user/login",
            &[("email", "alice@example.com"), ("password", "nope-nope")],
        )
        .await;
    let unknown_email = app
        .post_form(
            "/user/login",
            &[("email", "carol@example.com"), ("password", "nope-nope")],
        )
        .await;

    for response in [&wrong_password, &unknown_email] {
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.body.contains("Email or password is incorrect"));
    }
}

#[tokio::test]
async fn blank_login_fields_are_field_errors() {
    let mut app = TestApp::new();
    let response = app
        .post_form("/user/login", &[("email", ""), ("password", "")])
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("This field cannot be blank"));
    assert!(!response.body.contains("Email or password is incorrect"));
}

#[tokio::test]
async fn login_renews_the_session_token() {
    let mut app = TestApp::new();
    app.insert_user("Alice", "alice@example.com", "pa55word!");

    // The signup flash gives the anonymous visitor a session.
    app.post_form(
        "/user/signup",
        &[
            ("name", "Dan"),
            ("email", "dan@example.com"),
            ("password", "longenough"),
        ],
    )
    .await;
    let before = app.session_token().map(str::to_string);
    assert!(before.is_some());

    let response = app
        .post_form(
            "/user/login",
            &[("email", "alice@example.com"), ("password", "pa55word!")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/snippet/create"));

    let after = app.session_token().map(str::to_string);
    assert!(after.is_some());
    assert_ne!(before, after);
    // The old token's record is gone.
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn logged_in_nav_and_account_page() {
    let mut app = TestApp::new();
    app.login_as("alice@example.com", "pa55word!").await;

    let response = app.get("/").await;
    assert!(response.body.contains("<a href='/snippet/create'>Create snippet</a>"));
    assert!(!response.body.contains("<a href='/user/signup'>"));

    let response = app.get("/account/view").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("alice@example.com"));
    assert!(response.body.contains("Test User"));
}

#[tokio::test]
async fn account_requires_login() {
    let mut app = TestApp::new();
    let response = app.get("/account/view").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}

#[tokio::test]
async fn logout_flashes_and_drops_the_login() {
    let mut app = TestApp::new();
    app.login_as("alice@example.com", "pa55word!").await;
    let logged_in = app.session_token().map(str::to_string);

    let response = app.post_form("/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));
    assert_ne!(app.session_token().map(str::to_string), logged_in);

    let response = app.get("/").await;
    assert!(response.body.contains("You&#39;ve been logged out successfully!"));
    assert!(response.body.contains("<a href='/user/login'>Login</a>"));

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn session_cookie_attributes_and_stored_digest() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/user/signup",
            &[
                ("name", "Dan"),
                ("email", "dan@example.com"),
                ("password", "longenough"),
            ],
        )
        .await;

    let cookie = response.header("set-cookie").unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    // The harness runs with insecure cookies.
    assert!(!cookie.contains("Secure"));

    let token = app.session_token().unwrap().to_string();
    assert!(app.sessions.find(&token_digest(&token)).unwrap().is_some());
    assert!(app.sessions.find(&token).unwrap().is_none());
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() {
    let mut app = TestApp::new();
    app.set_session_token("AAAAAAAAAAAAAAAAAAAAAA");

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}
