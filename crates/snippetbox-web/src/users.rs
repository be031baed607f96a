//! Signup, login, logout and the account page.

use axum::{
    extract::{Form, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use snippetbox_db::DomainError;
use snippetbox_types::forms::{UserLoginForm, UserSignupForm};
use tracing::info;

use crate::error::{AppError, blocking};
use crate::middleware::{AUTH_USER_KEY, AuthenticatedUser, LOGIN_PATH, Viewer};
use crate::session::Session;
use crate::state::{AppState, FLASH_KEY};
use crate::templates::human_date;
use crate::validation::{Validator, matches_email, max_chars, min_chars, not_blank};

pub const MIN_PASSWORD_CHARS: usize = 8;

const AFTER_LOGIN_PATH: &str = "/snippet/create";

pub async fn signup_form(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
) -> Result<Response, AppError> {
    render_signup(
        &state,
        &session,
        &viewer,
        &UserSignupForm::default(),
        &Validator::new(),
        StatusCode::OK,
    )
    .await
}

pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
    form: Result<Form<UserSignupForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|_| AppError::Client(StatusCode::BAD_REQUEST))?;

    let mut v = Validator::new();
    v.check_field(not_blank(&form.name), "name", "This field cannot be blank");
    v.check_field(
        max_chars(&form.name, 255),
        "name",
        "This field cannot be more than 255 characters long",
    );
    v.check_field(not_blank(&form.email), "email", "This field cannot be blank");
    v.check_field(
        matches_email(&form.email),
        "email",
        "This field must be a valid email address",
    );
    v.check_field(not_blank(&form.password), "password", "This field cannot be blank");
    v.check_field(
        min_chars(&form.password, MIN_PASSWORD_CHARS),
        "password",
        "This field must be at least 8 characters long",
    );

    if !v.is_valid() {
        return render_signup(
            &state,
            &session,
            &viewer,
            &form,
            &v,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    }

    let users = state.users.clone();
    let (name, email, password) = (
        form.name.trim().to_string(),
        form.email.trim().to_string(),
        form.password.clone(),
    );
    match blocking(move || users.insert(&name, &email, &password)).await? {
        Ok(()) => {}
        Err(e) if e == DomainError::DuplicateEmail => {
            v.add_field_error("email", "Email address is already in use");
            return render_signup(
                &state,
                &session,
                &viewer,
                &form,
                &v,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        }
        Err(e) => return Err(AppError::server(e)),
    }

    session
        .insert(FLASH_KEY, "Your signup was successful. Please log in.")
        .await?;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

pub async fn login_form(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
) -> Result<Response, AppError> {
    render_login(
        &state,
        &session,
        &viewer,
        &UserLoginForm::default(),
        &Validator::new(),
        StatusCode::OK,
    )
    .await
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
    form: Result<Form<UserLoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|_| AppError::Client(StatusCode::BAD_REQUEST))?;

    let mut v = Validator::new();
    v.check_field(not_blank(&form.email), "email", "This field cannot be blank");
    v.check_field(
        matches_email(&form.email),
        "email",
        "This field must be a valid email address",
    );
    v.check_field(not_blank(&form.password), "password", "This field cannot be blank");

    if !v.is_valid() {
        return render_login(
            &state,
            &session,
            &viewer,
            &form,
            &v,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    }

    let users = state.users.clone();
    let (email, password) = (form.email.trim().to_string(), form.password.clone());
    let id = match blocking(move || users.authenticate(&email, &password)).await? {
        Ok(id) => id,
        Err(e) if e == DomainError::InvalidCredentials => {
            v.add_non_field_error("Email or password is incorrect");
            return render_login(
                &state,
                &session,
                &viewer,
                &form,
                &v,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        }
        Err(e) => return Err(AppError::server(e)),
    };

    // New privilege level, new token.
    session.cycle_id().await?;
    session.insert(AUTH_USER_KEY, id).await?;
    info!("User {} logged in", id);
    Ok(Redirect::to(AFTER_LOGIN_PATH).into_response())
}

pub async fn logout(session: Session) -> Result<Response, AppError> {
    session.cycle_id().await?;
    session.remove_value(AUTH_USER_KEY).await?;
    session
        .insert(FLASH_KEY, "You've been logged out successfully!")
        .await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn account(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, AppError> {
    let data = state
        .template_data(&session, &viewer)
        .await?
        .text("title", "Your Account")
        .text("name", user.name)
        .text("email", user.email)
        .text("joined", human_date(user.created));
    state.render(StatusCode::OK, "account.html", &data)
}

async fn render_signup(
    state: &AppState,
    session: &Session,
    viewer: &Viewer,
    form: &UserSignupForm,
    v: &Validator,
    status: StatusCode,
) -> Result<Response, AppError> {
    let data = state
        .template_data(session, viewer)
        .await?
        .text("title", "Signup")
        .text("form_name", form.name.as_str())
        .text("form_email", form.email.as_str());
    let data = state.with_form_errors(data, v, &["name", "email", "password"])?;
    state.render(status, "signup.html", &data)
}

async fn render_login(
    state: &AppState,
    session: &Session,
    viewer: &Viewer,
    form: &UserLoginForm,
    v: &Validator,
    status: StatusCode,
) -> Result<Response, AppError> {
    let data = state
        .template_data(session, viewer)
        .await?
        .text("title", "Login")
        .text("form_email", form.email.as_str());
    let data = state.with_form_errors(data, v, &["email", "password"])?;
    state.render(status, "login.html", &data)
}
