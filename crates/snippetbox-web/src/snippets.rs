use axum::{
    extract::{Form, Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use snippetbox_db::DomainError;
use snippetbox_types::SnippetId;
use snippetbox_types::forms::SnippetCreateForm;

use crate::error::{AppError, blocking};
use crate::middleware::Viewer;
use crate::session::Session;
use crate::state::{AppState, FLASH_KEY};
use crate::templates::human_date;
use crate::validation::{Validator, max_chars, not_blank, permitted_value};

/// Lifetimes offered on the create form, in days.
pub const EXPIRY_CHOICES: [u32; 3] = [1, 7, 365];

const DEFAULT_EXPIRY: &str = "365";

pub async fn home(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
) -> Result<Response, AppError> {
    let snippets = state.snippets.clone();
    let latest = blocking(move || snippets.latest()).await??;

    let data = state.template_data(&session, &viewer).await?;
    let rows = if latest.is_empty() {
        state.templates.render_partial("no_snippets.html", &data)?
    } else {
        let mut rows = String::new();
        for s in &latest {
            let row = data
                .clone()
                .text("id", s.id.to_string())
                .text("title", s.title.as_str())
                .text("created", human_date(s.created));
            rows.push_str(&state.templates.render_partial("snippet_row.html", &row)?);
        }
        rows
    };

    state.render(
        StatusCode::OK,
        "home.html",
        &data.text("title", "Home").html("snippets", rows),
    )
}

pub async fn view(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id: SnippetId = id
        .parse()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(AppError::NotFound)?;

    let snippets = state.snippets.clone();
    let snippet = match blocking(move || snippets.get(id)).await? {
        Ok(snippet) => snippet,
        Err(e) if e == DomainError::NoRecord => return Err(AppError::NotFound),
        Err(e) => return Err(AppError::server(e)),
    };

    let data = state
        .template_data(&session, &viewer)
        .await?
        .text("title", format!("Snippet #{}", snippet.id))
        .text("id", snippet.id.to_string())
        .text("snippet_title", snippet.title)
        .text("content", snippet.content)
        .text("created", human_date(snippet.created))
        .text("expires", human_date(snippet.expires));
    state.render(StatusCode::OK, "view.html", &data)
}

pub async fn create_form(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
) -> Result<Response, AppError> {
    let form = SnippetCreateForm {
        expires: DEFAULT_EXPIRY.to_string(),
        ..Default::default()
    };
    render_create(&state, &session, &viewer, &form, &Validator::new(), StatusCode::OK).await
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    viewer: Viewer,
    form: Result<Form<SnippetCreateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|_| AppError::Client(StatusCode::BAD_REQUEST))?;

    let mut v = Validator::new();
    v.check_field(not_blank(&form.title), "title", "This field cannot be blank");
    v.check_field(
        max_chars(&form.title, 100),
        "title",
        "This field cannot be more than 100 characters long",
    );
    v.check_field(not_blank(&form.content), "content", "This field cannot be blank");
    let days = form
        .expires
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| permitted_value(d, &EXPIRY_CHOICES));
    v.check_field(days.is_some(), "expires", "This field must equal 1, 7 or 365");

    let days = match days {
        Some(days) if v.is_valid() => days,
        _ => {
            return render_create(
                &state,
                &session,
                &viewer,
                &form,
                &v,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        }
    };

    let snippets = state.snippets.clone();
    let (title, content) = (form.title.clone(), form.content.clone());
    let id = blocking(move || snippets.insert(&title, &content, days)).await??;

    session.insert(FLASH_KEY, "Snippet successfully created!").await?;
    Ok(Redirect::to(&format!("/snippet/view/{}", id)).into_response())
}

async fn render_create(
    state: &AppState,
    session: &Session,
    viewer: &Viewer,
    form: &SnippetCreateForm,
    v: &Validator,
    status: StatusCode,
) -> Result<Response, AppError> {
    let checked = |days: &str| if form.expires.trim() == days { "checked" } else { "" };

    let data = state
        .template_data(session, viewer)
        .await?
        .text("title", "Create a New Snippet")
        .text("form_title", form.title.as_str())
        .text("form_content", form.content.as_str())
        .text("expires_365_checked", checked("365"))
        .text("expires_7_checked", checked("7"))
        .text("expires_1_checked", checked("1"));
    let data = state.with_form_errors(data, v, &["title", "content", "expires"])?;
    state.render(status, "create.html", &data)
}
