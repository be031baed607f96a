use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use snippetbox_db::{SnippetModel, UserModel};

use crate::error::AppError;
use crate::middleware::Viewer;
use crate::session::{Session, SessionLayer};
use crate::templates::{TemplateCache, TemplateData};
use crate::validation::Validator;

/// Session key holding the flash message shown on the next page.
pub const FLASH_KEY: &str = "flash";

pub type AppState = Arc<AppStateInner>;

/// Application context, built once at startup and shared by every handler.
pub struct AppStateInner {
    pub snippets: Arc<dyn SnippetModel>,
    pub users: Arc<dyn UserModel>,
    pub templates: TemplateCache,
    pub sessions: SessionLayer,
}

impl AppStateInner {
    /// Defaults every page needs: the year, the pending flash (consumed
    /// here) and whether the caller is logged in.
    pub async fn template_data(
        &self,
        session: &Session,
        viewer: &Viewer,
    ) -> Result<TemplateData, AppError> {
        let flash = session.remove::<String>(FLASH_KEY).await?;
        Ok(TemplateData::new(
            Utc::now(),
            flash,
            viewer.is_authenticated(),
        ))
    }

    /// Render `page` to a buffer first, then write it with `status`.
    pub fn render(
        &self,
        status: StatusCode,
        page: &str,
        data: &TemplateData,
    ) -> Result<Response, AppError> {
        let body = self.templates.render(page, data)?;
        Ok((status, Html(body)).into_response())
    }

    /// Add `{{{<field>_error}}}` for each of `fields` and
    /// `{{{non_field_errors}}}`, empty when the form has none.
    pub fn with_form_errors(
        &self,
        mut data: TemplateData,
        form: &Validator,
        fields: &[&str],
    ) -> Result<TemplateData, AppError> {
        for field in fields {
            let markup = match form.field_error(field) {
                Some(message) => self
                    .templates
                    .render_partial("field_error.html", &data.clone().text("error", message))?,
                None => String::new(),
            };
            data = data.html(&format!("{}_error", field), markup);
        }

        let mut non_field = String::new();
        for message in &form.non_field_errors {
            non_field.push_str(
                &self
                    .templates
                    .render_partial("non_field_error.html", &data.clone().text("error", message.as_str()))?,
            );
        }
        Ok(data.html("non_field_errors", non_field))
    }
}
