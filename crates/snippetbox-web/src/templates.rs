//! Template cache.
//!
//! Loaded once at startup from `<ui>/html` and read-only afterwards.
//!
//! Placeholders:
//! - `{{name}}` - text value, HTML-escaped
//! - `{{{name}}}` - pre-rendered markup, inserted as is
//!
//! Every page is wrapped in `base.html`, which receives `{{title}}`,
//! `{{current_year}}` and the rendered `{{{nav}}}`, `{{{flash}}}` and
//! `{{{main}}}`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::info;

const LAYOUT: &str = "base.html";
const NAV: &str = "nav.html";
const NAV_AUTHENTICATED: &str = "nav_auth.html";
const FLASH: &str = "flash.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template {0} not found")]
    Missing(String),

    #[error("template {template}: no value for placeholder {key}")]
    MissingValue { template: String, key: String },

    #[error("template {0}: unterminated placeholder")]
    Unterminated(String),
}

/// A value handed to a template.
#[derive(Debug, Clone)]
enum Slot {
    Text(String),
    Html(String),
}

/// Values for one render. Handlers start from
/// [`crate::state::AppStateInner::template_data`] so the layout always has
/// what it needs.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    slots: BTreeMap<String, Slot>,
}

impl TemplateData {
    pub fn new(now: DateTime<Utc>, flash: Option<String>, is_authenticated: bool) -> Self {
        Self {
            current_year: now.year(),
            flash,
            is_authenticated,
            slots: BTreeMap::new(),
        }
    }

    /// Set a text value; it is escaped when rendered.
    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_string(), Slot::Text(value.into()));
        self
    }

    /// Set trusted markup that is rendered verbatim.
    pub fn html(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_string(), Slot::Html(value.into()));
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "current_year" => Some(self.current_year.to_string()),
            _ => match self.slots.get(key)? {
                Slot::Text(s) => Some(escape_html(s)),
                Slot::Html(s) => Some(s.clone()),
            },
        }
    }
}

pub struct TemplateCache {
    layout: String,
    pages: HashMap<String, String>,
    partials: HashMap<String, String>,
}

impl TemplateCache {
    /// Read `base.html`, `partials/*.html` and `pages/*.html` under `html_dir`.
    pub fn load(html_dir: &Path) -> Result<Self, TemplateError> {
        let layout = read(&html_dir.join(LAYOUT))?;
        let partials = read_dir(&html_dir.join("partials"))?;
        let pages = read_dir(&html_dir.join("pages"))?;

        for required in [NAV, NAV_AUTHENTICATED, FLASH] {
            if !partials.contains_key(required) {
                return Err(TemplateError::Missing(format!("partials/{}", required)));
            }
        }

        info!(
            "Template cache loaded from {} ({} pages, {} partials)",
            html_dir.display(),
            pages.len(),
            partials.len()
        );
        Ok(Self {
            layout,
            pages,
            partials,
        })
    }

    /// Render a full page into a string. Nothing is returned on error, so
    /// a failed render never produces half a page.
    pub fn render(&self, page: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let source = self
            .pages
            .get(page)
            .ok_or_else(|| TemplateError::Missing(page.to_string()))?;
        let main = fill(page, source, data)?;

        let nav_name = if data.is_authenticated {
            NAV_AUTHENTICATED
        } else {
            NAV
        };
        let nav = self.render_partial(nav_name, data)?;

        let flash = match &data.flash {
            Some(message) => {
                self.render_partial(FLASH, &data.clone().text("flash", message.as_str()))?
            }
            None => String::new(),
        };

        let outer = data
            .clone()
            .html("nav", nav)
            .html("flash", flash)
            .html("main", main);
        fill(LAYOUT, &self.layout, &outer)
    }

    /// Render a partial on its own, e.g. one row of a list.
    pub fn render_partial(&self, name: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let source = self
            .partials
            .get(name)
            .ok_or_else(|| TemplateError::Missing(format!("partials/{}", name)))?;
        fill(name, source, data)
    }

    #[cfg(test)]
    fn has_page(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }
}

fn read(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_dir(dir: &Path) -> Result<HashMap<String, String>, TemplateError> {
    let entries = fs::read_dir(dir).map_err(|source| TemplateError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut out = HashMap::new();
    for entry in entries {
        let path = entry
            .map_err(|source| TemplateError::Read {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        out.insert(name.to_string(), read(&path)?);
    }
    Ok(out)
}

/// Substitute every placeholder in `source`.
fn fill(name: &str, source: &str, data: &TemplateData) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];

        let (open, close) = if after.starts_with("{{{") {
            ("{{{", "}}}")
        } else {
            ("{{", "}}")
        };
        let body = &after[open.len()..];
        let end = body
            .find(close)
            .ok_or_else(|| TemplateError::Unterminated(name.to_string()))?;
        let key = body[..end].trim();

        let value = data.lookup(key).ok_or_else(|| TemplateError::MissingValue {
            template: name.to_string(),
            key: key.to_string(),
        })?;
        out.push_str(&value);

        rest = &body[end + close.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `02 Jan 2026 at 15:04`, the format every page uses for timestamps.
pub fn human_date(at: DateTime<Utc>) -> String {
    at.format("%d %b %Y at %H:%M").to_string()
}
