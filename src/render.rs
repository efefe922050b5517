//! The rendering collaborator. Templates are Go-style templates executed by
//! `gtmpl` against [`PageData::to_template_value`]; markdown bodies are turned
//! into HTML with `pulldown_cmark`.

use crate::page_data::PageData;
use gtmpl::{Context, Template};
use pulldown_cmark::{html, Options, Parser};
use std::fmt;
use std::path::{Path, PathBuf};

/// Renders a template file against page data.
pub trait Renderer: Send + Sync {
    fn render(&self, template_path: &Path, data: &PageData) -> Result<String>;
}

/// A [`Renderer`] backed by `gtmpl`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateRenderer;

impl Renderer for TemplateRenderer {
    fn render(&self, template_path: &Path, data: &PageData) -> Result<String> {
        let annotate = |message: String| Error {
            path: template_path.to_owned(),
            message,
        };

        let source = std::fs::read_to_string(template_path)
            .map_err(|e| annotate(format!("reading template: {}", e)))?;

        let mut template = Template::default();
        template.parse(&source).map_err(annotate)?;

        let context = Context::from(data.to_template_value()).map_err(annotate)?;
        let mut out: Vec<u8> = Vec::new();
        template.execute(&mut out, &context).map_err(annotate)?;
        String::from_utf8(out).map_err(|e| annotate(e.to_string()))
    }
}

/// Converts a markdown body into HTML.
pub fn markdown_to_html(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(body, options));
    out
}

/// The result of a rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// A template that failed to load, parse or execute. `gtmpl` reports errors
/// as plain strings, so the message is carried as-is.
#[derive(Debug)]
pub struct Error {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rendering '{}': {}", self.path.display(), self.message)
    }
}

impl std::error::Error for Error {}
