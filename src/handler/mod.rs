//! The handler chain. A [`Handler`] decides whether it owns a file and, if it
//! does, turns it into zero or more [`OutputFile`]s. The builder asks its
//! handlers in registration order and the first one that answers yes gets the
//! file; [`DefaultHandler`] answers yes to everything and goes last.

mod default;
mod ignored;
mod page;
mod paginated;

pub use default::DefaultHandler;
pub use ignored::IgnoredHandler;
pub use page::PageHandler;
pub use paginated::PaginatedPageHandler;

use crate::file::{InputFile, OutputFile};
use crate::page_data::PageData;
use crate::paginator;
use crate::render::{self, markdown_to_html, Renderer};
use crate::resolver::PermalinkError;
use crate::scratch::TemporaryFilesystem;
use serde_yaml::Value;
use std::fmt;
use std::io;
use std::path::Path;

/// Owns some class of source files and produces their output artifacts.
pub trait Handler: Send + Sync {
    fn should_handle(&self, file: &InputFile) -> bool;

    /// Produces the file's artifacts. `data` is this file's own view; the
    /// handler may modify it freely.
    fn handle(&self, file: &InputFile, data: PageData) -> Result<Vec<OutputFile>>;
}

/// Returns the first handler in `handlers` that claims `file`.
pub fn first_match<'h>(handlers: &'h [Box<dyn Handler>], file: &InputFile) -> Option<&'h dyn Handler> {
    handlers
        .iter()
        .find(|handler| handler.should_handle(file))
        .map(|handler| handler.as_ref())
}

// Produces the rendered body of a templated and/or markdown file: templates
// are staged in scratch storage and rendered first, markdown is converted to
// HTML afterwards.
fn render_body(
    file: &InputFile,
    data: &PageData,
    renderer: &dyn Renderer,
    scratch: &TemporaryFilesystem,
) -> Result<String> {
    let body = match file.front_matter() {
        Some(front_matter) => front_matter.body.clone(),
        None => file.text()?.to_owned(),
    };

    let body = match file.is_template() {
        true => {
            let staged = scratch.put(&body, file.path(), ".tmpl")?;
            renderer.render(&staged, data)?
        }
        false => body,
    };

    Ok(match file.is_markdown() {
        true => markdown_to_html(&body),
        false => body,
    })
}

// Wraps rendered content in the page's `layout`, if it names one. The layout
// sees the content as the `content` variable.
fn apply_layout(
    content: String,
    data: &mut PageData,
    renderer: &dyn Renderer,
    layouts: &Path,
) -> Result<String> {
    let layout = match data.page("layout").and_then(Value::as_str) {
        Some(layout) => layouts.join(format!("{}.tmpl", layout)),
        None => return Ok(content),
    };
    data.put("content", Value::String(content));
    Ok(renderer.render(&layout, data)?)
}

/// The result of a handler invocation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error produced by a [`Handler`].
#[derive(Debug)]
pub enum Error {
    /// Returned for misconfigured `pagination` blocks.
    Pagination(paginator::Error),

    /// Returned when a template fails to render.
    Render(render::Error),

    /// Returned for I/O errors reading sources or staging scratch files.
    Io(io::Error),

    /// Returned for a permalink that can't be mapped into the destination.
    Permalink {
        permalink: String,
        reason: PermalinkError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Pagination(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::Permalink { permalink, reason } => {
                write!(f, "Resolving permalink '{}': {}", permalink, reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pagination(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Permalink {
                permalink: _,
                reason,
            } => Some(reason),
        }
    }
}

impl From<paginator::Error> for Error {
    fn from(err: paginator::Error) -> Error {
        Error::Pagination(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
