//! Output path resolution. An [`OutputPathResolver`] maps a file's relative
//! directory, name, output extension and page number onto the directory it is
//! written into, the path of the written file, and the link it is published
//! under. All three are relative to the destination root, use `/` separators,
//! and carry neither a leading nor a trailing slash.
//!
//! Two strategies are provided: [`DefaultResolver`] mirrors the source layout
//! (`about.md` → `about.html`), and [`PrettyResolver`] gives every HTML page
//! its own directory (`about.md` → `about/index.html`, linked as `about`).
//!
//! Permalinks declared in front matter bypass the resolvers entirely; see
//! [`resolve_permalink`].

use percent_encoding::percent_decode_str;
use std::fmt;

const INDEX: &str = "index";
const INDEX_HTML: &str = "index.html";
const HTML: &str = "html";

/// Where a single output file lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub directory: String,
    pub path: String,
    pub link: String,
}

/// Computes output locations. Implementations must be pure.
pub trait OutputPathResolver: Send + Sync {
    fn directory(&self, dir: &str, name: &str, extension: &str, page: usize) -> String;
    fn path(&self, dir: &str, name: &str, extension: &str, page: usize) -> String;
    fn link(&self, dir: &str, name: &str, extension: &str, page: usize) -> String;

    /// Resolves all three parts at once, percent-decoded.
    fn locate(&self, dir: &str, name: &str, extension: &str, page: usize) -> Location {
        Location {
            directory: decode(&self.directory(dir, name, extension, page)),
            path: decode(&self.path(dir, name, extension, page)),
            link: decode(&self.link(dir, name, extension, page)),
        }
    }
}

/// Mirrors the source layout: `blog/post.md` → `blog/post.html`. Pages after
/// the first go into a numbered subdirectory (`blog/2/post.html`).
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResolver;

impl OutputPathResolver for DefaultResolver {
    fn directory(&self, dir: &str, _name: &str, _extension: &str, page: usize) -> String {
        join_path(&[dir, &page_segment(page)])
    }

    fn path(&self, dir: &str, name: &str, extension: &str, page: usize) -> String {
        join_path(&[dir, &page_segment(page), &file_name(name, extension)])
    }

    fn link(&self, dir: &str, name: &str, extension: &str, page: usize) -> String {
        self.path(dir, name, extension, page)
    }
}

/// Pretty URLs: `blog/post.md` → `blog/post/index.html`, linked as
/// `blog/post`. Index pages stay where they are and non-HTML outputs keep
/// their file names.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrettyResolver;

impl PrettyResolver {
    fn page_directory(dir: &str, name: &str, extension: &str, page: usize) -> Option<String> {
        match (extension == HTML, name == INDEX) {
            (true, true) => Some(join_path(&[dir, &page_segment(page)])),
            (true, false) => Some(join_path(&[dir, name, &page_segment(page)])),
            (false, _) => None,
        }
    }
}

impl OutputPathResolver for PrettyResolver {
    fn directory(&self, dir: &str, name: &str, extension: &str, page: usize) -> String {
        Self::page_directory(dir, name, extension, page)
            .unwrap_or_else(|| join_path(&[dir, &page_segment(page)]))
    }

    fn path(&self, dir: &str, name: &str, extension: &str, page: usize) -> String {
        match Self::page_directory(dir, name, extension, page) {
            Some(directory) => join_path(&[&directory, INDEX_HTML]),
            None => join_path(&[dir, &page_segment(page), &file_name(name, extension)]),
        }
    }

    fn link(&self, dir: &str, name: &str, extension: &str, page: usize) -> String {
        match Self::page_directory(dir, name, extension, page) {
            Some(directory) => directory,
            None => self.path(dir, name, extension, page),
        }
    }
}

fn page_segment(page: usize) -> String {
    match page > 1 {
        true => page.to_string(),
        false => String::new(),
    }
}

fn file_name(name: &str, extension: &str) -> String {
    match extension.is_empty() {
        true => name.to_owned(),
        false => format!("{}.{}", name, extension),
    }
}

/// Joins path fragments with `/`, dropping empty segments (and therefore any
/// leading, trailing or doubled slashes).
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds an absolute URL for a site-relative `path`.
pub fn page_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

/// Percent-decodes `s`, replacing invalid UTF-8 sequences.
pub fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Resolves a front-matter permalink into a [`Location`]. The permalink is
/// percent-decoded and its `.`/`..` segments are resolved. A trailing `/`
/// names a directory, whose file is `index.html`.
pub fn resolve_permalink(permalink: &str) -> Result<Location, PermalinkError> {
    let decoded = decode(permalink.trim());
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PermalinkError::EscapesRoot);
                }
            }
            segment => segments.push(segment),
        }
    }

    let Some((_, parents)) = segments.split_last() else {
        return Err(PermalinkError::Empty);
    };

    if decoded.ends_with('/') {
        let link = segments.join("/");
        Ok(Location {
            directory: link.clone(),
            path: join_path(&[&link, INDEX_HTML]),
            link,
        })
    } else {
        let path = segments.join("/");
        Ok(Location {
            directory: parents.join("/"),
            link: path.clone(),
            path,
        })
    }
}

/// Returned for permalinks that cannot be mapped into the destination tree.
#[derive(Debug, PartialEq, Eq)]
pub enum PermalinkError {
    /// The permalink has no path segments (e.g. `/` or `./`).
    Empty,

    /// The permalink climbs above the destination root with `..`.
    EscapesRoot,
}

impl fmt::Display for PermalinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PermalinkError::Empty => write!(f, "permalink is empty"),
            PermalinkError::EscapesRoot => {
                write!(f, "permalink escapes the destination directory")
            }
        }
    }
}

impl std::error::Error for PermalinkError {}
