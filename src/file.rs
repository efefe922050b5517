//! Defines [`InputFile`], a source file as the builder sees it, and
//! [`OutputFile`], a write-ready artifact produced by a handler.

use crate::frontmatter::FrontMatter;
use crate::page_data::PageData;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Compound-extension markers that flag a file as templated, e.g.
/// `list.blade.php` or `feed.tmpl.xml`.
pub const TEMPLATE_MARKERS: &[&str] = &["blade", "tmpl"];

/// Source extensions whose templated output is HTML. Any other extension on a
/// templated file is carried through to the output (`feed.blade.xml` →
/// `feed.xml`).
const RENDERED_EXTENSIONS: &[&str] = &["php", "md", "markdown", "html", "tmpl"];

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

const HTML: &str = "html";

/// A source file. The content is read lazily, at most once.
#[derive(Debug)]
pub struct InputFile {
    path: PathBuf,
    relative_dir: String,
    file_name: String,
    contents: OnceLock<Vec<u8>>,
    front_matter: Option<FrontMatter>,
}

impl InputFile {
    /// Describes the file at `path`, which lives somewhere under `root`.
    pub fn new(root: &Path, path: &Path) -> InputFile {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_dir = relative
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(segment) => Some(segment.to_string_lossy()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();

        InputFile {
            path: path.to_owned(),
            relative_dir,
            file_name: relative
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            contents: OnceLock::new(),
            front_matter: None,
        }
    }

    /// Attaches the parsed front matter.
    pub fn with_front_matter(mut self, front_matter: FrontMatter) -> InputFile {
        self.front_matter = Some(front_matter);
        self
    }

    /// The absolute path of the source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory containing the file, relative to the source root
    /// (empty for root-level files).
    pub fn relative_dir(&self) -> &str {
        &self.relative_dir
    }

    /// The path of the file relative to the source root.
    pub fn relative_path(&self) -> String {
        match self.relative_dir.is_empty() {
            true => self.file_name.clone(),
            false => format!("{}/{}", self.relative_dir, self.file_name),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The last dot-separated segment of the file name. Dotfiles like
    /// `.htaccess` have no extension.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => extension,
            _ => "",
        }
    }

    /// The file name without its last extension.
    pub fn stem(&self) -> &str {
        let extension = self.extension();
        match extension.is_empty() {
            true => &self.file_name,
            false => &self.file_name[..self.file_name.len() - extension.len() - 1],
        }
    }

    /// Reports whether a handler renders this file rather than copying it.
    pub fn is_rendered(&self) -> bool {
        self.is_template() || self.is_markdown()
    }

    /// The template marker, if the name is of the form `name.{marker}.ext`.
    pub fn template_marker(&self) -> Option<&str> {
        let (stem, _) = self.file_name.rsplit_once('.')?;
        let (name, marker) = stem.rsplit_once('.')?;
        match !name.is_empty() && TEMPLATE_MARKERS.contains(&marker) {
            true => Some(marker),
            false => None,
        }
    }

    /// The extension including any template marker (`blade.php`, `md`).
    pub fn full_extension(&self) -> String {
        match self.template_marker() {
            Some(marker) => format!("{}.{}", marker, self.extension()),
            None => self.extension().to_owned(),
        }
    }

    /// The file name with its full extension removed.
    pub fn filename_without_extension(&self) -> &str {
        let full_extension = self.full_extension();
        if full_extension.is_empty() {
            return &self.file_name;
        }
        let cut = self.file_name.len() - full_extension.len() - 1;
        &self.file_name[..cut]
    }

    /// Reports whether the body goes through the rendering collaborator.
    pub fn is_template(&self) -> bool {
        self.template_marker().is_some() || self.extension().eq_ignore_ascii_case("tmpl")
    }

    pub fn is_markdown(&self) -> bool {
        let extension = self.extension();
        MARKDOWN_EXTENSIONS
            .iter()
            .any(|md| extension.eq_ignore_ascii_case(md))
    }

    /// The non-HTML extension a templated file preserves in its output, if
    /// any.
    pub fn extra_extension(&self) -> Option<&str> {
        self.template_marker()?;
        let extension = self.extension();
        match RENDERED_EXTENSIONS
            .iter()
            .any(|rendered| extension.eq_ignore_ascii_case(rendered))
        {
            true => None,
            false => Some(extension),
        }
    }

    /// The extension rendered output is written with.
    pub fn output_extension(&self) -> &str {
        self.extra_extension().unwrap_or(HTML)
    }

    /// The raw file content, read on first access.
    pub fn contents(&self) -> io::Result<&[u8]> {
        if let Some(contents) = self.contents.get() {
            return Ok(contents.as_slice());
        }
        let contents = std::fs::read(&self.path)?;
        Ok(self.contents.get_or_init(|| contents).as_slice())
    }

    /// The file content as UTF-8 text.
    pub fn text(&self) -> io::Result<&str> {
        std::str::from_utf8(self.contents()?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }
}

/// What an [`OutputFile`] writes.
#[derive(Clone, Debug)]
pub enum Contents {
    /// Rendered text produced by a handler.
    Rendered(String),

    /// A byte-for-byte copy of a source file.
    Copy(PathBuf),
}

/// A write-ready artifact. Produced by exactly one handler invocation and
/// written exactly once.
#[derive(Clone, Debug)]
pub struct OutputFile {
    relative_dir: String,
    name: String,
    extension: String,
    contents: Contents,
    data: PageData,
    page: usize,
}

impl OutputFile {
    pub fn rendered(
        relative_dir: &str,
        name: &str,
        extension: &str,
        content: String,
        data: PageData,
        page: usize,
    ) -> OutputFile {
        OutputFile {
            relative_dir: relative_dir.to_owned(),
            name: name.to_owned(),
            extension: extension.to_owned(),
            contents: Contents::Rendered(content),
            data,
            page,
        }
    }

    /// A pass-through copy of `source`.
    pub fn copy(
        source: &Path,
        relative_dir: &str,
        name: &str,
        extension: &str,
        data: PageData,
    ) -> OutputFile {
        OutputFile {
            relative_dir: relative_dir.to_owned(),
            name: name.to_owned(),
            extension: extension.to_owned(),
            contents: Contents::Copy(source.to_owned()),
            data,
            page: 1,
        }
    }

    pub fn relative_dir(&self) -> &str {
        &self.relative_dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    /// The 1-based page number within a paginated expansion.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Writes the artifact to `target`, replacing anything already there.
    pub fn put_contents(&self, target: &Path) -> io::Result<()> {
        match &self.contents {
            Contents::Rendered(content) => std::fs::write(target, content),
            Contents::Copy(source) => std::fs::copy(source, target).map(|_| ()),
        }
    }
}
