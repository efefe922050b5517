//! Exports [`SiteBuilder`], which runs a single build: it prepares the cache
//! directory, hands every source file to the first [`Handler`] that claims it,
//! resolves where each resulting [`OutputFile`] lands, writes them, and
//! returns the links it wrote. [`build_site`] wires a builder up from a
//! [`Config`].

use crate::config::Config;
use crate::file::{InputFile, OutputFile};
use crate::frontmatter::{self, FrontMatter};
use crate::handler::{
    self, first_match, DefaultHandler, Handler, IgnoredHandler, PageHandler, PaginatedPageHandler,
};
use crate::page_data::{PageData, PageMetadata, SiteData};
use crate::paginator::{self, Paginator};
use crate::progress::{LogProgress, Progress};
use crate::render::{self, Renderer, TemplateRenderer};
use crate::resolver::{
    page_url, resolve_permalink, DefaultResolver, Location, OutputPathResolver, PermalinkError,
    PrettyResolver,
};
use crate::scratch::TemporaryFilesystem;
use crossbeam_channel::unbounded;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use walkdir::WalkDir;

/// Builds the site described by `config` with the standard handler chain and
/// returns the manifest of written links.
pub fn build_site(config: &Config) -> Result<Vec<String>> {
    let resolver: Arc<dyn OutputPathResolver> = match config.pretty {
        true => Arc::new(PrettyResolver),
        false => Arc::new(DefaultResolver),
    };
    let renderer: Arc<dyn Renderer> = Arc::new(TemplateRenderer);
    let scratch = TemporaryFilesystem::new(&config.cache_directory);
    let layouts = config.source_directory.join("_layouts");
    if config.use_cache && scratch.has_temp_directory() {
        log::info!("Reusing cache at `{}`", scratch.directory().display());
    }

    let mut builder = SiteBuilder::new(
        &config.cache_directory,
        resolver.clone(),
        Arc::new(LogProgress::new()),
    )
    .with_use_cache(config.use_cache)
    .with_threads(config.threads)
    .with_clean_destination(true);

    builder.register_handler(IgnoredHandler);
    builder.register_handler(
        PaginatedPageHandler::new(Paginator::new(resolver), scratch.clone(), renderer.clone())
            .with_layouts(&layouts),
    );
    builder.register_handler(PageHandler::new(scratch, renderer, &layouts));
    builder.register_handler(DefaultHandler);

    builder.build(
        &config.source_directory,
        &config.output_directory,
        &config.site,
    )
}

/// Orchestrates a build. Handlers are consulted in registration order, so the
/// catch-all [`DefaultHandler`] must be registered last.
pub struct SiteBuilder {
    cache_path: PathBuf,
    resolver: Arc<dyn OutputPathResolver>,
    handlers: Vec<Box<dyn Handler>>,
    progress: Arc<dyn Progress>,

    /// Keep the cache directory (and its contents) across builds.
    use_cache: bool,

    /// Empty the destination directory before writing.
    clean_destination: bool,

    threads: usize,
}

impl SiteBuilder {
    pub fn new(
        cache_path: impl Into<PathBuf>,
        resolver: Arc<dyn OutputPathResolver>,
        progress: Arc<dyn Progress>,
    ) -> SiteBuilder {
        SiteBuilder {
            cache_path: cache_path.into(),
            resolver,
            handlers: Vec::new(),
            progress,
            use_cache: false,
            clean_destination: false,
            threads: 1,
        }
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> SiteBuilder {
        self.use_cache = use_cache;
        self
    }

    pub fn with_clean_destination(mut self, clean_destination: bool) -> SiteBuilder {
        self.clean_destination = clean_destination;
        self
    }

    /// Sets the number of worker threads handling source files. Values below
    /// two handle files on the calling thread.
    pub fn with_threads(mut self, threads: usize) -> SiteBuilder {
        self.threads = threads.max(1);
        self
    }

    pub fn register_handler(&mut self, handler: impl Handler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Builds every file under `source` into `destination` and returns the
    /// written links in source order. Any error aborts the build; outputs
    /// written before the failure stay on disk.
    pub fn build(
        &self,
        source: &Path,
        destination: &Path,
        site: &SiteData,
    ) -> Result<Vec<String>> {
        prepare_directory(&self.cache_path, !self.use_cache)?;
        let result = self.generate_and_write(source, destination, site);

        // the cache is removed even when the build fails
        match (result, self.cleanup()) {
            (Ok(manifest), cleanup) => cleanup.map(|_| manifest),
            (Err(err), Err(cleanup_err)) => {
                log::warn!("{}", cleanup_err);
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
        }
    }

    fn generate_and_write(
        &self,
        source: &Path,
        destination: &Path,
        site: &SiteData,
    ) -> Result<Vec<String>> {
        let files = list_files(source)?;
        self.progress.start(files.len());
        let outputs = self.generate_files(source, &files, site)?;

        prepare_directory(destination, self.clean_destination)?;
        let manifest = self.write_files(destination, &outputs)?;
        self.progress.finish(manifest.len());
        Ok(manifest)
    }

    fn generate_files(
        &self,
        source: &Path,
        files: &[PathBuf],
        site: &SiteData,
    ) -> Result<Vec<OutputFile>> {
        if self.threads < 2 || files.len() < 2 {
            let mut outputs = Vec::new();
            for path in files {
                outputs.extend(self.handle_file(source, path, site)?);
                self.progress.advance();
            }
            return Ok(outputs);
        }
        self.generate_files_parallel(source, files, site)
    }

    // Fans the files out over a pool of workers. Results are put back in
    // source order. Once a file fails, files after it are skipped but files
    // before it are still handled, so the reported error is always that of
    // the earliest failing file.
    fn generate_files_parallel(
        &self,
        source: &Path,
        files: &[PathBuf],
        site: &SiteData,
    ) -> Result<Vec<OutputFile>> {
        type Generated = Vec<(usize, Vec<OutputFile>)>;
        type Failures = Vec<(usize, Error)>;

        let (tx, rx) = unbounded::<(usize, &Path)>();
        let first_failure = AtomicUsize::new(usize::MAX);
        let mut generated: Generated = Vec::with_capacity(files.len());
        let mut failures: Failures = Vec::new();

        thread::scope(|scope| {
            let workers: Vec<_> = (0..self.threads.min(files.len()))
                .map(|_| {
                    let rx = rx.clone();
                    let first_failure = &first_failure;
                    scope.spawn(move || -> (Generated, Failures) {
                        let mut done = Vec::new();
                        let mut failed = Vec::new();
                        for (index, path) in rx {
                            if index > first_failure.load(Ordering::Relaxed) {
                                continue;
                            }
                            match self.handle_file(source, path, site) {
                                Ok(outputs) => {
                                    self.progress.advance();
                                    done.push((index, outputs));
                                }
                                Err(err) => {
                                    first_failure.fetch_min(index, Ordering::Relaxed);
                                    failed.push((index, err));
                                }
                            }
                        }
                        (done, failed)
                    })
                })
                .collect();
            drop(rx);

            for (index, path) in files.iter().enumerate() {
                if tx.send((index, path.as_path())).is_err() {
                    break;
                }
            }
            drop(tx);

            for worker in workers {
                match worker.join() {
                    Ok((done, failed)) => {
                        generated.extend(done);
                        failures.extend(failed);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        if let Some((_, err)) = failures.into_iter().min_by_key(|(index, _)| *index) {
            return Err(err);
        }
        generated.sort_by_key(|(index, _)| *index);
        Ok(generated
            .into_iter()
            .flat_map(|(_, outputs)| outputs)
            .collect())
    }

    fn handle_file(&self, source: &Path, path: &Path, site: &SiteData) -> Result<Vec<OutputFile>> {
        let mut file = InputFile::new(source, path);
        if file.is_rendered() {
            let front_matter = parse_front_matter(&file)?;
            file = file.with_front_matter(front_matter);
        }

        let mut data = PageData::new(site)
            .with_front_matter(
                file.front_matter()
                    .map(|front_matter| front_matter.data.clone())
                    .unwrap_or_default(),
            )
            .with_page_metadata(&self.page_metadata(&file, site));
        if let Some(permalink) = data.permalink() {
            let location = locate_permalink(permalink)?;
            data.set_page_path(&location.link);
        }

        let handler = first_match(&self.handlers, &file).ok_or_else(|| Error::NoHandlerMatched {
            path: path.to_owned(),
        })?;
        log::debug!("Handling `{}`", file.relative_path());
        handler
            .handle(&file, data)
            .map_err(|err| handler_error(path, err))
    }

    // Computes the metadata every page sees under `page.*` before a handler
    // gets to it.
    fn page_metadata(&self, file: &InputFile, site: &SiteData) -> PageMetadata {
        let (filename, extension) = match file.is_rendered() {
            true => (file.filename_without_extension(), file.output_extension()),
            false => (file.stem(), file.extension()),
        };
        let path = self
            .resolver
            .locate(file.relative_dir(), filename, extension, 1)
            .link;
        PageMetadata {
            filename: filename.to_owned(),
            extension: file.full_extension(),
            url: page_url(site.base_url(), &path),
            path,
            base_url: site.base_url().to_owned(),
        }
    }

    fn write_files(&self, destination: &Path, outputs: &[OutputFile]) -> Result<Vec<String>> {
        self.progress.writing(outputs.len());
        let mut manifest = Vec::with_capacity(outputs.len());
        for output in outputs {
            let location = self.locate(output)?;

            let directory = destination.join(&location.directory);
            std::fs::create_dir_all(&directory).map_err(|err| Error::Filesystem {
                path: directory.clone(),
                err,
            })?;

            let target = destination.join(&location.path);
            output.put_contents(&target).map_err(|err| Error::Filesystem {
                path: target.clone(),
                err,
            })?;
            log::trace!("Wrote `{}`", target.display());
            manifest.push(location.link);
        }
        Ok(manifest)
    }

    // A front-matter permalink overrides the resolver. Later pages of a
    // paginated file can't share it and keep their resolved locations.
    fn locate(&self, output: &OutputFile) -> Result<Location> {
        match output.data().permalink().filter(|_| output.page() == 1) {
            Some(permalink) => locate_permalink(permalink),
            None => Ok(self.resolver.locate(
                output.relative_dir(),
                output.name(),
                output.extension(),
                output.page(),
            )),
        }
    }

    fn cleanup(&self) -> Result<()> {
        match self.use_cache {
            true => Ok(()),
            false => rmdir(&self.cache_path),
        }
    }
}

fn locate_permalink(permalink: &str) -> Result<Location> {
    resolve_permalink(permalink).map_err(|reason| Error::PathResolution {
        permalink: permalink.to_owned(),
        reason,
    })
}

fn parse_front_matter(file: &InputFile) -> Result<FrontMatter> {
    let text = file.text().map_err(|err| Error::Filesystem {
        path: file.path().to_owned(),
        err,
    })?;
    frontmatter::parse(text).map_err(|err| Error::FrontMatter {
        path: file.path().to_owned(),
        err,
    })
}

fn handler_error(path: &Path, err: handler::Error) -> Error {
    let err = match err {
        handler::Error::Pagination(err) => Error::Pagination(err),
        handler::Error::Render(err) => Error::Render(err),
        handler::Error::Io(err) => {
            return Error::Filesystem {
                path: path.to_owned(),
                err,
            }
        }
        handler::Error::Permalink { permalink, reason } => {
            Error::PathResolution { permalink, reason }
        }
    };
    Error::Annotated(format!("handling `{}`", path.display()), Box::new(err))
}

// Lists every file under `source`, sorted by path.
fn list_files(source: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for result in WalkDir::new(source).sort_by_file_name() {
        let entry = result?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn prepare_directory(dir: &Path, clean: bool) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Filesystem {
        path: dir.to_owned(),
        err,
    })?;
    match clean {
        true => clean_directory(dir),
        false => Ok(()),
    }
}

// Removes the contents of `dir` but not `dir` itself.
fn clean_directory(dir: &Path) -> Result<()> {
    let filesystem = |path: &Path| {
        let path = path.to_owned();
        move |err| Error::Filesystem { path, err }
    };
    for entry in std::fs::read_dir(dir).map_err(filesystem(dir))? {
        let entry = entry.map_err(filesystem(dir))?;
        let path = entry.path();
        let removed = match entry.file_type().map_err(filesystem(&path))?.is_dir() {
            true => std::fs::remove_dir_all(&path),
            false => std::fs::remove_file(&path),
        };
        removed.map_err(filesystem(&path))?;
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Filesystem {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

/// The result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every kind aborts the build.
#[derive(Debug)]
pub enum Error {
    /// Returned when no registered handler claims a file, i.e. the chain is
    /// missing its catch-all.
    NoHandlerMatched { path: PathBuf },

    /// Returned for misconfigured `pagination` blocks.
    Pagination(paginator::Error),

    /// Returned for permalinks that can't be mapped into the destination.
    PathResolution {
        permalink: String,
        reason: PermalinkError,
    },

    /// Returned for I/O errors creating, reading, writing or deleting files
    /// and directories.
    Filesystem { path: PathBuf, err: io::Error },

    /// Returned when a template fails to render.
    Render(render::Error),

    /// Returned for malformed front matter.
    FrontMatter {
        path: PathBuf,
        err: frontmatter::Error,
    },

    /// Returned for errors enumerating the source directory.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoHandlerMatched { path } => {
                write!(f, "No handler matched '{}'", path.display())
            }
            Error::Pagination(err) => err.fmt(f),
            Error::PathResolution { permalink, reason } => {
                write!(f, "Resolving permalink '{}': {}", permalink, reason)
            }
            Error::Filesystem { path, err } => write!(f, "'{}': {}", path.display(), err),
            Error::Render(err) => err.fmt(f),
            Error::FrontMatter { path, err } => {
                write!(f, "Parsing front matter of '{}': {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NoHandlerMatched { path: _ } => None,
            Error::Pagination(err) => Some(err),
            Error::PathResolution {
                permalink: _,
                reason,
            } => Some(reason),
            Error::Filesystem { path: _, err } => Some(err),
            Error::Render(err) => Some(err),
            Error::FrontMatter { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::progress::NoProgress;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn builder(cache: &Path, resolver: Arc<dyn OutputPathResolver>) -> SiteBuilder {
        let mut builder = SiteBuilder::new(cache, resolver, Arc::new(NoProgress));
        builder.register_handler(IgnoredHandler);
        builder.register_handler(DefaultHandler);
        builder
    }

    fn write(path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    #[test]
    fn test_copies_and_ignores() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("source");
        write(&source.join("css/site.css"), "body {}")?;
        write(&source.join("_partials/nav.tmpl"), "nav")?;
        write(&source.join("robots.txt"), "User-agent: *")?;

        let manifest = builder(&dir.path().join("cache"), Arc::new(DefaultResolver)).build(
            &source,
            &dir.path().join("build"),
            &SiteData::default(),
        )?;

        assert_eq!(vec!["css/site.css", "robots.txt"], manifest);
        assert_eq!(
            "body {}",
            std::fs::read_to_string(dir.path().join("build/css/site.css"))?
        );
        assert!(!dir.path().join("build/_partials").exists());
        assert!(!dir.path().join("cache").exists());
        Ok(())
    }

    #[test]
    fn test_no_handler_matched() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("source");
        write(&source.join("about.md"), "# About")?;

        let mut builder = SiteBuilder::new(
            dir.path().join("cache"),
            Arc::new(DefaultResolver),
            Arc::new(NoProgress),
        );
        builder.register_handler(IgnoredHandler);
        match builder.build(&source, &dir.path().join("build"), &SiteData::default()) {
            Err(Error::NoHandlerMatched { path }) => assert_eq!(source.join("about.md"), path),
            other => panic!("expected NoHandlerMatched, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_permalink_overrides_resolver() -> TestResult {
        let site = SiteData::default();
        let data = PageData::new(&site)
            .with_front_matter(serde_yaml::from_str("permalink: /custom/%20out.html")?);
        let output = OutputFile::rendered("blog", "post", "html", String::new(), data, 1);
        let builder = builder(Path::new("/tmp/cache"), Arc::new(PrettyResolver));

        let location = builder.locate(&output)?;
        assert_eq!("custom/ out.html", location.path);
        assert_eq!("custom", location.directory);

        let plain = OutputFile::rendered("blog", "post", "html", String::new(), PageData::new(&site), 1);
        assert_eq!("blog/post/index.html", builder.locate(&plain)?.path);
        Ok(())
    }

    #[test]
    fn test_permalink_only_applies_to_first_page() -> TestResult {
        let site = SiteData::default();
        let data = PageData::new(&site)
            .with_front_matter(serde_yaml::from_str("permalink: posts/")?);
        let builder = builder(Path::new("/tmp/cache"), Arc::new(PrettyResolver));

        let first = OutputFile::rendered("", "list", "html", String::new(), data.clone(), 1);
        assert_eq!("posts/index.html", builder.locate(&first)?.path);
        let second = OutputFile::rendered("", "list", "html", String::new(), data, 2);
        assert_eq!("list/2/index.html", builder.locate(&second)?.path);
        Ok(())
    }

    #[test]
    fn test_invalid_permalink() -> TestResult {
        let data = PageData::new(&SiteData::default())
            .with_front_matter(serde_yaml::from_str("permalink: ../outside.html")?);
        let output = OutputFile::rendered("", "page", "html", String::new(), data, 1);
        match builder(Path::new("/tmp/cache"), Arc::new(DefaultResolver)).locate(&output) {
            Err(Error::PathResolution { reason, .. }) => {
                assert_eq!(PermalinkError::EscapesRoot, reason)
            }
            other => panic!("expected PathResolution, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_prepare_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("out");
        write(&target.join("stale/old.html"), "old")?;
        write(&target.join("keep.html"), "keep")?;

        prepare_directory(&target, false)?;
        assert!(target.join("keep.html").exists());

        prepare_directory(&target, true)?;
        assert!(target.is_dir());
        assert_eq!(0, std::fs::read_dir(&target)?.count());

        prepare_directory(&dir.path().join("new/nested"), true)?;
        assert!(dir.path().join("new/nested").is_dir());
        Ok(())
    }

    #[test]
    fn test_parallel_reports_earliest_failure() -> TestResult {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("source");
        for i in 0..40 {
            let content = match i {
                7 | 12 | 31 => "---\ntitle: unterminated\n",
                _ => "# Page\n",
            };
            write(&source.join(format!("page{:02}.md", i)), content)?;
        }

        for _ in 0..5 {
            let result = builder(&dir.path().join("cache"), Arc::new(DefaultResolver))
                .with_threads(4)
                .build(&source, &dir.path().join("build"), &SiteData::default());
            match result {
                Err(Error::FrontMatter { path, .. }) => {
                    assert_eq!(source.join("page07.md"), path)
                }
                other => panic!("expected a front matter error, got {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_missing_source_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let result = builder(&dir.path().join("cache"), Arc::new(DefaultResolver)).build(
            &dir.path().join("missing"),
            &dir.path().join("build"),
            &SiteData::default(),
        );
        assert!(matches!(result, Err(Error::WalkDir(_))));
        assert!(!dir.path().join("cache").exists());
        Ok(())
    }
}
