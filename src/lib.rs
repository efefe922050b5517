//! The library code for the `tessera` static site generator. A build walks the
//! source directory and pushes every file through three steps:
//!
//! 1. Dispatch: the file goes to the first [`handler::Handler`] in the chain
//!    that claims it. Files under `_`-prefixed directories are skipped,
//!    templates declaring `pagination` are expanded into one output per page
//!    ([`handler::PaginatedPageHandler`]), other templates and markdown files
//!    are rendered ([`handler::PageHandler`]), and everything else is copied
//!    ([`handler::DefaultHandler`]).
//! 2. Resolution: each output is located in the destination tree by an
//!    [`resolver::OutputPathResolver`], unless its front matter declares a
//!    permalink.
//! 3. Writing: outputs are written and their links collected into the build
//!    manifest.
//!
//! Every file is rendered against its own [`page_data::PageData`], a layered
//! view over the site data loaded by [`config`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod file;
pub mod frontmatter;
pub mod handler;
pub mod page_data;
pub mod paginator;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod scratch;
