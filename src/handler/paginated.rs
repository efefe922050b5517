use super::{apply_layout, render_body, Error, Handler, Result};
use crate::file::{InputFile, OutputFile};
use crate::page_data::PageData;
use crate::paginator::{Error as PaginationError, Paginator};
use crate::render::Renderer;
use crate::resolver::resolve_permalink;
use crate::scratch::TemporaryFilesystem;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// The page size used when neither the `pagination` block nor the page
/// declares one.
pub const DEFAULT_PER_PAGE: usize = 10;

const PAGINATION: &str = "pagination";

/// The `pagination` front matter block. A bare string names the collection.
#[derive(Deserialize)]
#[serde(untagged)]
enum PaginationSettings {
    Collection(String),
    Block {
        collection: Option<String>,
        #[serde(rename = "perPage")]
        per_page: Option<Value>,
    },
}

/// Expands a templated file whose front matter declares `pagination` into
/// one output per page of the named collection.
pub struct PaginatedPageHandler {
    paginator: Paginator,
    scratch: TemporaryFilesystem,
    renderer: Arc<dyn Renderer>,
    layouts: Option<PathBuf>,
}

impl PaginatedPageHandler {
    pub fn new(
        paginator: Paginator,
        scratch: TemporaryFilesystem,
        renderer: Arc<dyn Renderer>,
    ) -> PaginatedPageHandler {
        PaginatedPageHandler {
            paginator,
            scratch,
            renderer,
            layouts: None,
        }
    }

    /// Wraps each page in its `layout`, looked up in `layouts`.
    pub fn with_layouts(mut self, layouts: impl Into<PathBuf>) -> PaginatedPageHandler {
        self.layouts = Some(layouts.into());
        self
    }
}

impl Handler for PaginatedPageHandler {
    fn should_handle(&self, file: &InputFile) -> bool {
        file.is_template()
            && file
                .front_matter()
                .map_or(false, |front_matter| front_matter.contains_key(PAGINATION))
    }

    fn handle(&self, file: &InputFile, data: PageData) -> Result<Vec<OutputFile>> {
        let (collection, per_page) = settings(&data)?;
        let items = data
            .get(&collection)
            .ok_or_else(|| PaginationError::MissingCollection(collection.clone()))?;
        let first_link = match data.permalink() {
            Some(permalink) => Some(
                resolve_permalink(permalink)
                    .map_err(|reason| Error::Permalink {
                        permalink: permalink.to_owned(),
                        reason,
                    })?
                    .link,
            ),
            None => None,
        };
        let pages = self.paginator.paginate_from(
            file,
            &collection,
            items,
            per_page,
            first_link.as_deref(),
        )?;

        pages
            .iter()
            .map(|page| -> Result<OutputFile> {
                let mut data = data.clone();
                data.set_page_path(&page.current);
                data.put(PAGINATION, page.to_value());

                let content = render_body(file, &data, self.renderer.as_ref(), &self.scratch)?;
                let content = match &self.layouts {
                    Some(layouts) => {
                        apply_layout(content, &mut data, self.renderer.as_ref(), layouts)?
                    }
                    None => content,
                };

                Ok(OutputFile::rendered(
                    file.relative_dir(),
                    file.filename_without_extension(),
                    file.output_extension(),
                    content,
                    data,
                    page.current_page,
                ))
            })
            .collect()
    }
}

// Reads the collection name and page size. The page size comes from the
// `pagination` block, then the page's `perPage`, then `DEFAULT_PER_PAGE`.
fn settings(data: &PageData) -> std::result::Result<(String, usize), PaginationError> {
    let block = data
        .page(PAGINATION)
        .cloned()
        .ok_or(PaginationError::MissingCollectionKey)?;
    let (collection, per_page) = match serde_yaml::from_value(block) {
        Ok(PaginationSettings::Collection(collection)) => (Some(collection), None),
        Ok(PaginationSettings::Block {
            collection,
            per_page,
        }) => (collection, per_page),
        Err(_) => return Err(PaginationError::MissingCollectionKey),
    };

    let collection = collection
        .filter(|c| !c.trim().is_empty())
        .ok_or(PaginationError::MissingCollectionKey)?;

    let per_page = match per_page.as_ref().or_else(|| data.page("perPage")) {
        None | Some(Value::Null) => DEFAULT_PER_PAGE,
        Some(value) => parse_per_page(value)?,
    };
    Ok((collection, per_page))
}

fn parse_per_page(value: &Value) -> std::result::Result<usize, PaginationError> {
    let invalid = || {
        PaginationError::InvalidPerPage(match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => format!("{:?}", other),
        })
    };
    let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;

    match n >= 1 {
        true => Ok(n as usize),
        false => Err(invalid()),
    }
}
