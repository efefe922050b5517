use super::{apply_layout, render_body, Handler, Result};
use crate::file::{InputFile, OutputFile};
use crate::page_data::PageData;
use crate::render::Renderer;
use crate::scratch::TemporaryFilesystem;
use std::path::PathBuf;
use std::sync::Arc;

/// Renders a single templated or markdown page. Paginated templates are
/// claimed earlier in the chain by
/// [`PaginatedPageHandler`](super::PaginatedPageHandler).
pub struct PageHandler {
    scratch: TemporaryFilesystem,
    renderer: Arc<dyn Renderer>,

    /// The directory `layout` names are looked up in.
    layouts: PathBuf,
}

impl PageHandler {
    pub fn new(
        scratch: TemporaryFilesystem,
        renderer: Arc<dyn Renderer>,
        layouts: impl Into<PathBuf>,
    ) -> PageHandler {
        PageHandler {
            scratch,
            renderer,
            layouts: layouts.into(),
        }
    }
}

impl Handler for PageHandler {
    fn should_handle(&self, file: &InputFile) -> bool {
        file.is_rendered()
    }

    fn handle(&self, file: &InputFile, mut data: PageData) -> Result<Vec<OutputFile>> {
        let content = render_body(file, &data, self.renderer.as_ref(), &self.scratch)?;
        let content = apply_layout(content, &mut data, self.renderer.as_ref(), &self.layouts)?;
        Ok(vec![OutputFile::rendered(
            file.relative_dir(),
            file.filename_without_extension(),
            file.output_extension(),
            content,
            data,
            1,
        )])
    }
}
