use super::{Handler, Result};
use crate::file::{InputFile, OutputFile};
use crate::page_data::PageData;

/// Claims files under a `_`-prefixed path segment (layouts, partials, drafts)
/// and produces nothing for them.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoredHandler;

impl Handler for IgnoredHandler {
    fn should_handle(&self, file: &InputFile) -> bool {
        file.relative_path()
            .split('/')
            .any(|segment| segment.starts_with('_'))
    }

    fn handle(&self, _file: &InputFile, _data: PageData) -> Result<Vec<OutputFile>> {
        Ok(Vec::new())
    }
}
