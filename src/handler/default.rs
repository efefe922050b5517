use super::{Handler, Result};
use crate::file::{InputFile, OutputFile};
use crate::page_data::PageData;

/// The catch-all: copies the file through untouched, keeping its name and
/// extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHandler;

impl Handler for DefaultHandler {
    fn should_handle(&self, _file: &InputFile) -> bool {
        true
    }

    fn handle(&self, file: &InputFile, data: PageData) -> Result<Vec<OutputFile>> {
        Ok(vec![OutputFile::copy(
            file.path(),
            file.relative_dir(),
            file.stem(),
            file.extension(),
            data,
        )])
    }
}
