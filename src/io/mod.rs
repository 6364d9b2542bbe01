use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{DvhError, DvhResult};

pub mod csv_writer;
pub mod json_writer;
pub mod plan;
pub mod summary;

pub(crate) fn open_maybe_gz(path: &Path) -> DvhResult<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| DvhError::io(path, e))?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = GzDecoder::new(file);
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}
