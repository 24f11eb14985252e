use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use memmap2::Mmap;

use crate::error::ArtifactError;

/// An opened model file: mapped in place, or a buffered gzip stream that the
/// JSON parser reads from directly.
pub enum Artifact {
    Mapped(Mmap),
    Gzip(BufReader<GzDecoder<File>>),
}

impl Artifact {
    pub fn open(path: &Path) -> Result<Self, ArtifactError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(ArtifactError::Malformed(format!(
                "{} is empty",
                path.display()
            )));
        }
        if path.extension().is_some_and(|ext| ext == "gz") {
            let mut stream = BufReader::new(GzDecoder::new(file));
            check_json_start(path, stream.fill_buf()?)?;
            return Ok(Artifact::Gzip(stream));
        }
        // Model files are written once by training and never touched while serving.
        let mmap = unsafe { Mmap::map(&file)? };
        check_json_start(path, &mmap)?;
        Ok(Artifact::Mapped(mmap))
    }
}

/// Only JSON model exports are read. Binary boosters (legacy `.model` files
/// saved with `save_model` in the native format) are refused up front.
fn check_json_start(path: &Path, head: &[u8]) -> Result<(), ArtifactError> {
    match head.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | None => Ok(()),
        Some(_) => Err(ArtifactError::Unsupported(format!(
            "{} is not a JSON model export; binary model formats are not read",
            path.display()
        ))),
    }
}
