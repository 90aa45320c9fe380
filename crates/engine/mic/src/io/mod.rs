// Input/Output: text tokenizing and the binary save/restore channel

pub mod serial;
pub mod tokens;

use crate::error::Result;
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;

pub use serial::{Deserializer, Serializer};
pub use tokens::{tokenize, Line};

/// Read a whole mic file into memory. The buffer is dropped once tokenized.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Write text through a temporary file in the target directory, then swap it
/// into place. A failed write leaves the old file and its siblings intact.
pub(crate) fn write_text(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
