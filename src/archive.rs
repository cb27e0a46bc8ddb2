use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::emit::OutputTree;

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn options(path: &str) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    if path.ends_with(".sh") {
        options.unix_permissions(0o755)
    } else {
        options.unix_permissions(0o644)
    }
}

/// Zip every file of `tree`, in sorted path order with fixed timestamps,
/// so the same tree always yields the same bytes.
pub fn package(tree: &OutputTree) -> Result<Vec<u8>, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, contents) in tree.iter() {
        writer.start_file(path, options(path))?;
        writer.write_all(contents.as_bytes())?;
    }
    let bytes = writer.finish()?.into_inner();
    debug!(files = tree.len(), bytes = bytes.len(), "packaged archive");
    Ok(bytes)
}
