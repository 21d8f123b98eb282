//! Zip bundles of extracted frames

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::Result;
use crate::frames::Frame;

/// Pack frames into an in-memory zip archive, one entry per frame named by
/// its generated filename, in sequence order.
pub fn bundle_frames(frames: &[Frame]) -> Result<Vec<u8>> {
    bundle_entries(frames.iter().map(|f| (f.filename.as_str(), f.bytes.as_slice())))
}

/// Pack arbitrary `(name, bytes)` entries into an in-memory zip archive.
pub fn bundle_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, bytes) in entries {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
