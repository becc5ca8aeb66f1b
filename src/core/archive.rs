//! Bundling generated documents into one zip

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::batch::GenerateError;

/// Deflate every regular file directly inside `dir` into `archive`, named by
/// file name, in name order. Returns the number of entries written.
pub fn bundle_directory(dir: &Path, archive: &Path) -> Result<usize, GenerateError> {
    let file = File::create(archive)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        writer.start_file(name.as_str(), options)?;
        io::copy(&mut File::open(entry.path())?, &mut writer)?;
        count += 1;
    }

    let mut out = writer.finish()?;
    io::Write::flush(&mut out)?;
    log::info!("bundled {count} document(s) into {}", archive.display());
    Ok(count)
}
