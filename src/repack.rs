//! Manifest-first repair for written jars.
//!
//! Some jar consumers read the container as a stream and only recognise a
//! manifest that is the first record (optionally preceded by its `META-INF/`
//! directory). The concurrent writer emits records in completion order, so
//! after a run the output is checked and, when needed, rewritten with the
//! manifest moved to the front.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use zip::read::read_zipfile_from_stream;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::Result;
use crate::entry_path::{MANIFEST_PATH, META_INF_DIR};

/// Makes the manifest of the jar at `path` its first record.
///
/// Returns `Ok(true)` if the file was rewritten and `Ok(false)` if it was
/// already compliant or has no manifest. The rewrite goes to a temporary
/// file in the same directory which then atomically replaces `path`; on
/// error the original file is left as it was.
pub fn verify_manifest(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();

    if manifest_leads(path)? {
        log::trace!("{} already starts with its manifest", path.display());
        return Ok(false);
    }

    let mut source = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let names: Vec<String> = source.file_names().map(str::to_owned).collect();
    let Some(manifest_index) = names.iter().position(|name| is_manifest(name)) else {
        log::trace!("{} has no manifest", path.display());
        return Ok(false);
    };

    log::info!("moving manifest to the front of {}", path.display());

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix(".atlas-repack-")
        .suffix(".jar")
        .tempfile_in(dir)?;
    let mut writer = ZipWriter::new(BufWriter::new(temp));

    let mut dir_options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    {
        let manifest = source.by_index_raw(manifest_index)?;
        if let Some(time) = manifest.last_modified() {
            dir_options = dir_options.last_modified_time(time);
        }
        writer.add_directory(META_INF_DIR, dir_options)?;
        writer.raw_copy_file(manifest)?;
    }

    for (index, name) in names.iter().enumerate() {
        if index == manifest_index || is_manifest(name) || name.eq_ignore_ascii_case(META_INF_DIR) {
            continue;
        }
        writer.raw_copy_file(source.by_index_raw(index)?)?;
    }

    let temp = writer
        .finish()?
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?;
    drop(source);
    temp.persist(path).map_err(io::Error::from)?;
    Ok(true)
}

/// Returns `true` if a front-to-back read of `path` meets the manifest
/// before any other file record.
fn manifest_leads(path: &Path) -> Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);

    for _ in 0..2 {
        let name = match read_zipfile_from_stream(&mut reader) {
            Ok(Some(file)) => file.name().to_owned(),
            Ok(None) => return Ok(false),
            Err(e) => {
                log::debug!("streaming read of {} failed: {}", path.display(), e);
                return Ok(false);
            }
        };
        if is_manifest(&name) {
            return Ok(true);
        }
        if !name.eq_ignore_ascii_case(META_INF_DIR) {
            return Ok(false);
        }
    }
    Ok(false)
}

fn is_manifest(name: &str) -> bool {
    name.eq_ignore_ascii_case(MANIFEST_PATH)
}
