//! Example archives.
//!
//! Members are stored relative to the archived directory's parent, so a unit
//! archive unpacks to `<unit-dir>/...` and the whole-build archive to
//! `code/...`. Traversal is sorted and timestamps are fixed, which makes an
//! archive a pure function of the directory contents.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PackagingError, Result};

const ARCHIVE_SUFFIX: &str = "_examples.zip";

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    /// Member names in archive order.
    pub members: Vec<String>,
    /// Hex SHA-256 of the archive file.
    pub sha256: String,
}

/// Archive `unit_dir` into `<unit_dir>_examples.zip` beside it.
pub fn archive_unit(unit_dir: &Path) -> Result<ArchiveInfo> {
    let name = unit_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let archive_path = unit_dir.with_file_name(format!("{}{}", name, ARCHIVE_SUFFIX));
    write_archive(unit_dir, &archive_path, |_| true)
}

/// Archive the whole `code_dir` into `archive_path`.
///
/// Per-unit archives living inside `code_dir` are left out; their contents
/// are already present as directories.
pub fn archive_all(code_dir: &Path, archive_path: &Path) -> Result<ArchiveInfo> {
    if !code_dir.exists() {
        std::fs::create_dir_all(code_dir).map_err(PackagingError::io(code_dir))?;
    }
    write_archive(code_dir, archive_path, |relative| {
        !relative.ends_with(ARCHIVE_SUFFIX)
    })
}

/// Write every regular file below `root` accepted by `include` into a deflate
/// archive at `archive_path`.
pub fn write_archive(root: &Path, archive_path: &Path, include: impl Fn(&str) -> bool) -> Result<ArchiveInfo> {
    let base = root.parent().unwrap_or(root);

    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent).map_err(PackagingError::io(parent))?;
    }
    let file = File::create(archive_path).map_err(PackagingError::io(archive_path))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let mut members = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path == archive_path {
            continue;
        }
        let member = member_name(path, base)?;
        if !include(&member) {
            continue;
        }

        let bytes = std::fs::read(path).map_err(PackagingError::io(path))?;
        zip.start_file(member.as_str(), member_options(&member))?;
        zip.write_all(&bytes).map_err(PackagingError::io(archive_path))?;
        debug!(member = %member, "Archived");
        members.push(member);
    }

    let mut writer = zip.finish()?;
    writer.flush().map_err(PackagingError::io(archive_path))?;
    drop(writer);

    let sha256 = file_sha256(archive_path)?;
    info!(
        archive = %archive_path.display(),
        members = members.len(),
        sha256 = %sha256,
        "Wrote archive"
    );

    Ok(ArchiveInfo {
        path: archive_path.to_path_buf(),
        members,
        sha256,
    })
}

fn member_options(member: &str) -> FileOptions {
    let mode = if member.ends_with(".sh") { 0o755 } else { 0o644 };
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(mode)
}

/// Forward-slash member name of `path` relative to `base`.
fn member_name(path: &Path, base: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| PackagingError::OutsideRoot {
            path: path.to_path_buf(),
            root: base.to_path_buf(),
        })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn file_sha256(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(PackagingError::io(path))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
