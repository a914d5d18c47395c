//! Locating the CSV entry inside an uploaded archive.
//!
//! Supports ZIP (central directory scan) and TAR (sequential entry scan).
//! The first non-directory entry whose name ends with the configured suffix
//! wins; later matches are ignored. The matched entry is fully buffered
//! before it is returned.

use std::fmt;
use std::io::{Cursor, Read};

use crate::error::ArchiveError;

/// Container format of an uploaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    #[default]
    Zip,
    Tar,
}

impl ContainerKind {
    /// Lenient selector parsing: `"tar"` selects TAR, anything else
    /// (including an empty value) selects ZIP.
    pub fn from_selector(selector: &str) -> Self {
        if selector.trim().eq_ignore_ascii_case("tar") {
            ContainerKind::Tar
        } else {
            ContainerKind::Zip
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Zip => "zip",
            ContainerKind::Tar => "tar",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator settings.
#[derive(Debug, Clone)]
pub struct LocateOptions {
    /// Entry name suffix that identifies the CSV file.
    pub csv_suffix: String,
    /// Maximum decompressed size of the matched entry.
    pub max_entry_bytes: u64,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            csv_suffix: ".csv".to_string(),
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Returns the decompressed bytes of the first CSV entry in `bytes`.
pub fn locate(
    bytes: &[u8],
    kind: ContainerKind,
    options: &LocateOptions,
) -> Result<Vec<u8>, ArchiveError> {
    let found = match kind {
        ContainerKind::Zip => locate_zip(bytes, options)?,
        ContainerKind::Tar => locate_tar(bytes, options)?,
    };

    found.ok_or_else(|| ArchiveError::CsvNotFound {
        suffix: options.csv_suffix.clone(),
    })
}

fn format_error(kind: ContainerKind, err: impl fmt::Display) -> ArchiveError {
    ArchiveError::Format {
        kind: kind.as_str(),
        message: err.to_string(),
    }
}

fn locate_zip(bytes: &[u8], options: &LocateOptions) -> Result<Option<Vec<u8>>, ArchiveError> {
    let kind = ContainerKind::Zip;
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format_error(kind, e))?;

    for i in 0..archive.len() {
        // Raw access reads only the header, so skipped entries are never
        // decompressed or decrypted.
        let name = {
            let raw = archive.by_index_raw(i).map_err(|e| format_error(kind, e))?;
            if raw.is_dir() || !raw.name().ends_with(&options.csv_suffix) {
                continue;
            }
            raw.name().to_string()
        };
        let entry = archive.by_index(i).map_err(|e| format_error(kind, e))?;
        tracing::debug!(entry = %name, size = entry.size(), "found csv entry in zip");
        return read_bounded(entry, &name, kind, options.max_entry_bytes).map(Some);
    }

    Ok(None)
}

fn locate_tar(bytes: &[u8], options: &LocateOptions) -> Result<Option<Vec<u8>>, ArchiveError> {
    let kind = ContainerKind::Tar;
    let mut archive = tar::Archive::new(bytes);
    let entries = archive.entries().map_err(|e| format_error(kind, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format_error(kind, e))?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| format_error(kind, e))?
            .to_string_lossy()
            .into_owned();
        if !name.ends_with(&options.csv_suffix) {
            continue;
        }
        tracing::debug!(entry = %name, size = entry.size(), "found csv entry in tar");
        return read_bounded(entry, &name, kind, options.max_entry_bytes).map(Some);
    }

    Ok(None)
}

fn read_bounded(
    entry: impl Read,
    name: &str,
    kind: ContainerKind,
    max_bytes: u64,
) -> Result<Vec<u8>, ArchiveError> {
    let mut out = Vec::new();
    entry
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| format_error(kind, e))?;
    if out.len() as u64 > max_bytes {
        return Err(format_error(
            kind,
            format!("entry {} exceeds size limit ({} bytes)", name, max_bytes),
        ));
    }
    Ok(out)
}
