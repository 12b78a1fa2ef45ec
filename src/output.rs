use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::EntryError;
use crate::normalize::NormalizedBuildRecord;
use crate::translate::TranslatedBuildRecord;

/// Pretty JSON with a trailing newline, written beside the target then renamed over it.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let tmp = write_tmp(path, value)?;
    std::fs::rename(&tmp, path)
}

/// Serialize into `<path>.tmp`, creating parent directories. Nothing is left behind on error.
fn write_tmp<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    let tmp = path.with_extension("json.tmp");
    if let Err(e) = std::fs::write(&tmp, body) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

/// `<dir>/<Class>.json`, with path separators in the class name replaced.
pub fn class_file(dir: &Path, class_name: &str) -> PathBuf {
    let stem: String = class_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    dir.join(format!("{}.json", stem))
}

/// Persist both views of one class. Only called once translation succeeded.
///
/// Both files are staged before either replaces its target, so a failed
/// write leaves the previous pair in place.
pub fn save_build(
    builds_dir: &Path,
    translated_dir: &Path,
    normalized: &NormalizedBuildRecord,
    translated: &TranslatedBuildRecord,
) -> Result<(PathBuf, PathBuf), EntryError> {
    let build_path = class_file(builds_dir, &normalized.class_name);
    let translated_path = class_file(translated_dir, &normalized.class_name);

    let build_tmp =
        write_tmp(&build_path, normalized).map_err(|source| write_error(&build_path, source))?;
    let translated_tmp = match write_tmp(&translated_path, translated) {
        Ok(tmp) => tmp,
        Err(source) => {
            let _ = std::fs::remove_file(&build_tmp);
            return Err(write_error(&translated_path, source));
        }
    };

    for (tmp, path) in [(&build_tmp, &build_path), (&translated_tmp, &translated_path)] {
        if let Err(source) = std::fs::rename(tmp, path) {
            let _ = std::fs::remove_file(&build_tmp);
            let _ = std::fs::remove_file(&translated_tmp);
            return Err(write_error(path, source));
        }
    }

    Ok((build_path, translated_path))
}

fn write_error(path: &Path, source: io::Error) -> EntryError {
    EntryError::Write {
        path: path.display().to_string(),
        source,
    }
}
