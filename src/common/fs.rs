use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Next free variant of `path`: the path itself when nothing is in the way,
/// otherwise `name_1.ext`, `name_2.ext`, ... with the suffix inserted before
/// the extension.
pub fn collision_free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|s| s.to_string_lossy().into_owned());

    for n in 1u64.. {
        let name = match &extension {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("exhausted collision suffixes")
}

/// Full paths of every file under `directory` with the given extension
/// (case-insensitive), in sorted order.
pub fn find_files_with_extension(directory: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Extract every file entry of `zip_path` directly into `dest_dir`,
/// flattening any directory structure inside the archive away. Existing
/// files are overwritten. Returns the number of files written.
pub fn extract_zip_flat(zip_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = File::open(zip_path)
        .with_context(|| format!("failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read zip archive {}", zip_path.display()))?;

    let mut written = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("failed to read entry {i} of {}", zip_path.display()))?;
        if entry.is_dir() {
            continue;
        }

        // Only the entry's base name survives the flattening.
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_owned()))
        else {
            continue;
        };

        let dest = dest_dir.join(name);
        let mut out = File::create(&dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        io::copy(&mut entry, &mut out).with_context(|| {
            format!("failed to extract {} from {}", dest.display(), zip_path.display())
        })?;
        written += 1;
    }

    Ok(written)
}

/// Scan `source_dir` for `.zip` archives and extract each into `dest_dir`.
/// Returns the total number of files written.
pub fn extract_all(source_dir: &Path, dest_dir: &Path, verbose: u8) -> Result<usize> {
    ensure_dir_exists(dest_dir)?;

    let archives = find_files_with_extension(source_dir, "zip");
    let mut total = 0usize;
    for (i, archive) in archives.iter().enumerate() {
        if verbose > 0 {
            eprintln!("[extract] {} ({} of {})", archive.display(), i + 1, archives.len());
        }
        total += extract_zip_flat(archive, dest_dir)?;
    }

    Ok(total)
}
