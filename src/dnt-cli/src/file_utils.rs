//! File system utilities for common traversal patterns

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Walk files in a directory, filtering by extension
///
/// Calls the handler for each file matching the extension filter, in file
/// name order. Extension should not include the dot (e.g., "dnt" not ".dnt").
/// Without `recursive` only the directory's immediate children are visited.
pub fn walk_files_with_extension<F>(
    path: &Path,
    extensions: &[&str],
    recursive: bool,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut walker = walkdir::WalkDir::new(path).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let file_path = entry.path();

        let matches = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);

        if matches {
            handler(file_path)?;
        }
    }

    Ok(())
}

/// Collect files matching extension into a vector
pub fn collect_files_with_extension(
    path: &Path,
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    walk_files_with_extension(path, extensions, recursive, |file_path| {
        files.push(file_path.to_path_buf());
        Ok(())
    })?;

    Ok(files)
}

/// A single file as-is, or the matching files of a directory
pub fn collect_inputs(path: &Path, extensions: &[&str], recursive: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("Input not found: {}", path.display());
    }

    collect_files_with_extension(path, extensions, recursive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_non_recursive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.dnt"), b"").unwrap();
        fs::write(dir.path().join("a.DNT"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.dnt"), b"").unwrap();

        let files = collect_files_with_extension(dir.path(), &["dnt"], false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.DNT", "b.dnt"]);

        let files = collect_files_with_extension(dir.path(), &["dnt"], true).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_collect_inputs_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.bin");
        fs::write(&file, b"").unwrap();

        assert_eq!(collect_inputs(&file, &["dnt"], false).unwrap(), [file]);
    }

    #[test]
    fn test_collect_inputs_missing() {
        let dir = tempdir().unwrap();
        assert!(collect_inputs(&dir.path().join("missing"), &["dnt"], false).is_err());
    }
}
