use crate::error::PlanError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// True when `directory` names an existing directory. An empty path is never valid.
pub fn is_valid_directory<P: AsRef<Path>>(directory: P) -> bool {
    let dir_path = directory.as_ref();
    !dir_path.as_os_str().is_empty() && dir_path.is_dir()
}

/// Directory that receives `file_path` when exporting `source_root` into `dest_root`.
///
/// The last segment of `source_root` is kept, so `/src/Proj/X/Y.cpp` exported from
/// `/src/Proj` into `/out` lands in `/out/Proj/X`. A root without a parent (`/`)
/// mirrors only the segments below it.
pub fn destination_for<P, Q, R>(
    source_root: P,
    dest_root: Q,
    file_path: R,
) -> Result<PathBuf, PlanError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let source_root = source_root.as_ref();
    let file_path = file_path.as_ref();

    let base = source_root.parent().unwrap_or(source_root);

    let relative = file_path
        .strip_prefix(base)
        .ok()
        .filter(|_| file_path.starts_with(source_root) && file_path != source_root)
        .ok_or_else(|| PlanError::OutsideRoot {
            path: file_path.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;

    let directory = relative
        .parent()
        .ok_or_else(|| PlanError::NoFileName(file_path.to_path_buf()))?;

    Ok(dest_root.as_ref().join(directory))
}

/// Copy `source` into `directory` under its original file name.
///
/// The directory is created with its parents when missing; an existing copy
/// is overwritten. Returns the path of the written file.
pub fn copy_into<P: AsRef<Path>, Q: AsRef<Path>>(source: P, directory: Q) -> Result<PathBuf> {
    let src_path = source.as_ref();
    let dest_dir = directory.as_ref();

    let file_name = src_path
        .file_name()
        .ok_or_else(|| PlanError::NoFileName(src_path.to_path_buf()))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {:?}", dest_dir))?;

    let dest_path = dest_dir.join(file_name);

    fs::copy(src_path, &dest_path)
        .with_context(|| format!("Failed to copy file from {:?} to {:?}", src_path, dest_path))?;

    Ok(dest_path)
}

/// Every entry below `root`, depth first, the root itself excluded.
///
/// Entries under `exclude` are pruned. Traversal errors are logged and skipped.
pub fn walk_entries<'a>(
    root: &Path,
    exclude: Option<&'a Path>,
    files_only: bool,
) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(move |entry| {
            exclude.map_or(true, |excluded| !entry.path().starts_with(excluded))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read directory entry: {}", e);
                None
            }
        })
        .filter(move |entry| !files_only || !entry.file_type().is_dir())
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_destination_keeps_source_root_name() {
        let dest = destination_for("/src/Proj", "/out", "/src/Proj/X/Y.cpp").unwrap();
        assert_eq!(dest, PathBuf::from("/out/Proj/X"));
    }

    #[test]
    fn test_destination_for_file_at_root() {
        let dest = destination_for("/src/Proj", "/out", "/src/Proj/A.cpp").unwrap();
        assert_eq!(dest, PathBuf::from("/out/Proj"));
    }

    #[test]
    fn test_destination_rejects_path_outside_root() {
        let result = destination_for("/src/Proj", "/out", "/src/Other/A.cpp");
        assert!(matches!(result, Err(PlanError::OutsideRoot { .. })));

        let result = destination_for("/src/Proj", "/out", "/src/ProjX/A.cpp");
        assert!(matches!(result, Err(PlanError::OutsideRoot { .. })));
    }

    #[test]
    fn test_destination_from_filesystem_root() {
        let dest = destination_for("/", "/out", "/Proj/A.cpp").unwrap();
        assert_eq!(dest, PathBuf::from("/out/Proj"));
    }

    #[test]
    fn test_is_valid_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.h");
        fs::write(&file, "x").unwrap();

        assert!(is_valid_directory(dir.path()));
        assert!(!is_valid_directory(&file));
        assert!(!is_valid_directory(dir.path().join("missing")));
        assert!(!is_valid_directory(""));
    }

    #[test]
    fn test_copy_into_creates_directory_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("A.cpp");
        fs::write(&source, b"\x00first\xff").unwrap();
        let target_dir = dir.path().join("out").join("Proj").join("Sub");

        let copied = copy_into(&source, &target_dir).unwrap();
        assert_eq!(copied, target_dir.join("A.cpp"));
        assert_eq!(fs::read(&copied).unwrap(), b"\x00first\xff");

        fs::write(&source, "second").unwrap();
        copy_into(&source, &target_dir).unwrap();
        assert_eq!(fs::read_to_string(&copied).unwrap(), "second");
    }

    #[test]
    fn test_copy_into_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        assert!(copy_into(dir.path().join("missing.h"), dir.path().join("out")).is_err());
    }

    #[test]
    fn test_walk_entries_includes_directories_and_prunes_excluded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Sub")).unwrap();
        fs::create_dir_all(dir.path().join("Export")).unwrap();
        fs::write(dir.path().join("Sub").join("A.h"), "x").unwrap();
        fs::write(dir.path().join("Export").join("B.h"), "x").unwrap();

        let exclude = dir.path().join("Export");
        let mut all: Vec<PathBuf> = walk_entries(dir.path(), Some(&exclude), false).collect();
        all.sort();
        assert_eq!(all, vec![dir.path().join("Sub"), dir.path().join("Sub").join("A.h")]);

        let files: Vec<PathBuf> = walk_entries(dir.path(), None, true).collect();
        assert_eq!(files.len(), 2);
    }
}
