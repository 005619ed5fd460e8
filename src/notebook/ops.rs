use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TreeError};

/// Hidden folder inside a notebook that receives non-purged deletes.
pub const RECYCLE_BIN_NAME: &str = ".recycle_bin";

/// Whether an entry name is hidden from the folder tree.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Check that `name` can be used as a folder name.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed != name {
        return Err(TreeError::InvalidName(format!("{:?}", name)));
    }
    if name == "." || name == ".." || is_hidden(name) {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// List the visible sub-directories of `path`, sorted case-insensitively.
///
/// Files, symlinks and hidden entries are skipped.
pub fn list_sub_dirs(path: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_hidden(&name) {
            names.push(name);
        }
    }
    names.sort_by_key(|n| n.to_lowercase());
    Ok(names)
}

/// Create a new directory at the given path.
pub fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir(path)?;
    Ok(())
}

/// Rename (move) a directory from one path to another.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)?;
    Ok(())
}

/// Delete a directory recursively.
pub fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir_all(path)?;
    Ok(())
}

/// Pick a name for a folder copied into `dir`.
///
/// Returns `name` when it is free, otherwise `name_copy`, `name_copy_1`,
/// `name_copy_2`, ... whichever is the first free one.
pub fn resolve_copy_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }

    let mut index = 0usize;
    loop {
        let candidate = if index == 0 {
            format!("{}_copy", name)
        } else {
            format!("{}_copy_{}", name, index)
        };
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Pick `base`, `base_1`, `base_2`, ... whichever does not exist in `dir` yet.
pub fn sequence_name(dir: &Path, base: &str) -> String {
    if !dir.join(base).exists() {
        return base.to_string();
    }
    let mut index = 1usize;
    loop {
        let candidate = format!("{}_{}", base, index);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Recursively copy the directory `src` to the new path `dest`.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)?;
        }
    }
    Ok(())
}

/// Move the directory `src` to the new path `dest`.
///
/// Uses `fs::rename` first (fast, same-device). Falls back to copy+delete
/// if rename fails (cross-device).
pub fn move_dir(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_dir_recursive(src, dest)?;
            fs::remove_dir_all(src)?;
            Ok(())
        }
    }
}

/// Move `src` into the recycle bin of the notebook rooted at `notebook_root`.
///
/// Returns the folder's path inside the bin.
pub fn recycle(notebook_root: &Path, src: &Path) -> Result<PathBuf> {
    let bin = notebook_root.join(RECYCLE_BIN_NAME);
    fs::create_dir_all(&bin)?;
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| TreeError::InvalidPath(src.display().to_string()))?;
    let dest = bin.join(resolve_copy_name(&bin, &name));
    move_dir(src, &dest)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn validate_name_accepts_plain_names() {
        assert!(validate_name("Work").is_ok());
        assert!(validate_name("my notes 2024").is_ok());
    }

    #[test]
    fn validate_name_rejects_bad_names() {
        for bad in ["", "  ", " padded", ".", "..", ".hidden", "a/b", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn list_sub_dirs_skips_files_and_hidden() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("beta")).unwrap();
        fs::create_dir(tmp.path().join("Alpha")).unwrap();
        fs::create_dir(tmp.path().join(".hidden")).unwrap();
        fs::write(tmp.path().join("note.md"), "x").unwrap();

        let names = list_sub_dirs(tmp.path()).unwrap();
        assert_eq!(names, vec!["Alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn list_sub_dirs_missing_dir_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(list_sub_dirs(&tmp.path().join("gone")).is_err());
    }

    #[test]
    fn resolve_copy_name_no_conflict() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_copy_name(tmp.path(), "notes"), "notes");
    }

    #[test]
    fn resolve_copy_name_appends_copy() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("notes")).unwrap();
        assert_eq!(resolve_copy_name(tmp.path(), "notes"), "notes_copy");
    }

    #[test]
    fn resolve_copy_name_numbers_further_copies() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("notes")).unwrap();
        fs::create_dir(tmp.path().join("notes_copy")).unwrap();
        assert_eq!(resolve_copy_name(tmp.path(), "notes"), "notes_copy_1");
        fs::create_dir(tmp.path().join("notes_copy_1")).unwrap();
        assert_eq!(resolve_copy_name(tmp.path(), "notes"), "notes_copy_2");
    }

    #[test]
    fn sequence_name_counts_up() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(sequence_name(tmp.path(), "new_folder"), "new_folder");
        fs::create_dir(tmp.path().join("new_folder")).unwrap();
        assert_eq!(sequence_name(tmp.path(), "new_folder"), "new_folder_1");
    }

    #[test]
    fn copy_dir_recursive_copies_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.md"), "aaa").unwrap();
        fs::write(src.join("sub").join("b.md"), "bbb").unwrap();

        let dest = tmp.path().join("dest");
        copy_dir_recursive(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a.md")).unwrap(), "aaa");
        assert_eq!(
            fs::read_to_string(dest.join("sub").join("b.md")).unwrap(),
            "bbb"
        );
        assert!(src.exists());
    }

    #[test]
    fn move_dir_removes_source() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("move_me");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("inner.md"), "data").unwrap();

        let dest = tmp.path().join("moved");
        move_dir(&src, &dest).unwrap();
        assert!(!src.exists());
        assert!(dest.join("inner.md").exists());
    }

    #[test]
    fn recycle_moves_into_bin_with_collision() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("old");
        fs::create_dir(&first).unwrap();
        let binned = recycle(tmp.path(), &first).unwrap();
        assert_eq!(binned, tmp.path().join(RECYCLE_BIN_NAME).join("old"));

        fs::create_dir(&first).unwrap();
        let binned_again = recycle(tmp.path(), &first).unwrap();
        assert_eq!(
            binned_again,
            tmp.path().join(RECYCLE_BIN_NAME).join("old_copy")
        );
        assert!(!first.exists());
    }
}
