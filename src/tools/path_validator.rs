use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("無法建立資料夾: {}", path.display()))?;
    }
    Ok(())
}

/// 列出資料夾底下的子資料夾（依名稱排序）
pub fn list_subfolders(path: &Path) -> Result<Vec<PathBuf>> {
    validate_directory_exists(path)?;

    let mut folders: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("無法讀取資料夾: {}", path.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_dir())
        .collect();

    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_subfolders_sorted_and_dirs_only() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("camera_b")).unwrap();
        fs::create_dir(dir.path().join("camera_a")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let folders = list_subfolders(dir.path()).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["camera_a", "camera_b"]);
    }

    #[test]
    fn test_validate_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        assert!(validate_directory_exists(&file).is_err());
        assert!(validate_directory_exists(&dir.path().join("missing")).is_err());
    }
}
