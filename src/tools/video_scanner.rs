use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 掃描資料夾（不含子資料夾）中符合副檔名的影片，依檔名排序
pub fn scan_video_files(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let extensions: HashSet<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    let mut video_files: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_lowercase()))
        })
        .map(walkdir::DirEntry::into_path)
        .collect();

    video_files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(video_files)
}
