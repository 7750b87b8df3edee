use super::media::MediaBackend;
use super::segment::Segment;
use log::{debug, error, info};
use std::path::{Path, PathBuf};

/// 短於此長度的區段不輸出
pub const MIN_CLIP_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedClip {
    pub output_path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub has_objects: bool,
    pub has_motion: bool,
}

impl ExtractedClip {
    #[must_use]
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 秒數轉為 `HHMMSS`（捨去小數）
#[must_use]
pub fn format_hhmmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}{:02}{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// `{stem}_seg{序號:03}_{開始}_{結束}[_obj][_mot].{副檔名}`
#[must_use]
pub fn clip_file_name(
    stem: &str,
    ordinal: usize,
    start_time: f64,
    end_time: f64,
    segment: &Segment,
    extension: &str,
) -> String {
    let mut name = format!(
        "{stem}_seg{ordinal:03}_{}_{}",
        format_hhmmss(start_time),
        format_hhmmss(end_time)
    );
    if segment.has_objects {
        name.push_str("_obj");
    }
    if segment.has_motion {
        name.push_str("_mot");
    }
    name.push('.');
    name.push_str(extension);
    name
}

/// 計算要輸出的剪輯（不實際剪輯）
///
/// 序號以合併後的位置計算，被略過的短區段也會佔用序號。
#[must_use]
pub fn plan_clips(
    source: &Path,
    segments: &[Segment],
    fps: f64,
    output_dir: &Path,
    extension: &str,
) -> Vec<ExtractedClip> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    segments
        .iter()
        .enumerate()
        .filter_map(|(position, segment)| {
            let start_time = segment.start as f64 / fps;
            let end_time = segment.end as f64 / fps;
            let duration = end_time - start_time;

            if duration < MIN_CLIP_SECONDS {
                debug!(
                    "區段 {} 長度 {duration:.2}s 過短，略過",
                    position + 1
                );
                return None;
            }

            let name = clip_file_name(&stem, position + 1, start_time, end_time, segment, extension);
            Some(ExtractedClip {
                output_path: output_dir.join(name),
                start_time,
                end_time,
                duration,
                has_objects: segment.has_objects,
                has_motion: segment.has_motion,
            })
        })
        .collect()
}

/// 將合併後的區段輸出為剪輯檔
pub struct ClipExtractor<'a> {
    backend: &'a dyn MediaBackend,
    output_dir: &'a Path,
    extension: &'a str,
}

impl<'a> ClipExtractor<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn MediaBackend, output_dir: &'a Path, extension: &'a str) -> Self {
        Self {
            backend,
            output_dir,
            extension,
        }
    }

    /// 單一區段剪輯失敗只記錄錯誤並略過
    #[must_use]
    pub fn extract(&self, source: &Path, segments: &[Segment], fps: f64) -> Vec<ExtractedClip> {
        plan_clips(source, segments, fps, self.output_dir, self.extension)
            .into_iter()
            .filter(|clip| {
                match self
                    .backend
                    .cut(source, clip.start_time, clip.end_time, &clip.output_path)
                {
                    Ok(()) => {
                        info!(
                            "已輸出剪輯: {} ({:.1}s)",
                            clip.output_path.display(),
                            clip.duration
                        );
                        true
                    }
                    Err(e) => {
                        error!("剪輯失敗 {}: {e:#}", clip.output_path.display());
                        false
                    }
                }
            })
            .collect()
    }
}
