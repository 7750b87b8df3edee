use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// 0-100
    pub percent: u8,
    /// 有物件的影格數
    pub detections: usize,
    /// 目前已關閉的區段數
    pub segments: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "處理中"),
            Self::Completed => write!(f, "完成"),
            Self::Failed => write!(f, "失敗"),
            Self::Skipped => write!(f, "略過"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    /// 尚無完成的檔案時無法估計
    pub eta: Option<Duration>,
}

/// 進度回報介面
///
/// 會從工作執行緒呼叫，實作必須可跨執行緒共用。
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, _file: &str, _update: ProgressUpdate) {}

    fn on_file_status_change(&self, _file: &str, _status: FileStatus) {}

    fn on_batch_progress(&self, _progress: BatchProgress) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// 以 indicatif 顯示整體與各檔案進度
pub struct ConsoleProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    files: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    #[must_use]
    pub fn new(total_files: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_files as u64));
        overall.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ));
        overall.set_message("批次處理中");

        Self {
            multi,
            overall,
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn finish(&self) {
        self.overall.finish_with_message("批次處理結束");
    }

    fn file_bar(&self, file: &str) -> Option<ProgressBar> {
        let mut files = self.files.lock().ok()?;
        let bar = files.entry(file.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(100));
            bar.set_style(bar_style("  {prefix:30!} [{bar:30.green/white}] {pos:>3}% {msg}"));
            bar.set_prefix(file.to_string());
            bar
        });
        Some(bar.clone())
    }

    fn remove_file_bar(&self, file: &str) {
        let removed = self
            .files
            .lock()
            .ok()
            .and_then(|mut files| files.remove(file));
        if let Some(bar) = removed {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, file: &str, update: ProgressUpdate) {
        if let Some(bar) = self.file_bar(file) {
            bar.set_position(u64::from(update.percent.min(100)));
            bar.set_message(format!(
                "物件幀 {} / 區段 {}",
                update.detections, update.segments
            ));
        }
    }

    fn on_file_status_change(&self, file: &str, status: FileStatus) {
        match status {
            FileStatus::Processing => {
                let _ = self.file_bar(file);
            }
            FileStatus::Completed | FileStatus::Failed => {
                self.remove_file_bar(file);
                let _ = self.multi.println(format!("{file}: {status}"));
            }
            FileStatus::Skipped => {}
        }
    }

    fn on_batch_progress(&self, progress: BatchProgress) {
        self.overall.set_length(progress.total as u64);
        self.overall.set_position(progress.completed as u64);
        if let Some(eta) = progress.eta {
            self.overall
                .set_message(format!("預估剩餘 {}", format_duration(eta)));
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_duration(Duration::from_millis(999)), "00:00:00");
    }

    #[test]
    fn test_console_progress_tracks_file_bars() {
        let progress = ConsoleProgress::new(2);
        progress.on_file_status_change("a.mp4", FileStatus::Processing);
        progress.on_progress(
            "a.mp4",
            ProgressUpdate {
                percent: 50,
                detections: 1,
                segments: 0,
            },
        );
        assert_eq!(progress.files.lock().unwrap().len(), 1);

        progress.on_file_status_change("a.mp4", FileStatus::Completed);
        assert!(progress.files.lock().unwrap().is_empty());
        progress.finish();
    }
}
