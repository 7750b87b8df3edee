use super::clip_extractor::ExtractedClip;
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROCESSING_LOG_FILE: &str = "processing_log.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 檔案中的一列，欄位皆以字串保存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LogRow {
    filename: String,
    #[serde(default)]
    processed_datetime: String,
    #[serde(default)]
    objects: String,
    #[serde(default)]
    motion: String,
    /// JSON 陣列字串
    #[serde(default)]
    segment_files: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Completed { processed_at: String },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRecord {
    pub filename: String,
    pub state: RecordState,
    pub object_count: usize,
    pub motion_count: usize,
    pub segment_files: Vec<String>,
}

impl ProcessingRecord {
    #[must_use]
    pub fn pending(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            state: RecordState::Pending,
            object_count: 0,
            motion_count: 0,
            segment_files: Vec::new(),
        }
    }

    /// 只有成功完成的檔案會被略過，失敗的檔案下次重試
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.state, RecordState::Completed { .. })
    }

    fn from_row(row: LogRow) -> Self {
        let state = if !row.processed_datetime.trim().is_empty() {
            RecordState::Completed {
                processed_at: row.processed_datetime,
            }
        } else if row.status.as_deref() == Some("failed") {
            RecordState::Failed
        } else {
            RecordState::Pending
        };

        let segment_files = if row.segment_files.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&row.segment_files).unwrap_or_else(|e| {
                warn!("無法解析 {} 的剪輯清單: {e}", row.filename);
                Vec::new()
            })
        };

        Self {
            filename: row.filename,
            state,
            object_count: row.objects.trim().parse().unwrap_or(0),
            motion_count: row.motion.trim().parse().unwrap_or(0),
            segment_files,
        }
    }

    fn to_row(&self) -> Result<LogRow> {
        let (processed_datetime, status) = match &self.state {
            RecordState::Pending => (String::new(), "pending"),
            RecordState::Completed { processed_at } => (processed_at.clone(), "completed"),
            RecordState::Failed => (String::new(), "failed"),
        };

        // 尚未處理的列所有結果欄位都留空
        let (objects, motion, segment_files) = if self.state == RecordState::Pending {
            (String::new(), String::new(), String::new())
        } else {
            (
                self.object_count.to_string(),
                self.motion_count.to_string(),
                serde_json::to_string(&self.segment_files).context("無法序列化剪輯清單")?,
            )
        };

        Ok(LogRow {
            filename: self.filename.clone(),
            processed_datetime,
            objects,
            motion,
            segment_files,
            status: Some(status.to_string()),
        })
    }
}

#[must_use]
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 每個子資料夾一份的處理紀錄
///
/// 每次更新都會重新讀取整份紀錄、修改後寫到暫存檔再以 rename 取代，
/// 只能由排程器的單一執行緒寫入。
#[derive(Debug, Clone)]
pub struct ProcessingLog {
    path: PathBuf,
}

impl ProcessingLog {
    #[must_use]
    pub fn new(folder: &Path) -> Self {
        Self {
            path: folder.join(PROCESSING_LOG_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<ProcessingRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("無法讀取處理紀錄: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<LogRow> = serde_json::from_str(&content)
            .with_context(|| format!("處理紀錄格式錯誤: {}", self.path.display()))?;
        Ok(rows.into_iter().map(ProcessingRecord::from_row).collect())
    }

    /// 新出現的檔案以空白紀錄加入
    pub fn register_files(&self, files: &[PathBuf]) -> Result<Vec<ProcessingRecord>> {
        let mut records = self.load()?;
        let known: HashSet<String> = records.iter().map(|r| r.filename.clone()).collect();

        let mut added = 0;
        for file in files {
            let name = file_name_of(file);
            if !known.contains(&name) {
                records.push(ProcessingRecord::pending(name));
                added += 1;
            }
        }

        if added > 0 {
            debug!("處理紀錄新增 {added} 個檔案");
            self.write_all(&records)?;
        }
        Ok(records)
    }

    #[must_use]
    pub fn is_done(records: &[ProcessingRecord], file: &Path) -> bool {
        let name = file_name_of(file);
        records.iter().any(|r| r.filename == name && r.is_done())
    }

    /// 登錄檔案並回傳尚未完成的部分（依檔名排序）
    pub fn pending_files(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let records = self.register_files(files)?;
        let mut pending: Vec<PathBuf> = files
            .iter()
            .filter(|file| !Self::is_done(&records, file))
            .cloned()
            .collect();
        pending.sort_by_key(|file| file_name_of(file));
        Ok(pending)
    }

    pub fn mark_completed(
        &self,
        file: &Path,
        clips: &[ExtractedClip],
        processed_at: String,
    ) -> Result<()> {
        let object_count = clips.iter().filter(|c| c.has_objects).count();
        let motion_count = clips.iter().filter(|c| c.has_motion).count();
        let segment_files = clips.iter().map(ExtractedClip::file_name).collect();

        self.update(file, |record| {
            record.state = RecordState::Completed { processed_at };
            record.object_count = object_count;
            record.motion_count = motion_count;
            record.segment_files = segment_files;
        })
    }

    pub fn mark_failed(&self, file: &Path) -> Result<()> {
        self.update(file, |record| {
            record.state = RecordState::Failed;
            record.object_count = 0;
            record.motion_count = 0;
            record.segment_files.clear();
        })
    }

    fn update(&self, file: &Path, apply: impl FnOnce(&mut ProcessingRecord)) -> Result<()> {
        let name = file_name_of(file);
        let mut records = self.load()?;

        let index = match records.iter().position(|r| r.filename == name) {
            Some(index) => index,
            None => {
                records.push(ProcessingRecord::pending(name));
                records.len() - 1
            }
        };
        apply(&mut records[index]);

        self.write_all(&records)
    }

    fn write_all(&self, records: &[ProcessingRecord]) -> Result<()> {
        let rows = records
            .iter()
            .map(ProcessingRecord::to_row)
            .collect::<Result<Vec<_>>>()?;
        let content = serde_json::to_string_pretty(&rows).context("無法序列化處理紀錄")?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("無法寫入暫存紀錄: {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("無法更新處理紀錄: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn clip(name: &str, has_objects: bool, has_motion: bool) -> ExtractedClip {
        ExtractedClip {
            output_path: PathBuf::from("/out").join(name),
            start_time: 0.0,
            end_time: 2.0,
            duration: 2.0,
            has_objects,
            has_motion,
        }
    }

    fn files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| dir.join(n)).collect()
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_register_appends_pending_rows() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());

        let records = log
            .register_files(&files(temp_dir.path(), &["b.mp4", "a.mp4"]))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.state == RecordState::Pending));
        assert!(log.path().exists());

        let content = fs::read_to_string(log.path()).unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
        for row in &rows {
            assert_eq!(row["processed_datetime"], "");
            assert_eq!(row["objects"], "");
            assert_eq!(row["motion"], "");
            assert_eq!(row["segment_files"], "");
            assert_eq!(row["status"], "pending");
        }

        // 重複登錄不會產生重複紀錄
        let again = log
            .register_files(&files(temp_dir.path(), &["a.mp4", "c.mp4"]))
            .unwrap();
        assert_eq!(again.len(), 3);
    }

    #[test]
    fn test_completed_excluded_failed_retried() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        let all = files(temp_dir.path(), &["c.mp4", "a.mp4", "b.mp4"]);

        log.register_files(&all).unwrap();
        log.mark_completed(&all[1], &[clip("a_seg001.mp4", false, true)], "2024-01-01 10:00:00".into())
            .unwrap();
        log.mark_failed(&all[2]).unwrap();

        let pending = log.pending_files(&all).unwrap();
        assert_eq!(pending, files(temp_dir.path(), &["b.mp4", "c.mp4"]));
    }

    #[test]
    fn test_completed_row_contents() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        let file = temp_dir.path().join("v.mp4");

        log.mark_completed(
            &file,
            &[
                clip("v_seg001.mp4", true, true),
                clip("v_seg002.mp4", false, true),
            ],
            "2024-05-06 07:08:09".into(),
        )
        .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
        assert_eq!(rows[0]["processed_datetime"], "2024-05-06 07:08:09");
        assert_eq!(rows[0]["objects"], "1");
        assert_eq!(rows[0]["motion"], "2");
        assert_eq!(rows[0]["segment_files"], r#"["v_seg001.mp4","v_seg002.mp4"]"#);
        assert_eq!(rows[0]["status"], "completed");

        let records = log.load().unwrap();
        assert_eq!(records[0].segment_files.len(), 2);
        assert!(records[0].is_done());
    }

    #[test]
    fn test_failure_clears_previous_results() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        let file = temp_dir.path().join("v.mp4");

        log.mark_completed(&file, &[clip("v_seg001.mp4", true, false)], now_timestamp())
            .unwrap();
        log.mark_failed(&file).unwrap();

        let record = &log.load().unwrap()[0];
        assert_eq!(record.state, RecordState::Failed);
        assert_eq!(record.object_count, 0);
        assert!(record.segment_files.is_empty());
        assert!(!temp_dir.path().join("processing_log.json.tmp").exists());
    }

    #[test]
    fn test_zero_clips_is_still_done() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        let file = temp_dir.path().join("static.mp4");

        log.mark_completed(&file, &[], now_timestamp()).unwrap();
        assert!(log.pending_files(&[file]).unwrap().is_empty());
    }

    #[test]
    fn test_rows_without_status_column() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProcessingLog::new(temp_dir.path());
        fs::write(
            log.path(),
            r#"[
                {"filename":"done.mp4","processed_datetime":"2024-01-01 00:00:00","objects":"0","motion":"1","segment_files":"[\"x.mp4\"]"},
                {"filename":"todo.mp4","processed_datetime":"","objects":"","motion":"","segment_files":""}
            ]"#,
        )
        .unwrap();

        let records = log.load().unwrap();
        assert!(records[0].is_done());
        assert_eq!(records[0].motion_count, 1);
        assert_eq!(records[1].state, RecordState::Pending);
    }
}
