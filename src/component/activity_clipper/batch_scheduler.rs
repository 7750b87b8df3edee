use super::clip_extractor::ExtractedClip;
use super::media::MediaBackend;
use super::object_detector::SharedDetector;
use super::processing_log::{ProcessingLog, now_timestamp};
use super::progress::{BatchProgress, FileStatus, ProgressObserver};
use super::video_analyzer::{IN_VIDEO_MEMORY_LIMIT_PERCENT, VideoProcessor};
use crate::config::{BatchSettings, ProcessingConfig};
use crate::signal::CancellationToken;
use crate::tools::{MemoryMonitor, ensure_directory_exists};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// 等待完成訊息的間隔，同時決定記憶體檢查的最小粒度
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 一個子資料夾的批次結果
#[derive(Debug, Default)]
pub struct BatchRun {
    pub total_files: usize,
    pub skipped_count: usize,
    pub completed_count: usize,
    pub clips: Vec<ExtractedClip>,
    /// (檔名, 錯誤訊息)
    pub errors: Vec<(String, String)>,
    pub cancelled: bool,
}

impl BatchRun {
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.completed_count + self.errors.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    pub workers: usize,
    pub memory_limit_percent: f32,
    pub memory_check_interval: Duration,
}

impl BatchOptions {
    #[must_use]
    pub fn from_settings(settings: &BatchSettings, accelerated: bool) -> Self {
        let available = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            workers: resolve_worker_count(settings.max_workers, available, accelerated),
            memory_limit_percent: settings.memory_limit_percent,
            memory_check_interval: Duration::from_secs(settings.memory_check_interval_secs.max(1)),
        }
    }
}

/// 未指定時取 CPU 數的一半：一般限制在 1-4，有硬體加速時限制在 2-6
#[must_use]
pub fn resolve_worker_count(requested: Option<usize>, available: usize, accelerated: bool) -> usize {
    if let Some(requested) = requested {
        return requested.max(1);
    }

    let half = available / 2;
    if accelerated {
        half.clamp(2, 6)
    } else {
        half.clamp(1, 4)
    }
}

struct TaskOutcome {
    path: PathBuf,
    name: String,
    result: Result<Vec<ExtractedClip>, String>,
}

/// 多支影片的批次排程
///
/// 工作執行緒只負責分析與剪輯，處理紀錄與統計只在呼叫 `run` 的執行緒更新。
pub struct BatchScheduler<'a> {
    config: &'a ProcessingConfig,
    backend: &'a dyn MediaBackend,
    detector: &'a SharedDetector,
    observer: &'a dyn ProgressObserver,
    shutdown_signal: CancellationToken,
    options: BatchOptions,
    memory_monitor: MemoryMonitor,
}

impl<'a> BatchScheduler<'a> {
    #[must_use]
    pub fn new(
        config: &'a ProcessingConfig,
        backend: &'a dyn MediaBackend,
        detector: &'a SharedDetector,
        observer: &'a dyn ProgressObserver,
        shutdown_signal: CancellationToken,
        options: BatchOptions,
    ) -> Self {
        Self {
            config,
            backend,
            detector,
            observer,
            shutdown_signal,
            memory_monitor: MemoryMonitor::new(options.memory_limit_percent),
            options,
        }
    }

    /// 處理 `input_dir` 中的影片，剪輯輸出到 `output_dir`
    pub fn run(&self, input_dir: &Path, files: &[PathBuf], output_dir: &Path) -> Result<BatchRun> {
        let log = ProcessingLog::new(input_dir);
        let pending = log.pending_files(files)?;

        let mut run = BatchRun {
            total_files: files.len(),
            skipped_count: files.len() - pending.len(),
            ..Default::default()
        };

        for file in files.iter().filter(|f| !pending.contains(f)) {
            let name = file_name_of(file);
            info!("已處理過，略過: {name}");
            self.observer.on_file_status_change(&name, FileStatus::Skipped);
        }

        if pending.is_empty() {
            info!("{} 沒有需要處理的影片", input_dir.display());
            return Ok(run);
        }

        ensure_directory_exists(output_dir)?;

        if self.shutdown_signal.is_cancelled() {
            warn!("批次開始前已收到中斷信號，不處理任何影片");
            run.cancelled = true;
            return Ok(run);
        }

        let workers = self.options.workers.max(1);
        info!(
            "開始批次處理 {}: {} 支影片待處理（略過 {}），{} 個工作執行緒",
            input_dir.display(),
            pending.len(),
            run.skipped_count,
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("clipper-worker-{i}"))
            .build()
            .context("無法建立工作執行緒池")?;

        let started = Instant::now();
        self.observer.on_batch_progress(BatchProgress {
            completed: 0,
            total: pending.len(),
            eta: None,
        });

        pool.in_place_scope(|scope| {
            let (tx, rx) = mpsc::channel::<TaskOutcome>();
            let mut queue = pending.iter();
            let mut in_flight = 0usize;

            let submit = |path: &PathBuf| {
                let tx = tx.clone();
                let path = path.clone();
                scope.spawn(move |_| {
                    let outcome = self.process_file(&path, output_dir);
                    let _ = tx.send(outcome);
                });
            };

            for path in queue.by_ref().take(workers) {
                submit(path);
                in_flight += 1;
            }

            let mut last_memory_check = Instant::now();
            while in_flight > 0 {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(outcome) => {
                        in_flight -= 1;
                        self.record_outcome(&log, outcome, &mut run);

                        let finished = run.finished_count();
                        self.observer.on_batch_progress(BatchProgress {
                            completed: finished,
                            total: pending.len(),
                            eta: estimate_eta(started.elapsed(), finished, pending.len()),
                        });

                        if !self.shutdown_signal.is_cancelled()
                            && let Some(path) = queue.next()
                        {
                            submit(path);
                            in_flight += 1;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                if last_memory_check.elapsed() >= self.options.memory_check_interval {
                    last_memory_check = Instant::now();
                    self.check_memory();
                }
            }
        });

        run.cancelled = self.shutdown_signal.is_cancelled() && run.finished_count() < pending.len();
        if run.cancelled {
            warn!(
                "批次已中斷: 完成 {} / {} 支影片",
                run.finished_count(),
                pending.len()
            );
        }

        info!(
            "批次處理結束: 完成 {} 支影片，輸出 {} 個剪輯，失敗 {} 支",
            run.completed_count,
            run.clips.len(),
            run.errors.len()
        );
        for (name, message) in &run.errors {
            warn!("  {name}: {message}");
        }

        Ok(run)
    }

    fn process_file(&self, path: &Path, output_dir: &Path) -> TaskOutcome {
        let name = file_name_of(path);
        self.observer
            .on_file_status_change(&name, FileStatus::Processing);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let processor = VideoProcessor::new(self.config, self.backend, self.detector)
                .with_memory_monitor(&self.memory_monitor, IN_VIDEO_MEMORY_LIMIT_PERCENT);
            processor.process(path, output_dir, &mut |update| {
                self.observer.on_progress(&name, update);
            })
        }));

        let result = match result {
            Ok(Ok(clips)) => Ok(clips),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(payload) => Err(format!("處理時發生 panic: {}", panic_message(payload.as_ref()))),
        };

        TaskOutcome {
            path: path.to_path_buf(),
            name,
            result,
        }
    }

    fn record_outcome(&self, log: &ProcessingLog, outcome: TaskOutcome, run: &mut BatchRun) {
        let TaskOutcome { path, name, result } = outcome;

        match result {
            Ok(clips) => {
                if let Err(e) = log.mark_completed(&path, &clips, now_timestamp()) {
                    error!("無法更新處理紀錄 {name}: {e:#}");
                }
                info!("完成 {name}: {} 個剪輯", clips.len());
                self.observer
                    .on_file_status_change(&name, FileStatus::Completed);
                run.completed_count += 1;
                run.clips.extend(clips);
            }
            Err(message) => {
                error!("處理 {name} 失敗: {message}");
                if let Err(e) = log.mark_failed(&path) {
                    error!("無法更新處理紀錄 {name}: {e:#}");
                }
                self.observer.on_file_status_change(&name, FileStatus::Failed);
                run.errors.push((name, message));
            }
        }
    }

    fn check_memory(&self) {
        let usage = self.memory_monitor.current_usage();
        if usage > self.memory_monitor.usage_threshold() {
            warn!(
                "記憶體使用率 {usage:.1}% 超過 {:.1}%，要求釋放快取",
                self.memory_monitor.usage_threshold()
            );
            self.detector.release_cached_memory();
        }
    }
}

fn estimate_eta(elapsed: Duration, finished: usize, total: usize) -> Option<Duration> {
    if finished == 0 {
        return None;
    }
    let remaining = total.saturating_sub(finished) as u32;
    Some(elapsed / finished as u32 * remaining)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知錯誤".to_string()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
