use super::batch_scheduler::{BatchOptions, BatchRun, BatchScheduler};
use super::detector_process::CommandDetector;
use super::media::FfmpegBackend;
use super::object_detector::{NoopDetector, ObjectDetector, SharedDetector};
use super::progress::ConsoleProgress;
use crate::config::save::{add_recent_path, save_settings};
use crate::config::{Config, DetectorSettings, ProcessingConfig, UserSettings};
use crate::signal::CancellationToken;
use crate::tools::{list_subfolders, scan_video_files, validate_directory_exists};
use anyhow::{Context, Result};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 預設輸出資料夾名稱（位於來源資料夾底下）
pub const DEFAULT_OUTPUT_DIR: &str = "clips";

/// 活動片段擷取元件
pub struct ActivityClipper {
    config: Config,
    shutdown_signal: CancellationToken,
}

impl ActivityClipper {
    #[must_use]
    pub const fn new(config: Config, shutdown_signal: CancellationToken) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 活動片段擷取 ===").cyan().bold());

        let Some(base_path) = self.prompt_base_path()? else {
            return Ok(()); // ESC pressed
        };
        let base_dir = PathBuf::from(&base_path);
        validate_directory_exists(&base_dir)?;

        {
            let mut settings = self.config.settings.clone();
            add_recent_path(&mut settings, &base_path);
            if let Err(e) = save_settings(&settings) {
                warn!("無法儲存路徑歷史: {e}");
            }
        }

        let Some(subfolder) = self.prompt_subfolder(&base_dir)? else {
            return Ok(());
        };
        let output_base = self.prompt_output_path(&base_dir)?;
        let output_dir = clip_output_dir(&output_base, &subfolder);

        if let Some(run) = run_batch(
            &self.config.settings,
            &subfolder,
            &output_dir,
            &self.shutdown_signal,
        )? {
            print_summary(&run);
        }
        Ok(())
    }

    fn prompt_base_path(&self) -> Result<Option<String>> {
        let recent_paths = &self.config.settings.recent_paths;

        if recent_paths.is_empty() {
            let path: String = Input::new()
                .with_prompt("請輸入影片根目錄路徑")
                .interact_text()?;
            return Ok(Some(path.trim().to_string()));
        }

        let mut options: Vec<String> = recent_paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let indicator = if Path::new(p).exists() { "✓" } else { "✗" };
                format!("{} [{}] {}", i + 1, indicator, p)
            })
            .collect();
        options.push("輸入新路徑...".to_string());

        println!("{}", style("(按 ESC 返回主選單)").dim());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇影片根目錄")
            .items(&options)
            .default(0)
            .interact_opt()?;

        match selection {
            None => Ok(None),
            Some(idx) if idx < recent_paths.len() => Ok(Some(recent_paths[idx].clone())),
            Some(_) => {
                let path: String = Input::new()
                    .with_prompt("請輸入影片根目錄路徑")
                    .interact_text()?;
                Ok(Some(path.trim().to_string()))
            }
        }
    }

    fn prompt_subfolder(&self, base_dir: &Path) -> Result<Option<PathBuf>> {
        let subfolders = list_subfolders(base_dir)?;

        if subfolders.is_empty() {
            println!("{}", style("根目錄下沒有任何子資料夾").yellow());
            return Ok(None);
        }

        let items: Vec<String> = subfolders
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
            .collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇要處理的子資料夾")
            .items(&items)
            .default(0)
            .interact_opt()?;

        Ok(selection.map(|idx| subfolders[idx].clone()))
    }

    fn prompt_output_path(&self, base_dir: &Path) -> Result<PathBuf> {
        let default = base_dir.join(DEFAULT_OUTPUT_DIR);
        let path: String = Input::new()
            .with_prompt("請輸入剪輯輸出根目錄")
            .default(default.to_string_lossy().to_string())
            .interact_text()?;
        Ok(PathBuf::from(path.trim()))
    }
}

/// 建立物件偵測器；有設定偵測程序但無法啟動時視為致命錯誤
pub fn build_detector(settings: &DetectorSettings) -> Result<Arc<dyn ObjectDetector>> {
    match settings.command {
        Some(_) => {
            let detector = CommandDetector::spawn(settings).context("無法初始化物件偵測模型")?;
            Ok(Arc::new(detector))
        }
        None => {
            info!("未設定偵測程序，只使用動態偵測");
            Ok(Arc::new(NoopDetector))
        }
    }
}

/// 剪輯輸出到 `{output_root}/{子資料夾名稱}`
#[must_use]
pub fn clip_output_dir(output_root: &Path, subfolder: &Path) -> PathBuf {
    match subfolder.file_name() {
        Some(name) => output_root.join(name),
        None => output_root.to_path_buf(),
    }
}

/// 對一個子資料夾執行批次，資料夾內沒有影片時回傳 `None`
///
/// 互動選單與命令列模式共用此流程。偵測程序無法啟動時直接回傳錯誤。
pub fn run_batch(
    settings: &UserSettings,
    subfolder: &Path,
    output_dir: &Path,
    shutdown_signal: &CancellationToken,
) -> Result<Option<BatchRun>> {
    println!("{}", style("掃描影片檔案中...").dim());
    let video_files = scan_video_files(subfolder, &settings.batch.video_extensions)?;

    if video_files.is_empty() {
        println!("{}", style("找不到任何影片檔案").yellow());
        return Ok(None);
    }

    println!(
        "{}",
        style(format!("找到 {} 個影片檔案", video_files.len())).green()
    );

    let processing =
        ProcessingConfig::try_from(&settings.processing).context("分析參數設定錯誤")?;

    println!("{}", style("初始化物件偵測模型...").dim());
    let detector = SharedDetector::new(build_detector(&settings.detector)?);
    let options =
        BatchOptions::from_settings(&settings.batch, detector.uses_hardware_acceleration());

    println!(
        "{}",
        style(format!(
            "開始處理，輸出到 {}（{} 個工作執行緒）",
            output_dir.display(),
            options.workers
        ))
        .cyan()
    );

    shutdown_signal.reset();
    let backend = FfmpegBackend;
    let progress = ConsoleProgress::new(video_files.len());
    let scheduler = BatchScheduler::new(
        &processing,
        &backend,
        &detector,
        &progress,
        shutdown_signal.clone(),
        options,
    );

    let run = scheduler.run(subfolder, &video_files, output_dir);
    progress.finish();
    run.map(Some)
}

/// 印出批次結果摘要
pub fn print_summary(run: &BatchRun) {
    println!();
    println!("{}", style("=== 處理結果 ===").cyan().bold());
    println!("  影片總數: {}", run.total_files);
    println!("  已處理過（略過）: {}", style(run.skipped_count).dim());
    println!("  完成: {}", style(run.completed_count).green());
    println!("  輸出剪輯: {}", style(run.clips.len()).green());

    if run.errors.is_empty() {
        println!("  失敗: 0");
    } else {
        println!("  失敗: {}", style(run.errors.len()).red());
        for (name, message) in &run.errors {
            println!("    {} {}: {}", style("✗").red(), name, message);
        }
    }

    if run.cancelled {
        println!(
            "{}",
            style("處理已中斷，未處理的影片會在下次執行時繼續").yellow()
        );
    }

    info!(
        "活動片段擷取結束: 完成 {}，剪輯 {}，失敗 {}，中斷: {}",
        run.completed_count,
        run.clips.len(),
        run.errors.len(),
        run.cancelled
    );
}
