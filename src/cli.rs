//! 命令列參數
//!
//! 不帶子命令時進入互動選單；`run` 子命令直接處理一個子資料夾，適合排程或無人值守執行。

use crate::component::activity_clipper::{
    DEFAULT_OUTPUT_DIR, clip_output_dir, print_summary, run_batch,
};
use crate::config::{Config, UserSettings};
use crate::signal::CancellationToken;
use crate::tools::{list_subfolders, validate_directory_exists};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use console::style;
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extract activity clips from surveillance footage",
    long_about = "Without a subcommand an interactive menu is shown."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one subfolder of videos without the interactive menu
    Run(RunArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Base directory containing subfolders with videos
    #[arg(long = "base-dir", alias = "base_dir", value_name = "BASE_DIR")]
    pub base_dir: PathBuf,

    /// Root directory for clips (defaults to BASE_DIR/clips)
    #[arg(long = "output-dir", alias = "output_dir", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Subfolder to process; when omitted the available subfolders are listed
    #[arg(long, value_name = "NAME")]
    pub subfolder: Option<String>,

    /// Detector sidecar command (overrides settings.json)
    #[arg(long, value_name = "COMMAND")]
    pub detector: Option<String>,

    /// Model passed to the detector sidecar
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Confidence threshold for detections
    #[arg(long, value_name = "FLOAT")]
    pub confidence: Option<f32>,

    /// Maximum number of worker threads (default: auto)
    #[arg(long = "max-workers", alias = "max_workers", value_name = "N")]
    pub max_workers: Option<usize>,
}

impl RunArgs {
    /// 命令列參數覆寫設定檔中的值，不寫回設定檔
    pub fn apply_to(&self, settings: &mut UserSettings) {
        if let Some(command) = &self.detector {
            settings.detector.command = Some(command.clone());
        }
        if let Some(model) = &self.model {
            settings.detector.model.clone_from(model);
        }
        if let Some(confidence) = self.confidence {
            settings.processing.confidence = confidence;
        }
        if let Some(workers) = self.max_workers {
            settings.batch.max_workers = (workers > 0).then_some(workers);
        }
    }

    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_OUTPUT_DIR))
    }

    /// 找出要處理的子資料夾；未指定時回傳 `None`
    pub fn resolve_subfolder(&self) -> Result<Option<PathBuf>> {
        validate_directory_exists(&self.base_dir)?;

        let Some(name) = &self.subfolder else {
            return Ok(None);
        };

        let path = self.base_dir.join(name);
        if !path.is_dir() {
            bail!("找不到子資料夾: {}", path.display());
        }
        Ok(Some(path))
    }
}

/// 無人值守模式：處理指定子資料夾，或列出可用的子資料夾
pub fn run_unattended(
    args: &RunArgs,
    config: &Config,
    shutdown_signal: &CancellationToken,
) -> Result<()> {
    let Some(subfolder) = args.resolve_subfolder()? else {
        let subfolders = list_subfolders(&args.base_dir)?;
        if subfolders.is_empty() {
            error!("{} 底下沒有任何子資料夾", args.base_dir.display());
            bail!("{} 底下沒有任何子資料夾", args.base_dir.display());
        }

        println!("{}", style("可處理的子資料夾:").cyan().bold());
        for (i, folder) in subfolders.iter().enumerate() {
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            println!("  {}. {name}", i + 1);
        }
        println!("{}", style("請以 --subfolder 指定要處理的子資料夾").dim());
        return Ok(());
    };

    let mut settings = config.settings.clone();
    args.apply_to(&mut settings);

    let output_dir = clip_output_dir(&args.output_root(), &subfolder);
    info!(
        "無人值守處理: {} -> {}",
        subfolder.display(),
        output_dir.display()
    );

    if let Some(run) = run_batch(&settings, &subfolder, &output_dir, shutdown_signal)? {
        print_summary(&run);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_config() -> Config {
        Config {
            settings: UserSettings::default(),
        }
    }

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Run(run)) => run,
            None => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["activity_clipper"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_requires_base_dir() {
        assert!(Cli::try_parse_from(["activity_clipper", "run"]).is_err());
    }

    #[test]
    fn test_underscore_aliases() {
        let args = parse(&[
            "activity_clipper",
            "run",
            "--base_dir",
            "/data/Input",
            "--output_dir",
            "/data/Output",
            "--max_workers",
            "3",
        ]);
        assert_eq!(args.base_dir, PathBuf::from("/data/Input"));
        assert_eq!(args.output_root(), PathBuf::from("/data/Output"));
        assert_eq!(args.max_workers, Some(3));
    }

    #[test]
    fn test_overrides_apply_only_given_values() {
        let args = parse(&[
            "activity_clipper",
            "run",
            "--base-dir",
            "/in",
            "--model",
            "yolo11s.pt",
            "--confidence",
            "0.5",
            "--max-workers",
            "0",
        ]);
        let mut settings = UserSettings::default();
        settings.batch.max_workers = Some(4);
        settings.detector.command = Some("detector".to_string());

        args.apply_to(&mut settings);

        assert_eq!(settings.detector.model, "yolo11s.pt");
        assert_eq!(settings.detector.command.as_deref(), Some("detector"));
        assert!((settings.processing.confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.batch.max_workers, None);
    }

    #[test]
    fn test_default_output_root() {
        let args = parse(&["activity_clipper", "run", "--base-dir", "/in"]);
        assert_eq!(args.output_root(), PathBuf::from("/in").join(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_resolve_subfolder() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("cam_front")).unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let listed = parse(&["activity_clipper", "run", "--base-dir", base]);
        assert_eq!(listed.resolve_subfolder().unwrap(), None);

        let found = parse(&[
            "activity_clipper",
            "run",
            "--base-dir",
            base,
            "--subfolder",
            "cam_front",
        ]);
        assert_eq!(
            found.resolve_subfolder().unwrap(),
            Some(temp_dir.path().join("cam_front"))
        );

        let missing = parse(&[
            "activity_clipper",
            "run",
            "--base-dir",
            base,
            "--subfolder",
            "cam_back",
        ]);
        assert!(missing.resolve_subfolder().is_err());
    }

    #[test]
    fn test_listing_without_subfolder_runs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("cam_front")).unwrap();
        let args = parse(&[
            "activity_clipper",
            "run",
            "--base-dir",
            temp_dir.path().to_str().unwrap(),
        ]);

        run_unattended(&args, &default_config(), &CancellationToken::new()).unwrap();
        assert!(!temp_dir.path().join(DEFAULT_OUTPUT_DIR).exists());
    }

    #[test]
    fn test_empty_base_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let args = parse(&[
            "activity_clipper",
            "run",
            "--base-dir",
            temp_dir.path().to_str().unwrap(),
        ]);
        assert!(run_unattended(&args, &default_config(), &CancellationToken::new()).is_err());
    }
}
