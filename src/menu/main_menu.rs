use super::handlers::run_activity_clipper;
use crate::config::save::save_settings;
use crate::config::{Config, Language, ProcessingConfig, UserSettings};
use crate::signal::CancellationToken;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::fmt::Display;
use std::str::FromStr;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &CancellationToken,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_clipper"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_activity_clipper(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(2) => Ok(false),
        None => Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_processing"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_processing_settings_menu(term, config)?,
            Some(1) => show_language_menu(term, config)?,
            Some(2) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum ProcessingField {
    Confidence,
    BufferSeconds,
    MotionThreshold,
    MinObjectAreaRatio,
    SkipFrames,
    DetectionInterval,
    ResizeFactor,
    AdaptiveSkip,
    Debug,
    DetectorCommand,
    MaxWorkers,
}

const PROCESSING_FIELDS: [ProcessingField; 11] = [
    ProcessingField::Confidence,
    ProcessingField::BufferSeconds,
    ProcessingField::MotionThreshold,
    ProcessingField::MinObjectAreaRatio,
    ProcessingField::SkipFrames,
    ProcessingField::DetectionInterval,
    ProcessingField::ResizeFactor,
    ProcessingField::AdaptiveSkip,
    ProcessingField::Debug,
    ProcessingField::DetectorCommand,
    ProcessingField::MaxWorkers,
];

impl ProcessingField {
    fn label(self) -> String {
        match self {
            Self::Confidence => t!("settings.processing.confidence"),
            Self::BufferSeconds => t!("settings.processing.buffer_seconds"),
            Self::MotionThreshold => t!("settings.processing.motion_threshold"),
            Self::MinObjectAreaRatio => t!("settings.processing.min_object_area_ratio"),
            Self::SkipFrames => t!("settings.processing.skip_frames"),
            Self::DetectionInterval => t!("settings.processing.detection_interval"),
            Self::ResizeFactor => t!("settings.processing.resize_factor"),
            Self::AdaptiveSkip => t!("settings.processing.adaptive_skip"),
            Self::Debug => t!("settings.processing.debug"),
            Self::DetectorCommand => t!("settings.processing.detector_command"),
            Self::MaxWorkers => t!("settings.processing.max_workers"),
        }
        .to_string()
    }

    fn current_value(self, settings: &UserSettings) -> String {
        let p = &settings.processing;
        match self {
            Self::Confidence => p.confidence.to_string(),
            Self::BufferSeconds => p.buffer_seconds.to_string(),
            Self::MotionThreshold => p.motion_threshold.to_string(),
            Self::MinObjectAreaRatio => p.min_object_area_ratio.to_string(),
            Self::SkipFrames => p.skip_frames.to_string(),
            Self::DetectionInterval => p.detection_interval.to_string(),
            Self::ResizeFactor => p.resize_factor.to_string(),
            Self::AdaptiveSkip => p.adaptive_skip.to_string(),
            Self::Debug => p.debug.to_string(),
            Self::DetectorCommand => settings
                .detector
                .command
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            Self::MaxWorkers => settings
                .batch
                .max_workers
                .map_or_else(|| "auto".to_string(), |n| n.to_string()),
        }
    }

    /// 回傳修改後的設定；ESC 或輸入無效時回傳 `None`
    fn edit(self, settings: &UserSettings) -> Result<Option<UserSettings>> {
        let mut updated = settings.clone();
        let p = &mut updated.processing;

        match self {
            Self::Confidence => {
                if let Some(v) = prompt_value(self, p.confidence)? {
                    p.confidence = v;
                }
            }
            Self::BufferSeconds => {
                if let Some(v) = prompt_value(self, p.buffer_seconds)? {
                    p.buffer_seconds = v;
                }
            }
            Self::MotionThreshold => {
                if let Some(v) = prompt_value(self, p.motion_threshold)? {
                    p.motion_threshold = v;
                }
            }
            Self::MinObjectAreaRatio => {
                if let Some(v) = prompt_value(self, p.min_object_area_ratio)? {
                    p.min_object_area_ratio = v;
                }
            }
            Self::SkipFrames => {
                if let Some(v) = prompt_value(self, p.skip_frames)? {
                    p.skip_frames = v;
                }
            }
            Self::DetectionInterval => {
                if let Some(v) = prompt_value(self, p.detection_interval)? {
                    p.detection_interval = v;
                }
            }
            Self::ResizeFactor => {
                if let Some(v) = prompt_value(self, p.resize_factor)? {
                    p.resize_factor = v;
                }
            }
            Self::AdaptiveSkip => p.adaptive_skip = !p.adaptive_skip,
            Self::Debug => p.debug = !p.debug,
            Self::DetectorCommand => {
                let current = updated.detector.command.clone().unwrap_or_default();
                let value: String = Input::new()
                    .with_prompt(t!("settings.processing.detector_command_prompt"))
                    .default(current)
                    .allow_empty(true)
                    .interact_text()?;
                let value = value.trim();
                updated.detector.command = (!value.is_empty()).then(|| value.to_string());
            }
            Self::MaxWorkers => {
                let current = updated.batch.max_workers.unwrap_or(0);
                let Some(value) = prompt_value::<usize>(self, current)? else {
                    return Ok(None);
                };
                updated.batch.max_workers = (value > 0).then_some(value);
            }
        }

        if let Err(e) = ProcessingConfig::try_from(&updated.processing) {
            println!("{} {e:#}", style(t!("settings.invalid")).red());
            std::thread::sleep(std::time::Duration::from_secs(2));
            return Ok(None);
        }

        Ok((updated != *settings).then_some(updated))
    }
}

fn prompt_value<T>(field: ProcessingField, current: T) -> Result<Option<T>>
where
    T: FromStr + Display,
{
    let raw: String = Input::new()
        .with_prompt(field.label())
        .default(current.to_string())
        .interact_text()?;

    match raw.trim().parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            println!("{}", style(t!("settings.invalid")).red());
            std::thread::sleep(std::time::Duration::from_secs(1));
            Ok(None)
        }
    }
}

/// 分析參數設定選單
fn show_processing_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.processing.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let items: Vec<String> = PROCESSING_FIELDS
            .iter()
            .map(|field| format!("{}: {}", field.label(), field.current_value(&config.settings)))
            .collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.processing.prompt"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;

        let Some(selection) = selection else {
            return Ok(());
        };

        let field = PROCESSING_FIELDS[selection];
        if let Some(updated) = field.edit(&config.settings)? {
            config.settings = updated;
            save_settings(&config.settings)?;
            println!(
                "\n{} {}",
                style(t!("settings.saved")).green(),
                field.current_value(&config.settings)
            );
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];

    let items: Vec<String> = languages.iter().map(ToString::to_string).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
