use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_RECENT_PATHS: usize = 10;

/// 介面語言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 影片分析參數（原始設定值，尚未驗證）
///
/// 驗證後轉換為 [`crate::config::ProcessingConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    pub confidence: f32,
    pub buffer_seconds: f64,
    pub min_object_area_ratio: f64,
    /// `None` 表示不過濾類別
    pub target_classes: Option<Vec<i32>>,
    /// `[x1, y1, x2, y2]`，座標以縮放後的畫面為準
    pub roi_coords: Option<[u32; 4]>,
    pub motion_threshold: f64,
    pub skip_frames: u32,
    pub resize_factor: f64,
    pub adaptive_skip: bool,
    /// 物件偵測間隔（以取樣間隔的倍數計）
    pub detection_interval: u32,
    pub output_extension: String,
    pub debug: bool,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            confidence: 0.35,
            buffer_seconds: 5.0,
            min_object_area_ratio: 0.002,
            target_classes: Some(vec![0, 1, 2, 3, 5, 7]),
            roi_coords: None,
            motion_threshold: 0.015,
            skip_frames: 15,
            resize_factor: 0.5,
            adaptive_skip: true,
            detection_interval: 3,
            output_extension: "mp4".to_string(),
            debug: false,
        }
    }
}

/// 外部物件偵測程序設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// 偵測程序指令，`None` 時只使用動態偵測
    pub command: Option<String>,
    pub args: Vec<String>,
    pub model: String,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            model: "yolo11n.pt".to_string(),
        }
    }
}

/// 批次排程設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// `None` 時依 CPU 數量自動決定
    pub max_workers: Option<usize>,
    pub memory_limit_percent: f32,
    pub memory_check_interval_secs: u64,
    pub video_extensions: Vec<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_workers: None,
            memory_limit_percent: 85.0,
            memory_check_interval_secs: 5,
            video_extensions: vec!["mp4".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub recent_paths: Vec<String>,
    pub processing: ProcessingSettings,
    pub detector: DetectorSettings,
    pub batch: BatchSettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: UserSettings,
}
