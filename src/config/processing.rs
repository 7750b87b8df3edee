use crate::config::types::ProcessingSettings;
use anyhow::{Result, bail};
use std::collections::HashSet;

/// 分析區域（縮放後畫面座標，右下角不含）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// 已驗證的影片分析設定
///
/// 只能透過 `TryFrom<&ProcessingSettings>` 建立，建立後不可變更，
/// 可安全地在多個工作執行緒之間共用。
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    confidence: f32,
    buffer_seconds: f64,
    min_object_area_ratio: f64,
    target_classes: Option<HashSet<i32>>,
    roi: Option<Roi>,
    motion_threshold: f64,
    skip_frames: u32,
    resize_factor: f64,
    adaptive_skip: bool,
    detection_interval: u32,
    output_extension: String,
    debug: bool,
}

impl TryFrom<&ProcessingSettings> for ProcessingConfig {
    type Error = anyhow::Error;

    fn try_from(settings: &ProcessingSettings) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.confidence) {
            bail!("confidence 必須介於 0 與 1 之間: {}", settings.confidence);
        }
        if !settings.buffer_seconds.is_finite() || settings.buffer_seconds < 0.0 {
            bail!("buffer_seconds 不可為負數: {}", settings.buffer_seconds);
        }
        if !(0.0..=1.0).contains(&settings.min_object_area_ratio) {
            bail!(
                "min_object_area_ratio 必須介於 0 與 1 之間: {}",
                settings.min_object_area_ratio
            );
        }
        if !settings.motion_threshold.is_finite() || settings.motion_threshold < 0.0 {
            bail!("motion_threshold 不可為負數: {}", settings.motion_threshold);
        }
        if settings.skip_frames < 1 {
            bail!("skip_frames 至少為 1");
        }
        if !(settings.resize_factor > 0.0 && settings.resize_factor <= 1.0) {
            bail!(
                "resize_factor 必須介於 0（不含）與 1 之間: {}",
                settings.resize_factor
            );
        }
        if settings.detection_interval < 1 {
            bail!("detection_interval 至少為 1");
        }

        let roi = match settings.roi_coords {
            Some([x1, y1, x2, y2]) => {
                if x1 >= x2 || y1 >= y2 {
                    bail!("roi_coords 範圍無效: [{x1}, {y1}, {x2}, {y2}]");
                }
                Some(Roi { x1, y1, x2, y2 })
            }
            None => None,
        };

        let output_extension = settings.output_extension.trim().trim_start_matches('.');
        if output_extension.is_empty() {
            bail!("output_extension 不可為空");
        }

        Ok(Self {
            confidence: settings.confidence,
            buffer_seconds: settings.buffer_seconds,
            min_object_area_ratio: settings.min_object_area_ratio,
            target_classes: settings
                .target_classes
                .as_ref()
                .map(|classes| classes.iter().copied().collect()),
            roi,
            motion_threshold: settings.motion_threshold,
            skip_frames: settings.skip_frames,
            resize_factor: settings.resize_factor,
            adaptive_skip: settings.adaptive_skip,
            detection_interval: settings.detection_interval,
            output_extension: output_extension.to_string(),
            debug: settings.debug,
        })
    }
}

impl ProcessingConfig {
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.confidence
    }

    #[must_use]
    pub const fn buffer_seconds(&self) -> f64 {
        self.buffer_seconds
    }

    #[must_use]
    pub const fn min_object_area_ratio(&self) -> f64 {
        self.min_object_area_ratio
    }

    #[must_use]
    pub const fn target_classes(&self) -> Option<&HashSet<i32>> {
        self.target_classes.as_ref()
    }

    #[must_use]
    pub const fn roi(&self) -> Option<Roi> {
        self.roi
    }

    #[must_use]
    pub const fn motion_threshold(&self) -> f64 {
        self.motion_threshold
    }

    #[must_use]
    pub const fn skip_frames(&self) -> u32 {
        self.skip_frames
    }

    #[must_use]
    pub const fn resize_factor(&self) -> f64 {
        self.resize_factor
    }

    #[must_use]
    pub const fn adaptive_skip(&self) -> bool {
        self.adaptive_skip
    }

    #[must_use]
    pub const fn detection_interval(&self) -> u32 {
        self.detection_interval
    }

    #[must_use]
    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }
}
