use super::frame::Frame;
use crate::config::ProcessingConfig;
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// 偵測框（畫面像素座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    #[must_use]
    pub fn area(&self) -> f64 {
        let width = f64::from(self.x2 - self.x1).max(0.0);
        let height = f64::from(self.y2 - self.y1).max(0.0);
        width * height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: i32,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// 物件偵測模型（外部協作者）
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;

    /// 是否能同時處理多個推論請求；預設為否，呼叫端需自行序列化
    fn supports_concurrent_inference(&self) -> bool {
        false
    }

    /// 有硬體加速時排程器可開較多工作執行緒
    fn uses_hardware_acceleration(&self) -> bool {
        false
    }

    /// 記憶體壓力過高時釋放快取
    fn release_cached_memory(&self) {}
}

/// 未設定偵測模型時使用，只依靠動態偵測
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

impl ObjectDetector for NoopDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }

    fn supports_concurrent_inference(&self) -> bool {
        true
    }
}

/// 在多個工作執行緒之間共用的偵測器
///
/// 偵測器未宣告支援並行推論時，所有呼叫都會經過同一把鎖。
#[derive(Clone)]
pub struct SharedDetector {
    inner: Arc<dyn ObjectDetector>,
    gate: Option<Arc<Mutex<()>>>,
}

impl SharedDetector {
    pub fn new(detector: Arc<dyn ObjectDetector>) -> Self {
        let gate = (!detector.supports_concurrent_inference()).then(|| Arc::new(Mutex::new(())));
        Self {
            inner: detector,
            gate,
        }
    }

    pub fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        match &self.gate {
            Some(gate) => {
                // 鎖內沒有資料，某支影片推論時 panic 不影響之後的影片
                let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);
                self.inner.detect(frame)
            }
            None => self.inner.detect(frame),
        }
    }

    #[must_use]
    pub fn uses_hardware_acceleration(&self) -> bool {
        self.inner.uses_hardware_acceleration()
    }

    pub fn release_cached_memory(&self) {
        self.inner.release_cached_memory();
    }
}

/// 信心值、類別與面積過濾條件
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    confidence: f32,
    min_area_ratio: f64,
    target_classes: Option<HashSet<i32>>,
}

impl DetectionFilter {
    #[must_use]
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            confidence: config.confidence(),
            min_area_ratio: config.min_object_area_ratio(),
            target_classes: config.target_classes().cloned(),
        }
    }

    #[must_use]
    pub fn accepts(&self, detection: &Detection, frame_area: f64) -> bool {
        if let Some(classes) = &self.target_classes
            && !classes.contains(&detection.class_id)
        {
            return false;
        }

        detection.confidence >= self.confidence
            && detection.bbox.area() >= self.min_area_ratio * frame_area
    }
}

/// 將偵測結果轉為逐幀的「有物件」訊號
pub struct DetectionAdapter<'a> {
    detector: &'a SharedDetector,
    filter: DetectionFilter,
    frames_with_objects: usize,
    debug: bool,
}

impl<'a> DetectionAdapter<'a> {
    #[must_use]
    pub fn new(detector: &'a SharedDetector, config: &ProcessingConfig) -> Self {
        Self {
            detector,
            filter: DetectionFilter::new(config),
            frames_with_objects: 0,
            debug: config.debug(),
        }
    }

    /// 回傳此影格是否有至少一個通過過濾的物件
    pub fn observe(&mut self, frame_index: u64, frame: &Frame) -> Result<bool> {
        let detections = self.detector.detect(frame)?;
        let frame_area = frame.area();
        let accepted = detections
            .iter()
            .filter(|d| self.filter.accepts(d, frame_area))
            .count();

        if self.debug {
            debug!(
                "影格 {frame_index}: 偵測 {} 個物件，通過過濾 {accepted} 個",
                detections.len()
            );
        }

        if accepted > 0 {
            self.frames_with_objects += 1;
        }
        Ok(accepted > 0)
    }

    /// 有物件的影格數（不是物件總數）
    #[must_use]
    pub const fn detection_count(&self) -> usize {
        self.frames_with_objects
    }
}
