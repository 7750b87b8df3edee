/// 以 30fps 為基準調整取樣間隔
const REFERENCE_FPS: f64 = 30.0;

/// 決定哪些影格需要分析
///
/// 取樣間隔在建立時依 fps 計算一次，整支影片固定不變。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSampler {
    stride: u64,
    detection_stride: u64,
}

impl FrameSampler {
    #[must_use]
    pub fn new(skip_frames: u32, fps: f64, adaptive: bool, detection_interval: u32) -> Self {
        let stride = Self::adaptive_stride(skip_frames, fps, adaptive);
        Self {
            stride,
            detection_stride: stride * u64::from(detection_interval.max(1)),
        }
    }

    /// 高 fps 影片放大間隔，低 fps 影片縮小間隔
    #[must_use]
    pub fn adaptive_stride(skip_frames: u32, fps: f64, adaptive: bool) -> u64 {
        let base = u64::from(skip_frames.max(1));
        if !adaptive || (15.0..=REFERENCE_FPS).contains(&fps) {
            return base;
        }

        let scaled = (f64::from(skip_frames) * (fps / REFERENCE_FPS)) as u64;
        scaled.max(1)
    }

    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    #[must_use]
    pub const fn detection_stride(&self) -> u64 {
        self.detection_stride
    }

    #[must_use]
    pub const fn should_analyze(&self, frame_index: u64) -> bool {
        frame_index % self.stride == 0
    }

    /// 物件偵測成本較高，只在較粗的間隔執行
    #[must_use]
    pub const fn should_detect(&self, frame_index: u64) -> bool {
        frame_index % self.detection_stride == 0
    }
}
