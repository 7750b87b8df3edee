use super::frame::GrayFrame;
use std::collections::VecDeque;

/// 保留最近幾次的動態分數
pub const MOTION_HISTORY_LEN: usize = 10;

/// 像素差異大於此值才視為變化
pub const PIXEL_DIFF_THRESHOLD: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    /// 第一個影格沒有前一幀可比較，分數為 `None`
    pub score: Option<f64>,
    pub detected: bool,
}

/// 幀差動態偵測
///
/// 每支影片建立一個新的實例，狀態不跨影片共用。
#[derive(Debug)]
pub struct MotionDetector {
    threshold: f64,
    previous: Option<GrayFrame>,
    history: VecDeque<f64>,
}

impl MotionDetector {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
            history: VecDeque::with_capacity(MOTION_HISTORY_LEN),
        }
    }

    /// 以目前影格更新狀態，並回傳是否偵測到動態
    pub fn update(&mut self, current: GrayFrame) -> MotionReading {
        let score = self
            .previous
            .as_ref()
            .and_then(|previous| changed_pixel_ratio(previous, &current));

        // 不論結果都以目前影格作為下一次比較的基準
        self.previous = Some(current);

        let Some(score) = score else {
            return MotionReading {
                score: None,
                detected: false,
            };
        };

        if self.history.len() == MOTION_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(score);

        MotionReading {
            score: Some(score),
            detected: self.average() > self.threshold,
        }
    }

    #[must_use]
    pub fn average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// 兩張亮度圖中變化像素的比例；尺寸不同時無法比較
fn changed_pixel_ratio(previous: &GrayFrame, current: &GrayFrame) -> Option<f64> {
    if previous.width != current.width
        || previous.height != current.height
        || current.data.is_empty()
    {
        return None;
    }

    let changed = previous
        .data
        .iter()
        .zip(&current.data)
        .filter(|&(a, b)| a.abs_diff(*b) > PIXEL_DIFF_THRESHOLD)
        .count();

    Some(changed as f64 / current.data.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, fill: u8) -> GrayFrame {
        GrayFrame {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    fn with_block(mut frame: GrayFrame, pixels: usize, value: u8) -> GrayFrame {
        for px in frame.data.iter_mut().take(pixels) {
            *px = value;
        }
        frame
    }

    #[test]
    fn test_first_frame_has_no_score() {
        let mut detector = MotionDetector::new(0.01);
        let reading = detector.update(gray(10, 10, 0));
        assert_eq!(reading.score, None);
        assert!(!reading.detected);
        assert_eq!(detector.history_len(), 0);
    }

    #[test]
    fn test_score_is_changed_pixel_fraction() {
        let mut detector = MotionDetector::new(0.01);
        detector.update(gray(10, 10, 0));
        let reading = detector.update(with_block(gray(10, 10, 0), 25, 200));
        assert!((reading.score.unwrap() - 0.25).abs() < 1e-9);
        assert!(reading.detected);
    }

    #[test]
    fn test_small_differences_are_ignored() {
        let mut detector = MotionDetector::new(0.0);
        detector.update(gray(10, 10, 100));
        let reading = detector.update(gray(10, 10, 130));
        assert_eq!(reading.score, Some(0.0));
        assert!(!reading.detected);

        let reading = detector.update(gray(10, 10, 161));
        assert_eq!(reading.score, Some(1.0));
    }

    #[test]
    fn test_history_is_bounded_and_averaged() {
        let mut detector = MotionDetector::new(0.05);
        let mut frame = gray(10, 10, 0);
        detector.update(frame.clone());

        // 一次大變化之後連續靜止，平均值逐漸下降
        frame = with_block(frame, 100, 255);
        assert!(detector.update(frame.clone()).detected);

        let mut last = true;
        for _ in 0..MOTION_HISTORY_LEN {
            last = detector.update(frame.clone()).detected;
        }
        assert_eq!(detector.history_len(), MOTION_HISTORY_LEN);
        assert!(!last);
        assert!(detector.average().abs() < 1e-9);
    }

    #[test]
    fn test_dimension_change_resets_comparison() {
        let mut detector = MotionDetector::new(0.01);
        detector.update(gray(10, 10, 0));
        let reading = detector.update(gray(5, 5, 255));
        assert_eq!(reading.score, None);
        let reading = detector.update(gray(5, 5, 0));
        assert_eq!(reading.score, Some(1.0));
    }
}
