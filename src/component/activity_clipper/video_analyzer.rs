use super::clip_extractor::{ClipExtractor, ExtractedClip};
use super::frame_sampler::FrameSampler;
use super::media::{DecodeOptions, MediaBackend};
use super::motion_detector::MotionDetector;
use super::object_detector::{DetectionAdapter, SharedDetector};
use super::progress::ProgressUpdate;
use super::segment::{Segment, SegmentBuilder};
use super::segment_merger::merge_segments;
use crate::config::ProcessingConfig;
use crate::tools::{MemoryMonitor, VideoInfo};
use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::path::Path;

/// 影片處理中每分析這麼多幀檢查一次記憶體
pub const MEMORY_CHECK_FRAMES: u64 = 100;

/// 影片處理中的記憶體上限（%）
pub const IN_VIDEO_MEMORY_LIMIT_PERCENT: f32 = 90.0;

#[derive(Debug, Clone)]
pub struct VideoAnalysis {
    pub info: VideoInfo,
    /// 尚未合併的區段
    pub segments: Vec<Segment>,
    pub detection_count: usize,
    pub analyzed_frames: u64,
}

/// 單支影片的完整處理流程：取樣、偵測、切段、合併、剪輯
pub struct VideoProcessor<'a> {
    config: &'a ProcessingConfig,
    backend: &'a dyn MediaBackend,
    detector: &'a SharedDetector,
    /// (監控器, 影片處理中的記憶體上限 %)
    memory_monitor: Option<(&'a MemoryMonitor, f32)>,
}

impl<'a> VideoProcessor<'a> {
    #[must_use]
    pub fn new(
        config: &'a ProcessingConfig,
        backend: &'a dyn MediaBackend,
        detector: &'a SharedDetector,
    ) -> Self {
        Self {
            config,
            backend,
            detector,
            memory_monitor: None,
        }
    }

    /// 每分析 `MEMORY_CHECK_FRAMES` 幀檢查一次，超過 `limit_percent` 時要求偵測器釋放快取
    #[must_use]
    pub fn with_memory_monitor(mut self, monitor: &'a MemoryMonitor, limit_percent: f32) -> Self {
        self.memory_monitor = Some((monitor, limit_percent));
        self
    }

    pub fn process(
        &self,
        path: &Path,
        output_dir: &Path,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<Vec<ExtractedClip>> {
        let analysis = self.analyze(path, on_progress)?;
        let merged = merge_segments(&analysis.segments);

        let extractor = ClipExtractor::new(self.backend, output_dir, self.config.output_extension());
        let clips = extractor.extract(path, &merged, analysis.info.frame_rate);

        info!(
            "{} 分析完成: 分析 {} 幀，{} 個區段（合併後 {}），輸出 {} 個剪輯",
            path.display(),
            analysis.analyzed_frames,
            analysis.segments.len(),
            merged.len(),
            clips.len()
        );
        Ok(clips)
    }

    pub fn analyze(
        &self,
        path: &Path,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<VideoAnalysis> {
        let info = self.backend.probe(path)?;
        let fps = info.frame_rate;
        if fps.is_nan() || fps <= 0.0 {
            bail!("無效的影格率 {fps}: {}", path.display());
        }

        let config = self.config;
        let sampler = FrameSampler::new(
            config.skip_frames(),
            fps,
            config.adaptive_skip(),
            config.detection_interval(),
        );
        let buffer_frames = SegmentBuilder::buffer_frames_for(config.buffer_seconds(), fps);

        info!(
            "開始分析 {}: {:.2} fps，共 {} 幀，取樣間隔 {}，緩衝 {} 幀",
            path.display(),
            fps,
            info.total_frames,
            sampler.stride(),
            buffer_frames
        );

        let mut source = self.backend.open(
            path,
            &info,
            &DecodeOptions {
                stride: sampler.stride(),
                resize_factor: config.resize_factor(),
            },
        )?;

        let mut motion = MotionDetector::new(config.motion_threshold());
        let mut objects = DetectionAdapter::new(self.detector, config);
        let mut builder = SegmentBuilder::new(buffer_frames);

        let total_frames = info.total_frames;
        let mut frame_index: u64 = 0;
        let mut analyzed_frames: u64 = 0;
        let mut last_index = None;

        loop {
            if !sampler.should_analyze(frame_index) {
                source.grab()?;
                frame_index += 1;
                continue;
            }

            let Some(frame) = source.read()? else {
                break;
            };

            on_progress(ProgressUpdate {
                percent: progress_percent(frame_index, total_frames),
                detections: objects.detection_count(),
                segments: builder.closed_count(),
            });

            let reading = motion.update(frame.to_gray(config.roi())?);
            let has_objects = if sampler.should_detect(frame_index) {
                objects.observe(frame_index, &frame)?
            } else {
                false
            };

            if config.debug() {
                debug!(
                    "影格 {frame_index}: 動態分數 {:?}（平均 {:.4}），動態 {}，物件 {}",
                    reading.score,
                    motion.average(),
                    reading.detected,
                    has_objects
                );
            }

            builder.observe(frame_index, reading.detected, has_objects);
            last_index = Some(frame_index);
            analyzed_frames += 1;

            if analyzed_frames % MEMORY_CHECK_FRAMES == 0 {
                self.check_memory(path);
            }

            frame_index += 1;
        }

        let stream_frames = if total_frames > 0 {
            total_frames
        } else {
            last_index.map_or(0, |i| i + 1)
        };
        let segments = builder.finish(stream_frames);

        on_progress(ProgressUpdate {
            percent: 100,
            detections: objects.detection_count(),
            segments: segments.len(),
        });

        Ok(VideoAnalysis {
            info,
            segments,
            detection_count: objects.detection_count(),
            analyzed_frames,
        })
    }

    fn check_memory(&self, path: &Path) {
        let Some((monitor, limit_percent)) = self.memory_monitor else {
            return;
        };
        if monitor.exceeds(limit_percent) {
            warn!(
                "處理 {} 時記憶體使用率超過 {limit_percent}%，要求釋放快取",
                path.display()
            );
            self.detector.release_cached_memory();
        }
    }
}

fn progress_percent(frame_index: u64, total_frames: u64) -> u8 {
    if total_frames == 0 {
        return 0;
    }
    u8::try_from((frame_index.saturating_mul(100) / total_frames).min(100)).unwrap_or(100)
}
