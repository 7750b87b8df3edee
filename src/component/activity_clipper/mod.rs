//! 活動片段擷取元件
//!
//! 從監視器類型的影片中找出有動態或物件的時間段並輸出為獨立剪輯

mod batch_scheduler;
mod clip_extractor;
mod detector_process;
mod frame;
mod frame_sampler;
mod main;
mod media;
mod motion_detector;
mod object_detector;
mod processing_log;
mod progress;
mod segment;
mod segment_merger;
mod video_analyzer;

pub use batch_scheduler::{BatchOptions, BatchRun, BatchScheduler, resolve_worker_count};
pub use clip_extractor::{ClipExtractor, ExtractedClip, MIN_CLIP_SECONDS, format_hhmmss, plan_clips};
pub use detector_process::CommandDetector;
pub use frame::{Frame, GrayFrame};
pub use frame_sampler::FrameSampler;
pub use main::{
    ActivityClipper, DEFAULT_OUTPUT_DIR, build_detector, clip_output_dir, print_summary, run_batch,
};
pub use media::{DecodeOptions, FfmpegBackend, FrameSource, MediaBackend};
pub use motion_detector::{MotionDetector, MotionReading};
pub use object_detector::{
    BoundingBox, Detection, DetectionAdapter, DetectionFilter, NoopDetector, ObjectDetector,
    SharedDetector,
};
pub use processing_log::{PROCESSING_LOG_FILE, ProcessingLog, ProcessingRecord, RecordState};
pub use progress::{
    BatchProgress, ConsoleProgress, FileStatus, NoopObserver, ProgressObserver, ProgressUpdate,
};
pub use segment::{Segment, SegmentBuilder};
pub use segment_merger::merge_segments;
pub use video_analyzer::{VideoAnalysis, VideoProcessor};
