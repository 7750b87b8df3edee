mod ffprobe_info;
mod memory_monitor;
mod path_validator;
mod video_scanner;

pub use ffprobe_info::{VideoInfo, get_video_info};
pub use memory_monitor::MemoryMonitor;
pub use path_validator::{ensure_directory_exists, list_subfolders, validate_directory_exists};
pub use video_scanner::scan_video_files;
