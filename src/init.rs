use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;

pub const LOG_FILE: &str = "activity_clipper.log";

/// 初始化日誌，輸出到工作目錄下的日誌檔以免干擾終端介面
///
/// 預設層級為 `info`，可用 `RUST_LOG` 覆寫。
pub fn init() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    match OpenOptions::new().create(true).append(true).open(LOG_FILE) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("無法開啟日誌檔 {LOG_FILE}，改為輸出到 stderr: {e}"),
    }

    let _ = builder.try_init();
}
