use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 協作式取消旗標
///
/// 排程器只在檔案任務之間檢查，不會中斷正在處理的影片。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 重新開始新的批次前清除旗標
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[must_use]
pub fn setup_shutdown_signal() -> CancellationToken {
    let shutdown_signal = CancellationToken::new();
    let signal_clone = shutdown_signal.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        signal_clone.cancel();
        eprintln!("\n收到中斷信號，目前的影片處理完成後將停止...");
    }) {
        log::warn!("無法設定 Ctrl-C 處理器: {e}");
    }

    shutdown_signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        clone.reset();
        assert!(!token.is_cancelled());
    }
}
