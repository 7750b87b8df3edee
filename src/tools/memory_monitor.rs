use std::sync::Mutex;
use sysinfo::System;

/// 系統記憶體使用率監控
///
/// 多個工作執行緒共用同一個實例，`System` 以 `Mutex` 保護。
pub struct MemoryMonitor {
    system: Mutex<System>,
    usage_threshold: f32,
}

impl MemoryMonitor {
    #[must_use]
    pub fn new(usage_threshold: f32) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
            usage_threshold,
        }
    }

    #[must_use]
    pub const fn usage_threshold(&self) -> f32 {
        self.usage_threshold
    }

    /// 目前記憶體使用率（0-100）
    pub fn current_usage(&self) -> f32 {
        let Ok(mut system) = self.system.lock() else {
            return 0.0;
        };
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        (system.used_memory() as f64 / total as f64 * 100.0) as f32
    }

    /// 以指定的閾值檢查，供影片處理中較寬鬆的檢查使用
    pub fn exceeds(&self, threshold_percent: f32) -> bool {
        self.current_usage() > threshold_percent
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new(85.0)
    }
}
