use crate::component::ActivityClipper;
use crate::config::Config;
use crate::pause;
use crate::signal::CancellationToken;
use anyhow::Result;
use console::{Term, style};

pub fn run_activity_clipper(
    term: &Term,
    shutdown_signal: &CancellationToken,
    config: &mut Config,
) -> Result<()> {
    let clipper = ActivityClipper::new(config.clone(), shutdown_signal.clone());

    if let Err(e) = clipper.run() {
        log::error!("活動片段擷取失敗: {e:#}");
        eprintln!("{} {:#}", style(t!("common.error_prefix")).red().bold(), e);
    }

    // 元件會更新最近使用的路徑，重新載入以免之後的設定覆寫掉
    *config = Config::new()?;

    pause(term)?;
    Ok(())
}
