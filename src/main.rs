use activity_clipper::cli::{Cli, Commands, run_unattended};
use activity_clipper::config::types::Config;
use activity_clipper::init;
use activity_clipper::menu::show_main_menu;
use activity_clipper::signal::setup_shutdown_signal;
use anyhow::Result;
use clap::Parser;
use console::{Term, style};
use log::{info, warn};
use rust_i18n::t;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    let cli = Cli::parse();
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    if let Some(Commands::Run(args)) = cli.command {
        info!("以命令列模式執行");
        return run_unattended(&args, &config, &shutdown_signal);
    }

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("main_menu.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
