use StoichKit::Utils::logging::init_logger;
use StoichKit::cli::cli_main::{run_arguments, run_interactive_menu};
use StoichKit::settings::{DEFAULT_CONFIG_FILE, SettingsManager};
use log::warn;
use std::process::ExitCode;

pub fn main() -> ExitCode {
    let (manager, load_error) = SettingsManager::load(DEFAULT_CONFIG_FILE);
    let settings = manager.settings();
    init_logger(&settings.log_level);
    if let Some(e) = load_error {
        warn!("{}, using default settings", e);
    }
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        run_interactive_menu(settings);
        ExitCode::SUCCESS
    } else if run_arguments(&args, settings) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
