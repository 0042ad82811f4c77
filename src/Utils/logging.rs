use log::LevelFilter;
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};
use std::str::FromStr;

/// "off", "error", "warn", "info", "debug" or "trace", case-insensitive; anything else is Info
pub fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}

/// Installs a terminal logger on stderr, or a plain logger when no terminal is available.
/// Returns false when a logger was installed before.
pub fn init_logger(level: &str) -> bool {
    let level = parse_level(level);
    if TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto).is_ok() {
        return true;
    }
    SimpleLogger::init(level, Config::default()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }
}
