// A stderr logger for the `log` crate, with the level taken from RUST_LOG.

use log::{LevelFilter, Log};

#[derive(Debug)]
pub struct Logger(());

const LOGGER: &Logger = &Logger(());

impl Logger {
    /// Install the logger, using the level named by the RUST_LOG environment
    /// variable. Logging is off if it is unset or unrecognized.
    pub fn init() -> Result<(), log::SetLoggerError> {
        log::set_logger(LOGGER)?;
        log::set_max_level(level_from_env(std::env::var("RUST_LOG").ok().as_deref()));
        Ok(())
    }
}

fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value.map(str::trim) {
        Some(level) => level.parse().unwrap_or(LevelFilter::Off),
        None => LevelFilter::Off,
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        // Filtering happens through log::set_max_level.
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => {
                eprintln!(
                    "{}|{}|{}:{}: {}",
                    record.level(),
                    record.target(),
                    file,
                    line,
                    record.args()
                );
            }
            _ => {
                eprintln!("{}|{}: {}", record.level(), record.target(), record.args());
            }
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(level_from_env(None), LevelFilter::Off);
        assert_eq!(level_from_env(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_env(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(level_from_env(Some("chatty")), LevelFilter::Off);
    }
}
