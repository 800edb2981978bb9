use log::{Level, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::Result;

/// Appends `[LEVEL] message` lines to a file.
struct FileLogger {
    path: PathBuf,
    level: Level,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Routes the compiler's `log` output to `path`, up to `level`.
///
/// Fails if a logger is already installed for this process.
pub fn init_logger(path: impl Into<PathBuf>, level: Level) -> Result<()> {
    log::set_boxed_logger(Box::new(FileLogger {
        path: path.into(),
        level,
    }))?;
    log::set_max_level(level.to_level_filter());
    Ok(())
}
