//! env_logger setup.
//!
//! `RUST_LOG` picks the filter (default `info`). Records are written as
//! `[2024-03-01T12:30:00Z] INFO: message` to stderr and, when a log file
//! can be opened, appended to it as well.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Copies every write to stderr and a file
pub struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr is best effort; the file is the record of truth
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn format_line(timestamp: &str, level: log::Level, message: &str) -> String {
    format!("[{}] {}: {}", timestamp, level, message)
}

/// Initialize the global logger. Must be called once, before anything logs.
pub fn init(log_path: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        writeln!(buf, "{}", format_line(&timestamp, record.level(), &record.args().to_string()))
    });

    let mut open_error = None;
    match log_path.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => {
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
        }
        Some((path, Err(e))) => {
            open_error = Some((path.display().to_string(), e));
            builder.target(env_logger::Target::Stderr);
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder.init();

    if let Some((path, e)) = open_error {
        log::warn!("⚠️  Cannot open log file {} ({}), logging to stderr only", path, e);
    }
}
