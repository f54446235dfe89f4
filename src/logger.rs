//! Session logger, installed as the `log` crate backend.
//!
//! The file is truncated at each launch, so it only ever holds output from
//! the most recent run. Warnings and errors are mirrored to stderr.
//!
//! Log location:
//!   Windows:  `%APPDATA%\rasterkit\rasterkit.log`
//!   Linux:    `~/.local/share/rasterkit/rasterkit.log`
//!   macOS:    `~/Library/Application Support/rasterkit/rasterkit.log`

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: SessionLogger = SessionLogger;
static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

struct SessionLogger;

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] [{}] {}", timestamp(), record.level(), record.args());
        if record.level() <= Level::Warn {
            eprintln!("{line}");
        }
        write_line(&line);
    }

    fn flush(&self) {
        if let Some(mutex) = LOG_FILE.get()
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a raw line to the session file. I/O errors are ignored.
fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Install the logger. Safe to call more than once; later calls only
/// adjust the level.
///
/// * Creates (or truncates) the log file under the OS data directory.
/// * Installs a panic hook that writes the panic message to the log before
///   running the default handler.
pub fn init(level: LevelFilter) {
    log::set_max_level(level);
    if log::set_logger(&LOGGER).is_err() {
        return;
    }

    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // stderr mirroring still works without the file
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    }

    write_line(&format!("=== rasterkit session started {} ===", human_timestamp()));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("rasterkit").join("rasterkit.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}
