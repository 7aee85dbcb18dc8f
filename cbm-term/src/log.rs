use std::fs::{self, OpenOptions};
use std::io::Write;

const LOG_FILE: &str = "cbm.log";

/// Truncate the log at startup. Stdout belongs to the emulated screen, so
/// launcher diagnostics go to a file instead.
pub fn init_log() {
    let _ = fs::File::create(LOG_FILE);
}

/// Log for when stdout is taken. Best effort; a failing log must never take
/// the machine down with it.
pub fn log(text: &str) {
    if let Ok(mut file) = OpenOptions::new().append(true).open(LOG_FILE) {
        let _ = file.write_all(text.as_bytes());
        let _ = file.write_all(b"\n");
    }
}
