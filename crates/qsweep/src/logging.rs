//! Tracing setup for the CLI: stderr by default, or an append-only log file
//! that is trimmed to its tail when it grows too large.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file size that triggers trimming (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Tail kept after trimming (1 MB)
const KEEP_SIZE: u64 = 1024 * 1024;

const TRIM_MARKER: &str = "--- earlier qsweep log entries trimmed ---\n";

/// Cut `path` down to roughly its last `keep` bytes, starting on a whole line,
/// once it is larger than `limit`. Returns the number of bytes dropped.
fn trim_log(path: &Path, limit: u64, keep: u64) -> io::Result<u64> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    if size <= limit {
        return Ok(0);
    }

    let mut tail = Vec::with_capacity(keep as usize);
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-(keep.min(size) as i64)))?;
    file.read_to_end(&mut tail)?;

    let line_start = tail.iter().position(|&b| b == b'\n').map_or(0, |i| i + 1);
    let kept = &tail[line_start..];

    let mut file = File::create(path)?;
    file.write_all(TRIM_MARKER.as_bytes())?;
    file.write_all(kept)?;
    Ok(size - kept.len() as u64)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qsweep={level},qsweep_core={level}")))
}

/// Initialize logging.
///
/// With a `log_file`, logs are appended to that file with size-based
/// rotation: past 5MB, only the last 1MB is kept. Without one, logs go to
/// stderr. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter(level))
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
        return Ok(());
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let trimmed = trim_log(log_path, MAX_LOG_SIZE, KEEP_SIZE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    match trimmed {
        Ok(0) => {}
        Ok(bytes) => tracing::info!(bytes, "trimmed log file"),
        Err(e) => tracing::warn!(error = %e, "could not trim log file"),
    }
    tracing::info!(log_path = %log_path.display(), "logging initialized");
    Ok(())
}
