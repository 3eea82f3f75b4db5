use tokio::sync::mpsc;

use crate::util::data_dir;

/// Async session logger that writes timestamped lines to `~/.dronesim/logs/latest.log`.
///
/// Uses an mpsc channel so callers never block on disk I/O — `log()` just sends
/// through the channel, and a background task does the actual writing.
pub struct SessionLogger {
    tx: mpsc::UnboundedSender<String>,
}

impl SessionLogger {
    /// Create the session logger.
    ///
    /// - Creates `~/.dronesim/logs/` if it doesn't exist
    /// - Rotates `latest.log` → `session-{timestamp}.log`
    /// - Cleans up old sessions (keeps max 10)
    /// - Spawns a background writer task
    ///
    /// Returns `None` when the log directory is unusable — logging is never
    /// allowed to fail a command.
    pub async fn new() -> Option<Self> {
        let logs_dir = data_dir().ok()?.join("logs");

        if tokio::fs::create_dir_all(&logs_dir).await.is_err() {
            return None;
        }

        let latest = logs_dir.join("latest.log");

        // Rotate previous latest.log to session-{timestamp}.log
        if latest.exists() {
            let ts = unix_timestamp();
            let rotated = logs_dir.join(format!("session-{ts}.log"));
            let _ = tokio::fs::rename(&latest, &rotated).await;
        }

        cleanup_old_sessions(&logs_dir).await;

        let file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&latest)
            .await
        {
            Ok(f) => f,
            Err(_) => return None,
        };

        let (tx, rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(writer_task(file, rx));

        let header = format!(
            "=== dronesim session — {} ===\n\n",
            format_timestamp(unix_timestamp())
        );
        let _ = tx.send(header);

        Some(Self { tx })
    }

    /// Send a log line. Never blocks — just pushes to the channel.
    pub fn log(&self, prefix: &str, line: &str) {
        let ts = format_timestamp(unix_timestamp());
        let formatted = format!("[{ts}] [{prefix}] {line}\n");
        let _ = self.tx.send(formatted);
    }

    /// Clone the sender so subprocess reader tasks can log without holding a lock.
    pub fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.tx.clone()
    }
}

/// Format a log line and send it through a cloned sender.
/// Convenience for tasks that outlive the logger borrow.
pub fn send_log(tx: &mpsc::UnboundedSender<String>, prefix: &str, line: &str) {
    let ts = format_timestamp(unix_timestamp());
    let formatted = format!("[{ts}] [{prefix}] {line}\n");
    let _ = tx.send(formatted);
}

/// Background task that receives lines from the channel and writes to disk.
async fn writer_task(file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<String>) {
    use tokio::io::AsyncWriteExt;
    let mut writer = tokio::io::BufWriter::new(file);

    while let Some(line) = rx.recv().await {
        let _ = writer.write_all(line.as_bytes()).await;
        // Flush per line so logs are readable while a build is still running
        let _ = writer.flush().await;
    }

    let footer = format!(
        "\n=== Session ended — {} ===\n",
        format_timestamp(unix_timestamp())
    );
    let _ = writer.write_all(footer.as_bytes()).await;
    let _ = writer.flush().await;
}

/// Get current Unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Format a Unix timestamp as ISO 8601 UTC (e.g. "2025-06-15T10:30:00Z").
/// No chrono dependency — pure arithmetic (inverse of config.rs::parse_iso8601_to_unix).
pub fn format_timestamp(secs: u64) -> String {
    let s = secs as i64;

    let sec = s % 60;
    let min = (s / 60) % 60;
    let hour = (s / 3600) % 24;
    let mut days = s / 86400;

    // Convert days since epoch to year/month/day
    let mut year: i64 = 1970;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let month_days: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month: i64 = 1;
    for i in 0..12 {
        let mut d = month_days[i];
        if i == 1 && is_leap(year) {
            d += 1;
        }
        if days < d {
            break;
        }
        days -= d;
        month += 1;
    }
    let day = days + 1;

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// Keep only the 10 most recent `session-*.log` files.
async fn cleanup_old_sessions(logs_dir: &std::path::Path) {
    let mut entries = match tokio::fs::read_dir(logs_dir).await {
        Ok(rd) => rd,
        Err(_) => return,
    };

    let mut session_files: Vec<std::path::PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with("session-") && name_str.ends_with(".log") {
            session_files.push(entry.path());
        }
    }

    // Sort by name (timestamp is embedded, so lexicographic = chronological)
    session_files.sort();

    while session_files.len() > 10 {
        if let Some(oldest) = session_files.first() {
            let _ = tokio::fs::remove_file(oldest).await;
        }
        session_files.remove(0);
    }
}
