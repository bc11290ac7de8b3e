/// Text rendering of scan status for the terminal.
use threatsleuth_core::model::{ScanPhase, ScanStatus};

/// Longest folder path shown on the progress line.
const MAX_FOLDER_DISPLAY: usize = 60;

/// `1234567` as `1,234,567`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.char_indices() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `1h 02m 03s`, `4m 05s` or `6.7s`.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    let secs = millis / 1_000;
    if secs >= 3_600 {
        format!("{}h {:02}m {:02}s", secs / 3_600, (secs % 3_600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{}s", secs, (millis % 1_000) / 100)
    }
}

/// Shorten a path to `max_chars`, keeping both ends.
pub fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars || max_chars < 5 {
        return path.to_string();
    }
    let half = (max_chars - 3) / 2;
    let head: String = path.chars().take(half).collect();
    let tail: String = path.chars().skip(count - half).collect();
    format!("{head}...{tail}")
}

/// One-line live progress, e.g.
/// `[ 42.0%] 1,024/2,438 files  threats: 1  /home/u/Downloads`.
pub fn progress_line(status: &ScanStatus) -> String {
    let folder = if status.current_folder.is_empty() {
        "counting files...".to_string()
    } else {
        truncate_path(&status.current_folder, MAX_FOLDER_DISPLAY)
    };
    format!(
        "[{:>5.1}%] {}/{} files  threats: {}  {}",
        status.progress_percent(),
        format_count(status.scanned_files),
        format_count(status.total_files),
        status.threats_found,
        folder
    )
}

/// Multi-line final report.
pub fn summary(status: &ScanStatus) -> String {
    let mut out = String::new();
    let phase = status.phase();
    out.push_str(&format!("Scan {} ({})\n", phase.label().to_lowercase(), status.scan_type));
    if phase == ScanPhase::Idle {
        return out;
    }

    out.push_str(&format!(
        "  Files scanned: {} of {}\n",
        format_count(status.scanned_files),
        format_count(status.total_files)
    ));
    if let Some(elapsed) = status.elapsed() {
        out.push_str(&format!("  Duration:      {}\n", format_elapsed(elapsed)));
    }
    out.push_str(&format!("  Threats found: {}\n", status.threats_found));
    for threat in &status.threats {
        out.push_str(&format!(
            "    {} [{}] {}\n",
            threat.path, threat.threat_type, threat.signature
        ));
    }
    out
}
