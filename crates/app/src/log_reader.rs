//! Reading records back out of host log files.

use iobridge_domain::file::LogFile;
use iobridge_domain::log::{LogLevel, LogMessage};

/// The newest file holding records; log files are named by date, so the
/// greatest name is the newest.
#[must_use]
pub fn newest_file(files: &[LogFile]) -> Option<&LogFile> {
    files
        .iter()
        .filter(|file| file.has_records())
        .max_by(|a, b| a.file_name.cmp(&b.file_name))
}

/// Parse `text` from its last line backwards, newest record first.
///
/// A record is kept when its severity equals `level` and its source equals
/// `instance` (each when given). Lines that do not parse are skipped.
/// A `count` of zero means no limit.
#[must_use]
pub fn collect_records(
    text: &str,
    level: Option<LogLevel>,
    instance: Option<&str>,
    count: Option<usize>,
) -> Vec<LogMessage> {
    let limit = count.filter(|&count| count > 0).unwrap_or(usize::MAX);
    text.lines()
        .rev()
        .filter_map(LogMessage::parse_line)
        .filter(|record| level.is_none_or(|level| record.severity == level))
        .filter(|record| instance.is_none_or(|instance| record.from == instance))
        .take(limit)
        .collect()
}
