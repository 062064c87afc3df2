//! Terminal rendering helpers

use clipwatch_core::domain::job::{Job, JobStatus};
use clipwatch_core::domain::log::{LogEntry, LogLevel};
use clipwatch_core::domain::request::GenerationRequest;
use clipwatch_tracker::Countdown;
use clipwatch_tracker::countdown::humanize;
use colored::*;
use std::io::Write;

/// Print a log entry
pub fn print_log_entry(log: &LogEntry) {
    let level_str = format!("{:?}", log.level).to_uppercase();
    let level_colored = match log.level {
        LogLevel::Info => level_str.cyan(),
        LogLevel::Success => level_str.green(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}

/// Redraws the single-line job status in place
pub fn print_status_line(job: &Job, countdown: &Countdown) {
    let mut line = format!(
        "{} {} {:>3}%  elapsed {}  next check {}",
        "▸".cyan(),
        colorize_status(&job.status),
        job.progress,
        humanize(countdown.elapsed),
        countdown.label()
    );
    if let Some(raw) = job.provider_status.as_deref()
        && raw != job.status.as_str()
    {
        line.push_str(&format!("  provider: {}", raw.dimmed()));
    }
    if job.fallback.attempt_count > 0 {
        line.push_str(&format!(
            "  direct attempts: {}",
            job.fallback.attempt_count
        ));
    }

    print!("\r\x1b[2K{line}");
    let _ = std::io::stdout().flush();
}

pub fn clear_status_line() {
    print!("\r\x1b[2K");
    let _ = std::io::stdout().flush();
}

/// Colorize job status for display
fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.as_str().to_string();
    match status {
        JobStatus::Queued => status_str.yellow(),
        JobStatus::InProgress => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Unknown(_) => status_str.dimmed(),
    }
}

/// Renders a request as a ready-to-run `clipwatch generate` command
pub fn retry_command(request: &GenerationRequest) -> String {
    let mut command = format!(
        "clipwatch generate {} --provider {} --model {}",
        quote(&request.prompt),
        request.provider,
        quote(&request.model)
    );
    let optional = [
        ("--seconds", &request.seconds),
        ("--size", &request.size),
        ("--remix-video-id", &request.remix_video_id),
        ("--input-reference", &request.input_reference),
    ];
    for (flag, value) in optional {
        if let Some(value) = value {
            command.push_str(&format!(" {flag} {}", quote(value)));
        }
    }
    command
}

/// Renders the command that resumes following `job`
pub fn watch_command(job: &Job) -> String {
    format!(
        "clipwatch watch {} --provider {}",
        quote(&job.id),
        job.provider
    )
}

/// Single-quotes a shell argument when it needs it
fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipwatch_core::domain::request::Provider;

    #[test]
    fn test_retry_command() {
        let request = GenerationRequest::new(Provider::OpenAi, "a cat's nap")
            .with_seconds("8")
            .with_size("1280x720");
        assert_eq!(
            retry_command(&request),
            "clipwatch generate 'a cat'\\''s nap' --provider openai --model sora-2 --seconds 8 --size 1280x720"
        );
    }

    #[test]
    fn test_watch_command_names_provider() {
        let job = Job::new(
            "r8abc123",
            GenerationRequest::new(Provider::Replicate, "a neon jungle"),
            JobStatus::InProgress,
            Default::default(),
        );
        assert_eq!(watch_command(&job), "clipwatch watch r8abc123 --provider replicate");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("bytedance/seedance-1-pro"), "bytedance/seedance-1-pro");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("1280x720"), "1280x720");
        assert_eq!(quote("a;b"), "'a;b'");
    }
}
