//! Ping session: output grammar, summary aggregation, orchestration.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DiagResult;
use crate::events::{DiagnosticEvent, EventSink, PingLineData};
use crate::exec::{drain_stderr, launch, wait_exit, LineReader, SpawnedCommand};
use crate::types::{PingSample, PingSummary};
use crate::validate::{clamp_count, is_valid_target};

/// Response line: `64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=4.52 ms`.
static RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) bytes from ([^:]+): icmp_seq=(\d+) ttl=(\d+) time=([\d.]+) ms")
        .expect("response pattern")
});

/// Sequence number inside a timeout line, `icmp_seq=3` or `icmp_seq 3`.
static TIMEOUT_SEQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"icmp_seq[=\s](\d+)").expect("timeout seq pattern"));

/// Statistics line: `4 packets transmitted, 4 packets received, 0.0% packet loss`.
/// Linux prints `4 received` without the second `packets`.
static STATS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) packets transmitted, (\d+) (?:packets )?received, ([\d.]+)% packet loss")
        .expect("stats pattern")
});

/// RTT line: `round-trip min/avg/max/stddev = 4.1/5.4/7.8/1.2 ms`
/// (`rtt min/avg/max/mdev` on Linux).
static RTT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"min/avg/max/\w+ = ([\d.]+)/([\d.]+)/([\d.]+)").expect("rtt pattern")
});

/// Parse one line of ping output.
///
/// Returns `None` for banner, blank and statistics lines; those are not
/// probe results.
#[must_use]
pub fn parse_ping_line(line: &str) -> Option<PingSample> {
    if let Some(caps) = RESPONSE.captures(line) {
        return Some(PingSample {
            host: Some(caps[2].to_string()),
            seq: caps[3].parse().ok(),
            ttl: caps[4].parse().ok(),
            time: caps[5].parse().ok(),
            success: true,
        });
    }

    if line.contains("Request timeout") || line.contains("timed out") {
        let seq = TIMEOUT_SEQ
            .captures(line)
            .and_then(|caps| caps[1].parse().ok());
        return Some(PingSample {
            host: None,
            seq,
            ttl: None,
            time: None,
            success: false,
        });
    }

    None
}

/// Derive terminal statistics from the accumulated output.
///
/// A summary exists only when both transmitted and received counts were
/// found; the RTT line alone is not enough.
#[must_use]
pub fn parse_ping_summary(lines: &[String]) -> Option<PingSummary> {
    let mut counts: Option<(u32, u32, f64)> = None;
    let mut rtt: Option<(f64, f64, f64)> = None;

    for line in lines {
        if let Some(caps) = STATS.captures(line) {
            counts = Some((
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            ));
        }
        if let Some(caps) = RTT.captures(line) {
            rtt = Some((
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            ));
        }
    }

    let (transmitted, received, loss_percent) = counts?;
    let (min_time, avg_time, max_time) = match rtt {
        Some((min, avg, max)) => (Some(min), Some(avg), Some(max)),
        None => (None, None, None),
    };

    Some(PingSummary {
        transmitted,
        received,
        loss_percent,
        min_time,
        avg_time,
        max_time,
    })
}

/// Run one complete ping session against the sink.
pub(super) async fn execute_ping(sink: &dyn EventSink, host: &str, count: u32) {
    if !is_valid_target(host) {
        let _ = sink
            .send(DiagnosticEvent::PingError {
                error: "Invalid host: only letters, digits, dots, hyphens and colons are allowed"
                    .to_string(),
            })
            .await;
        return;
    }

    let count = clamp_count(count);
    if let Err(e) = run_ping(sink, host, count).await {
        if e.is_expected() {
            log::warn!("ping {host} failed: {e}");
        } else {
            log::error!("ping {host} failed: {e}");
        }
        let _ = sink
            .send(DiagnosticEvent::PingError {
                error: e.to_string(),
            })
            .await;
    }
}

async fn run_ping(sink: &dyn EventSink, host: &str, count: u32) -> DiagResult<()> {
    sink.send(DiagnosticEvent::PingStart {
        host: host.to_string(),
        count,
    })
    .await?;

    let count_arg = count.to_string();
    let SpawnedCommand {
        stdout,
        stderr,
        mut child,
    } = launch("ping", &["-c", &count_arg, host])?;

    let mut reader = LineReader::new(stdout);
    let mut all_lines: Vec<String> = Vec::new();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        all_lines.push(line.clone());
        let sample = parse_ping_line(&line);
        sink.send(DiagnosticEvent::PingLine(PingLineData { line, sample }))
            .await?;
    }

    let exit_code = wait_exit(&mut child).await?;

    let err_text = drain_stderr(stderr).await;
    if !err_text.is_empty() {
        sink.send(DiagnosticEvent::PingError { error: err_text }).await?;
    }

    let summary = parse_ping_summary(&all_lines);
    sink.send(DiagnosticEvent::PingComplete {
        host: host.to_string(),
        exit_code,
        summary,
    })
    .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    // ==================== parse_ping_line tests ====================

    #[test]
    fn test_parse_response_line() {
        let sample =
            parse_ping_line("64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=4.52 ms").unwrap();
        assert_eq!(sample.host.as_deref(), Some("8.8.8.8"));
        assert_eq!(sample.seq, Some(1));
        assert_eq!(sample.ttl, Some(117));
        assert_eq!(sample.time, Some(4.52));
        assert!(sample.success);
    }

    #[test]
    fn test_parse_response_line_with_hostname() {
        let line =
            "64 bytes from fra16s48-in-f14.1e100.net (142.250.185.78): icmp_seq=2 ttl=118 time=11.3 ms";
        let sample = parse_ping_line(line).unwrap();
        assert_eq!(
            sample.host.as_deref(),
            Some("fra16s48-in-f14.1e100.net (142.250.185.78)")
        );
        assert_eq!(sample.seq, Some(2));
        assert_eq!(sample.time, Some(11.3));
    }

    #[test]
    fn test_parse_macos_timeout_line() {
        let sample = parse_ping_line("Request timeout for icmp_seq 3").unwrap();
        assert!(!sample.success);
        assert_eq!(sample.seq, Some(3));
        assert_eq!(sample.ttl, None);
        assert_eq!(sample.time, None);
    }

    #[test]
    fn test_parse_timeout_line_without_seq() {
        let sample = parse_ping_line("Request timed out.").unwrap();
        assert!(!sample.success);
        assert_eq!(sample.seq, None);
    }

    #[test]
    fn test_banner_and_stats_lines_do_not_parse() {
        assert!(parse_ping_line("PING 8.8.8.8 (8.8.8.8): 56 data bytes").is_none());
        assert!(parse_ping_line("--- 8.8.8.8 ping statistics ---").is_none());
        assert!(parse_ping_line("").is_none());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let line = "64 bytes from 1.1.1.1: icmp_seq=4 ttl=57 time=8.91 ms";
        assert_eq!(parse_ping_line(line), parse_ping_line(line));
    }

    // ==================== parse_ping_summary tests ====================

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_summary_macos_format() {
        let summary = parse_ping_summary(&lines(&[
            "--- 8.8.8.8 ping statistics ---",
            "4 packets transmitted, 4 packets received, 0.0% packet loss",
            "round-trip min/avg/max/stddev = 4.123/5.456/7.890/1.234 ms",
        ]))
        .unwrap();
        assert_eq!(summary.transmitted, 4);
        assert_eq!(summary.received, 4);
        assert_eq!(summary.loss_percent, 0.0);
        assert_eq!(summary.min_time, Some(4.123));
        assert_eq!(summary.avg_time, Some(5.456));
        assert_eq!(summary.max_time, Some(7.890));
    }

    #[test]
    fn test_summary_linux_format() {
        let summary = parse_ping_summary(&lines(&[
            "4 packets transmitted, 3 received, 25.0% packet loss, time 3004ms",
            "rtt min/avg/max/mdev = 10.104/10.222/10.341/0.118 ms",
        ]))
        .unwrap();
        assert_eq!(summary.transmitted, 4);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.loss_percent, 25.0);
        assert_eq!(summary.avg_time, Some(10.222));
    }

    #[test]
    fn test_summary_without_rtt_line() {
        let summary = parse_ping_summary(&lines(&[
            "4 packets transmitted, 0 packets received, 100.0% packet loss",
        ]))
        .unwrap();
        assert_eq!(summary.received, 0);
        assert_eq!(summary.min_time, None);
    }

    #[test]
    fn test_no_summary_without_counts() {
        assert!(parse_ping_summary(&lines(&[
            "round-trip min/avg/max/stddev = 4.1/5.4/7.8/1.2 ms",
        ]))
        .is_none());
        assert!(parse_ping_summary(&[]).is_none());
    }

    // ==================== orchestrator tests ====================

    #[tokio::test]
    async fn test_invalid_host_emits_single_error_event() {
        let sink = RecordingSink::new();
        execute_ping(&sink, "evil; rm -rf /", 4).await;
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DiagnosticEvent::PingError { .. }));
    }

    #[tokio::test]
    #[ignore = "requires network access and the ping binary"]
    async fn test_ping_loopback_real() {
        let sink = RecordingSink::new();
        execute_ping(&sink, "127.0.0.1", 1).await;
        let events = sink.events();
        assert!(matches!(
            events.first(),
            Some(DiagnosticEvent::PingStart { count: 1, .. })
        ));
        assert!(matches!(
            events.last(),
            Some(DiagnosticEvent::PingComplete { exit_code: 0, .. })
        ));
    }
}
