//! Traceroute session: hop grammar, completion aggregation, orchestration.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DiagResult;
use crate::events::{DiagnosticEvent, EventSink};
use crate::exec::{drain_stderr, launch, wait_exit, LineReader, SpawnedCommand};
use crate::types::{TracerouteHop, TracerouteOutcome};
use crate::validate::{clamp_max_hops, is_valid_target};

/// Leading hop number: ` 2  ...`.
static HOP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+").expect("hop prefix pattern"));

/// `name (ip)` pair after the hop number.
static HOST_IP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+([^\s(]+)\s+\(([^)]+)\)").expect("host/ip pattern"));

/// Bare dotted-quad after the hop number (Linux numeric output).
static IP_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\s+(\d+\.\d+\.\d+\.\d+)\s+").expect("bare ip pattern")
});

/// One round-trip sample, `1.234 ms`.
static TIME_MS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*ms").expect("time pattern"));

/// Whether this is the tool's own banner line rather than a hop.
#[must_use]
pub fn is_traceroute_header(line: &str) -> bool {
    line.contains("traceroute to")
}

/// Parse one hop line.
///
/// Returns `None` for blank lines, the banner, and anything without a
/// leading hop number. `* * *` yields a full-timeout hop; otherwise all
/// `<float> ms` samples on the line are collected in order, and
/// `partial_timeout` marks lines where some probes answered and some
/// printed `*`.
#[must_use]
pub fn parse_traceroute_line(line: &str) -> Option<TracerouteHop> {
    if line.trim().is_empty() || is_traceroute_header(line) {
        return None;
    }

    let hop: u32 = HOP_PREFIX.captures(line)?.get(1)?.as_str().parse().ok()?;

    if line.contains("* * *") {
        return Some(TracerouteHop {
            hop,
            host: None,
            ip: None,
            times: Vec::new(),
            timeout: true,
            partial_timeout: false,
        });
    }

    let mut host: Option<String> = None;
    let mut ip: Option<String> = None;

    if let Some(caps) = HOST_IP.captures(line) {
        let name = caps[1].to_string();
        let addr = caps[2].to_string();
        // `ip (ip)` carries no name information
        if name != addr {
            host = Some(name);
        }
        ip = Some(addr);
    } else if let Some(caps) = IP_ONLY.captures(line) {
        ip = Some(caps[1].to_string());
    }

    let times: Vec<f64> = TIME_MS
        .captures_iter(line)
        .filter_map(|caps| caps[1].parse().ok())
        .collect();

    let partial_timeout = line.contains('*') && times.len() < 3;
    let timeout = times.is_empty();

    Some(TracerouteHop {
        hop,
        host,
        ip,
        times,
        timeout,
        partial_timeout,
    })
}

/// Derive the terminal outcome from the accumulated hop records.
#[must_use]
pub fn summarize_traceroute(hops: &[TracerouteHop], exit_code: i32) -> TracerouteOutcome {
    TracerouteOutcome {
        total_hops: u32::try_from(hops.len()).unwrap_or(u32::MAX),
        reached_destination: hops.iter().any(|h| h.ip.is_some() && !h.timeout),
        exit_code,
    }
}

/// Run one complete traceroute session against the sink.
pub(super) async fn execute_traceroute(sink: &dyn EventSink, host: &str, max_hops: u32) {
    if !is_valid_target(host) {
        let _ = sink
            .send(DiagnosticEvent::TracerouteError {
                error: "Invalid host: only letters, digits, dots, hyphens and colons are allowed"
                    .to_string(),
            })
            .await;
        return;
    }

    let max_hops = clamp_max_hops(max_hops);
    if let Err(e) = run_traceroute(sink, host, max_hops).await {
        if e.is_expected() {
            log::warn!("traceroute {host} failed: {e}");
        } else {
            log::error!("traceroute {host} failed: {e}");
        }
        let _ = sink
            .send(DiagnosticEvent::TracerouteError {
                error: e.to_string(),
            })
            .await;
    }
}

async fn run_traceroute(sink: &dyn EventSink, host: &str, max_hops: u32) -> DiagResult<()> {
    sink.send(DiagnosticEvent::TracerouteStart {
        host: host.to_string(),
        max_hops,
    })
    .await?;

    let hops_arg = max_hops.to_string();
    let SpawnedCommand {
        stdout,
        stderr,
        mut child,
    } = launch("traceroute", &["-m", &hops_arg, host])?;

    let mut reader = LineReader::new(stdout);
    let mut hops: Vec<TracerouteHop> = Vec::new();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(hop) = parse_traceroute_line(&line) {
            hops.push(hop.clone());
            sink.send(DiagnosticEvent::TracerouteHop(hop)).await?;
        } else if is_traceroute_header(&line) {
            sink.send(DiagnosticEvent::TracerouteHeader { line }).await?;
        }
    }

    let exit_code = wait_exit(&mut child).await?;

    let err_text = drain_stderr(stderr).await;
    if !err_text.is_empty() && exit_code != 0 {
        sink.send(DiagnosticEvent::TracerouteError { error: err_text })
            .await?;
    }

    let outcome = summarize_traceroute(&hops, exit_code);
    sink.send(DiagnosticEvent::TracerouteComplete {
        host: host.to_string(),
        total_hops: outcome.total_hops,
        reached_destination: outcome.reached_destination,
        exit_code: outcome.exit_code,
    })
    .await?;

    Ok(())
}
