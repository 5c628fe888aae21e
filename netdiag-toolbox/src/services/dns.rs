//! DNS session: dig and nslookup output grammars, fallback orchestration.
//!
//! dig is preferred for its machine-friendly answer section and query
//! statistics; when it is missing, exits non-zero, or prints nothing, the
//! session re-runs with nslookup and parses its chattier format instead.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DiagError, DiagResult};
use crate::events::{DiagnosticEvent, EventSink};
use crate::exec::{drain_stderr, launch, wait_exit, LineReader, SpawnedCommand};
use crate::types::{DnsLookupOutcome, DnsRecordEntry, DnsTool, RecordType};
use crate::validate::is_valid_domain;

/// dig statistics line: `;; Query time: 12 msec`.
static QUERY_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Query time:\s+(\d+)\s+msec").expect("query time pattern"));

/// nslookup resolver line: `Server:		192.168.1.1`.
static NS_SERVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Server:\s+(.+)").expect("server pattern"));

/// nslookup IPv4 answer: `Address: 142.250.199.46`.
static NS_ADDR_V4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Address:\s+(\d+\.\d+\.\d+\.\d+)").expect("ipv4 pattern"));

/// nslookup IPv6 answer; a match without a colon is a truncated IPv4 hit
/// and is discarded by the caller.
static NS_ADDR_V6: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Address:\s+([0-9a-fA-F:]+)").expect("ipv6 pattern"));

/// nslookup alias answer: `www.example.com  canonical name = example.com.`
static NS_CNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)canonical name\s*=\s*(.+)").expect("cname pattern"));

/// Extract the query time from a dig statistics line.
#[must_use]
pub fn parse_dig_query_time(line: &str) -> Option<u32> {
    QUERY_TIME
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parse one dig answer line: `name TTL IN TYPE VALUE…`.
///
/// Comment lines (leading `;`), section headers and blanks return `None`.
/// MX values carry the numeric preference in a separate field.
#[must_use]
pub fn parse_dig_line(line: &str) -> Option<DnsRecordEntry> {
    if line.starts_with(';') || line.contains("SECTION") || line.trim().is_empty() {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 || parts[2] != "IN" {
        return None;
    }

    let ttl = parts[1].parse().ok();
    let record_type = parts[3].to_string();

    if record_type == "MX" {
        let priority = parts[4].parse().ok();
        let value = parts[5..].join(" ").trim_end_matches('.').to_string();
        return Some(DnsRecordEntry {
            record_type,
            value,
            ttl,
            priority,
        });
    }

    let value = parts[4..].join(" ").trim_end_matches('.').to_string();
    Some(DnsRecordEntry {
        record_type,
        value,
        ttl,
        priority: None,
    })
}

/// Parse complete nslookup output into records and resolver addresses.
///
/// The grammar is stateful: address and alias lines only count once a
/// `Non-authoritative answer` / `Authoritative answer` marker has been
/// seen, so the resolver's own address block is never misread as an
/// answer.
#[must_use]
pub fn parse_nslookup_output(lines: &[String]) -> (Vec<DnsRecordEntry>, Vec<String>) {
    let mut records: Vec<DnsRecordEntry> = Vec::new();
    let mut name_servers: Vec<String> = Vec::new();
    let mut in_answer = false;

    for line in lines {
        if line.contains("Server:") {
            if let Some(caps) = NS_SERVER.captures(line) {
                name_servers.push(caps[1].trim().to_string());
            }
        }

        if line.contains("Non-authoritative answer") || line.contains("Authoritative answer") {
            in_answer = true;
            continue;
        }

        if !in_answer {
            continue;
        }

        if let Some(caps) = NS_ADDR_V4.captures(line) {
            records.push(DnsRecordEntry {
                record_type: "A".to_string(),
                value: caps[1].to_string(),
                ttl: None,
                priority: None,
            });
        }

        if let Some(caps) = NS_ADDR_V6.captures(line) {
            let value = caps[1].to_string();
            if value.contains(':') {
                records.push(DnsRecordEntry {
                    record_type: "AAAA".to_string(),
                    value,
                    ttl: None,
                    priority: None,
                });
            }
        }

        if let Some(caps) = NS_CNAME.captures(line) {
            let value = caps[1].trim().trim_end_matches('.').to_string();
            records.push(DnsRecordEntry {
                record_type: "CNAME".to_string(),
                value,
                ttl: None,
                priority: None,
            });
        }
    }

    (records, name_servers)
}

/// Run one complete DNS session against the sink.
pub(super) async fn execute_dns(sink: &dyn EventSink, domain: &str, record_type: RecordType) {
    if !is_valid_domain(domain) {
        let _ = sink
            .send(DiagnosticEvent::DnsError {
                error: "Invalid domain: only letters, digits, dots and hyphens are allowed"
                    .to_string(),
            })
            .await;
        return;
    }

    if let Err(e) = run_dns(sink, domain, record_type).await {
        if e.is_expected() {
            log::warn!("dns lookup {domain} failed: {e}");
        } else {
            log::error!("dns lookup {domain} failed: {e}");
        }
        let _ = sink
            .send(DiagnosticEvent::DnsError {
                error: e.to_string(),
            })
            .await;
    }
}

async fn run_dns(sink: &dyn EventSink, domain: &str, record_type: RecordType) -> DiagResult<()> {
    sink.send(DiagnosticEvent::DnsStart {
        domain: domain.to_string(),
        record_type,
    })
    .await?;

    let outcome = match try_dig(domain, record_type).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => {
            log::debug!("dig produced no usable output for {domain}, trying nslookup");
            run_nslookup(domain, record_type).await?
        }
        Err(e) => {
            log::debug!("dig unavailable for {domain} ({e}), trying nslookup");
            run_nslookup(domain, record_type).await?
        }
    };

    sink.send(DiagnosticEvent::DnsComplete(outcome)).await?;
    Ok(())
}

/// Attempt the dig invocation. `Ok(None)` means dig ran but its result is
/// unusable (non-zero exit or empty output) and the caller should fall
/// back.
async fn try_dig(domain: &str, record_type: RecordType) -> DiagResult<Option<DnsLookupOutcome>> {
    let type_arg = record_type.to_string();
    let SpawnedCommand {
        stdout,
        stderr: _stderr,
        mut child,
    } = launch("dig", &["+noall", "+answer", "+stats", domain, &type_arg])?;

    let mut reader = LineReader::new(stdout);
    let mut records: Vec<DnsRecordEntry> = Vec::new();
    let mut query_time: Option<u32> = None;
    let mut saw_output = false;

    while let Some(line) = reader.next_line().await? {
        if !line.trim().is_empty() {
            saw_output = true;
        }
        // the statistics line starts with `;;`, so check it before the
        // comment skip inside parse_dig_line
        if let Some(time) = parse_dig_query_time(&line) {
            query_time = Some(time);
            continue;
        }
        if let Some(record) = parse_dig_line(&line) {
            records.push(record);
        }
    }

    let exit_code = wait_exit(&mut child).await?;
    if exit_code != 0 || !saw_output {
        return Ok(None);
    }

    Ok(Some(DnsLookupOutcome {
        domain: domain.to_string(),
        records,
        name_servers: None,
        query_time,
        record_type,
        tool: DnsTool::Dig,
    }))
}

async fn run_nslookup(domain: &str, record_type: RecordType) -> DiagResult<DnsLookupOutcome> {
    let SpawnedCommand {
        stdout,
        stderr,
        mut child,
    } = launch("nslookup", &[domain])?;

    let mut reader = LineReader::new(stdout);
    let mut lines: Vec<String> = Vec::new();
    while let Some(line) = reader.next_line().await? {
        lines.push(line);
    }

    let exit_code = wait_exit(&mut child).await?;
    if exit_code != 0 {
        let err_text = drain_stderr(stderr).await;
        let message = if err_text.is_empty() {
            "DNS resolution failed".to_string()
        } else {
            err_text
        };
        return Err(DiagError::Execution(message));
    }

    let (records, name_servers) = parse_nslookup_output(&lines);
    Ok(DnsLookupOutcome {
        domain: domain.to_string(),
        records,
        name_servers: (!name_servers.is_empty()).then_some(name_servers),
        query_time: None,
        record_type,
        tool: DnsTool::Nslookup,
    })
}
