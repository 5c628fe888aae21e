//! Local network information: hostname, interfaces, gateway, resolvers,
//! public IP.
//!
//! Everything except the hostname is best-effort; a sub-collector that
//! fails simply leaves its field empty.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::{DiagError, DiagResult};
use crate::events::{DiagnosticEvent, EventSink};
use crate::exec::{launch, wait_exit, LineReader, SpawnedCommand};
use crate::types::{InterfaceAddr, NetworkInfo};

/// Shared HTTP client for the public-IP endpoint.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

const PUBLIC_IP_ENDPOINT: &str = "https://api.ipify.org?format=json";
const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);

/// BSD `route -n get default` gateway line.
static GATEWAY_BSD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gateway:\s+(\S+)").expect("bsd gateway pattern"));

/// Linux `ip route show default` gateway token.
static GATEWAY_LINUX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"via\s+(\S+)").expect("linux gateway pattern"));

/// resolv.conf nameserver line.
static NAMESERVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^nameserver\s+(\S+)").expect("nameserver pattern"));

/// `ip -o addr show` IPv4 line: `2: eth0    inet 192.168.1.10/24 …`.
static ADDR_V4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:\s+(\S+)\s+inet\s+(\S+)").expect("inet pattern"));

/// `ip -o addr show` IPv6 line.
static ADDR_V6: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:\s+(\S+)\s+inet6\s+(\S+)").expect("inet6 pattern"));

#[derive(Deserialize)]
struct IpifyResponse {
    ip: String,
}

/// Extract the default gateway from BSD `route` output.
#[must_use]
pub fn extract_gateway_bsd(output: &str) -> Option<String> {
    GATEWAY_BSD.captures(output).map(|caps| caps[1].to_string())
}

/// Extract the default gateway from Linux `ip route` output.
#[must_use]
pub fn extract_gateway_linux(output: &str) -> Option<String> {
    GATEWAY_LINUX
        .captures(output)
        .map(|caps| caps[1].to_string())
}

/// Extract resolver addresses from resolv.conf content.
#[must_use]
pub fn parse_resolv_conf(content: &str) -> Vec<String> {
    NAMESERVER
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Fold `ip -o addr show` lines into per-interface address entries.
///
/// The first IPv4 address per interface wins; for IPv6 a global address
/// replaces a link-local one.
#[must_use]
pub fn parse_ip_addr_output(lines: &[String]) -> Vec<InterfaceAddr> {
    let mut interfaces: Vec<InterfaceAddr> = Vec::new();

    let entry_for = |name: &str, interfaces: &mut Vec<InterfaceAddr>| -> usize {
        if let Some(pos) = interfaces.iter().position(|i| i.name == name) {
            return pos;
        }
        interfaces.push(InterfaceAddr {
            name: name.to_string(),
            ipv4: None,
            ipv6: None,
        });
        interfaces.len() - 1
    };

    for line in lines {
        if let Some(caps) = ADDR_V6.captures(line) {
            let idx = entry_for(&caps[1], &mut interfaces);
            let addr = caps[2].to_string();
            let link_local = addr.starts_with("fe80:");
            if !link_local || interfaces[idx].ipv6.is_none() {
                interfaces[idx].ipv6 = Some(addr);
            }
        } else if let Some(caps) = ADDR_V4.captures(line) {
            let idx = entry_for(&caps[1], &mut interfaces);
            if interfaces[idx].ipv4.is_none() {
                interfaces[idx].ipv4 = Some(caps[2].to_string());
            }
        }
    }

    interfaces
}

/// Run a short-lived command and capture its full stdout as text.
async fn capture_output(binary: &str, args: &[&str]) -> DiagResult<String> {
    let SpawnedCommand {
        stdout,
        stderr: _stderr,
        mut child,
    } = launch(binary, args)?;

    let mut reader = LineReader::new(stdout);
    let mut output = String::new();
    while let Some(line) = reader.next_line().await? {
        output.push_str(&line);
        output.push('\n');
    }
    wait_exit(&mut child).await?;
    Ok(output)
}

async fn detect_default_gateway() -> Option<String> {
    if let Ok(output) = capture_output("route", &["-n", "get", "default"]).await {
        if let Some(gateway) = extract_gateway_bsd(&output) {
            return Some(gateway);
        }
    }
    let output = capture_output("ip", &["route", "show", "default"]).await.ok()?;
    extract_gateway_linux(&output)
}

async fn read_dns_servers() -> Vec<String> {
    match tokio::fs::read_to_string("/etc/resolv.conf").await {
        Ok(content) => parse_resolv_conf(&content),
        Err(e) => {
            log::debug!("could not read resolv.conf: {e}");
            Vec::new()
        }
    }
}

async fn fetch_public_ip() -> Option<String> {
    let request = async {
        let response = HTTP_CLIENT.get(PUBLIC_IP_ENDPOINT).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json::<IpifyResponse>().await.ok().map(|r| r.ip)
    };
    match tokio::time::timeout(PUBLIC_IP_TIMEOUT, request).await {
        Ok(ip) => ip,
        Err(_) => {
            log::debug!("public IP lookup timed out");
            None
        }
    }
}

async fn collect_interfaces() -> Vec<InterfaceAddr> {
    match capture_output("ip", &["-o", "addr", "show"]).await {
        Ok(output) => {
            let lines: Vec<String> = output.lines().map(str::to_string).collect();
            parse_ip_addr_output(&lines)
        }
        Err(e) => {
            log::debug!("interface enumeration unavailable: {e}");
            Vec::new()
        }
    }
}

/// Run one network-info collection against the sink.
pub(super) async fn execute_network_info(sink: &dyn EventSink) {
    if let Err(e) = run_network_info(sink).await {
        if e.is_expected() {
            log::warn!("network info collection failed: {e}");
        } else {
            log::error!("network info collection failed: {e}");
        }
        let _ = sink
            .send(DiagnosticEvent::NetworkInfoError {
                error: e.to_string(),
            })
            .await;
    }
}

async fn run_network_info(sink: &dyn EventSink) -> DiagResult<()> {
    sink.send(DiagnosticEvent::NetworkInfoStart {}).await?;

    let hostname = capture_output("hostname", &[]).await?.trim().to_string();
    if hostname.is_empty() {
        return Err(DiagError::Execution(
            "hostname produced no output".to_string(),
        ));
    }

    let interfaces = collect_interfaces().await;
    let (default_gateway, dns_servers, public_ip) = futures::future::join3(
        detect_default_gateway(),
        read_dns_servers(),
        fetch_public_ip(),
    )
    .await;

    sink.send(DiagnosticEvent::NetworkInfoComplete(NetworkInfo {
        hostname,
        interfaces,
        default_gateway,
        public_ip,
        dns_servers: (!dns_servers.is_empty()).then_some(dns_servers),
    }))
    .await?;

    Ok(())
}
