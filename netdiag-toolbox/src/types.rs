//! Public types produced by diagnostic sessions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// DNS record type accepted for lookup requests.
///
/// The set is closed; anything outside it coerces to [`A`](Self::A) via
/// [`coerce`](Self::coerce) so a malformed request degrades to the default
/// query instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Name server record.
    Ns,
    /// Text record.
    Txt,
    /// Query all record types.
    Any,
}

impl RecordType {
    /// Parse a record type, falling back to `A` for anything unrecognized.
    #[must_use]
    pub fn coerce(s: &str) -> Self {
        s.parse().unwrap_or(Self::A)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Cname => write!(f, "CNAME"),
            Self::Mx => write!(f, "MX"),
            Self::Ns => write!(f, "NS"),
            Self::Txt => write!(f, "TXT"),
            Self::Any => write!(f, "ANY"),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "TXT" => Ok(Self::Txt),
            "ANY" => Ok(Self::Any),
            _ => Err(format!("Unsupported record type: {s}")),
        }
    }
}

/// One parsed ping probe, response or timeout.
///
/// Response lines carry every field; timeout lines carry at most `seq`
/// with `success` false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingSample {
    /// Responding host as printed by ping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// ICMP sequence number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    /// Remaining time-to-live reported by the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Round-trip time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Whether a reply was received for this probe.
    pub success: bool,
}

/// Terminal ping statistics, derived from the full output once the
/// process has exited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingSummary {
    /// Probes sent.
    pub transmitted: u32,
    /// Replies received.
    pub received: u32,
    /// Packet loss percentage.
    pub loss_percent: f64,
    /// Minimum round-trip time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_time: Option<f64>,
    /// Average round-trip time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_time: Option<f64>,
    /// Maximum round-trip time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time: Option<f64>,
}

/// One traceroute hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteHop {
    /// Hop number, starting at 1.
    pub hop: u32,
    /// Reverse-resolved name, when it differs from the address.
    pub host: Option<String>,
    /// Router address for this hop.
    pub ip: Option<String>,
    /// Per-probe round-trip times in milliseconds, left to right.
    pub times: Vec<f64>,
    /// True when no probe got an answer (`* * *`).
    pub timeout: bool,
    /// True when the line shows `*` for some probes but not all.
    pub partial_timeout: bool,
}

/// Terminal traceroute outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteOutcome {
    /// Number of hop records parsed, timeouts included.
    pub total_hops: u32,
    /// Whether any hop answered with an address.
    pub reached_destination: bool,
    /// Exit code of the traceroute process.
    pub exit_code: i32,
}

/// A single DNS record extracted from dig or nslookup output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordEntry {
    /// Record type as printed by the tool (e.g. `"A"`, `"MX"`).
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value with any trailing dot stripped.
    pub value: String,
    /// Time-to-live in seconds (dig output only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// MX preference value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// Which external tool produced a DNS result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsTool {
    Dig,
    Nslookup,
}

impl fmt::Display for DnsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dig => write!(f, "dig"),
            Self::Nslookup => write!(f, "nslookup"),
        }
    }
}

/// Assembled DNS lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsLookupOutcome {
    /// Queried domain.
    pub domain: String,
    /// Extracted records.
    pub records: Vec<DnsRecordEntry>,
    /// Resolver addresses seen in nslookup output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
    /// Query time in milliseconds (dig output only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<u32>,
    /// Record type the query asked for.
    pub record_type: RecordType,
    /// Tool whose grammar produced the records.
    pub tool: DnsTool,
}

/// A local network interface address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceAddr {
    /// Interface name (e.g. `"eth0"`).
    pub name: String,
    /// IPv4 address with prefix length, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    /// IPv6 address with prefix length, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

/// Snapshot of the local machine's network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Local hostname.
    pub hostname: String,
    /// Interface addresses, one entry per interface.
    pub interfaces: Vec<InterfaceAddr>,
    /// Default gateway address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_gateway: Option<String>,
    /// Public IP as seen from the internet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Configured DNS resolvers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
}
