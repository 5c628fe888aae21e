//! Stateless service façade exposing all diagnostic sessions.
//!
//! Every method on [`DiagnosticService`] runs one complete session against
//! an [`EventSink`]: validation, subprocess execution, incremental parsing,
//! terminal summary. All failures are converted to a terminal `*-error`
//! event at this boundary; nothing propagates to the caller.

mod dns;
mod net_info;
mod ping;
mod traceroute;

pub use dns::{parse_dig_line, parse_dig_query_time, parse_nslookup_output};
pub use ping::{parse_ping_line, parse_ping_summary};
pub use traceroute::{is_traceroute_header, parse_traceroute_line, summarize_traceroute};

use crate::events::EventSink;
use crate::types::RecordType;

/// Entry point for all diagnostic sessions.
///
/// All methods are stateless associated functions — call them directly on
/// the type. Each drives one subprocess invocation and emits its events on
/// the given sink in output order.
///
/// ```rust,no_run
/// use netdiag_toolbox::{DiagnosticService, EventSink};
/// # async fn demo(sink: &dyn EventSink) {
/// DiagnosticService::ping(sink, "8.8.8.8", 4).await;
/// # }
/// ```
pub struct DiagnosticService;

impl DiagnosticService {
    /// Run a ping session: `ping -c <count> <host>`.
    ///
    /// `count` is clamped to 1–20. Emits `ping-start`, one `ping-line` per
    /// output line, then `ping-complete` (with a summary when the tool's
    /// statistics block was found), plus `ping-error` for stderr content
    /// or failures.
    pub async fn ping(sink: &dyn EventSink, host: &str, count: u32) {
        ping::execute_ping(sink, host, count).await;
    }

    /// Run a traceroute session: `traceroute -m <max_hops> <host>`.
    ///
    /// `max_hops` is clamped to 1–64. Emits `traceroute-start`,
    /// `traceroute-header` for the tool's banner, one `traceroute-hop` per
    /// hop, then `traceroute-complete`.
    pub async fn traceroute(sink: &dyn EventSink, host: &str, max_hops: u32) {
        traceroute::execute_traceroute(sink, host, max_hops).await;
    }

    /// Resolve DNS records: `dig +noall +answer +stats`, falling back to
    /// `nslookup` when dig is unavailable, exits non-zero, or prints
    /// nothing.
    ///
    /// `record_type` outside the supported set coerces to
    /// [`RecordType::A`]. Emits `dns-start` then `dns-complete` or
    /// `dns-error`.
    pub async fn dns_lookup(sink: &dyn EventSink, domain: &str, record_type: RecordType) {
        dns::execute_dns(sink, domain, record_type).await;
    }

    /// Collect local network information: hostname, interface addresses,
    /// default gateway, configured resolvers and the public IP.
    pub async fn network_info(sink: &dyn EventSink) {
        net_info::execute_network_info(sink).await;
    }
}
