//! Wire protocol events and the output channel seam.
//!
//! Every event serializes as `{"type": "...", "data": {...}}` with a
//! kebab-case discriminant, matching what diagnostic clients consume.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DiagResult;
use crate::types::{
    DnsLookupOutcome, NetworkInfo, PingSample, PingSummary, RecordType, TracerouteHop,
};

/// Payload of a `ping-line` event: the raw line plus, when the line
/// matched a probe grammar, the parsed fields flattened alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingLineData {
    /// Raw output line as produced by ping.
    pub line: String,
    /// Parsed probe fields, absent for unmatched lines.
    #[serde(flatten)]
    pub sample: Option<PingSample>,
}

/// One event in a diagnostic session's output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum DiagnosticEvent {
    /// Greeting sent once per connection.
    Connected { message: String },

    /// Ping session accepted; `count` is the clamped probe count.
    PingStart { host: String, count: u32 },
    /// One line of ping output.
    PingLine(PingLineData),
    /// Ping session finished.
    PingComplete {
        host: String,
        exit_code: i32,
        summary: Option<PingSummary>,
    },
    /// Ping session failed, or ping wrote to stderr.
    PingError { error: String },

    /// Traceroute session accepted; `max_hops` is the clamped hop cap.
    TracerouteStart { host: String, max_hops: u32 },
    /// The tool's own header line, forwarded raw.
    TracerouteHeader { line: String },
    /// One parsed hop.
    TracerouteHop(TracerouteHop),
    /// Traceroute session finished.
    TracerouteComplete {
        host: String,
        total_hops: u32,
        reached_destination: bool,
        exit_code: i32,
    },
    /// Traceroute session failed.
    TracerouteError { error: String },

    /// DNS session accepted; `record_type` is the coerced type.
    DnsStart {
        domain: String,
        record_type: RecordType,
    },
    /// DNS session finished successfully.
    DnsComplete(DnsLookupOutcome),
    /// DNS session failed after exhausting both tools.
    DnsError { error: String },

    /// Network info collection started.
    NetworkInfoStart {},
    /// Network info collection finished.
    NetworkInfoComplete(NetworkInfo),
    /// Network info collection failed.
    NetworkInfoError { error: String },

    /// Inbound message was not understood.
    Error { message: String },
}

/// Message sink representing one connected client.
///
/// Implementations deliver events best-effort and in call order; a failed
/// send surfaces as [`DiagError::ChannelClosed`](crate::DiagError) so the
/// session can stop early when the client is gone.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event to the client.
    async fn send(&self, event: DiagnosticEvent) -> DiagResult<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_and_data_shape() {
        let event = DiagnosticEvent::PingStart {
            host: "8.8.8.8".to_string(),
            count: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ping-start");
        assert_eq!(json["data"]["host"], "8.8.8.8");
        assert_eq!(json["data"]["count"], 4);
    }

    #[test]
    fn test_event_discriminants_are_kebab_case() {
        let cases: Vec<(DiagnosticEvent, &str)> = vec![
            (
                DiagnosticEvent::TracerouteStart {
                    host: "h".to_string(),
                    max_hops: 30,
                },
                "traceroute-start",
            ),
            (
                DiagnosticEvent::DnsError {
                    error: "e".to_string(),
                },
                "dns-error",
            ),
            (DiagnosticEvent::NetworkInfoStart {}, "network-info-start"),
        ];
        for (event, expected) in cases {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], expected);
        }
    }

    #[test]
    fn test_event_fields_are_camel_case() {
        let event = DiagnosticEvent::TracerouteComplete {
            host: "example.com".to_string(),
            total_hops: 12,
            reached_destination: true,
            exit_code: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["totalHops"], 12);
        assert_eq!(json["data"]["reachedDestination"], true);
        assert_eq!(json["data"]["exitCode"], 0);
    }

    #[test]
    fn test_ping_line_flattens_sample() {
        let event = DiagnosticEvent::PingLine(PingLineData {
            line: "64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=4.52 ms".to_string(),
            sample: Some(PingSample {
                host: Some("8.8.8.8".to_string()),
                seq: Some(1),
                ttl: Some(117),
                time: Some(4.52),
                success: true,
            }),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["seq"], 1);
        assert_eq!(json["data"]["time"], 4.52);
        assert!(json["data"]["line"].as_str().unwrap().contains("icmp_seq"));
    }

    #[test]
    fn test_ping_line_without_sample_carries_only_line() {
        let event = DiagnosticEvent::PingLine(PingLineData {
            line: "PING 8.8.8.8 (8.8.8.8): 56 data bytes".to_string(),
            sample: None,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["data"].get("success").is_none());
        assert!(json["data"].get("line").is_some());
    }

    #[test]
    fn test_network_info_start_has_empty_data() {
        let json = serde_json::to_value(DiagnosticEvent::NetworkInfoStart {}).unwrap();
        assert_eq!(json["data"], serde_json::json!({}));
    }

    #[test]
    fn test_event_roundtrip() {
        let event = DiagnosticEvent::TracerouteHop(TracerouteHop {
            hop: 3,
            host: Some("router.local".to_string()),
            ip: Some("10.0.0.1".to_string()),
            times: vec![1.2, 1.4],
            timeout: false,
            partial_timeout: true,
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: DiagnosticEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
