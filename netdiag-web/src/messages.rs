//! Inbound client messages.
//!
//! A closed tagged union: anything whose `type` is not listed here fails
//! deserialization and is answered with a single `error` event instead of
//! being dispatched.

use serde::Deserialize;

/// One diagnostic request from a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Reachability probe: `{"type":"ping","payload":{"host":"…","count":4}}`.
    Ping { host: String, count: Option<u32> },
    /// Route trace: `{"type":"traceroute","payload":{"host":"…","maxHops":30}}`.
    Traceroute { host: String, max_hops: Option<u32> },
    /// Name resolution: `{"type":"dns","payload":{"domain":"…","recordType":"MX"}}`.
    Dns {
        #[serde(alias = "host")]
        domain: String,
        record_type: Option<String>,
    },
    /// Local network snapshot: `{"type":"network-info","payload":{}}`.
    NetworkInfo {},
}
