//! Streaming network diagnostics over external tools.
//!
//! Runs `ping`, `traceroute`, `dig`/`nslookup` and friends as subprocesses
//! with fixed argument vectors, re-chunks their output into lines as it
//! arrives, parses each line into a structured record, and emits one event
//! per line on an [`EventSink`] followed by a terminal summary. All state is
//! transient per invocation.

mod error;
mod events;
mod exec;
mod services;
mod types;
mod validate;

#[cfg(test)]
mod test_utils;

pub use error::{DiagError, DiagResult};
pub use events::{DiagnosticEvent, EventSink, PingLineData};
pub use exec::{drain_stderr, launch, wait_exit, LineReader, SpawnedCommand};
pub use services::{
    is_traceroute_header, parse_dig_line, parse_dig_query_time, parse_nslookup_output,
    parse_ping_line, parse_ping_summary, parse_traceroute_line, summarize_traceroute,
    DiagnosticService,
};
pub use types::{
    DnsLookupOutcome, DnsRecordEntry, DnsTool, InterfaceAddr, NetworkInfo, PingSample,
    PingSummary, RecordType, TracerouteHop, TracerouteOutcome,
};
pub use validate::{clamp_count, clamp_max_hops, is_valid_domain, is_valid_target};
