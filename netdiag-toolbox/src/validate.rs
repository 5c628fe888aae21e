//! Input validation for diagnostic targets.
//!
//! Targets end up in the argv of a spawned process, so everything outside a
//! strict allow-list is rejected before a command is ever constructed. The
//! argv is never passed through a shell; together with these checks that
//! closes the injection surface.

/// Longest name accepted, matching the DNS limit.
const MAX_TARGET_LEN: usize = 253;

/// Probe count bounds for ping `-c`.
pub const PING_COUNT_RANGE: (u32, u32) = (1, 20);

/// Hop cap bounds for traceroute `-m`.
pub const MAX_HOPS_RANGE: (u32, u32) = (1, 64);

/// Whether `host` is acceptable as a ping/traceroute target.
///
/// Accepts 1–253 characters drawn from ASCII letters, digits, dot, hyphen
/// and colon (for IPv6 literals). Anything else, including whitespace and
/// Unicode, is rejected.
#[must_use]
pub fn is_valid_target(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_TARGET_LEN {
        return false;
    }
    host.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b':')
}

/// Whether `domain` is acceptable as a DNS lookup target.
///
/// Same allow-list as [`is_valid_target`] minus the colon: DNS queries
/// take names, not IPv6 literals.
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_TARGET_LEN {
        return false;
    }
    domain
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

/// Clamp a requested ping probe count into the allowed range.
#[must_use]
pub fn clamp_count(count: u32) -> u32 {
    count.clamp(PING_COUNT_RANGE.0, PING_COUNT_RANGE.1)
}

/// Clamp a requested traceroute hop cap into the allowed range.
#[must_use]
pub fn clamp_max_hops(max_hops: u32) -> u32 {
    max_hops.clamp(MAX_HOPS_RANGE.0, MAX_HOPS_RANGE.1)
}
