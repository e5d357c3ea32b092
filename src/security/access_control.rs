//! IP allow-list middleware.
//! Admits only clients whose address matches a configured address or CIDR range.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::observability::metrics;

/// Reasons an allow-list entry cannot be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllowListError {
    #[error("'{0}' is not an IP address")]
    Address(String),

    #[error("'{0}' has an invalid prefix length")]
    PrefixLength(String),

    #[error("'{0}' has host bits set beyond its prefix")]
    HostBits(String),
}

/// A single allowed address or an address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListEntry {
    Single(IpAddr),
    Range { network: IpAddr, prefix_len: u8 },
}

impl FromStr for AllowListEntry {
    type Err = AllowListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((addr, len)) = s.split_once('/') else {
            return s
                .parse::<IpAddr>()
                .map(AllowListEntry::Single)
                .map_err(|_| AllowListError::Address(s.to_string()));
        };

        let network: IpAddr = addr
            .parse()
            .map_err(|_| AllowListError::Address(s.to_string()))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| AllowListError::PrefixLength(s.to_string()))?;

        let max_len = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_len {
            return Err(AllowListError::PrefixLength(s.to_string()));
        }
        if masked(network, prefix_len) != network {
            return Err(AllowListError::HostBits(s.to_string()));
        }

        Ok(AllowListEntry::Range {
            network,
            prefix_len,
        })
    }
}

impl AllowListEntry {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match *self {
            AllowListEntry::Single(allowed) => allowed == ip,
            AllowListEntry::Range {
                network,
                prefix_len,
            } => {
                // Mixed families never match.
                network.is_ipv4() == ip.is_ipv4() && masked(ip, prefix_len) == network
            }
        }
    }
}

/// Zero every bit after the first `prefix_len`.
fn masked(ip: IpAddr, prefix_len: u8) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
            IpAddr::V4((u32::from(v4) & mask).into())
        }
        IpAddr::V6(v6) => {
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0);
            IpAddr::V6((u128::from(v6) & mask).into())
        }
    }
}

/// Static list of allowed addresses and ranges.
#[derive(Debug, Clone, Default)]
pub struct CidrAllowList {
    entries: Vec<AllowListEntry>,
}

impl CidrAllowList {
    /// Parse entries, logging and skipping the malformed ones.
    pub fn from_entries<S: AsRef<str>>(raw: &[S]) -> Self {
        let entries = raw
            .iter()
            .filter_map(|entry| match entry.as_ref().parse::<AllowListEntry>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::error!(entry = %entry.as_ref(), error = %e, "Skipping malformed allow-list entry");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a textual client address. Unparseable addresses are denied.
    pub fn is_allowed(&self, client: &str) -> bool {
        match client.parse::<IpAddr>() {
            Ok(ip) => self.is_allowed_ip(ip),
            Err(_) => {
                tracing::warn!(client = %client, "Client address is not an IP address");
                false
            }
        }
    }

    pub fn is_allowed_ip(&self, ip: IpAddr) -> bool {
        // IPv4-mapped IPv6 peers (dual-stack sockets) are compared as IPv4.
        let ip = ip.to_canonical();
        match self.entries.iter().find(|entry| entry.contains(ip)) {
            Some(entry) => {
                tracing::debug!(client = %ip, entry = ?entry, "Client matched allow-list");
                true
            }
            None => false,
        }
    }
}

/// Middleware function enforcing the IP allow-list.
pub async fn ip_allow_list_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(allow_list): State<Arc<CidrAllowList>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if allow_list.is_allowed_ip(addr.ip()) {
        return next.run(request).await;
    }

    tracing::warn!(
        client = %addr.ip(),
        path = %request.uri().path(),
        "Blocked request from unauthorized IP"
    );
    metrics::record_rejection("ip_denied");
    ApiError::IpDenied.into_response()
}
