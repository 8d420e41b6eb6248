// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Family-filtering DNS for link-preview fetches.
//!
//! Implements `reqwest::dns::Resolve` on top of a resolver pointed at
//! Cloudflare for Families, which refuses malware and adult-content domains.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};

/// Cloudflare for Families: IPv4 primary and secondary, then IPv6.
pub const FAMILY_NAMESERVERS: [IpAddr; 4] = [
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 3)),
    IpAddr::V4(Ipv4Addr::new(1, 0, 0, 3)),
    IpAddr::V6(Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1113)),
    IpAddr::V6(Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1003)),
];

#[derive(Clone)]
pub struct FamilyDnsResolver {
    resolver: Arc<TokioAsyncResolver>,
}

impl FamilyDnsResolver {
    pub fn new() -> Self {
        Self::with_nameservers(&FAMILY_NAMESERVERS)
    }

    pub fn with_nameservers(ips: &[IpAddr]) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(ips, 53, true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        Self {
            resolver: Arc::new(TokioAsyncResolver::tokio(config, ResolverOpts::default())),
        }
    }
}

impl Default for FamilyDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for FamilyDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = Arc::clone(&self.resolver);
        let host = name.as_str().to_string();

        Box::pin(async move {
            let lookup = resolver
                .lookup_ip(host.as_str())
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;
            let resolved: Vec<SocketAddr> =
                lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            debug!(host = %host, count = resolved.len(), "resolved through family DNS");
            let addrs: Addrs = Box::new(resolved.into_iter());
            Ok(addrs)
        })
    }
}
