//! DNS resolver initialization.
//!
//! This module provides functions to initialize the DNS resolvers used by the
//! checks: the default recursive resolver, and throwaway resolvers pointed at
//! specific server addresses (authoritative nameservers or the public
//! resolvers of the propagation check).

use std::net::IpAddr;
use std::sync::Arc;

use hickory_resolver::config::{
    NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::TokioAsyncResolver;

use crate::query::QueryPolicy;

/// Initializes the default recursive resolver.
///
/// Uses hickory's default configuration (Google DNS: 8.8.8.8, 8.8.4.4) with
/// the policy's timeout, to prevent hanging on slow or unresponsive servers.
///
/// # Returns
///
/// A configured `TokioAsyncResolver` wrapped in `Arc` for sharing across tasks.
pub fn init_resolver(policy: &QueryPolicy) -> Arc<TokioAsyncResolver> {
    Arc::new(TokioAsyncResolver::tokio(
        ResolverConfig::default(),
        base_opts(policy),
    ))
}

/// Builds a resolver that talks only to the given server addresses over
/// plain UDP/TCP on port 53.
///
/// With `recursion` false the query goes out without the RD bit, which is
/// what direct queries against a zone's authoritative nameservers need; the
/// propagation check passes true because its targets are recursive servers.
pub fn resolver_for_ips(
    ips: &[IpAddr],
    policy: &QueryPolicy,
    recursion: bool,
) -> TokioAsyncResolver {
    let group = NameServerConfigGroup::from_ips_clear(ips, 53, true);
    let config = ResolverConfig::from_parts(None, vec![], group);
    let mut opts = base_opts(policy);
    opts.recursion_desired = recursion;
    TokioAsyncResolver::tokio(config, opts)
}

fn base_opts(policy: &QueryPolicy) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = policy.timeout;
    opts.attempts = 1; // retries are handled at the query layer
                       // Set ndots to 0 to prevent search domain appending
    opts.ndots = 0;
    opts
}
