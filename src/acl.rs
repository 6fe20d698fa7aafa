//! Rebuilds one of a zone's four access-control lists from a list of
//! configured remotes. An ACL is an ordered set of address rules with an
//! implicit default action of DENY; every rule that was successfully
//! resolved from configuration carries an explicit ACCEPT.

use std::fmt;
use std::net::IpAddr;

use tracing::warn;

use crate::config::AclRuleConfig;

/// An access-control list: an ordered set of accepted addresses.
///
/// Addresses not present default to DENY.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acl {
    accepted: Vec<IpAddr>,
}

impl Acl {
    /// Whether this ACL has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Evaluate this ACL against an address: ACCEPT if listed, DENY otherwise.
    pub fn matches(&self, addr: IpAddr) -> bool {
        self.accepted.contains(&addr)
    }

    /// The first accepted address, if any.
    ///
    /// Used by the reconciler to seed a zone's `xfr_in.master` from the
    /// head rule of its `xfr_in` ACL.
    pub fn first(&self) -> Option<IpAddr> {
        self.accepted.first().copied()
    }

    /// Rebuild an ACL from a list of configured rules.
    ///
    /// Rules whose remote address fails to resolve are logged and skipped;
    /// they do not abort the rebuild. There is no reachable out-of-memory
    /// case in this implementation (see [`crate::error::CoreError`]).
    pub fn rebuild(rules: &[AclRuleConfig]) -> Result<Acl, AclError> {
        let mut accepted = Vec::with_capacity(rules.len());
        for rule in rules {
            match resolve(&rule.remote.address) {
                Ok(addr) => accepted.push(addr),
                Err(err) => {
                    warn!(
                        "skipping unresolvable ACL rule '{}': {err}",
                        rule.remote.address
                    );
                }
            }
        }
        Ok(Acl { accepted })
    }
}

/// Parse a configured remote's address.
///
/// Remotes are configured as literal addresses, not hostnames; this is a
/// parse, not a DNS lookup, matching how a configured remote's address is
/// combined with its family and port rather than resolved over the network.
fn resolve(host: &str) -> Result<IpAddr, std::net::AddrParseError> {
    host.parse::<IpAddr>()
}

/// An error rebuilding an ACL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AclError {
    /// The rule list reference was malformed.
    InvalidParam(String),
}

impl std::error::Error for AclError {}

impl fmt::Display for AclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParam(reason) => write!(f, "invalid ACL rule list: {reason}"),
        }
    }
}
