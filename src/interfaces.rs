//! The network-interface side of AXFR-IN polling.
//!
//! Selecting a UDP socket whose address family matches a master and
//! sending it a SOA query belongs to the AF_XDP fast-path socket layer,
//! which is out of scope for this crate. The scheduler only depends on
//! this trait; production wiring implements it over the real socket
//! layer, tests implement it over an in-memory fake.

use std::io;
use std::net::SocketAddr;

/// A source of outbound SOA queries to zone masters.
pub trait Interfaces: Send + Sync {
    /// Send a SOA query to `master`, returning the query's wire message ID.
    fn send_soa_query(&self, master: SocketAddr) -> io::Result<u16>;
}

/// An [`Interfaces`] that has no usable sockets.
///
/// Useful as a placeholder before the real socket layer is wired in; every
/// send fails, which the scheduler treats as a transient error and simply
/// retries on the next timer firing.
#[derive(Debug, Default)]
pub struct NoInterfaces;

impl Interfaces for NoInterfaces {
    fn send_soa_query(&self, master: SocketAddr) -> io::Result<u16> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            format!("no network interface is bound to reach {master}"),
        ))
    }
}
