//! The core of an authoritative DNS server: zone database lifecycle
//! management and AXFR-IN scheduling.
//!
//! Zones are loaded from a compiled on-disk form ([`zone_reader`]), kept
//! fresh by polling their configured masters on SOA-derived timers
//! ([`scheduler`]), and the live zone database is rebuilt and published
//! without interrupting readers whenever configuration changes
//! ([`reconcile`], [`db`]).

pub mod acl;
pub mod config;
pub mod db;
pub mod edns;
pub mod error;
pub mod interfaces;
pub mod log;
pub mod reconcile;
pub mod scheduler;
pub mod zone;
pub mod zone_reader;

pub use crate::config::Config;
pub use crate::db::{Host, ZoneDb};
pub use crate::error::CoreError;
pub use crate::zone::Zone;
