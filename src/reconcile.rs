//! For each configured zone, decide whether to reuse the in-memory copy,
//! reload it from disk, or (on a malformed name) abort reconciliation
//! early, then rebuild its ACLs and re-arm its AXFR-IN timers.

use std::str::FromStr;
use std::sync::Arc;

use domain::zonetree::StoredName;
use tracing::{error, warn};

use crate::acl::Acl;
use crate::config::{Config, ZoneConfig};
use crate::db::ZoneDb;
use crate::interfaces::Interfaces;
use crate::scheduler;
use crate::zone::Zone;
use crate::zone_reader::{self, CompiledZoneReader};

/// Compute a new [`ZoneDb`] from `old` and `conf`.
///
/// Returns the new database and the count of zones successfully carried
/// over or (re)loaded. Does not publish anything; that is [`crate::db::Host::update_db_from_config`]'s job.
pub fn reconcile(
    old: &ZoneDb,
    conf: &Config,
    reader: &dyn CompiledZoneReader,
    interfaces: &Arc<dyn Interfaces>,
) -> (ZoneDb, usize) {
    let mut new_db = ZoneDb::default();
    let mut inserted = 0;

    for zc in &conf.zones {
        let name = match StoredName::from_str(&zc.name) {
            Ok(name) => name,
            Err(err) => {
                error!("invalid zone name '{}': {err}; aborting reload", zc.name);
                return (new_db, inserted);
            }
        };

        let zone = match plan(old, reader, &name, zc) {
            Some(zone) => zone,
            None => continue,
        };

        rebuild_acls(&zone, zc);
        scheduler::timers_update(&zone, interfaces);

        new_db.insert(zone);
        inserted += 1;
    }

    (new_db, inserted)
}

/// Decide reload vs. carry-over for one zone, and act on it.
fn plan(
    old: &ZoneDb,
    reader: &dyn CompiledZoneReader,
    name: &StoredName,
    zc: &ZoneConfig,
) -> Option<Arc<Zone>> {
    if let Some(existing) = old.find_zone(name) {
        match zone_reader::compiled_mtime(&zc.file) {
            Ok(mtime) if mtime <= existing.version() => {
                return Some(existing);
            }
            Ok(_) => {
                // Stale; fall through to reload below.
            }
            Err(err) => {
                warn!(
                    "could not stat source file '{}' for '{name}', carrying over: {err}",
                    zc.file
                );
                return Some(existing);
            }
        }
    }

    match zone_reader::load(reader, name, zc.file.as_str(), &zc.db) {
        Ok(zone) => Some(zone),
        Err(err) => {
            error!("failed to load zone '{name}': {err}");
            None
        }
    }
}

/// Rebuild a zone's four ACLs and seed its `xfr_in.master` from the head
/// rule of its `xfr_in` ACL.
fn rebuild_acls(zone: &Arc<Zone>, zc: &ZoneConfig) {
    let xfr_out = Acl::rebuild(&zc.acl.xfr_out).unwrap_or_default();
    let xfr_in = Acl::rebuild(&zc.acl.xfr_in).unwrap_or_default();
    let notify_in = Acl::rebuild(&zc.acl.notify_in).unwrap_or_default();
    let notify_out = Acl::rebuild(&zc.acl.notify_out).unwrap_or_default();

    let master = xfr_in
        .first()
        .map(|ip| std::net::SocketAddr::new(ip, first_xfr_in_port(&zc.acl.xfr_in)));

    {
        let mut acl = zone.acl.lock().unwrap();
        acl.xfr_out = xfr_out;
        acl.xfr_in = xfr_in;
        acl.notify_in = notify_in;
        acl.notify_out = notify_out;
    }

    zone.xfr_in.lock().unwrap().master = master;
}

fn first_xfr_in_port(rules: &[crate::config::AclRuleConfig]) -> u16 {
    rules.first().map(|r| r.remote.port).unwrap_or(53)
}
