//! The zone database and its atomic publication.

use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use domain::zonetree::StoredName;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CoreError;
use crate::interfaces::Interfaces;
use crate::reconcile;
use crate::zone::Zone;
use crate::zone_reader::CompiledZoneReader;

/// An immutable-once-published mapping from apex name to [`Zone`].
///
/// Readers (the query processor) only ever see a `ZoneDb` through an
/// `Arc`; once published, a `ZoneDb`'s zone set never changes (individual
/// zones may still mutate their own `xfr_in`/`availability` fields under
/// their own locks).
#[derive(Clone, Default)]
pub struct ZoneDb {
    zones: foldhash::HashMap<StoredName, Arc<Zone>>,
}

impl ZoneDb {
    pub fn find_zone(&self, name: &StoredName) -> Option<Arc<Zone>> {
        self.zones.get(name).cloned()
    }

    pub fn insert(&mut self, zone: Arc<Zone>) {
        self.zones.insert(zone.name.clone(), zone);
    }

    pub fn remove(&mut self, name: &StoredName) -> Option<Arc<Zone>> {
        self.zones.remove(name)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &StoredName> {
        self.zones.keys()
    }
}

/// The process-wide handle to the live zone database, plus the
/// collaborators the reconciler needs to rebuild it.
///
/// The `Arc<ArcSwap<ZoneDb>>` pairing is an RCU-style publication
/// mechanism: publication is [`ArcSwap::swap`], and the "grace period"
/// before the old database may be freed is simply whichever readers are
/// still holding an `Arc` to it.
pub struct Host {
    pub zone_db: Arc<ArcSwap<ZoneDb>>,
    pub interfaces: Arc<dyn Interfaces>,
    pub reader: Arc<dyn CompiledZoneReader>,
}

impl Host {
    pub fn new(interfaces: Arc<dyn Interfaces>, reader: Arc<dyn CompiledZoneReader>) -> Self {
        Self {
            zone_db: Arc::new(ArcSwap::from_pointee(ZoneDb::default())),
            interfaces,
            reader,
        }
    }

    /// `find_zone`: the query processor's sole entry point into the zone
    /// database. Never mutates.
    pub fn find_zone(&self, name: &StoredName) -> Option<Arc<Zone>> {
        self.zone_db.load().find_zone(name)
    }

    /// Rebuild the zone database from `conf` and publish it.
    ///
    /// Returns the number of zones successfully inserted into the new
    /// database. Per-zone failures are logged and skipped; only a missing
    /// current database is fatal to the reload.
    pub fn update_db_from_config(&self, conf: &Config) -> Result<usize, CoreError> {
        let old = self.zone_db.load_full();

        let total = conf.zones.len();
        info!("Loading {total} zones");

        let (new_db, inserted) =
            reconcile::reconcile(&old, conf, self.reader.as_ref(), &self.interfaces);

        if inserted != total {
            warn!("Loaded {inserted} of {total} zones");
        } else {
            info!("Loaded {inserted} of {total} zones");
        }

        let configured: foldhash::HashSet<StoredName> = conf
            .zones
            .iter()
            .filter_map(|z| StoredName::from_str(&z.name).ok())
            .collect();

        // Zones carried into `new_db` are shared with `old`; anything in
        // `old` whose name is no longer configured is what the caller must
        // let go of once all of its readers have drained.
        let dropped: Vec<StoredName> = old
            .names()
            .filter(|name| !configured.contains(*name))
            .cloned()
            .collect();

        self.zone_db.store(Arc::new(new_db));

        for name in &dropped {
            info!("Zone '{name}' is no longer configured; dropping it");
        }

        Ok(inserted)
    }
}
