//! The in-memory [`Zone`] type: apex contents plus operational state.

use std::sync::Mutex;

use domain::base::Rtype;
use domain::rdata::ZoneRecordData;
use domain::zonetree::{AnswerContent, StoredName, Zone as ZoneData};

use crate::acl::Acl;
use crate::error::CoreError;
use crate::scheduler::XfrInState;

/// A zone: its apex and RRsets, plus the operational state layered on top.
///
/// `name`, `data` and the ACL/AXFR-IN fields match the data model's split
/// between immutable identity and mutable operational state: the name and
/// contents never change after construction, while `version`, `acl` and
/// `xfr_in` are updated in place as the zone is reconciled and polled.
pub struct Zone {
    pub name: StoredName,
    data: ZoneData,

    /// File mtime at load time. Monotonically increases across reloads of
    /// the same zone name.
    pub version: Mutex<u32>,

    pub acl: Mutex<ZoneAcls>,
    pub xfr_in: Mutex<XfrInState>,
    pub availability: Mutex<ZoneAvailability>,
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Whether a zone is queryable.
///
/// An EXPIRED zone is not removed from the database (see the Design
/// Notes on EXPIRE semantics): it is flagged, and the query-path
/// integration is expected to consult this flag rather than the core
/// silently dropping zones out from under a reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneAvailability {
    Available,
    Expired,
}

/// The four ACLs a zone carries.
#[derive(Clone, Debug, Default)]
pub struct ZoneAcls {
    pub xfr_out: Acl,
    pub xfr_in: Acl,
    pub notify_in: Acl,
    pub notify_out: Acl,
}

impl Zone {
    /// Wrap zone contents with fresh, empty operational state.
    pub fn new(name: StoredName, data: ZoneData, version: u32) -> Self {
        Self {
            name,
            data,
            version: Mutex::new(version),
            acl: Mutex::new(ZoneAcls::default()),
            xfr_in: Mutex::new(XfrInState::default()),
            availability: Mutex::new(ZoneAvailability::Available),
        }
    }

    pub fn version(&self) -> u32 {
        *self.version.lock().unwrap()
    }

    /// Read the apex SOA RDATA.
    ///
    /// Re-reads the apex on every call rather than caching a "current" SOA
    /// so that a just-reloaded zone's new timer values take effect
    /// immediately.
    pub fn apex_soa(&self) -> Result<domain::rdata::Soa<bytes::Bytes>, CoreError> {
        let answer = self
            .data
            .read()
            .query(self.name.clone(), Rtype::SOA)
            .map_err(|err| CoreError::ZoneInvalid(format!("apex query failed: {err}")))?;

        let AnswerContent::Data(rrset) = answer.content() else {
            return Err(CoreError::ZoneInvalid(
                "zone has no SOA RRset at its apex".into(),
            ));
        };

        let rr = rrset
            .first()
            .ok_or_else(|| CoreError::ZoneInvalid("zone's apex SOA RRset is empty".into()))?;

        match rr.data() {
            ZoneRecordData::Soa(soa) => Ok(soa.clone()),
            _ => Err(CoreError::ZoneInvalid(
                "zone's apex SOA RRset does not contain SOA data".into(),
            )),
        }
    }
}

/// One of the SOA fields that drives a zone's AXFR-IN timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoaField {
    Refresh,
    Retry,
    Expire,
}

/// Reads `field` from a zone's apex SOA and returns it in milliseconds.
pub fn soa_timer_millis(zone: &Zone, field: SoaField) -> Result<u32, CoreError> {
    let soa = zone.apex_soa()?;
    let ttl = match field {
        SoaField::Refresh => soa.refresh(),
        SoaField::Retry => soa.retry(),
        SoaField::Expire => soa.expire(),
    };
    Ok(ttl.as_secs().saturating_mul(1000))
}
