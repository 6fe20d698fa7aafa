//! The AXFR-IN scheduler: a per-zone state machine (IDLE / REFRESHING /
//! RETRYING / EXPIRED) driven by the zone's own SOA REFRESH/RETRY/EXPIRE
//! intervals. Each "timer" is a cancellable `tokio` task: a scheduled
//! unit of work is an abort-on-drop task handle rather than a handle
//! into a separate event-loop object.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::interfaces::Interfaces;
use crate::zone::{soa_timer_millis, SoaField, Zone, ZoneAvailability};

/// The AXFR-IN state of a single zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AxfrInState {
    #[default]
    Idle,
    Refreshing,
    Retrying,
    Expired,
}

/// A scheduled task, cancelled when dropped.
///
/// Dropping `None` (no handle armed) is always a safe no-op, which gives
/// the "double-cancel is a no-op" invariant for free.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The transfer-in state carried by a [`Zone`](crate::zone::Zone).
#[derive(Default)]
pub struct XfrInState {
    /// The configured master, derived from the head rule of the zone's
    /// `xfr_in` ACL. `None` means no master is configured: the zone has no
    /// timers armed.
    pub master: Option<SocketAddr>,

    /// The wire message ID of the outstanding SOA query, if any.
    pub next_id: Option<u16>,

    pub state: AxfrInState,

    poll: Option<AbortOnDrop>,
    expire: Option<AbortOnDrop>,
}

impl XfrInState {
    fn disable(&mut self) {
        self.poll = None;
        self.expire = None;
        self.next_id = None;
        self.state = AxfrInState::Idle;
    }
}

/// Recompute a zone's AXFR-IN timers after its configuration or SOA may
/// have changed.
///
/// Called by the reconciler once per zone, after ACLs and
/// `xfr_in.master` have been set. Idempotent: calling it again with an
/// unchanged master while already REFRESHING/RETRYING leaves the existing
/// timers running rather than re-arming them, since the zone's own poll
/// task is the sole mutator of its AXFR-IN fields while a cycle is live.
pub fn timers_update(zone: &Arc<Zone>, interfaces: &Arc<dyn Interfaces>) {
    let mut xfr = zone.xfr_in.lock().unwrap();

    let Some(_master) = xfr.master else {
        xfr.disable();
        return;
    };

    if !matches!(xfr.state, AxfrInState::Idle) {
        // A poll/retry cycle is already running for this master; it will
        // keep re-arming itself. Nothing to do here.
        return;
    }

    let refresh_ms = match soa_timer_millis(zone, SoaField::Refresh) {
        Ok(ms) => ms,
        Err(err) => {
            warn!("cannot arm AXFR-IN timer for '{}': {err}", zone.name);
            return;
        }
    };

    xfr.expire = None;
    xfr.state = AxfrInState::Refreshing;
    xfr.poll = Some(spawn_poll(
        zone.clone(),
        interfaces.clone(),
        Duration::from_millis(refresh_ms.into()),
    ));
}

/// Disarm a zone's AXFR-IN timers, e.g. because its `xfr_in` ACL became
/// empty on reload.
pub fn disable(zone: &Arc<Zone>) {
    zone.xfr_in.lock().unwrap().disable();
}

fn spawn_poll(zone: Arc<Zone>, interfaces: Arc<dyn Interfaces>, delay: Duration) -> AbortOnDrop {
    AbortOnDrop(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        on_poll_fire(zone, interfaces).await;
    }))
}

fn spawn_expire(zone: Arc<Zone>, delay: Duration) -> AbortOnDrop {
    AbortOnDrop(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        on_expire_fire(&zone);
    }))
}

async fn on_poll_fire(zone: Arc<Zone>, interfaces: Arc<dyn Interfaces>) {
    let master = match zone.xfr_in.lock().unwrap().master {
        Some(master) => master,
        // Disabled between arming and firing; nothing to do.
        None => return,
    };

    match interfaces.send_soa_query(master) {
        Ok(id) => {
            debug!("sent SOA query {id} to {master} for '{}'", zone.name);
            zone.xfr_in.lock().unwrap().next_id = Some(id);
        }
        Err(err) => {
            warn!(
                "failed to send SOA query to {master} for '{}': {err}",
                zone.name
            );
        }
    }

    let retry_ms = soa_timer_millis(&zone, SoaField::Retry).unwrap_or(0);
    let expire_ms = soa_timer_millis(&zone, SoaField::Expire).unwrap_or(0);

    let mut xfr = zone.xfr_in.lock().unwrap();
    if xfr.master != Some(master) {
        // Reconfigured away from this master while the query was in flight.
        return;
    }

    xfr.state = AxfrInState::Retrying;
    if xfr.expire.is_none() {
        xfr.expire = Some(spawn_expire(
            zone.clone(),
            Duration::from_millis(expire_ms.into()),
        ));
    }
    xfr.poll = Some(spawn_poll(
        zone.clone(),
        interfaces,
        Duration::from_millis(retry_ms.into()),
    ));
}

fn on_expire_fire(zone: &Arc<Zone>) {
    {
        let mut xfr = zone.xfr_in.lock().unwrap();
        xfr.poll = None;
        xfr.expire = None;
        xfr.next_id = None;
        xfr.state = AxfrInState::Expired;
    }
    *zone.availability.lock().unwrap() = ZoneAvailability::Expired;
    warn!(
        "zone '{}' expired: no fresh transfer before EXPIRE elapsed",
        zone.name
    );
}

/// The address family of a socket address, used to pick a matching
/// interface when sending a SOA query. The actual interface table is the
/// AF_XDP fast-path layer and is out of scope here; this helper exists so
/// that production [`Interfaces`] implementations have a consistent way
/// to filter candidates the way this scheduler expects.
pub fn family_matches(master: SocketAddr, candidate: IpAddr) -> bool {
    master.ip().is_ipv4() == candidate.is_ipv4()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::test_support::{FailingInterfaces, RecordingInterfaces};
    use crate::zone::Zone;
    use bytes::Bytes;
    use domain::base::iana::Class;
    use domain::base::{Name, Record, Serial, Ttl};
    use domain::rdata::{Soa, ZoneRecordData};
    use domain::zonetree::update::ZoneUpdater;
    use domain::zonetree::{types::ZoneUpdate, ZoneBuilder};
    use std::str::FromStr;

    async fn test_zone(refresh: u32, retry: u32, expire: u32) -> Arc<Zone> {
        let name = Name::<Bytes>::from_str("example.com.").unwrap();
        let data = ZoneBuilder::new(name.clone(), Class::IN).build();

        let mut updater = ZoneUpdater::new(data.clone()).await.unwrap();
        let soa = Soa::new(
            name.clone(),
            name.clone(),
            Serial::now(),
            Ttl::from_secs(refresh),
            Ttl::from_secs(retry),
            Ttl::from_secs(expire),
            Ttl::from_secs(60),
        );
        let record = Record::new(name.clone(), Class::IN, Ttl::from_secs(3600), ZoneRecordData::Soa(soa));
        updater.apply(ZoneUpdate::Finished(record)).await.unwrap();

        Arc::new(Zone::new(name, data, 1))
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_arms_expire_and_keeps_retrying() {
        let zone = test_zone(10, 5, 30).await;
        let interfaces: Arc<dyn Interfaces> = Arc::new(FailingInterfaces);
        let master: SocketAddr = "192.0.2.1:53".parse().unwrap();
        zone.xfr_in.lock().unwrap().master = Some(master);

        timers_update(&zone, &interfaces);
        assert_eq!(zone.xfr_in.lock().unwrap().state, AxfrInState::Refreshing);

        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(zone.xfr_in.lock().unwrap().state, AxfrInState::Retrying);
        assert!(zone.xfr_in.lock().unwrap().next_id.is_none());

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(zone.xfr_in.lock().unwrap().state, AxfrInState::Expired);
        assert_eq!(
            *zone.availability.lock().unwrap(),
            ZoneAvailability::Expired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn successful_poll_records_query_id() {
        let zone = test_zone(10, 5, 30).await;
        let interfaces: Arc<dyn Interfaces> = Arc::new(RecordingInterfaces::default());
        let master: SocketAddr = "192.0.2.1:53".parse().unwrap();
        zone.xfr_in.lock().unwrap().master = Some(master);

        timers_update(&zone, &interfaces);
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert!(zone.xfr_in.lock().unwrap().next_id.is_some());
    }

    #[tokio::test]
    async fn no_master_means_no_timers() {
        let zone = test_zone(10, 5, 30).await;
        let interfaces: Arc<dyn Interfaces> = Arc::new(FailingInterfaces);

        timers_update(&zone, &interfaces);
        assert_eq!(zone.xfr_in.lock().unwrap().state, AxfrInState::Idle);
    }
}
