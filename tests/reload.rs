//! End-to-end reload scenarios against the public [`Host`] API.

use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use domain::base::iana::Class;
use domain::base::{Name, Record, Serial, Ttl};
use domain::rdata::{Soa, ZoneRecordData};
use domain::zonetree::update::ZoneUpdater;
use domain::zonetree::{types::ZoneUpdate, StoredName, ZoneBuilder};

use zonecore::config::{AclRuleConfig, Config, RemoteConfig, ZoneAclConfig, ZoneConfig};
use zonecore::interfaces::NoInterfaces;
use zonecore::zone_reader::test_support::{FakeCompiledZone, FakeCompiledZoneReader};
use zonecore::Host;

async fn soa_zone(apex: &str) -> domain::zonetree::Zone {
    let name = Name::<Bytes>::from_str(apex).unwrap();
    let data = ZoneBuilder::new(name.clone(), Class::IN).build();
    let mut updater = ZoneUpdater::new(data.clone()).await.unwrap();
    let soa = Soa::new(
        name.clone(),
        name.clone(),
        Serial::now(),
        Ttl::from_secs(3600),
        Ttl::from_secs(600),
        Ttl::from_secs(86400),
        Ttl::from_secs(60),
    );
    let record = Record::new(
        name.clone(),
        Class::IN,
        Ttl::from_secs(3600),
        ZoneRecordData::Soa(soa),
    );
    updater.apply(ZoneUpdate::Finished(record)).await.unwrap();
    data
}

fn config_with(names_and_outs: &[(&str, &str, Vec<&str>)]) -> Config {
    Config {
        zones: names_and_outs
            .iter()
            .map(|(name, db, xfr_out)| ZoneConfig {
                name: (*name).into(),
                file: format!("{name}.zone").into(),
                db: (*db).into(),
                acl: ZoneAclConfig {
                    xfr_out: xfr_out
                        .iter()
                        .map(|addr| AclRuleConfig {
                            remote: RemoteConfig {
                                address: (*addr).into(),
                                port: 0,
                            },
                        })
                        .collect(),
                    ..Default::default()
                },
            })
            .collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn fresh_load_publishes_zone_with_version_from_mtime() {
    let reader = Arc::new(FakeCompiledZoneReader::default());
    reader.insert(
        "ex.db",
        FakeCompiledZone {
            source: "example.com.zone".into(),
            needs_update: false,
            data: soa_zone("example.com.").await,
        },
    );
    let host = Host::new(Arc::new(NoInterfaces), reader);

    let conf = config_with(&[("example.com.", "ex.db", vec![])]);
    let inserted = host.update_db_from_config(&conf).unwrap();
    assert_eq!(inserted, 1);

    let name = StoredName::from_str("example.com.").unwrap();
    assert!(host.find_zone(&name).is_some());
}

#[tokio::test]
async fn reload_with_unchanged_config_is_idempotent() {
    let reader = Arc::new(FakeCompiledZoneReader::default());
    reader.insert(
        "ex.db",
        FakeCompiledZone {
            source: "example.com.zone".into(),
            needs_update: false,
            data: soa_zone("example.com.").await,
        },
    );
    let host = Host::new(Arc::new(NoInterfaces), reader);
    let conf = config_with(&[("example.com.", "ex.db", vec![])]);

    let first = host.update_db_from_config(&conf).unwrap();
    let name = StoredName::from_str("example.com.").unwrap();
    let first_zone = host.find_zone(&name).unwrap();

    // No new compiled zone is registered, so the second reload must carry
    // the same zone object over rather than failing to "reload".
    let second = host.update_db_from_config(&conf).unwrap();
    let second_zone = host.find_zone(&name).unwrap();

    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first_zone, &second_zone));
}

#[tokio::test]
async fn acl_rebuild_replaces_old_allowed_set() {
    let reader = Arc::new(FakeCompiledZoneReader::default());
    reader.insert(
        "ex.db",
        FakeCompiledZone {
            source: "example.com.zone".into(),
            needs_update: false,
            data: soa_zone("example.com.").await,
        },
    );
    let host = Host::new(Arc::new(NoInterfaces), reader);

    let conf1 = config_with(&[("example.com.", "ex.db", vec!["10.0.0.1"])]);
    host.update_db_from_config(&conf1).unwrap();

    let conf2 = config_with(&[("example.com.", "ex.db", vec!["10.0.0.2", "10.0.0.3"])]);
    host.update_db_from_config(&conf2).unwrap();

    let name = StoredName::from_str("example.com.").unwrap();
    let zone = host.find_zone(&name).unwrap();
    let acl = zone.acl.lock().unwrap();
    assert!(!acl.xfr_out.matches("10.0.0.1".parse().unwrap()));
    assert!(acl.xfr_out.matches("10.0.0.2".parse().unwrap()));
    assert!(acl.xfr_out.matches("10.0.0.3".parse().unwrap()));
}

#[tokio::test]
async fn dropping_a_zone_from_config_removes_it_from_the_new_database() {
    let reader = Arc::new(FakeCompiledZoneReader::default());
    reader.insert(
        "a.db",
        FakeCompiledZone {
            source: "a.example.zone".into(),
            needs_update: false,
            data: soa_zone("a.example.").await,
        },
    );
    reader.insert(
        "b.db",
        FakeCompiledZone {
            source: "b.example.zone".into(),
            needs_update: false,
            data: soa_zone("b.example.").await,
        },
    );
    let host = Host::new(Arc::new(NoInterfaces), reader);

    let both = config_with(&[("a.example.", "a.db", vec![]), ("b.example.", "b.db", vec![])]);
    host.update_db_from_config(&both).unwrap();

    let just_a = config_with(&[("a.example.", "a.db", vec![])]);
    host.update_db_from_config(&just_a).unwrap();

    assert!(host.find_zone(&StoredName::from_str("a.example.").unwrap()).is_some());
    assert!(host.find_zone(&StoredName::from_str("b.example.").unwrap()).is_none());
}

/// A reader that loaded the zone database before a reload must keep
/// observing a valid (if now stale) snapshot through its own `Arc`, per
/// the RCU-style publication model.
#[tokio::test]
async fn old_snapshot_stays_valid_after_a_swap() {
    let reader = Arc::new(FakeCompiledZoneReader::default());
    reader.insert(
        "ex.db",
        FakeCompiledZone {
            source: "example.com.zone".into(),
            needs_update: false,
            data: soa_zone("example.com.").await,
        },
    );
    let host = Host::new(Arc::new(NoInterfaces), reader);
    let conf = config_with(&[("example.com.", "ex.db", vec![])]);
    host.update_db_from_config(&conf).unwrap();

    let old_snapshot = host.zone_db.load_full();
    let empty = Config::default();
    host.update_db_from_config(&empty).unwrap();

    let name = StoredName::from_str("example.com.").unwrap();
    assert!(old_snapshot.find_zone(&name).is_some());
    assert!(host.find_zone(&name).is_none());
}
