//! Loads one compiled zone from disk into an in-memory [`Zone`], stamping
//! its version from the compiled file's mtime. The actual on-disk
//! compiled-zone format is an external collaborator (see
//! [`CompiledZoneReader`]); this module only consumes its interface.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use camino::Utf8Path;
use domain::zonetree::{StoredName, Zone as ZoneData};
use tracing::warn;

use crate::error::CoreError;
use crate::zone::Zone;

/// A handle returned by [`CompiledZoneReader::open`] for one compiled zone.
pub trait OpenZone {
    /// The zone's original (textual) source path, as recorded in the
    /// compiled form.
    fn source(&self) -> &str;

    /// Whether the compiled form is stale relative to its source.
    fn needs_update(&self) -> bool;

    /// Decode the zone contents.
    fn load(self: Box<Self>) -> Result<ZoneData, CoreError>;
}

/// The on-disk compiled-zone file reader.
///
/// Out of scope to implement here (it is the zone file compiler's
/// counterpart); production wiring supplies a real implementation, and
/// `#[cfg(test)]` code in this crate exercises the loader's own logic
/// against an in-memory fake.
pub trait CompiledZoneReader: Send + Sync {
    fn open(&self, path: &Utf8Path) -> std::io::Result<Box<dyn OpenZone>>;
}

/// Load `name` from `compiled_path`, recording `source_path` for
/// diagnostics, and insert the outcome into a fresh [`Zone`].
///
/// A source-path mismatch or a stale compiled form is a warning, not a
/// failure; only an unopenable or undecodable compiled file is fatal.
pub fn load(
    reader: &dyn CompiledZoneReader,
    name: &StoredName,
    source_path: &str,
    compiled_path: &Utf8Path,
) -> Result<Arc<Zone>, CoreError> {
    if compiled_path.as_str().is_empty() {
        return Err(CoreError::InvalidParam(
            "compiled zone path must not be empty".into(),
        ));
    }

    let opened = reader
        .open(compiled_path)
        .map_err(|err| CoreError::ZoneInvalid(format!("{compiled_path}: {err}")))?;

    if opened.source() != source_path {
        warn!(
            "compiled zone '{compiled_path}' was built from '{}', configuration names '{source_path}'",
            opened.source()
        );
    }
    if opened.needs_update() {
        warn!("compiled zone '{compiled_path}' is out of date with its source");
    }

    let version = mtime(compiled_path)?;

    let data = opened
        .load()
        .map_err(|err| CoreError::ZoneInvalid(format!("{compiled_path}: {err}")))?;

    Ok(Arc::new(Zone::new(name.clone(), data, version)))
}

fn mtime(path: &Utf8Path) -> Result<u32, CoreError> {
    let metadata = std::fs::metadata(path)
        .map_err(|err| CoreError::ZoneInvalid(format!("{path}: {err}")))?;
    let modified = metadata
        .modified()
        .map_err(|err| CoreError::ZoneInvalid(format!("{path}: {err}")))?;
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|err| CoreError::ZoneInvalid(format!("{path}: clock before epoch: {err}")))?
        .as_secs();
    Ok(secs as u32)
}

/// Read a file's mtime directly, in the same epoch-seconds form used to
/// stamp a zone's `version`, without loading anything.
///
/// Used by the reconciler to decide reload vs. carry-over (by comparing a
/// zone's configured source file against its already-loaded version)
/// before it commits to the cost of a full [`load`].
pub fn compiled_mtime(compiled_path: &Utf8Path) -> Result<u32, CoreError> {
    mtime(compiled_path)
}

/// A [`CompiledZoneReader`] with no compiled zones to offer.
///
/// Useful as a placeholder before the real compiled-zone reader is wired
/// in: every `open` fails, which the reconciler logs and skips, leaving
/// previously carried-over zones untouched.
#[derive(Debug, Default)]
pub struct NullCompiledZoneReader;

impl CompiledZoneReader for NullCompiledZoneReader {
    fn open(&self, path: &Utf8Path) -> std::io::Result<Box<dyn OpenZone>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("no compiled-zone reader is wired in to open '{path}'"),
        ))
    }
}

/// Test doubles for [`CompiledZoneReader`], used by this crate's own unit
/// tests and available to downstream integration tests.
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct FakeCompiledZone {
        pub source: String,
        pub needs_update: bool,
        pub data: ZoneData,
    }

    impl OpenZone for FakeCompiledZone {
        fn source(&self) -> &str {
            &self.source
        }

        fn needs_update(&self) -> bool {
            self.needs_update
        }

        fn load(self: Box<Self>) -> Result<ZoneData, CoreError> {
            Ok(self.data)
        }
    }

    #[derive(Default)]
    pub struct FakeCompiledZoneReader {
        pub zones: Mutex<HashMap<String, FakeCompiledZone>>,
    }

    impl FakeCompiledZoneReader {
        pub fn insert(&self, path: impl Into<String>, zone: FakeCompiledZone) {
            self.zones.lock().unwrap().insert(path.into(), zone);
        }
    }

    impl CompiledZoneReader for FakeCompiledZoneReader {
        fn open(&self, path: &Utf8Path) -> std::io::Result<Box<dyn OpenZone>> {
            let mut zones = self.zones.lock().unwrap();
            let zone = zones.remove(path.as_str()).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such fake compiled zone")
            })?;
            Ok(Box::new(zone))
        }
    }
}
