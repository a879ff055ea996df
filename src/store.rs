//! Last-known telemetry per vehicle.

use std::collections::HashMap;

use crate::ws::message::TelemetryRecord;

/// Mapping from vehicle id to its latest known record.
///
/// Live pushes overlay the REST baseline: a live record always takes precedence
/// over a baseline record for the same id, whichever was written first. Records are
/// replaced whole, never merged field by field, and nothing is ever evicted.
#[derive(Debug, Default, Clone)]
pub struct TelemetryStore {
    baseline: HashMap<String, TelemetryRecord>,
    live: HashMap<String, TelemetryRecord>,
}

/// Point-in-time copy of a [`TelemetryStore`].
pub type Snapshot = HashMap<String, TelemetryRecord>;

impl TelemetryStore {
    /// Establish (or refresh) the baseline. Records without an id are skipped.
    ///
    /// A refresh overwrites baseline records by id but never drops a vehicle that an
    /// earlier baseline contained.
    pub fn seed<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = TelemetryRecord>,
    {
        let mut count = 0;
        for record in records {
            if record.vehicle_id.is_empty() {
                log::warn!("Skip baseline record without vehicle id");
                continue;
            }
            self.baseline.insert(record.vehicle_id.clone(), record);
            count += 1;
        }
        log::debug!("Seeded {} baseline record(s)", count);
    }

    /// Replace the record for `vehicle_id` with a newly arrived one.
    ///
    /// Last write wins: no timestamp or sequence comparison is made.
    pub fn apply<S: Into<String>>(&mut self, vehicle_id: S, record: TelemetryRecord) {
        self.live.insert(vehicle_id.into(), record);
    }

    /// Current record for one vehicle.
    pub fn get(&self, vehicle_id: &str) -> Option<&TelemetryRecord> {
        self.live
            .get(vehicle_id)
            .or_else(|| self.baseline.get(vehicle_id))
    }

    /// Union of baseline and live records, live taking precedence.
    pub fn snapshot(&self) -> Snapshot {
        let mut merged = self.baseline.clone();
        merged.extend(self.live.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Number of distinct vehicles known.
    pub fn len(&self) -> usize {
        self.baseline.len()
            + self
                .live
                .keys()
                .filter(|k| !self.baseline.contains_key(*k))
                .count()
    }

    /// true if no vehicle is known
    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty() && self.live.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(id: &str, speed: f64) -> TelemetryRecord {
        TelemetryRecord {
            vehicle_id: id.to_string(),
            speed: Some(speed),
            ..Default::default()
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = TelemetryStore::default();
        store.apply("V1", record("V1", 10.0));
        store.apply("V1", record("V1", 20.0));
        assert_eq!(store.snapshot()["V1"].speed, Some(20.0));
    }

    #[test]
    fn test_apply_replaces_whole_record() {
        let mut store = TelemetryStore::default();
        let mut first = record("V1", 10.0);
        first.fuel = Some(80.0);
        store.apply("V1", first);
        store.apply("V1", record("V1", 20.0));

        assert_eq!(store.get("V1").unwrap().fuel, None);
    }

    #[test]
    fn test_seed_and_apply_union() {
        let mut store = TelemetryStore::default();
        store.seed(vec![record("V1", 1.0), record("V2", 2.0)]);
        store.apply("V3", record("V3", 3.0));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap["V2"].speed, Some(2.0));
        assert_eq!(snap["V3"].speed, Some(3.0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_live_beats_later_baseline() {
        let mut store = TelemetryStore::default();
        store.seed(vec![record("V1", 1.0)]);
        store.apply("V1", record("V1", 40.0));
        store.seed(vec![record("V1", 5.0), record("V2", 2.0)]);

        let snap = store.snapshot();
        assert_eq!(snap["V1"].speed, Some(40.0));
        assert_eq!(snap["V2"].speed, Some(2.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reseed_never_evicts() {
        let mut store = TelemetryStore::default();
        store.seed(vec![record("V1", 1.0), record("V2", 2.0)]);
        store.seed(vec![record("V2", 3.0)]);

        let snap = store.snapshot();
        assert_eq!(snap["V1"].speed, Some(1.0));
        assert_eq!(snap["V2"].speed, Some(3.0));
    }

    #[test]
    fn test_seed_skips_missing_id() {
        let mut store = TelemetryStore::default();
        store.seed(vec![TelemetryRecord::default()]);
        assert!(store.is_empty());
    }
}
