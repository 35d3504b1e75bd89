use crate::error::{CorruptPersistedState, StoreError};
use crate::types::{Coords, Metrics, Workout, WorkoutId, WorkoutKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One of the sort selector values: `date-asc`, `date-desc`, `distance-asc`,
/// `distance-desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field {
            SortField::Date => "date",
            SortField::Distance => "distance",
        };
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{field}-{direction}")
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s
            .split_once('-')
            .ok_or_else(|| format!("unknown sort order: {s:?}"))?;
        let field = match field {
            "date" => SortField::Date,
            "distance" => SortField::Distance,
            _ => return Err(format!("unknown sort field: {field:?}")),
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(format!("unknown sort direction: {direction:?}")),
        };
        Ok(Self { field, direction })
    }
}

/// Shape of one entry in the persisted array.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWorkout {
    id: WorkoutId,
    coords: Coords,
    distance: f64,
    duration: f64,
    date: DateTime<Utc>,
    #[serde(default)]
    clicks: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elevation_gain: Option<f64>,

    // Written for readability; recomputed on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pace: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<&Workout> for PersistedWorkout {
    fn from(w: &Workout) -> Self {
        let (cadence, pace, elevation_gain, speed) = match *w.metrics() {
            Metrics::Running { cadence, pace } => (Some(cadence), Some(pace), None, None),
            Metrics::Cycling {
                elevation_gain,
                speed,
            } => (None, None, Some(elevation_gain), Some(speed)),
        };
        Self {
            id: w.id().clone(),
            coords: w.coords(),
            distance: w.distance(),
            duration: w.duration(),
            date: w.date(),
            clicks: w.clicks(),
            kind: w.kind().to_string(),
            cadence,
            elevation_gain,
            pace,
            speed,
            description: Some(w.description().to_string()),
        }
    }
}

impl PersistedWorkout {
    fn rebuild(self) -> Result<Workout, CorruptPersistedState> {
        let kind: WorkoutKind = self
            .kind
            .parse()
            .map_err(|e| CorruptPersistedState(format!("entry {}: {e}", self.id)))?;
        let extra = match kind {
            WorkoutKind::Running => self.cadence,
            WorkoutKind::Cycling => self.elevation_gain,
        }
        .ok_or_else(|| {
            CorruptPersistedState(format!(
                "entry {}: missing {} for {kind} workout",
                self.id,
                kind.extra_label()
            ))
        })?;

        let id = self.id;
        Workout::create(
            id.clone(),
            kind,
            self.coords,
            self.distance,
            self.duration,
            extra,
            Some(self.date),
        )
        .map(|w| w.with_clicks(self.clicks))
        .map_err(|e| CorruptPersistedState(format!("entry {id}: {e}")))
    }
}

/// The session's workouts in insertion order, plus the active sort used when
/// iterating.
#[derive(Debug, Default)]
pub struct WorkoutStore {
    workouts: Vec<Workout>,
    order: Option<SortOrder>,
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted blob. Any bad entry fails the whole
    /// load.
    pub fn restore(blob: &str) -> Result<Self, CorruptPersistedState> {
        let mut store = Self::new();
        for w in Self::deserialize(blob)? {
            store
                .add(w)
                .map_err(|e| CorruptPersistedState(e.to_string()))?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    pub fn contains(&self, id: &WorkoutId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &WorkoutId) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id() == id)
    }

    fn position(&self, id: &WorkoutId) -> Option<usize> {
        self.workouts.iter().position(|w| w.id() == id)
    }

    pub fn add(&mut self, workout: Workout) -> Result<(), StoreError> {
        if self.contains(workout.id()) {
            return Err(StoreError::DuplicateId(workout.id().clone()));
        }
        self.workouts.push(workout);
        Ok(())
    }

    /// Swaps the workout with `id` for `workout` in the same slot and returns
    /// the old one.
    pub fn replace(&mut self, id: &WorkoutId, workout: Workout) -> Result<Workout, StoreError> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if workout.id() != id && self.contains(workout.id()) {
            return Err(StoreError::DuplicateId(workout.id().clone()));
        }
        Ok(std::mem::replace(&mut self.workouts[idx], workout))
    }

    /// Removing an id that is not present is a no-op.
    pub fn remove(&mut self, id: &WorkoutId) -> Option<Workout> {
        let idx = self.position(id)?;
        Some(self.workouts.remove(idx))
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
    }

    pub fn record_click(&mut self, id: &WorkoutId) -> Option<&Workout> {
        let idx = self.position(id)?;
        let w = &mut self.workouts[idx];
        w.record_click();
        Some(w)
    }

    pub fn sort_by(&mut self, field: SortField, direction: SortDirection) {
        self.order = Some(SortOrder::new(field, direction));
    }

    pub fn clear_sort(&mut self) {
        self.order = None;
    }

    pub const fn sort_order(&self) -> Option<SortOrder> {
        self.order
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkoutId> {
        self.workouts.iter().map(Workout::id)
    }

    /// Workouts in display order. Descending is the exact reverse of
    /// ascending; ties keep insertion order in the ascending view.
    pub fn ordered(&self) -> Vec<&Workout> {
        let mut out: Vec<&Workout> = self.workouts.iter().collect();
        let Some(order) = self.order else {
            return out;
        };
        out.sort_by(|a, b| compare(a, b, order.field));
        if order.direction == SortDirection::Desc {
            out.reverse();
        }
        out
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        let entries: Vec<PersistedWorkout> = self.workouts.iter().map(Into::into).collect();
        serde_json::to_string(&entries)
    }

    pub fn deserialize(blob: &str) -> Result<Vec<Workout>, CorruptPersistedState> {
        let entries: Vec<PersistedWorkout> =
            serde_json::from_str(blob).map_err(|e| CorruptPersistedState(e.to_string()))?;
        entries.into_iter().map(PersistedWorkout::rebuild).collect()
    }
}

fn compare(a: &Workout, b: &Workout, field: SortField) -> Ordering {
    match field {
        SortField::Date => a.date().cmp(&b.date()),
        SortField::Distance => a.distance().total_cmp(&b.distance()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn run(id: &str, distance: f64, day: u32) -> Workout {
        let date = Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).unwrap();
        Workout::create(
            id.into(),
            WorkoutKind::Running,
            Coords::new(10.0, 20.0),
            distance,
            30.0,
            150.0,
            Some(date),
        )
        .unwrap()
    }

    fn ride(id: &str, distance: f64, day: u32) -> Workout {
        let date = Utc.with_ymd_and_hms(2024, 5, day, 17, 5, 0).unwrap();
        Workout::create(
            id.into(),
            WorkoutKind::Cycling,
            Coords::new(-33.9, 151.2),
            distance,
            60.0,
            300.0,
            Some(date),
        )
        .unwrap()
    }

    fn ids(store: &WorkoutStore) -> Vec<String> {
        store
            .ordered()
            .iter()
            .map(|w| w.id().to_string())
            .collect()
    }

    fn sample() -> WorkoutStore {
        let mut s = WorkoutStore::new();
        s.add(run("a", 5.0, 3)).unwrap();
        s.add(ride("b", 20.0, 1)).unwrap();
        s.add(run("c", 10.0, 2)).unwrap();
        s.add(ride("d", 5.0, 4)).unwrap();
        s
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut s = WorkoutStore::new();
        s.add(run("a", 5.0, 1)).unwrap();
        let err = s.add(ride("a", 7.0, 2)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId("a".into()));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn replace_keeps_position() {
        let mut s = sample();
        let old = s.replace(&"b".into(), run("b", 42.0, 1)).unwrap();
        assert_eq!(old.kind(), WorkoutKind::Cycling);
        assert_eq!(ids(&s), ["a", "b", "c", "d"]);
        assert_eq!(s.get(&"b".into()).unwrap().distance(), 42.0);
    }

    #[test]
    fn replace_missing_is_not_found() {
        let mut s = sample();
        let err = s.replace(&"zz".into(), run("zz", 1.0, 1)).unwrap_err();
        assert_eq!(err, StoreError::NotFound("zz".into()));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut s = sample();
        assert!(s.remove(&"c".into()).is_some());
        assert!(s.remove(&"c".into()).is_none());
        assert_eq!(ids(&s), ["a", "b", "d"]);
    }

    #[test]
    fn distance_desc_is_reverse_of_asc() {
        let mut s = sample();
        s.sort_by(SortField::Distance, SortDirection::Asc);
        let asc = ids(&s);
        assert_eq!(asc, ["a", "d", "c", "b"]);

        s.sort_by(SortField::Distance, SortDirection::Desc);
        let mut desc = ids(&s);
        desc.reverse();
        assert_eq!(desc, asc);
    }

    #[test]
    fn sorting_is_idempotent_and_leaves_insertion_order() {
        let mut s = sample();
        s.sort_by(SortField::Date, SortDirection::Asc);
        let once = ids(&s);
        s.sort_by(SortField::Date, SortDirection::Asc);
        assert_eq!(ids(&s), once);
        assert_eq!(once, ["b", "c", "a", "d"]);

        s.clear_sort();
        assert_eq!(ids(&s), ["a", "b", "c", "d"]);
    }

    #[test]
    fn sort_order_round_trips_selector_values() {
        for v in ["date-asc", "date-desc", "distance-asc", "distance-desc"] {
            assert_eq!(v.parse::<SortOrder>().unwrap().to_string(), v);
        }
        assert!("speed-asc".parse::<SortOrder>().is_err());
        assert!("date-up".parse::<SortOrder>().is_err());
    }

    #[test]
    fn restore_rebuilds_variants_and_keeps_persisted_fields() {
        let mut s = sample();
        s.record_click(&"b".into());
        s.record_click(&"b".into());
        let blob = s.serialize().unwrap();

        let restored = WorkoutStore::restore(&blob).unwrap();
        assert_eq!(restored.len(), 4);
        for w in s.ordered() {
            let r = restored.get(w.id()).unwrap();
            assert_eq!(r, w);
        }
        assert_eq!(restored.get(&"b".into()).unwrap().clicks(), 2);
    }

    #[test]
    fn restore_reproduces_arbitrary_floats_exactly() {
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move |scale: f64| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 * scale
        };

        let mut s = WorkoutStore::new();
        for i in 0..2000 {
            let kind = if i % 2 == 0 {
                WorkoutKind::Running
            } else {
                WorkoutKind::Cycling
            };
            let w = Workout::create(
                i.to_string().as_str().into(),
                kind,
                Coords::new(next(180.0) - 90.0, next(360.0) - 180.0),
                next(50.0) + 0.001,
                next(300.0) + 0.001,
                next(2000.0) + 0.001,
                None,
            )
            .unwrap();
            s.add(w).unwrap();
        }

        let restored = WorkoutStore::restore(&s.serialize().unwrap()).unwrap();
        for w in s.ordered() {
            assert_eq!(restored.get(w.id()), Some(w));
        }
    }

    #[test]
    fn persisted_shape_matches_storage_format() {
        let mut s = WorkoutStore::new();
        s.add(ride("17", 20.0, 1)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s.serialize().unwrap()).unwrap();
        let e = &v[0];
        assert_eq!(e["id"], "17");
        assert_eq!(e["type"], "cycling");
        assert_eq!(e["coords"], serde_json::json!([-33.9, 151.2]));
        assert_eq!(e["elevationGain"], 300.0);
        assert_eq!(e["clicks"], 0);
        assert!(e.get("cadence").is_none());
        assert_eq!(e["date"], "2024-05-01T17:05:00Z");
    }

    #[test]
    fn restore_accepts_entries_without_derived_fields() {
        let blob = r#"[{"id":"1","coords":[1.5,2.5],"distance":4,"duration":20,
            "date":"2024-02-10T06:00:00.000Z","type":"running","cadence":170}]"#;
        let s = WorkoutStore::restore(blob).unwrap();
        let w = s.get(&"1".into()).unwrap();
        assert_eq!(w.clicks(), 0);
        assert_eq!(w.description(), "Running on February 10 at 06:00");
        assert!(matches!(*w.metrics(), Metrics::Running { pace, .. } if (pace - 5.0).abs() < 1e-12));
    }

    #[test]
    fn unknown_type_fails_whole_restore() {
        let blob = r#"[
            {"id":"1","coords":[0,0],"distance":4,"duration":20,"date":"2024-02-10T06:00:00Z","type":"running","cadence":170},
            {"id":"2","coords":[0,0],"distance":4,"duration":20,"date":"2024-02-10T06:00:00Z","type":"unicycle","cadence":170}
        ]"#;
        assert!(WorkoutStore::restore(blob).is_err());
    }

    #[test]
    fn missing_fields_fail_restore() {
        let no_cadence = r#"[{"id":"1","coords":[0,0],"distance":4,"duration":20,"date":"2024-02-10T06:00:00Z","type":"running"}]"#;
        let no_distance = r#"[{"id":"1","coords":[0,0],"duration":20,"date":"2024-02-10T06:00:00Z","type":"cycling","elevationGain":3}]"#;
        let dup = r#"[
            {"id":"1","coords":[0,0],"distance":4,"duration":20,"date":"2024-02-10T06:00:00Z","type":"cycling","elevationGain":3},
            {"id":"1","coords":[0,0],"distance":4,"duration":20,"date":"2024-02-10T06:00:00Z","type":"cycling","elevationGain":3}
        ]"#;
        for blob in [no_cadence, no_distance, dup, "not json"] {
            assert!(WorkoutStore::restore(blob).is_err(), "{blob}");
        }
    }
}
