use crate::collab::{MapView, MarkerHandle};
use crate::dlog;
use crate::types::{Coords, Workout, WorkoutId};
use std::collections::BTreeMap;

/// Workout id to map marker, one marker per id.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: BTreeMap<WorkoutId, MarkerHandle>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always places a fresh marker. If `id` was already registered the old
    /// handle is dropped from the registry but stays on the map.
    pub fn place<M: MapView>(
        &mut self,
        map: &mut M,
        id: &WorkoutId,
        coords: Coords,
        popup: &str,
    ) -> MarkerHandle {
        let handle = map.place_marker(coords, popup);
        dlog!("marker_placed id={id} handle={} coords={coords}", handle.0);
        if let Some(orphan) = self.markers.insert(id.clone(), handle) {
            tracing::warn!(%id, orphan = orphan.0, "marker replaced without removal");
        }
        handle
    }

    pub fn place_workout<M: MapView>(&mut self, map: &mut M, workout: &Workout) -> MarkerHandle {
        self.place(map, workout.id(), workout.coords(), &workout.popup_content())
    }

    /// Drops the marker for `old_id` if any, then places one for `workout`.
    pub fn replace<M: MapView>(
        &mut self,
        map: &mut M,
        old_id: &WorkoutId,
        workout: &Workout,
    ) -> MarkerHandle {
        self.remove(map, old_id);
        self.place_workout(map, workout)
    }

    pub fn remove<M: MapView>(&mut self, map: &mut M, id: &WorkoutId) -> bool {
        let Some(handle) = self.markers.remove(id) else {
            return false;
        };
        map.remove_marker(handle);
        dlog!("marker_removed id={id} handle={}", handle.0);
        true
    }

    pub fn clear_all<M: MapView>(&mut self, map: &mut M) {
        for (_, handle) in std::mem::take(&mut self.markers) {
            map.remove_marker(handle);
        }
    }

    pub fn get(&self, id: &WorkoutId) -> Option<MarkerHandle> {
        self.markers.get(id).copied()
    }

    pub fn contains(&self, id: &WorkoutId) -> bool {
        self.markers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkoutId> {
        self.markers.keys()
    }
}
