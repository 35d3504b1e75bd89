//! Services the controller talks to but does not own: the map widget, the
//! key-value blob store, the confirmation popup, list rendering and the
//! position source.

use crate::error::GeolocationUnavailable;
use crate::types::{Coords, Workout, WorkoutId, WorkoutInput};
use anyhow::Result;

/// Opaque handle to a marker placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    pub animate: bool,
    /// Pan duration in seconds.
    pub pan_duration: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            animate: true,
            pan_duration: 1.0,
        }
    }
}

pub trait MapView {
    fn place_marker(&mut self, coords: Coords, popup: &str) -> MarkerHandle;
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn set_view(&mut self, coords: Coords, zoom: u8, options: ViewOptions);
}

/// Single-blob-per-key storage.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, blob: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

pub trait ConfirmPrompt {
    /// Blocks until the user answers.
    fn ask(&mut self, title: &str, message: &str, confirm_style: bool) -> bool;
}

pub trait Renderer {
    /// Renders one row, replacing an existing row for the same id in place.
    /// A new row goes to the top of the list, right under the form.
    fn render_row(&mut self, workout: &Workout);
    fn remove_row(&mut self, id: &WorkoutId);
    /// Drops every row and renders `workouts` in the given order.
    fn render_list(&mut self, workouts: &[&Workout]);
    fn show_sort_control(&mut self);
    fn hide_sort_control(&mut self);
    fn mark_row_editing(&mut self, id: &WorkoutId);
    fn clear_editing_mark(&mut self);
    /// Opens the workout form, pre-filled when `prefill` is set.
    fn show_form(&mut self, prefill: Option<&WorkoutInput>);
    fn hide_form(&mut self);
    /// User-visible message (alert).
    fn notify(&mut self, message: &str);
}

pub trait Geolocator {
    fn locate(&mut self) -> Result<Coords, GeolocationUnavailable>;
}
