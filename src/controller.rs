use crate::collab::{BlobStore, ConfirmPrompt, Geolocator, MapView, Renderer, ViewOptions};
use crate::dlog;
use crate::error::{ControllerError, CorruptPersistedState, GeolocationUnavailable, StoreError};
use crate::markers::MarkerRegistry;
use crate::store::{SortOrder, WorkoutStore};
use crate::types::{Coords, IdGenerator, Workout, WorkoutId, WorkoutInput};
use chrono::Utc;

pub const WORKOUTS_KEY: &str = "workouts";
pub const SORT_KEY: &str = "workouts.sort";
pub const DEFAULT_ZOOM: u8 = 13;

/// Sort control is shown from this many workouts on.
const SORT_CONTROL_MIN: usize = 2;

/// Where the workout form is.
///
/// `draft` holds the last rejected submission so the form can be shown again
/// with the values the user typed.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Hidden,
    New {
        coords: Coords,
        draft: Option<WorkoutInput>,
    },
    Edit {
        id: WorkoutId,
        draft: Option<WorkoutInput>,
    },
}

/// Runs every user-initiated operation against the store and the marker
/// registry, then drives rendering and persistence.
pub struct WorkoutController<M, S, P, R> {
    map: M,
    storage: S,
    prompt: P,
    renderer: R,

    store: WorkoutStore,
    markers: MarkerRegistry,
    ids: IdGenerator,
    form: FormState,
    map_ready: bool,
    zoom: u8,
}

impl<M, S, P, R> WorkoutController<M, S, P, R>
where
    M: MapView,
    S: BlobStore,
    P: ConfirmPrompt,
    R: Renderer,
{
    pub fn new(map: M, storage: S, prompt: P, renderer: R) -> Self {
        Self {
            map,
            storage,
            prompt,
            renderer,
            store: WorkoutStore::new(),
            markers: MarkerRegistry::new(),
            ids: IdGenerator::default(),
            form: FormState::Hidden,
            map_ready: false,
            zoom: DEFAULT_ZOOM,
        }
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub const fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub const fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub const fn form(&self) -> &FormState {
        &self.form
    }

    pub const fn map(&self) -> &M {
        &self.map
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    pub const fn is_map_ready(&self) -> bool {
        self.map_ready
    }

    pub fn into_parts(self) -> (M, S, P, R) {
        (self.map, self.storage, self.prompt, self.renderer)
    }

    /// Startup: restore saved workouts, then bring up the map.
    pub fn boot<G: Geolocator>(&mut self, geo: &mut G) -> Result<(), GeolocationUnavailable> {
        self.restore_from_persistence();
        self.load_map(geo)
    }

    /// Loads the saved collection. A corrupt blob is discarded as a whole and
    /// the session starts empty. Returns the number of restored workouts.
    pub(crate) fn restore_from_persistence(&mut self) -> usize {
        let blob = match self.storage.get(WORKOUTS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return 0,
            Err(e) => {
                tracing::warn!(err = %e, "reading saved workouts failed");
                return 0;
            }
        };

        let store = match WorkoutStore::restore(&blob) {
            Ok(store) => store,
            Err(CorruptPersistedState(reason)) => {
                tracing::warn!(%reason, "discarding corrupt saved workouts");
                self.renderer
                    .notify("Saved workouts could not be restored and were skipped.");
                return 0;
            }
        };
        self.markers.clear_all(&mut self.map);
        self.store = store;
        for id in self.store.ids() {
            self.ids.observe(id);
        }

        if let Some(order) = self.saved_sort_order() {
            self.store.sort_by(order.field, order.direction);
        }

        self.render_all();
        self.sync_sort_control();
        if self.map_ready {
            self.place_missing_markers();
        }

        let restored = self.store.len();
        tracing::info!(restored, sort = ?self.store.sort_order(), "workouts restored");
        restored
    }

    fn saved_sort_order(&self) -> Option<SortOrder> {
        let raw = match self.storage.get(SORT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(err = %e, "reading saved sort order failed");
                return None;
            }
        };
        match raw.parse() {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::warn!(err = %e, "ignoring saved sort order");
                None
            }
        }
    }

    /// Centers the map on the current position and puts a marker on every
    /// known workout. Without a position the map stays unavailable.
    pub fn load_map<G: Geolocator>(&mut self, geo: &mut G) -> Result<(), GeolocationUnavailable> {
        let position = match geo.locate() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("geolocation unavailable; map disabled");
                self.renderer.notify(&e.to_string());
                return Err(e);
            }
        };

        self.map.set_view(
            position,
            self.zoom,
            ViewOptions {
                animate: false,
                pan_duration: 0.0,
            },
        );
        self.map_ready = true;
        self.place_missing_markers();
        dlog!("map_loaded position={position} markers={}", self.markers.len());
        Ok(())
    }

    fn place_missing_markers(&mut self) {
        for w in self.store.ordered() {
            if !self.markers.contains(w.id()) {
                self.markers.place_workout(&mut self.map, w);
            }
        }
    }

    pub fn map_clicked(&mut self, coords: Coords) -> Result<(), ControllerError> {
        if !self.map_ready {
            return Err(ControllerError::MapUnavailable);
        }
        if matches!(self.form, FormState::Edit { .. }) {
            return Err(ControllerError::EditInProgress);
        }
        self.form = FormState::New {
            coords,
            draft: None,
        };
        self.renderer.show_form(None);
        dlog!("map_clicked coords={coords}");
        Ok(())
    }

    /// Form submit: creates or edits depending on what the form is open for.
    pub fn submit(&mut self, input: &WorkoutInput) -> Result<WorkoutId, ControllerError> {
        match &self.form {
            FormState::Edit { id, .. } => {
                let id = id.clone();
                self.submit_edit(input).map(|()| id)
            }
            FormState::New { .. } | FormState::Hidden => self.submit_new(input),
        }
    }

    pub fn submit_new(&mut self, input: &WorkoutInput) -> Result<WorkoutId, ControllerError> {
        let FormState::New { coords, .. } = self.form else {
            return Err(ControllerError::NoPendingLocation);
        };

        let id = self.ids.next_id(Utc::now());
        let workout = match Workout::from_input(id, coords, input, None) {
            Ok(w) => w,
            Err(e) => return Err(self.reject(input, e)),
        };

        let id = workout.id().clone();
        if let Err(e) = self.store.add(workout) {
            return Err(self.reject(input, e.into()));
        }
        if let Some(w) = self.store.get(&id) {
            self.markers.place_workout(&mut self.map, w);
            tracing::info!(%id, kind = %w.kind(), total = self.store.len(), "workout added");
        }
        if self.store.sort_order().is_some() {
            self.render_all();
        } else if let Some(w) = self.store.get(&id) {
            self.renderer.render_row(w);
        }

        self.form = FormState::Hidden;
        self.renderer.hide_form();
        self.persist();
        self.sync_sort_control();
        Ok(id)
    }

    /// Reports a rejected submission and keeps the form open with the input.
    fn reject(&mut self, input: &WorkoutInput, err: ControllerError) -> ControllerError {
        tracing::warn!(err = %err, "workout rejected");
        self.renderer.notify(&err.to_string());
        match &mut self.form {
            FormState::New { draft, .. } | FormState::Edit { draft, .. } => {
                *draft = Some(input.clone());
            }
            FormState::Hidden => {}
        }
        err
    }

    pub fn start_edit(&mut self, id: &WorkoutId) -> Result<(), ControllerError> {
        let Some(workout) = self.store.get(id) else {
            return Err(StoreError::NotFound(id.clone()).into());
        };
        let prefill = workout.to_input();

        self.renderer.clear_editing_mark();
        self.form = FormState::Edit {
            id: id.clone(),
            draft: None,
        };
        self.renderer.show_form(Some(&prefill));
        self.renderer.mark_row_editing(id);
        dlog!("edit_started id={id}");
        Ok(())
    }

    /// Rebuilds the edited workout from the form, keeping its id, location
    /// and date.
    pub fn submit_edit(&mut self, input: &WorkoutInput) -> Result<(), ControllerError> {
        let FormState::Edit { id, .. } = &self.form else {
            return Err(ControllerError::NotEditing);
        };
        let id = id.clone();

        let Some(old) = self.store.get(&id) else {
            dlog!("edit_target_vanished id={id}");
            self.exit_edit();
            return Err(StoreError::NotFound(id).into());
        };
        let (coords, date, clicks) = (old.coords(), old.date(), old.clicks());

        let workout = match Workout::from_input(id.clone(), coords, input, Some(date)) {
            Ok(w) => w.with_clicks(clicks),
            Err(e) => return Err(self.reject(input, e)),
        };

        if let Err(e) = self.store.replace(&id, workout) {
            self.exit_edit();
            return Err(e.into());
        }
        if let Some(w) = self.store.get(&id) {
            if self.map_ready {
                self.markers.replace(&mut self.map, &id, w);
            }
            self.renderer.render_row(w);
            tracing::info!(%id, kind = %w.kind(), "workout edited");
        }

        self.exit_edit();
        self.persist();
        Ok(())
    }

    fn exit_edit(&mut self) {
        self.renderer.clear_editing_mark();
        self.renderer.hide_form();
        self.form = FormState::Hidden;
    }

    /// Leaves edit mode without touching the collection.
    pub fn cancel_edit(&mut self) {
        if matches!(self.form, FormState::Edit { .. }) {
            dlog!("edit_cancelled");
            self.exit_edit();
        }
    }

    /// Closing the form drops a pending location or cancels the edit.
    pub fn close_form(&mut self) {
        match self.form {
            FormState::Edit { .. } => self.cancel_edit(),
            FormState::New { .. } => {
                self.form = FormState::Hidden;
                self.renderer.hide_form();
            }
            FormState::Hidden => {}
        }
    }

    pub fn delete(&mut self, id: &WorkoutId) {
        let removed = self.store.remove(id).is_some();
        self.markers.remove(&mut self.map, id);
        self.renderer.remove_row(id);
        if matches!(&self.form, FormState::Edit { id: editing, .. } if editing == id) {
            self.exit_edit();
        }
        self.persist();
        self.sync_sort_control();
        tracing::info!(%id, removed, total = self.store.len(), "workout deleted");
    }

    /// Asks first. Returns whether anything was deleted.
    pub fn delete_all(&mut self) -> bool {
        let confirmed = self.prompt.ask(
            "Delete all workouts",
            "Are you sure you want to delete all workouts? This cannot be undone.",
            true,
        );
        if !confirmed {
            dlog!("delete_all_declined");
            return false;
        }

        let total = self.store.len();
        self.markers.clear_all(&mut self.map);
        self.store.clear();
        self.renderer.render_list(&[]);
        if matches!(self.form, FormState::Edit { .. }) {
            self.exit_edit();
        }
        self.persist();
        self.renderer.hide_sort_control();
        tracing::info!(deleted = total, "all workouts deleted");
        true
    }

    /// Reorders the list. Markers do not move.
    pub fn sort(&mut self, order: SortOrder) {
        self.store.sort_by(order.field, order.direction);
        self.render_all();
        self.persist_sort();
        dlog!("sorted order={order}");
    }

    /// Pans to a workout and counts the click.
    pub fn focus(&mut self, id: &WorkoutId) -> Result<(), ControllerError> {
        if !self.map_ready {
            return Err(ControllerError::MapUnavailable);
        }
        let Some(w) = self.store.record_click(id) else {
            return Err(StoreError::NotFound(id.clone()).into());
        };
        let (coords, clicks) = (w.coords(), w.clicks());
        self.map.set_view(coords, self.zoom, ViewOptions::default());
        self.persist();
        dlog!("focused id={id} clicks={clicks}");
        Ok(())
    }

    /// Wipes saved state, markers and the list, then reloads from scratch.
    pub fn reset(&mut self) {
        for key in [WORKOUTS_KEY, SORT_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, err = %e, "removing saved state failed");
            }
        }
        self.markers.clear_all(&mut self.map);
        self.store = WorkoutStore::new();
        self.renderer.hide_sort_control();
        tracing::info!("reset; reloading");
        self.reload();
    }

    fn reload(&mut self) {
        self.form = FormState::Hidden;
        self.renderer.clear_editing_mark();
        self.renderer.hide_form();
        self.renderer.render_list(&[]);
        self.restore_from_persistence();
    }

    /// Without a sort the newest workout is listed first.
    fn render_all(&mut self) {
        let mut ordered = self.store.ordered();
        if self.store.sort_order().is_none() {
            ordered.reverse();
        }
        self.renderer.render_list(&ordered);
    }

    fn sync_sort_control(&mut self) {
        if self.store.len() >= SORT_CONTROL_MIN {
            self.renderer.show_sort_control();
        } else {
            self.renderer.hide_sort_control();
        }
    }

    /// Writes are fire-and-forget; failures are only logged.
    fn persist(&mut self) {
        let blob = match self.store.serialize() {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(err = %e, "serializing workouts failed");
                return;
            }
        };
        if let Err(e) = self.storage.set(WORKOUTS_KEY, &blob) {
            tracing::warn!(err = %e, "saving workouts failed");
        }
    }

    fn persist_sort(&mut self) {
        let result = match self.store.sort_order() {
            Some(order) => self.storage.set(SORT_KEY, &order.to_string()),
            None => self.storage.remove(SORT_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(err = %e, "saving sort order failed");
        }
    }
}
