//! Terminal stand-ins for the map, the workout list, the confirmation popup
//! and the position source.

use crate::collab::{ConfirmPrompt, Geolocator, MapView, MarkerHandle, Renderer, ViewOptions};
use crate::dlog;
use crate::error::GeolocationUnavailable;
use crate::types::{Coords, Metrics, Workout, WorkoutId, WorkoutInput};
use crate::utils::format_number;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Headless map: keeps the markers it was asked to show and logs each change.
#[derive(Debug, Default)]
pub struct TerminalMap {
    next: u64,
    markers: BTreeMap<u64, (Coords, String)>,
    view: Option<(Coords, u8)>,
}

impl TerminalMap {
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub const fn view(&self) -> Option<(Coords, u8)> {
        self.view
    }
}

impl MapView for TerminalMap {
    fn place_marker(&mut self, coords: Coords, popup: &str) -> MarkerHandle {
        self.next += 1;
        self.markers.insert(self.next, (coords, popup.to_string()));
        tracing::trace!(marker = self.next, %coords, popup, "marker placed");
        MarkerHandle(self.next)
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        if self.markers.remove(&marker.0).is_none() {
            tracing::warn!(marker = marker.0, "removing unknown marker");
        }
    }

    fn set_view(&mut self, coords: Coords, zoom: u8, options: ViewOptions) {
        self.view = Some((coords, zoom));
        tracing::info!(%coords, zoom, animate = options.animate, "map view");
    }
}

/// One rendered list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: WorkoutId,
    pub text: String,
}

/// Keeps the workout list the way a page would show it and prints it on
/// demand.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    rows: Vec<Row>,
    editing: Option<WorkoutId>,
    sort_visible: bool,
    form_open: bool,
    notices: Vec<String>,
}

impl ConsoleRenderer {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub const fn sort_visible(&self) -> bool {
        self.sort_visible
    }

    /// Writes the list, one tab-separated row per workout. With `details` the
    /// id and click count come first.
    pub fn print_list(&self, out: &mut impl Write, details: bool) -> io::Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            let mark = if self.editing.as_ref() == Some(&row.id) {
                "*"
            } else {
                ""
            };
            if details {
                writeln!(out, "{}\t{}{mark}\t{}", i + 1, row.id, row.text)?;
            } else {
                writeln!(out, "{}{mark}", row.text)?;
            }
        }
        Ok(())
    }
}

/// `"🏃 Running on May 3 at 08:30\t5 km\t30 min\t6.0 min/km\t150 spm"`
pub fn row_text(w: &Workout) -> String {
    let head = format!(
        "{} {}\t{} km\t{} min",
        w.kind().emoji(),
        w.description(),
        format_number(w.distance()),
        format_number(w.duration())
    );
    match *w.metrics() {
        Metrics::Running { cadence, pace } => {
            format!("{head}\t{pace:.1} min/km\t{} spm", format_number(cadence))
        }
        Metrics::Cycling {
            elevation_gain,
            speed,
        } => format!("{head}\t{speed:.1} km/h\t{} m", format_number(elevation_gain)),
    }
}

impl Renderer for ConsoleRenderer {
    fn render_row(&mut self, workout: &Workout) {
        let row = Row {
            id: workout.id().clone(),
            text: row_text(workout),
        };
        match self.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => self.rows.insert(0, row),
        }
    }

    fn remove_row(&mut self, id: &WorkoutId) {
        self.rows.retain(|r| &r.id != id);
    }

    fn render_list(&mut self, workouts: &[&Workout]) {
        self.rows = workouts
            .iter()
            .map(|w| Row {
                id: w.id().clone(),
                text: row_text(w),
            })
            .collect();
    }

    fn show_sort_control(&mut self) {
        self.sort_visible = true;
    }

    fn hide_sort_control(&mut self) {
        self.sort_visible = false;
    }

    fn mark_row_editing(&mut self, id: &WorkoutId) {
        self.editing = Some(id.clone());
    }

    fn clear_editing_mark(&mut self) {
        self.editing = None;
    }

    fn show_form(&mut self, prefill: Option<&WorkoutInput>) {
        self.form_open = true;
        if let Some(p) = prefill {
            dlog!(
                "form_prefill type={} distance={} duration={} extra={}",
                p.kind,
                p.distance,
                p.duration,
                p.extra
            );
        }
    }

    fn hide_form(&mut self) {
        self.form_open = false;
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
        self.notices.push(message.to_string());
    }
}

/// Yes/no question on stdin. Anything but `y`/`yes` declines.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn ask(&mut self, title: &str, message: &str, confirm_style: bool) -> bool {
        ask_on(
            io::stdin().lock(),
            io::stderr(),
            title,
            message,
            confirm_style,
        )
    }
}

fn ask_on<I: BufRead, O: Write>(
    mut input: I,
    mut out: O,
    title: &str,
    message: &str,
    confirm_style: bool,
) -> bool {
    let hint = if confirm_style { "[y/N]" } else { "[Y/n]" };
    if let Err(e) = write!(out, "{title}: {message} {hint} ").and_then(|()| out.flush()) {
        tracing::debug!(err = %e, "writing prompt failed");
    }

    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return false;
    }
    let answer = line.trim().to_ascii_lowercase();
    if answer.is_empty() {
        return !confirm_style;
    }
    matches!(answer.as_str(), "y" | "yes")
}

/// Answers every question the same way (`--yes`, scripts).
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn ask(&mut self, title: &str, _message: &str, _confirm_style: bool) -> bool {
        dlog!("prompt_auto title={title:?} answer={}", self.0);
        self.0
    }
}

/// Position taken from configuration rather than a device.
pub struct ConfiguredPosition(pub Option<Coords>);

impl Geolocator for ConfiguredPosition {
    fn locate(&mut self) -> Result<Coords, GeolocationUnavailable> {
        self.0.ok_or(GeolocationUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkoutKind;
    use chrono::{TimeZone, Utc};

    fn ride() -> Workout {
        let date = Utc.with_ymd_and_hms(2024, 7, 14, 18, 2, 0).unwrap();
        Workout::create(
            "7".into(),
            WorkoutKind::Cycling,
            Coords::new(45.0, 6.0),
            27.5,
            90.0,
            640.0,
            Some(date),
        )
        .unwrap()
    }

    #[test]
    fn row_text_shows_metric_to_one_decimal() {
        assert_eq!(
            row_text(&ride()),
            "🚴‍♀️ Cycling on July 14 at 18:02\t27.5 km\t90 min\t18.3 km/h\t640 m"
        );
    }

    #[test]
    fn render_row_replaces_in_place() {
        let mut r = ConsoleRenderer::default();
        let w = ride();
        r.render_row(&w);
        r.render_row(&w);
        assert_eq!(r.rows().len(), 1);

        r.mark_row_editing(w.id());
        let mut out = Vec::new();
        r.print_list(&mut out, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("1\t7*\t🚴‍♀️ Cycling"));

        r.remove_row(w.id());
        assert!(r.rows().is_empty());
    }

    #[test]
    fn new_rows_go_on_top_and_lists_keep_their_order() {
        let mut r = ConsoleRenderer::default();
        let older = ride();
        let newer = Workout::create(
            "8".into(),
            WorkoutKind::Running,
            Coords::new(45.0, 6.0),
            5.0,
            30.0,
            150.0,
            None,
        )
        .unwrap();
        r.render_row(&older);
        r.render_row(&newer);
        let ids: Vec<_> = r.rows().iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["8", "7"]);

        r.render_list(&[&older, &newer]);
        let ids: Vec<_> = r.rows().iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["7", "8"]);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn prompt_reads_answer_even_when_output_fails() {
        assert!(ask_on(&b"yes\n"[..], BrokenPipe, "Delete", "all?", true));
        assert!(!ask_on(&b"\n"[..], BrokenPipe, "Delete", "all?", true));
        assert!(ask_on(&b""[..], Vec::new(), "Keep", "going?", false));

        let mut out = Vec::new();
        assert!(!ask_on(&b"nope\n"[..], &mut out, "Delete", "all?", true));
        assert_eq!(String::from_utf8(out).unwrap(), "Delete: all? [y/N] ");
    }

    #[test]
    fn terminal_map_tracks_markers() {
        let mut map = TerminalMap::default();
        let h = map.place_marker(Coords::new(1.0, 2.0), "x");
        assert_eq!(map.marker_count(), 1);
        map.remove_marker(h);
        assert_eq!(map.marker_count(), 0);
        map.set_view(Coords::new(1.0, 2.0), 13, ViewOptions::default());
        assert_eq!(map.view(), Some((Coords::new(1.0, 2.0), 13)));
    }

    #[test]
    fn configured_position_without_value_is_unavailable() {
        assert!(ConfiguredPosition(None).locate().is_err());
        assert_eq!(
            ConfiguredPosition(Some(Coords::new(3.0, 4.0))).locate(),
            Ok(Coords::new(3.0, 4.0))
        );
    }
}
