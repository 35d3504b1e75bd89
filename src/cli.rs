use crate::store::SortOrder;
use crate::types::{Coords, WorkoutId, WorkoutInput, WorkoutKind};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "workmap",
    about = "Log running and cycling workouts at places on a map"
)]
pub struct Cli {
    /// Settings file (default: <config dir>/workmap/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite file holding saved workouts; overrides the settings file.
    #[arg(long, global = true, conflicts_with = "ephemeral")]
    pub db: Option<PathBuf>,

    /// Keep workouts in memory only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Current position as LAT,LNG. Falls back to $WORKMAP_POSITION, then the
    /// home position from settings.
    #[arg(long, value_name = "LAT,LNG", global = true, allow_hyphen_values = true)]
    pub at: Option<Coords>,

    /// Answer yes to confirmation questions.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Show ids and click counts in the list.
    #[arg(long, global = true)]
    pub details: bool,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print saved workouts (default).
    List,

    /// Click the map at LAT,LNG and submit a new workout there.
    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[command(flatten)]
        form: FormArgs,
    },

    /// Edit a workout. Fields left out keep their current value.
    Edit {
        id: WorkoutId,
        #[command(flatten)]
        form: FormArgs,
    },

    /// Delete one workout.
    Delete { id: WorkoutId },

    /// Delete every workout (asks first unless --yes).
    DeleteAll,

    /// Sort the list: date-asc, date-desc, distance-asc or distance-desc.
    Sort { order: SortOrder },

    /// Center the map on a workout.
    Focus { id: WorkoutId },

    /// Remove all saved state.
    Reset,

    /// Show or change settings.
    Config {
        /// Home position used when no position is given.
        #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
        home: Option<Coords>,
        #[arg(long)]
        zoom: Option<u8>,
        /// Database file to use from now on.
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

/// Workout form fields.
#[derive(Args, Debug, Default, Clone)]
pub struct FormArgs {
    /// running or cycling
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<String>,
    /// Distance in km.
    #[arg(long, allow_hyphen_values = true)]
    pub distance: Option<f64>,
    /// Duration in minutes.
    #[arg(long, allow_hyphen_values = true)]
    pub duration: Option<f64>,
    /// Steps per minute (running).
    #[arg(long, allow_hyphen_values = true)]
    pub cadence: Option<f64>,
    /// Elevation gain in meters (cycling).
    #[arg(long, allow_hyphen_values = true)]
    pub elevation: Option<f64>,
}

impl FormArgs {
    /// Overlays the given fields on `base` (the edit prefill). Missing numbers
    /// come through as NaN and are rejected by validation, the same as an
    /// empty form field.
    pub fn into_input(self, base: Option<&WorkoutInput>) -> WorkoutInput {
        let kind = self
            .kind
            .or_else(|| base.map(|b| b.kind.clone()))
            .unwrap_or_else(|| WorkoutKind::Running.to_string());
        let same_kind = base.is_some_and(|b| b.kind == kind);
        let extra = if kind == WorkoutKind::Cycling.as_str() {
            self.elevation
        } else {
            self.cadence
        }
        .or_else(|| base.filter(|_| same_kind).map(|b| b.extra));

        WorkoutInput {
            kind,
            distance: self.distance.or(base.map(|b| b.distance)).unwrap_or(f64::NAN),
            duration: self.duration.or(base.map(|b| b.duration)).unwrap_or(f64::NAN),
            extra: extra.unwrap_or(f64::NAN),
        }
    }
}
