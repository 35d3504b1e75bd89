use crate::error::{InvalidType, ValidationError};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkoutId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for WorkoutId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Hands out millisecond-timestamp ids that never repeat within a session.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_ms: i64,
}

impl IdGenerator {
    pub fn next_id(&mut self, now: DateTime<Utc>) -> WorkoutId {
        let ms = now.timestamp_millis().max(self.last_ms.saturating_add(1));
        self.last_ms = ms;
        WorkoutId(ms.to_string())
    }

    /// Keeps later ids above an id restored from storage. Ids at `i64::MAX`
    /// leave no room above them and are not tracked.
    pub fn observe(&mut self, id: &WorkoutId) {
        if let Ok(ms) = id.as_str().parse::<i64>()
            && ms < i64::MAX
        {
            self.last_ms = self.last_ms.max(ms);
        }
    }
}

/// `[lat, lng]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(c: Coords) -> Self {
        [c.lat, c.lng]
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

impl FromStr for Coords {
    type Err = String;

    /// Parses `"lat,lng"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
        let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
        let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("coordinates out of range: {lat},{lng}"));
        }
        Ok(Self { lat, lng })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Running => "🏃",
            Self::Cycling => "🚴‍♀️",
        }
    }

    /// Label of the type-specific form field.
    pub const fn extra_label(self) -> &'static str {
        match self {
            Self::Running => "cadence",
            Self::Cycling => "elevation",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutKind {
    type Err = InvalidType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "cycling" => Ok(Self::Cycling),
            other => Err(InvalidType(other.to_string())),
        }
    }
}

/// Variant payload. Derived values are fixed when the workout is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metrics {
    Running { cadence: f64, pace: f64 },
    Cycling { elevation_gain: f64, speed: f64 },
}

impl Metrics {
    fn compute(kind: WorkoutKind, distance: f64, duration: f64, extra: f64) -> Self {
        match kind {
            // min/km
            WorkoutKind::Running => Self::Running {
                cadence: extra,
                pace: duration / distance,
            },
            // km/h
            WorkoutKind::Cycling => Self::Cycling {
                elevation_gain: extra,
                speed: distance / (duration / 60.0),
            },
        }
    }

    pub const fn kind(&self) -> WorkoutKind {
        match self {
            Self::Running { .. } => WorkoutKind::Running,
            Self::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    /// Cadence or elevation gain, whichever the variant carries.
    pub const fn extra(&self) -> f64 {
        match *self {
            Self::Running { cadence, .. } => cadence,
            Self::Cycling { elevation_gain, .. } => elevation_gain,
        }
    }
}

/// Raw values as they come out of the workout form.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutInput {
    pub kind: String,
    pub distance: f64,
    pub duration: f64,
    pub extra: f64,
}

impl WorkoutInput {
    pub fn new(kind: impl Into<String>, distance: f64, duration: f64, extra: f64) -> Self {
        Self {
            kind: kind.into(),
            distance,
            duration,
            extra,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("distance", self.distance),
            ("duration", self.duration),
            ("extra", self.extra),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ValidationError { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    id: WorkoutId,
    coords: Coords,
    distance: f64,
    duration: f64,
    date: DateTime<Utc>,
    clicks: u32,
    description: String,
    metrics: Metrics,
}

impl Workout {
    /// Validates the numbers, then builds the variant with its derived metric
    /// and description.
    pub fn create(
        id: WorkoutId,
        kind: WorkoutKind,
        coords: Coords,
        distance: f64,
        duration: f64,
        extra: f64,
        date: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        WorkoutInput::new(kind.as_str(), distance, duration, extra).validate()?;
        let date = date.unwrap_or_else(Utc::now);
        Ok(Self {
            description: describe(kind, date),
            metrics: Metrics::compute(kind, distance, duration, extra),
            id,
            coords,
            distance,
            duration,
            date,
            clicks: 0,
        })
    }

    pub fn from_input(
        id: WorkoutId,
        coords: Coords,
        input: &WorkoutInput,
        date: Option<DateTime<Utc>>,
    ) -> Result<Self, crate::error::ControllerError> {
        let kind: WorkoutKind = input.kind.parse()?;
        Ok(Self::create(
            id,
            kind,
            coords,
            input.distance,
            input.duration,
            input.extra,
            date,
        )?)
    }

    pub const fn id(&self) -> &WorkoutId {
        &self.id
    }

    pub const fn coords(&self) -> Coords {
        self.coords
    }

    pub const fn distance(&self) -> f64 {
        self.distance
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub const fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub const fn kind(&self) -> WorkoutKind {
        self.metrics.kind()
    }

    pub fn record_click(&mut self) {
        self.clicks = self.clicks.saturating_add(1);
    }

    pub(crate) const fn with_clicks(mut self, clicks: u32) -> Self {
        self.clicks = clicks;
        self
    }

    /// Text shown in the marker popup.
    pub fn popup_content(&self) -> String {
        format!("{} {}", self.kind().emoji(), self.description)
    }

    /// Current values, as the edit form is pre-filled with them.
    pub fn to_input(&self) -> WorkoutInput {
        WorkoutInput::new(
            self.kind().as_str(),
            self.distance,
            self.duration,
            self.metrics.extra(),
        )
    }
}

/// `"Running on April 14 at 09:05"`
pub fn describe(kind: WorkoutKind, date: DateTime<Utc>) -> String {
    let month = MONTHS[date.month0() as usize];
    format!(
        "{} on {month} {} at {:02}:{:02}",
        kind.title(),
        date.day(),
        date.hour(),
        date.minute()
    )
}
