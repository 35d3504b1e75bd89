//! Geo-tagged workout log: running and cycling sessions placed on a map,
//! kept in one saved collection with a marker per workout.

pub mod cli;
pub mod collab;
pub mod config;
pub mod console;
pub mod controller;
pub mod database;
pub mod error;
pub mod markers;
pub mod store;
pub mod types;
pub mod utils;
