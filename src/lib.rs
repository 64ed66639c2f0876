//! Lakeside scene core
//!
//! Procedural lake-ringed terrain, a time-of-day lighting engine and
//! quality-tiered water kept in sync with the day/night cycle.

pub mod atmosphere;
pub mod config;
pub mod export;
pub mod heightfield;
pub mod lattice;
pub mod material;
pub mod scene;
pub mod seeds;
pub mod shoreline;
pub mod signals;
pub mod terrain;
pub mod texture;
pub mod time_of_day;
pub mod viewer;
pub mod water;
pub mod water_sync;
