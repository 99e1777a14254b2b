//! Sleeptrack - track sleep nights from the terminal.
//!
//! The core is [`tracker::SleepTracker`], a state holder that keeps the
//! in-progress night and history observable for a view layer while the
//! actual reads and writes go through a [`store::NightStore`].
//!
//! Architecture:
//! - `models` define the night record and quality rating
//! - `db` owns the `SQLite` schema and queries
//! - `store` puts the database (or memory) behind the `NightStore` trait
//! - `tracker` offloads store work and publishes state through `watch` channels
//! - `cli` is the terminal view driving the tracker

pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod format;
pub mod models;
pub mod store;
pub mod tracker;
