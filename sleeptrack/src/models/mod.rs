//! Data models for sleep tracking.

mod night;
mod quality;

pub use night::SleepNight;
pub use quality::SleepQuality;
