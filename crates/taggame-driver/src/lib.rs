//! Headless driver for the tag engine: a fixed-rate tokio tick loop that
//! steps a shared engine, feeds the RL player and reports frames, which can
//! be recorded to disk and replayed.

pub mod config;
pub mod game_loop;
pub mod recording;

pub use config::{DriverConfig, RlController};
pub use game_loop::{
    DriverCommand, DriverEvent, DriverSummary, StopReason, evade_action, spawn_driver,
};
pub use recording::{FrameRecorder, RecordingError, read_frames, read_recording};
