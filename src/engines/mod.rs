//! Engine launcher implementations
//!
//! This module contains implementations of the EngineLauncher trait: one that
//! spawns the real engine binary, and a scripted stand-in that never spawns.

pub mod process;
pub mod scripted;

pub use process::ProcessLauncher;
pub use scripted::{ScriptedLauncher, ScriptedResponse};
