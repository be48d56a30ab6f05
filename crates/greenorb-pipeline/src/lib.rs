//! The GreenOrb agent pipeline.
//!
//! Four stages (Scout → Analyst → Risk → Strategy) each run in their own
//! controller loop. A controller pulls its upstream backlog out of the event
//! log, asks a [`TextGenerator`](greenorb_llm::TextGenerator) for one record
//! at a time, parses the answer and appends the result as events. Stages
//! never talk to each other directly; the store is the only channel.

mod bridge;
mod controller;
pub mod error;
pub mod live;
mod pipeline;
pub mod scan;
mod schedule;
pub mod stage;
pub mod stages;

pub use bridge::SyncBridge;
pub use controller::{Controller, StageControl};
pub use error::{Error, Result};
pub use live::{LiveInsight, live_insight};
pub use pipeline::{Pipeline, PipelineConfig};
pub use scan::{ScanReport, scan_document};
pub use schedule::Pacer;
pub use stage::{Outcome, Phase, RunState, Stage, StageStatus, StageTimings};

#[cfg(test)]
mod testing;
