//! Decision fusion for the plant-care daemon: aggregates the latest sensor
//! reading, pot geometry, plant identity and weather window into one
//! multimodal model call, validates the fused reply, and appends the dual
//! health/watering history the dashboard reads.

pub mod config;
pub mod context;
pub mod error;
pub mod logbook;
pub mod panel;
pub mod pipeline;
pub mod prompt;
pub mod validate;

pub use config::{load_config, SproutConfig};
pub use context::{gather_context, DecisionContext, PotContext};
pub use error::PipelineError;
pub use panel::{snapshot, PanelSnapshot};
pub use pipeline::{CycleReport, Pipeline};
pub use validate::validate_assessment;
