//! Wheel Flux - day/night activity analysis for multi-subject running-wheel recordings
//!
//! Wheel Flux turns a time-indexed table of per-subject activity counts into
//! day/light/night totals and per-night running intervals through a
//! deterministic pipeline: day boundaries → recurring windows → aggregation
//! → burst detection → interval kinematics.
//!
//! ## Modules
//!
//! - **Calendar & windows**: day boundaries anchored at a configurable day start,
//!   recurring light/night windows resolved per day
//! - **Aggregation**: per-day totals for every subject and window family
//! - **Bursts & kinematics**: run segmentation inside night windows and
//!   per-run distance, speed and energy
//! - **Outputs**: text tables, CSV, weekly speed histograms and JSON reports

pub mod aggregate;
pub mod bursts;
pub mod calendar;
pub mod config;
pub mod encoder;
pub mod error;
pub mod histogram;
pub mod kinematics;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod types;
pub mod windows;

pub use config::{AnalysisConfig, AnalysisRange};
pub use error::ComputeError;
pub use pipeline::{analyze_text, ActivityProcessor, AnalysisOutput};

// Schema exports
pub use schema::{SampleFileAdapter, SampleTable};

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "wheel-flux";
