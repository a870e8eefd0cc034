//! Application lifecycle, authorization, and candidate-job matching for the hireflow
//! recruitment marketplace.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
