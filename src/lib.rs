pub mod archive;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod emit;
pub mod env_state;
pub mod epoch;
pub mod exofold;
pub mod exofold_errors;
pub mod input;
pub mod journal;
pub mod lightcurve;
pub mod orchestrator;
pub mod target;
pub mod units;
pub mod worker;
