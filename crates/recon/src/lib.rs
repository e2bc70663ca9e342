//! `rostermatch-recon` — fuzzy contact reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded datasets, returns match decisions
//! and annotated output tables. No CLI or IO dependencies.

pub mod annotate;
pub mod blocking;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod similarity;
pub mod summary;

pub use config::{ConfigOverrides, MatchConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{Dataset, MatchResult, OutputTable, ReconInput, RunResult};
pub use similarity::{FastTokenSetRatio, Scorer, TokenSetRatio};
