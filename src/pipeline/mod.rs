//! Comparison Pipeline - ordered stages over a write-once state
//!
//! Each stage renders its prompt from earlier outputs, makes one gateway call,
//! and stores the reply under its output key. Stages never overwrite a key.

mod executor;
mod parse;
mod stage;
mod state;

pub use executor::{DEFAULT_STAGE_TIMEOUT, PipelineExecutor, RunMetadata, StageTiming, validate_stages};
pub use parse::{extract_json, parse_json_reply};
pub use stage::{OutputKind, Stage, default_stages, keys, load_stages};
pub use state::{PipelineState, StageValue};
