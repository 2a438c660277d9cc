pub mod config;
pub mod error;
pub mod ident;
pub mod ingest;
pub mod graph;
pub mod cache;
pub mod pipeline;
pub mod viewer;

pub use config::Config;
pub use error::{MubinGraphError, Result};
pub use graph::{filter_reachable, reachable_ids, render_dot, DuplicatePolicy, Link, Object};
pub use ident::{normalize, to_decimal, to_hex, HashId};
pub use pipeline::{Pipeline, RunOutcome, SourceSet};
