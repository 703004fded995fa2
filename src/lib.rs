//! A minimal map/reduce engine bounded to one machine: tokenize records
//! into pairs, group them by key, sum each group. The grouping stage is
//! behind a trait so the in-memory and disk-spilling implementations
//! swap without touching the engines.

pub mod apps;
pub mod common;
pub mod config;
pub mod engine_parallel;
pub mod engine_seq;
pub mod error;
pub mod grouper;
pub mod samples;
pub mod stream;

pub use common::{Delimiter, Engine, Group, Mapper, Pair, PairSink, Records, Reducer};
pub use config::JobConfig;
pub use engine_parallel::ParallelEngine;
pub use engine_seq::SequentialEngine;
pub use error::MrError;
