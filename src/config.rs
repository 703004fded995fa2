//! Job configuration. Only the recognized options are enumerated here;
//! there is no free-form key-value bag.

use std::path::PathBuf;

use crate::common::Delimiter;

#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Token-splitting rule handed to the mapper.
    pub delimiter: Delimiter,
    /// Resident-byte cap for a grouper partition before it spills, or
    /// refuses with `GroupingCapacity` when no spill directory is set.
    pub spill_threshold_bytes: usize,
    /// Where spill files go. `None` selects the purely in-memory grouper.
    pub spill_dir: Option<PathBuf>,
    /// Partition count for the parallel engine.
    pub workers: usize,
    /// Run the reducer as a combiner on map-side state before it is
    /// spilled. Sum is associative, so final counts are unchanged.
    pub combine: bool,
    /// Separator between key and count in persisted output lines.
    pub output_separator: char,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            spill_threshold_bytes: 64 * 1024 * 1024,
            spill_dir: None,
            workers: 4,
            combine: true,
            output_separator: '\t',
        }
    }
}

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Default 64 MiB.
    pub fn set_spill_threshold_bytes(mut self, n: usize) -> Self {
        self.spill_threshold_bytes = n;
        self
    }

    /// Enables the spilling grouper, writing spill files under `dir`.
    pub fn set_spill_dir(mut self, dir: PathBuf) -> Self {
        self.spill_dir = Some(dir);
        self
    }

    /// Default 4.
    pub fn set_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Default true.
    pub fn set_combine(mut self, on: bool) -> Self {
        self.combine = on;
        self
    }

    /// Default tab.
    pub fn set_output_separator(mut self, sep: char) -> Self {
        self.output_separator = sep;
        self
    }
}
