//! Grouping of mapped pairs by key. The only stateful stage of the
//! pipeline, and the only one that has to make a memory decision: the
//! in-memory grouper refuses input past its byte limit, the spilling
//! grouper writes its table to disk and merges the spill files back when
//! the groups are drained.

use std::collections::HashMap;
use std::fs;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::common::{Group, Pair, Reducer};
use crate::config::JobConfig;
use crate::error::MrError;

/// Grouping contract: pairs go in unordered, each distinct key comes out
/// exactly once with all of its values. Implementations swap freely.
pub trait Grouper: Send {
    fn insert(&mut self, pair: Pair) -> Result<(), MrError>;
    fn into_groups(self: Box<Self>) -> Result<Vec<Group>, MrError>;
}

/// Builds the grouper a config asks for. `combiner` is only consulted by
/// the spilling grouper, and only when combining is enabled.
pub fn for_config(config: &JobConfig, combiner: Option<Arc<dyn Reducer>>) -> Box<dyn Grouper> {
    match &config.spill_dir {
        Some(dir) => {
            let mut grouper =
                SpillingGrouper::new(dir.clone(), config.spill_threshold_bytes);
            if config.combine {
                if let Some(combiner) = combiner {
                    grouper = grouper.with_combiner(combiner);
                }
            }
            Box::new(grouper)
        }
        None => Box::new(InMemoryGrouper::new(config.spill_threshold_bytes)),
    }
}

// Rough per-pair resident cost. An estimate, not an allocator measurement:
// the key bytes plus one stored value.
fn pair_cost(pair: &Pair) -> usize {
    pair.key.len() + mem::size_of::<u64>()
}

/// HashMap-backed grouper for bounded input. Past the byte limit it fails
/// with `GroupingCapacity` rather than grow without bound.
pub struct InMemoryGrouper {
    groups: HashMap<String, Vec<u64>>,
    resident_bytes: usize,
    limit: usize,
}

impl InMemoryGrouper {
    pub fn new(limit: usize) -> Self {
        Self {
            groups: HashMap::new(),
            resident_bytes: 0,
            limit,
        }
    }
}

impl Grouper for InMemoryGrouper {
    fn insert(&mut self, pair: Pair) -> Result<(), MrError> {
        self.resident_bytes += pair_cost(&pair);
        if self.resident_bytes > self.limit {
            return Err(MrError::GroupingCapacity {
                resident: self.resident_bytes,
                limit: self.limit,
            });
        }
        self.groups.entry(pair.key).or_default().push(pair.value);
        Ok(())
    }

    fn into_groups(self: Box<Self>) -> Result<Vec<Group>, MrError> {
        Ok(to_groups(self.groups))
    }
}

/// Grouper that bounds resident memory by writing its table to spill
/// files, then merges every spill file plus the resident table when
/// drained, so each key is still emitted exactly once.
pub struct SpillingGrouper {
    groups: HashMap<String, Vec<u64>>,
    resident_bytes: usize,
    limit: usize,
    dir: PathBuf,
    spill_files: Vec<PathBuf>,
    combiner: Option<Arc<dyn Reducer>>,
}

impl SpillingGrouper {
    pub fn new(dir: PathBuf, limit: usize) -> Self {
        Self {
            groups: HashMap::new(),
            resident_bytes: 0,
            limit,
            dir,
            spill_files: Vec::new(),
            combiner: None,
        }
    }

    /// Pre-aggregates each group to a single pair before it is spilled,
    /// shrinking spill files. Must only be used with associative reducers.
    pub fn with_combiner(mut self, combiner: Arc<dyn Reducer>) -> Self {
        self.combiner = Some(combiner);
        self
    }

    fn spill(&mut self) -> Result<(), MrError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("spill-{}.tsv", Uuid::new_v4()));
        let mut lines = String::new();
        for (key, values) in self.groups.drain() {
            match &self.combiner {
                Some(combiner) => {
                    let sum = combiner.reduce(&key, &values)?;
                    lines.push_str(&format!("{}\t{}\n", key, sum));
                }
                None => {
                    for value in values {
                        lines.push_str(&format!("{}\t{}\n", key, value));
                    }
                }
            }
        }
        fs::write(&path, lines)?;
        debug!(
            "spill write: {} ({} resident bytes)",
            path.display(),
            self.resident_bytes
        );
        self.resident_bytes = 0;
        self.spill_files.push(path);
        Ok(())
    }
}

impl Grouper for SpillingGrouper {
    fn insert(&mut self, pair: Pair) -> Result<(), MrError> {
        self.resident_bytes += pair_cost(&pair);
        self.groups.entry(pair.key).or_default().push(pair.value);
        if self.resident_bytes > self.limit {
            self.spill()?;
        }
        Ok(())
    }

    fn into_groups(self: Box<Self>) -> Result<Vec<Group>, MrError> {
        let mut merged = self.groups;
        for path in &self.spill_files {
            let contents = fs::read_to_string(path)?;
            for line in contents.lines() {
                // Values are numeric and never contain a tab, so splitting
                // from the right is safe even for keys that embed one.
                let (key, value) = line.rsplit_once('\t').ok_or_else(|| {
                    MrError::Io(corrupt_spill(path, "missing separator"))
                })?;
                let value: u64 = value
                    .parse()
                    .map_err(|_| MrError::Io(corrupt_spill(path, "bad count")))?;
                merged.entry(key.to_string()).or_default().push(value);
            }
        }
        for path in self.spill_files {
            if let Err(err) = fs::remove_file(&path) {
                warn!("failed to remove spill file {}: {}", path.display(), err);
            }
        }
        Ok(to_groups(merged))
    }
}

fn to_groups(map: HashMap<String, Vec<u64>>) -> Vec<Group> {
    map.into_iter()
        .map(|(key, values)| Group { key, values })
        .collect()
}

fn corrupt_spill(path: &PathBuf, what: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("corrupt spill file {}: {}", path.display(), what),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::SumReducer;
    use std::collections::HashMap;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("minimr-{}-{}", tag, Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn counts(groups: Vec<Group>) -> HashMap<String, Vec<u64>> {
        groups
            .into_iter()
            .map(|g| {
                let mut values = g.values;
                values.sort_unstable();
                (g.key, values)
            })
            .collect()
    }

    fn feed(grouper: &mut dyn Grouper, keys: &[&str]) {
        for key in keys {
            grouper.insert(Pair::new(*key, 1)).unwrap();
        }
    }

    #[test]
    fn in_memory_groups_by_key() {
        let mut grouper = Box::new(InMemoryGrouper::new(1024));
        feed(grouper.as_mut(), &["the", "cat", "the"]);
        let groups = counts(grouper.into_groups().unwrap());
        assert_eq!(groups["the"], vec![1, 1]);
        assert_eq!(groups["cat"], vec![1]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn in_memory_refuses_past_the_limit() {
        let mut grouper = InMemoryGrouper::new(32);
        let err = (0..100)
            .map(|i| grouper.insert(Pair::new(format!("key-{}", i), 1)))
            .find_map(Result::err)
            .expect("limit never hit");
        assert!(matches!(err, MrError::GroupingCapacity { .. }));
    }

    #[test]
    fn spilling_grouper_matches_in_memory_result() {
        let dir = temp_dir("spill");
        // A limit this small forces a spill on nearly every insert.
        let mut grouper = Box::new(SpillingGrouper::new(dir.clone(), 8));
        feed(grouper.as_mut(), &["a", "b", "a", "c", "a", "b"]);
        let groups = counts(grouper.into_groups().unwrap());
        assert_eq!(groups["a"], vec![1, 1, 1]);
        assert_eq!(groups["b"], vec![1, 1]);
        assert_eq!(groups["c"], vec![1]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn spill_files_are_removed_after_drain() {
        let dir = temp_dir("spill-cleanup");
        let mut grouper = Box::new(SpillingGrouper::new(dir.clone(), 8));
        feed(grouper.as_mut(), &["one", "two", "three"]);
        grouper.into_groups().unwrap();
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn combiner_collapses_spilled_groups() {
        let dir = temp_dir("spill-combine");
        let mut grouper = Box::new(
            SpillingGrouper::new(dir.clone(), 64).with_combiner(Arc::new(SumReducer)),
        );
        for _ in 0..50 {
            grouper.insert(Pair::new("word", 1)).unwrap();
        }
        let groups = grouper.into_groups().unwrap();
        assert_eq!(groups.len(), 1);
        let total: u64 = groups[0].values.iter().sum();
        assert_eq!(total, 50);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn for_config_picks_the_spilling_grouper_when_a_dir_is_set() {
        let dir = temp_dir("for-config");
        let config = JobConfig::new()
            .set_spill_dir(dir.clone())
            .set_spill_threshold_bytes(8);
        let mut grouper = for_config(&config, Some(Arc::new(SumReducer)));
        feed(grouper.as_mut(), &["x", "y", "x"]);
        let groups = counts(grouper.into_groups().unwrap());
        assert_eq!(groups["x"].iter().sum::<u64>(), 2);
        fs::remove_dir_all(dir).unwrap();
    }
}
