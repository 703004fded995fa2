//! Parallel engine: the grouper is sharded by key hash across N
//! partitions, each owned by one worker thread fed over a bounded
//! channel. Workers only start reducing once every sender is gone, so a
//! group is never reduced before all of its pairs arrived.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use tokio::task;
use uuid::Uuid;

use crate::common::{Engine, Mapper, Pair, PairSink, Records, Reducer};
use crate::config::JobConfig;
use crate::error::MrError;
use crate::grouper::{self, Grouper};

const PARTITION_CHANNEL_CAPACITY: usize = 1024;

pub struct ParallelEngine {
    config: JobConfig,
    mapper: Box<dyn Mapper>,
    reducer: Arc<dyn Reducer>,
}

impl ParallelEngine {
    pub fn new(config: JobConfig, mapper: Box<dyn Mapper>, reducer: Box<dyn Reducer>) -> Self {
        Self {
            config,
            mapper,
            reducer: Arc::from(reducer),
        }
    }
}

#[async_trait]
impl Engine for ParallelEngine {
    async fn run(self, records: Records, sink: &mut dyn PairSink) -> anyhow::Result<()> {
        let partitions = self.config.workers.max(1);
        let mut senders = Vec::with_capacity(partitions);
        let mut workers = Vec::with_capacity(partitions);

        for _ in 0..partitions {
            let (tx, rx) = async_channel::bounded::<Pair>(PARTITION_CHANNEL_CAPACITY);
            senders.push(tx);
            let combiner = self.config.combine.then(|| Arc::clone(&self.reducer));
            let grouper = grouper::for_config(&self.config, combiner);
            let reducer = Arc::clone(&self.reducer);
            let id = Uuid::new_v4();
            workers.push(task::spawn_blocking(move || {
                partition_worker(id, rx, grouper, reducer)
            }));
        }

        let mapper = self.mapper;
        let feeder = task::spawn_blocking(move || feed_partitions(records, mapper, senders));

        // Merge barrier: workers drain their channels until the feeder has
        // dropped every sender, then reduce.
        let worker_results = join_all(workers).await;
        let feed_result = feeder.await?;

        let mut output = Vec::new();
        for result in worker_results {
            output.extend(result??);
        }
        // Check the feeder after the workers so a worker-side error is not
        // masked by the broken channel it leaves behind, but before any
        // output is emitted.
        feed_result?;

        for pair in output {
            sink.accept(pair)?;
        }
        sink.flush()?;
        Ok(())
    }
}

fn feed_partitions(
    records: Records,
    mapper: Box<dyn Mapper>,
    senders: Vec<Sender<Pair>>,
) -> Result<(), MrError> {
    let partitions = senders.len();
    for record in records {
        let record = record?;
        for pair in mapper.map(&record) {
            let idx = partition_of(&pair.key, partitions);
            senders[idx].send_blocking(pair).map_err(|_| {
                MrError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "partition worker stopped",
                ))
            })?;
        }
    }
    Ok(())
}

fn partition_worker(
    id: Uuid,
    receiver: Receiver<Pair>,
    mut grouper: Box<dyn Grouper>,
    reducer: Arc<dyn Reducer>,
) -> Result<Vec<Pair>, MrError> {
    let mut received = 0u64;
    while let Ok(pair) = receiver.recv_blocking() {
        received += 1;
        grouper.insert(pair)?;
    }
    // All senders dropped: every pair for this partition has arrived.
    debug!("worker {}: {} pairs received, reducing", id, received);
    let mut output = Vec::new();
    for group in grouper.into_groups()? {
        let sum = reducer.reduce(&group.key, &group.values)?;
        output.push(Pair::new(group.key, sum));
    }
    Ok(output)
}

fn partition_of(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{SumReducer, WordCount};
    use crate::common::Delimiter;
    use crate::engine_seq::SequentialEngine;
    use crate::stream::{from_lines, VecSink};
    use std::collections::HashMap;

    fn engine(config: JobConfig) -> ParallelEngine {
        ParallelEngine::new(
            config,
            Box::new(WordCount::new(Delimiter::Whitespace)),
            Box::new(SumReducer),
        )
    }

    async fn run_parallel(config: JobConfig, lines: &[&str]) -> HashMap<String, u64> {
        let mut sink = VecSink::new();
        let records = from_lines(lines.iter().map(|s| s.to_string()).collect());
        engine(config).run(records, &mut sink).await.unwrap();
        sink.into_counts()
    }

    #[tokio::test]
    async fn counts_match_the_worked_example() {
        let counts = run_parallel(JobConfig::new().set_workers(3), &["the cat sat", "the dog sat"]).await;
        let expected: HashMap<String, u64> = [
            ("the".to_string(), 2),
            ("cat".to_string(), 1),
            ("sat".to_string(), 2),
            ("dog".to_string(), 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(counts, expected);
    }

    #[tokio::test]
    async fn matches_the_sequential_engine() {
        let lines = [
            "one two three four",
            "two three four",
            "three four",
            "four",
        ];
        let parallel = run_parallel(JobConfig::new().set_workers(4), &lines).await;

        let seq = SequentialEngine::new(
            JobConfig::new(),
            Box::new(WordCount::new(Delimiter::Whitespace)),
            Box::new(SumReducer),
        );
        let mut sink = VecSink::new();
        seq.run_sync(
            from_lines(lines.iter().map(|s| s.to_string()).collect()),
            &mut sink,
        )
        .unwrap();
        assert_eq!(parallel, sink.into_counts());
    }

    #[tokio::test]
    async fn empty_input_produces_empty_output() {
        let counts = run_parallel(JobConfig::new(), &[]).await;
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn single_worker_degenerates_cleanly() {
        let counts = run_parallel(JobConfig::new().set_workers(1), &["a b a"]).await;
        assert_eq!(counts["a"], 2);
        assert_eq!(counts["b"], 1);
    }

    #[tokio::test]
    async fn worker_capacity_error_fails_the_job_without_output() {
        let config = JobConfig::new().set_workers(2).set_spill_threshold_bytes(8);
        let mut sink = VecSink::new();
        let records = from_lines(vec!["lots of distinct words arriving quickly".to_string()]);
        let result = engine(config).run(records, &mut sink).await;
        assert!(result.is_err());
        assert!(sink.pairs.is_empty());
    }

    #[test]
    fn partitioning_is_stable_and_in_range() {
        for key in ["the", "cat", "sat", "dog"] {
            let p = partition_of(key, 4);
            assert!(p < 4);
            assert_eq!(p, partition_of(key, 4));
        }
    }
}
