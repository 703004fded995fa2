//! Single-threaded engine: stream the records through the mapper into one
//! grouper, then reduce every group into the sink.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::common::{Engine, Mapper, Pair, PairSink, Records, Reducer};
use crate::config::JobConfig;
use crate::error::MrError;
use crate::grouper;

pub struct SequentialEngine {
    config: JobConfig,
    mapper: Box<dyn Mapper>,
    reducer: Arc<dyn Reducer>,
}

impl SequentialEngine {
    pub fn new(config: JobConfig, mapper: Box<dyn Mapper>, reducer: Box<dyn Reducer>) -> Self {
        Self {
            config,
            mapper,
            reducer: Arc::from(reducer),
        }
    }

    pub fn run_sync(self, records: Records, sink: &mut dyn PairSink) -> Result<(), MrError> {
        let combiner = self.config.combine.then(|| Arc::clone(&self.reducer));
        let mut grouper = grouper::for_config(&self.config, combiner);

        let mut mapped = 0u64;
        for record in records {
            let record = record?;
            for pair in self.mapper.map(&record) {
                mapped += 1;
                grouper.insert(pair)?;
            }
        }
        debug!("map done: {} pairs", mapped);

        for group in grouper.into_groups()? {
            let sum = self.reducer.reduce(&group.key, &group.values)?;
            sink.accept(Pair::new(group.key, sum))?;
        }
        sink.flush()
    }
}

#[async_trait]
impl Engine for SequentialEngine {
    async fn run(self, records: Records, sink: &mut dyn PairSink) -> anyhow::Result<()> {
        self.run_sync(records, sink)?;
        Ok(())
    }
}
