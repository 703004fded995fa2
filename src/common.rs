use async_trait::async_trait;
use regex::Regex;

use crate::error::MrError;

/// One key-value emission from the map phase. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: u64,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: u64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// All values observed for one key, ready for aggregation. Built once by the
/// grouper, consumed exactly once by the reducer. Value order is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    pub values: Vec<u64>,
}

/// Token-splitting rule applied to each record.
#[derive(Debug, Clone)]
pub enum Delimiter {
    /// Split on runs of whitespace. The default.
    Whitespace,
    /// Split on a single character, dropping empty tokens.
    Char(char),
    /// Emit every match of a pattern as a token.
    Pattern(Regex),
}

impl Delimiter {
    /// Alphanumeric-run tokenization, for prose rather than delimited data.
    pub fn words() -> Self {
        Delimiter::Pattern(Regex::new(r"\b[a-zA-Z0-9]+\b").expect("invalid word pattern"))
    }

    pub fn tokens<'a>(&'a self, record: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            Delimiter::Whitespace => Box::new(record.split_whitespace()),
            Delimiter::Char(c) => Box::new(record.split(*c).filter(|t| !t.is_empty())),
            Delimiter::Pattern(re) => Box::new(re.find_iter(record).map(|m| m.as_str())),
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Whitespace
    }
}

/// The stream of records feeding a job. Each item is one text line; sources
/// report undecodable bytes as [`MrError::MalformedInput`].
pub type Records = Box<dyn Iterator<Item = Result<String, MrError>> + Send>;

/// Produces pairs from one record.
pub trait Mapper: Send + Sync {
    fn map<'a>(&'a self, record: &'a str) -> Box<dyn Iterator<Item = Pair> + 'a>;
}

/// Produces one aggregated value from a group.
pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &str, values: &[u64]) -> Result<u64, MrError>;
}

/// Receives the final output pairs of a job.
pub trait PairSink: Send {
    fn accept(&mut self, pair: Pair) -> Result<(), MrError>;
    fn flush(&mut self) -> Result<(), MrError> {
        Ok(())
    }
}

/// A runnable map/group/reduce pipeline over a record stream.
#[async_trait]
pub trait Engine {
    async fn run(self, records: Records, sink: &mut dyn PairSink) -> anyhow::Result<()>;
}
