//! Record sources and pair sinks. The engines only ever see the abstract
//! `Records` iterator and `PairSink` trait, so files, sample data and
//! in-memory fixtures all plug in the same way.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::common::{Pair, PairSink, Records};
use crate::error::MrError;

/// In-memory record stream, mainly for tests and sample data.
pub fn from_lines(lines: Vec<String>) -> Records {
    Box::new(lines.into_iter().map(Ok))
}

/// Lazily reads lines from one or more files, in order. Lines that are not
/// valid UTF-8 surface as `MalformedInput` with their path and line number.
pub fn open_paths(paths: &[PathBuf]) -> Records {
    Box::new(FileRecords {
        pending: paths.iter().cloned().collect(),
        current: None,
    })
}

struct FileRecords {
    pending: VecDeque<PathBuf>,
    current: Option<(PathBuf, BufReader<File>, u64)>,
}

impl Iterator for FileRecords {
    type Item = Result<String, MrError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.pending.pop_front()?;
                match File::open(&path) {
                    Ok(file) => {
                        debug!("map read: {}", path.display());
                        self.current = Some((path, BufReader::new(file), 0));
                    }
                    Err(err) => return Some(Err(MrError::Io(err))),
                }
            }
            let (path, reader, line) = self.current.as_mut().unwrap();
            let mut buf = Vec::new();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.current = None;
                }
                Ok(_) => {
                    *line += 1;
                    while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    return Some(match String::from_utf8(buf) {
                        Ok(record) => Ok(record),
                        Err(_) => Err(MrError::MalformedInput {
                            path: path.clone(),
                            line: *line,
                        }),
                    });
                }
                Err(err) => {
                    self.current = None;
                    return Some(Err(MrError::Io(err)));
                }
            }
        }
    }
}

/// Collects output pairs in memory, for tests and sample read-back.
#[derive(Default)]
pub struct VecSink {
    pub pairs: Vec<Pair>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_counts(self) -> std::collections::HashMap<String, u64> {
        self.pairs.into_iter().map(|p| (p.key, p.value)).collect()
    }
}

impl PairSink for VecSink {
    fn accept(&mut self, pair: Pair) -> Result<(), MrError> {
        self.pairs.push(pair);
        Ok(())
    }
}

/// Writes `key<sep>count` lines, sorted by key so output is deterministic.
/// The file is only written on flush, after the whole job succeeded.
pub struct FileSink {
    path: PathBuf,
    separator: char,
    pairs: Vec<Pair>,
}

impl FileSink {
    pub fn create(path: &Path, separator: char) -> Result<Self, MrError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            separator,
            pairs: Vec::new(),
        })
    }
}

impl PairSink for FileSink {
    fn accept(&mut self, pair: Pair) -> Result<(), MrError> {
        self.pairs.push(pair);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MrError> {
        self.pairs.sort_by(|a, b| a.key.cmp(&b.key));
        let mut lines = String::new();
        for pair in &self.pairs {
            lines.push_str(&format!("{}{}{}\n", pair.key, self.separator, pair.value));
        }
        std::fs::write(&self.path, lines)?;
        info!("reduce write: {}", self.path.display());
        Ok(())
    }
}
