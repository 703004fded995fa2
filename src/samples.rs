//! Sample-data convenience: write two small comma-delimited input files
//! before a job runs, and print the result file once it has finished.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::MrError;

/// Two days of a toy access log, one line of comma-separated addresses each.
pub const SAMPLE_INPUTS: [(&str, &str); 2] = [
    ("access-2019-03-24.txt", "192.168.32.126,192.168.32.127\n"),
    ("access-2019-03-25.txt", "192.168.32.126,192.168.32.128\n"),
];

pub fn write_sample_inputs(dir: &Path) -> Result<Vec<PathBuf>, MrError> {
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(SAMPLE_INPUTS.len());
    for (name, contents) in SAMPLE_INPUTS {
        let path = dir.join(name);
        fs::write(&path, contents)?;
        info!("sample write: {}", path.display());
        paths.push(path);
    }
    info!("write done");
    Ok(paths)
}

/// Reads the result file once and logs each line. No polling: the job has
/// already completed by the time this is called.
pub fn print_result(path: &Path) -> Result<String, MrError> {
    let contents = fs::read_to_string(path)?;
    for line in contents.lines() {
        info!("{}", line);
    }
    Ok(contents)
}
