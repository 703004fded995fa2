use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use minimr::apps::{SumReducer, WordCount};
use minimr::common::{Delimiter, Engine};
use minimr::config::JobConfig;
use minimr::engine_parallel::ParallelEngine;
use minimr::engine_seq::SequentialEngine;
use minimr::samples;
use minimr::stream::{self, FileSink};

#[derive(Parser)]
#[command(name = "wordcount", about = "Count token occurrences across input files")]
struct Cli {
    /// Input files
    #[arg(required_unless_present = "sample_data")]
    inputs: Vec<PathBuf>,

    /// Output file, one `key<sep>count` line per key
    #[arg(short, long)]
    output: PathBuf,

    /// Token-splitting rule. Defaults to whitespace, or comma in sample mode
    #[arg(long, value_enum)]
    delimiter: Option<DelimiterArg>,

    #[arg(long, value_enum, default_value = "sequential")]
    engine: EngineKind,

    /// Partition count for the parallel engine
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Directory for grouper spill files; without it the grouper fails
    /// once the threshold is exceeded
    #[arg(long)]
    spill_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    spill_threshold_bytes: usize,

    /// Disable map-side combining before spills
    #[arg(long)]
    no_combine: bool,

    /// Separator between key and count in the output file
    #[arg(long, default_value_t = '\t')]
    output_separator: char,

    /// Write two small sample input files, run over them, and print the
    /// result file afterwards
    #[arg(long)]
    sample_data: bool,

    #[arg(long, default_value = "input/samples")]
    sample_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum DelimiterArg {
    Whitespace,
    Comma,
    /// Alphanumeric runs, for prose input
    Words,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineKind {
    Sequential,
    Parallel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let inputs = if cli.sample_data {
        samples::write_sample_inputs(&cli.sample_dir)?
    } else {
        cli.inputs.clone()
    };

    let delimiter = match cli.delimiter {
        Some(DelimiterArg::Whitespace) => Delimiter::Whitespace,
        Some(DelimiterArg::Comma) => Delimiter::Char(','),
        Some(DelimiterArg::Words) => Delimiter::words(),
        None if cli.sample_data => Delimiter::Char(','),
        None => Delimiter::Whitespace,
    };
    run_job(&cli, &inputs, delimiter).await
}

async fn run_job(cli: &Cli, inputs: &[PathBuf], delimiter: Delimiter) -> anyhow::Result<()> {
    let mut config = JobConfig::new()
        .set_delimiter(delimiter)
        .set_workers(cli.workers)
        .set_spill_threshold_bytes(cli.spill_threshold_bytes)
        .set_combine(!cli.no_combine)
        .set_output_separator(cli.output_separator);
    if let Some(dir) = &cli.spill_dir {
        config = config.set_spill_dir(dir.clone());
    }
    let mapper = WordCount::new(config.delimiter.clone());

    let records = stream::open_paths(inputs);
    let mut sink = FileSink::create(&cli.output, config.output_separator)?;

    match cli.engine {
        EngineKind::Sequential => {
            SequentialEngine::new(config, Box::new(mapper), Box::new(SumReducer))
                .run(records, &mut sink)
                .await?;
        }
        EngineKind::Parallel => {
            ParallelEngine::new(config, Box::new(mapper), Box::new(SumReducer))
                .run(records, &mut sink)
                .await?;
        }
    }
    info!("job done: {}", cli.output.display());

    if cli.sample_data {
        samples::print_result(&cli.output)?;
    }
    Ok(())
}
