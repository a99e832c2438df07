use std::error::Error;

use clap::Parser;
use log::info;

mod adapters;
mod io_utils;
mod record;
mod stats;
mod trim;

use adapters::AdapterSet;
use io_utils::{open_input, open_output, FastqReader, FastqWriter};
use record::Record;
use stats::StatsReport;
use trim::{process_record, TrimPolicy};

#[derive(Parser)]
#[command(version, about = "Trim adapters and low-quality ends from FASTQ reads")]
struct Args {
    /// Input FASTQ (use '-' for stdin). Gzip input is detected automatically.
    input: String,

    /// Output file; '.gz' and '.zst' extensions select compression. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Trim read ends to the best-scoring window above this phred quality.
    #[arg(short = 'q', long = "quality-threshold")]
    quality_threshold: Option<u8>,

    /// Discard reads shorter than this after trimming.
    #[arg(short = 'l', long = "min-length", default_value_t = 20)]
    min_length: usize,

    /// After quality trimming, discard reads below this mean windowed quality.
    #[arg(short = 'm', long = "min-mean-quality", default_value_t = 0)]
    min_mean_quality: u32,

    /// Adapter sequence to trim from the 3' ends of the reads.
    #[arg(short = 'a', long = "adapter")]
    adapter: Option<String>,

    /// Fasta file of adapter sequences (may be gzipped).
    #[arg(short = 'f', long = "adapter-file")]
    adapter_file: Option<String>,

    /// Leading adapter bases a subsequence must share for a match to occur.
    #[arg(short = 'M', long = "min-adapter-match", value_parser = parse_min_match)]
    min_adapter_match: Option<usize>,

    /// Keep filtered reads, with sequence and quality truncated to empty.
    #[arg(short = 'k', long = "keep-empty")]
    keep_empty: bool,

    /// Phred encoding of the quality scores in the input fastq.
    #[arg(short = 'p', long = "phred", default_value_t = 33, value_parser = parse_phred)]
    phred: u8,

    /// Log progress details to stderr.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn parse_min_match(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(String::from("minimum adapter match must be at least 1")),
    }
}

fn parse_phred(s: &str) -> Result<u8, String> {
    match s {
        "33" => Ok(33),
        "64" => Ok(64),
        _ => Err(String::from("phred encoding must be 33 or 64")),
    }
}

fn init_log(log_max_level: usize) {
    stderrlog::new()
        .module(module_path!())
        .verbosity(log_max_level)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_log(if args.verbose { 2 } else { 1 });

    let trim_adapters = args.adapter.is_some() || args.adapter_file.is_some();
    let trim_quality = args.quality_threshold.is_some();

    if args.min_adapter_match.is_some() && !trim_adapters {
        return Err("--min-adapter-match specified without adapter sequence(s)".into());
    }
    if !trim_quality {
        if args.min_mean_quality > 0 {
            return Err("--min-mean-quality requires the -q option".into());
        }
        if !trim_adapters {
            return Err("must specify at least one of the following options: -q, -a, -f".into());
        }
    }

    let policy = TrimPolicy {
        quality_threshold: args.quality_threshold,
        phred_offset: args.phred,
        min_length: args.min_length,
        min_mean_quality: args.min_mean_quality,
        min_adapter_match: args.min_adapter_match.unwrap_or(12),
        keep_empty: args.keep_empty,
    };

    let adapters = if trim_adapters {
        AdapterSet::build(
            args.adapter.as_deref(),
            args.adapter_file.as_deref(),
            policy.min_adapter_match,
        )?
    } else {
        AdapterSet::default()
    };

    let mut reader = FastqReader::new(open_input(&args.input)?);
    let mut writer = FastqWriter::new(open_output(args.output.as_deref())?);

    // one record slot for the whole stream; trimming only moves offsets
    let mut rec = Record::new();
    let mut stats = StatsReport::default();
    while reader.read_into(&mut rec)? {
        stats.reads_read += 1;
        let passed = process_record(&mut rec, &adapters, &policy, &mut stats);
        if passed || policy.keep_empty {
            writer
                .write_record(&rec)
                .map_err(|e| format!("error writing output: {e}"))?;
        }
        if stats.reads_read % 1_000_000 == 0 {
            info!("{} reads processed", stats.reads_read);
        }
    }
    writer.flush()?;

    info!("finished after {} reads", stats.reads_read);
    stats.print(trim_adapters, trim_quality);
    Ok(())
}
