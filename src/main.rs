use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use pairwise_sort::input::ELEMENT_SIZE;
use pairwise_sort::{BinaryExternalChunk, ExternalChunk, PipelineBuilder, TextExternalChunk};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let format: Format = arg_parser.value_of_t_or_exit("format");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let threads: Option<usize> = arg_parser
        .is_present("threads")
        .then(|| arg_parser.value_of_t_or_exit("threads"));

    let chunk_size: usize = if arg_parser.is_present("chunk_size") {
        arg_parser.value_of_t_or_exit("chunk_size")
    } else {
        let chunk_memory = arg_parser.value_of("chunk_memory").expect("value is required");
        let chunk_memory = chunk_memory.parse::<ByteSize>().expect("value is pre-validated").as_u64();
        match usize::try_from(chunk_memory / ELEMENT_SIZE as u64) {
            Ok(chunk_size) => chunk_size,
            Err(err) => {
                log::error!("chunk memory too large for this platform: {}", err);
                process::exit(1);
            }
        }
    };

    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");
    let verify = arg_parser.is_present("verify");

    match format {
        Format::Text => sort(
            configure::<TextExternalChunk>(chunk_size, threads, tmp_dir),
            input,
            output,
            verify,
        ),
        Format::Binary => sort(
            configure::<BinaryExternalChunk>(chunk_size, threads, tmp_dir),
            input,
            output,
            verify,
        ),
    }

    println!("{}", output);
}

fn configure<C: ExternalChunk>(chunk_size: usize, threads: Option<usize>, tmp_dir: Option<&str>) -> PipelineBuilder<C> {
    let mut pipeline_builder = PipelineBuilder::new().with_chunk_size(chunk_size);
    if let Some(threads) = threads {
        pipeline_builder = pipeline_builder.with_threads_number(threads);
    }

    if let Some(tmp_dir) = tmp_dir {
        pipeline_builder = pipeline_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    pipeline_builder
}

fn sort<C: ExternalChunk>(pipeline_builder: PipelineBuilder<C>, input: &str, output: &str, verify: bool) {
    let pipeline = match pipeline_builder.build() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            log::error!("pipeline initialization error: {}", err);
            process::exit(1);
        }
    };

    let sorted = match pipeline.run(path::Path::new(input)) {
        Ok(sorted) => sorted,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    if verify {
        match sorted.is_sorted() {
            Ok(true) => log::info!("output verified: sorted"),
            Ok(false) => {
                log::error!("output verification failed: unit {} is not sorted", sorted.id());
                process::exit(1);
            }
            Err(err) => {
                log::error!("output verification error: {}", err);
                process::exit(1);
            }
        }
    }

    if let Err(err) = sorted.persist(path::Path::new(output)) {
        log::error!("data saving error: {}", err);
        process::exit(1);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

/// Sorted unit storage format.
#[derive(Copy, Clone, clap::ArgEnum)]
enum Format {
    Text,
    Binary,
}

impl Format {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Format::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Format as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("pairwise-sort")
        .about("external sorter of binary integer files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file of little-endian 64-bit integers to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("format")
                .short('f')
                .long("format")
                .help("sorted units and result format")
                .takes_value(true)
                .default_value("text")
                .possible_values(Format::possible_values()),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("number of threads to use for parallel sorting and merging")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .short('c')
                .long("chunk-size")
                .help("number of integers sorted in memory by a single worker")
                .takes_value(true)
                .required_unless_present("chunk_memory")
                .conflicts_with("chunk_memory")
                .validator(|v| match v.parse::<usize>() {
                    Ok(0) => Err("Chunk size must be greater than zero".to_string()),
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Chunk size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("chunk_memory")
                .short('m')
                .long("chunk-memory")
                .help("memory sorted by a single worker, e.g. 64MiB")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(size) if size.as_u64() < ELEMENT_SIZE as u64 => {
                        Err(format!("Chunk memory must hold at least one {}-byte integer", ELEMENT_SIZE))
                    }
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Chunk memory format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("verify")
                .long("verify")
                .help("check that the result is sorted before saving it"),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
