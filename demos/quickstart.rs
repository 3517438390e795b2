use std::path;

use env_logger;
use log;
use rand::Rng;

use pairwise_sort::{input, Pipeline, PipelineBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let mut rng = rand::thread_rng();
    input::write_numbers(path::Path::new("input.bin"), (0..100_000).map(|_| rng.gen::<i64>())).unwrap();

    let pipeline: Pipeline = PipelineBuilder::new()
        .with_tmp_dir(path::Path::new("./"))
        .with_chunk_size(10_000)
        .build()
        .unwrap();

    let sorted = pipeline.run(path::Path::new("input.bin")).unwrap();
    assert!(sorted.is_sorted().unwrap());

    sorted.persist(path::Path::new("output.txt")).unwrap();
}
