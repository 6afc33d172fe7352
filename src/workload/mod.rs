//! Benchmark workload: initial population, random inputs, and the client driver.

pub mod driver;
pub mod generator;
pub mod params;
mod rand_util;

pub use driver::{BenchConfig, BenchReport, KindReport, run_benchmark};
pub use generator::{DatasetGenerator, LoadSummary, ScaleParameters, last_name, load_dataset};
pub use params::ParameterGenerator;
