// SPDX-License-Identifier: MPL-2.0

use color_eyre::eyre::{Result, WrapErr};
use futures::executor::block_on;
use securerand::{
    bound::Number,
    entropy::OsEntropySource,
    generator::{GeneratorConfig, SecureRandom},
};
use std::{
    fs::read_to_string,
    io::{stdout, Write},
    num::NonZeroU32,
    path::{Path, PathBuf},
    str::FromStr,
};
use structopt::StructOpt;

/// A bound given on the command line, either an integer or a decimal number.
#[derive(Debug, Clone, Copy)]
struct Bound(Number);

impl FromStr for Bound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = i128::from_str(s) {
            return Ok(Bound(Number::Int(value)));
        }
        f64::from_str(s)
            .map(|value| Bound(Number::Float(value)))
            .map_err(|e| format!("argument could not be parsed as a number: {e:?}"))
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "random_int",
    about = "Print cryptographically secure random integers between two bounds, inclusive",
    rename_all = "kebab-case",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Options {
    /// Lower bound
    #[structopt(long, allow_hyphen_values = true)]
    min: Option<Bound>,
    /// Upper bound, which may itself be returned
    #[structopt(long, allow_hyphen_values = true)]
    max: Option<Bound>,
    /// How many integers to print, one per line
    #[structopt(long, short, default_value = "1")]
    count: usize,
    /// Path to a JSON generator configuration, e.g. `{"max_attempts": 64}`
    #[structopt(long, value_name = "path", parse(from_os_str))]
    config: Option<PathBuf>,
    /// Give up after this many rejected candidates per integer. Overrides the configuration file.
    #[structopt(long)]
    max_attempts: Option<NonZeroU32>,
}

/// Read a generator configuration from a JSON file.
fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let contents = read_to_string(path)
        .wrap_err_with(|| format!("could not read configuration from {}", path.display()))?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<GeneratorConfig> {
    serde_json::from_str(contents).wrap_err("could not parse generator configuration")
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let options = Options::from_args();

    let mut config = match &options.config {
        Some(path) => load_config(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(max_attempts) = options.max_attempts {
        config.max_attempts = Some(max_attempts);
    }
    let mut rng = SecureRandom::with_config(OsEntropySource, config);

    let stdout = stdout();
    let mut out = stdout.lock();
    for _ in 0..options.count {
        let value = block_on(rng.generate_from(
            options.min.map(|bound| bound.0),
            options.max.map(|bound| bound.0),
        ))
        .wrap_err("could not generate random integer")?;
        writeln!(out, "{value}").wrap_err("could not write to stdout")?;
    }

    Ok(())
}
