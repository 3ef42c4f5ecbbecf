use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use membench::{
    config::{Output, Suite},
    export::{self, Axes, Csv, Exporter, SvgPlot},
    options::Options,
    primitive::Portable,
    record::ResultMatrix,
    suite::{Bench, Buffers, SweepReport},
    Config,
};
use std::fmt::Display;

fn exporter(config: &Config, suite: Suite) -> Box<dyn Exporter> {
    let path = config.output_path(suite);
    match config.output {
        Output::Plot => Box::new(SvgPlot::new(path)),
        Output::Csv => Box::new(Csv::new(path)),
    }
}

fn write_results<K: Display>(
    bench: &Bench<Portable>,
    suite: Suite,
    results: &ResultMatrix<K>,
    axes: Axes<'_>,
) -> eyre::Result<()> {
    let config = bench.config();
    let mut exporter = exporter(config, suite);
    export::export(results, &mut *exporter, &bench.job_title(suite), axes).wrap_err_with(|| {
        format!(
            "failed to export {suite} results to {}",
            config.output_path(suite).display()
        )
    })?;
    Ok(())
}

/// Dump every measured point when debug logging is enabled.
fn log_points(report: &SweepReport) -> eyre::Result<()> {
    if log::log_enabled!(log::Level::Debug) {
        let points = serde_yaml::to_string(&report.points)?;
        log::debug!("sweep points:\n{points}");
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    color_eyre::install()?;

    let options = Options::parse();
    let config = options.resolve()?;
    log::info!(
        "max_size = {}, iterations = {}, nice = {}",
        human_bytes::human_bytes(config.max_size as f64),
        config.iterations,
        config.nice
    );

    let needs_buffers = config
        .suites
        .iter()
        .any(|suite| matches!(suite, Suite::Memcpy | Suite::Bandwidth));
    let mut buffers = if needs_buffers {
        Some(Buffers::allocate(config.max_size)?)
    } else {
        None
    };

    utils::set_priority(config.nice)
        .wrap_err_with(|| format!("failed to set process priority to {}", config.nice))?;
    log::info!("System Maximum threads = {}", num_cpus::get());

    let machine = utils::machine_name().wrap_err("failed to query machine name")?;
    let mut bench = Bench::new(config.clone(), Portable, machine)?;

    for suite in config.suites.iter().copied() {
        log::info!("{}", bench.job_title(suite));
        match (suite, buffers.as_mut()) {
            (Suite::Memcpy, Some(buffers)) => {
                let report = bench.memcpy(buffers)?;
                log_points(&report)?;
                write_results(&bench, suite, &report.results, Axes::BANDWIDTH)?;
            }
            (Suite::Bandwidth, Some(buffers)) => {
                let report = bench.bandwidth(buffers)?;
                log_points(&report)?;
                write_results(&bench, suite, &report.results, Axes::BANDWIDTH)?;
            }
            (Suite::Matrix, _) => {
                let results = bench.matrix()?;
                write_results(&bench, suite, &results, Axes::MATRIX)?;
            }
            (Suite::Memcpy | Suite::Bandwidth, None) => {
                eyre::bail!("{suite} suite needs the sweep buffers");
            }
        }
    }
    Ok(())
}
