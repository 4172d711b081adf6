// main.rs

use clap::Parser;
use log::{error, info};

use cosine_gpu::config::BenchConfig;
use cosine_gpu::gpu::list_adapters;
use cosine_gpu::{BenchmarkHarness, CpuEngine, GpuEngine, LogSink, ReportSink, Result};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BenchConfig::parse();
    if let Err(err) = run(config).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(config: BenchConfig) -> Result<()> {
    config.validate()?;

    if config.list_devices {
        for adapter in list_adapters(config.gpu_options().backends) {
            println!("{adapter}");
        }
        return Ok(());
    }

    let set = config
        .dataset
        .generate(config.samples, config.dimensions, config.seed)?;
    info!(
        "generated {:?} dataset: {} vectors x {} dimensions",
        config.dataset,
        set.len(),
        set.dim()
    );

    let gpu = GpuEngine::new(config.gpu_options()).await?;
    let cpu = CpuEngine::new(config.threads())?;
    let harness = BenchmarkHarness::new(config.tolerance);

    // Both engines block while they run; keep them off the async workers.
    let report = tokio::task::spawn_blocking(move || harness.run(&set, &gpu, &cpu))
        .await??;

    let mut sink = LogSink;
    sink.report(&report);
    report.verification.into_result()?;
    Ok(())
}
