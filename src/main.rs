use anyhow::Result;
use chrono::Utc;
use kube::Client;
use tracing::info;

use kube_object_checks::{
    config_failure, execute, fetch_snapshot, load_config, load_snapshot_file, CheckOutput, Config, Snapshot,
};

#[tokio::main]
async fn main() {
    init_tracing();
    let output = run().await;
    println!("{}", output);
    std::process::exit(output.severity.exit_code());
}

async fn run() -> CheckOutput {
    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => return config_failure(&e),
    };
    info!("mode = {:?}, namespaces = {:?}", cfg.mode, cfg.namespaces);

    let snapshot = snapshot(&cfg).await;
    execute(&cfg, snapshot, Utc::now())
}

async fn snapshot(cfg: &Config) -> Result<Snapshot> {
    if let Some(path) = &cfg.snapshot_file {
        info!("reading snapshot from {}", path.display());
        return load_snapshot_file(path);
    }
    let client = Client::try_default().await?;
    fetch_snapshot(&client, cfg).await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
