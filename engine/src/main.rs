use std::process::ExitCode;

use anyhow::Context;
use engine::{PluginManager, Startup};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("engine: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> anyhow::Result<ExitCode> {
    let mut manager = match PluginManager::start(args)? {
        Startup::Help(text) => {
            println!("{}", text);
            return Ok(ExitCode::SUCCESS);
        }
        Startup::Checked(mut manager) => {
            manager.shutdown();
            return Ok(ExitCode::SUCCESS);
        }
        Startup::Ready(manager) => manager,
    };

    manager.logger().info("Engine running, press Ctrl-C to stop");
    let waited = tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C");
    manager.shutdown();
    waited?;
    Ok(ExitCode::SUCCESS)
}
