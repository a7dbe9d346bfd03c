mod commands;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use bucketscout_common::cancel::CancelSignal;
use bucketscout_core::ScanOrchestrator;
use commands::CommandLine;
use terminal::{logging, print, progress::ProgressSink, report};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.log_file().as_deref())?;
    print::banner(commands.quiet);

    let cfg = commands.to_scan_config();
    let cancel = CancelSignal::new();
    spawn_interrupt_handler(cancel.clone());

    print::header("getting ready", commands.quiet);
    let orchestrator = match ScanOrchestrator::from_config(&cfg, Arc::new(ProgressSink::default())) {
        Ok(orchestrator) => orchestrator.with_cancel(cancel),
        Err(e) => {
            error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    print::header("scanning target", commands.quiet);
    match orchestrator.run(commands.domain.clone(), &cfg.probe).await {
        Ok(result) => {
            report::render(&result, commands.quiet);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// First Ctrl-C lets in-flight downloads finish and skips the rest.
fn spawn_interrupt_handler(cancel: CancelSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            cancel.cancel();
        }
    });
}
