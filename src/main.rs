// src/main.rs

use plugwatch::{cli, logging, run};

// Current-thread flavor on purpose: the watch layer hands work off to a
// single-threaded scheduler, and reload/notify actions must never run in
// parallel with each other.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("plugwatch error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let log = logging::init_logging(args.log_level)?;
    run(args, Some(log)).await
}
