use std::io;

use anyhow::Result;
use clap::Parser;

use diskschedsim::cli::Cli;
use diskschedsim::config::RunConfigBuilder;
use diskschedsim::orchestrator::Orchestrator;
use diskschedsim::session;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RunConfigBuilder::new()
        .log_level(cli.log_level.clone())
        .selftest(cli.selftest)
        .build()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    if config.selftest {
        return run_selftest();
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let orchestrator = session::run_session(stdin.lock(), stdout.lock())?;
    log::info!("{}", orchestrator.metrics.snapshot());
    Ok(())
}

/// Run one scripted scenario against an in-memory orchestrator, with no
/// protocol I/O, to smoke-test the scheduler without a driver attached.
fn run_selftest() -> Result<()> {
    use diskschedsim::protocol::WriteEvent;
    use diskschedsim::tag_heat::TagHeatTable;

    println!("diskschedsim selftest");
    println!("=====================");

    let tag_heat = TagHeatTable::new(vec![vec![0]], vec![vec![0]]);
    let mut orchestrator = Orchestrator::new(5, 20, 100, tag_heat);

    let slice_one = orchestrator.run_slice(
        1,
        vec![],
        vec![WriteEvent { object_id: 1, size: 3, tag: 1 }],
        vec![],
    );
    println!("slice 1: wrote {} object(s)", slice_one.written.len());

    let slice_two = orchestrator.run_slice(2, vec![], vec![], vec![(1, 1)]);
    println!(
        "slice 2: head actions = {:?}, completed = {:?}",
        slice_two.actions, slice_two.completed
    );

    println!();
    println!("disk summaries:");
    println!("{}", serde_json::to_string_pretty(&orchestrator.disk_summaries())?);
    println!();
    println!("{}", orchestrator.metrics.snapshot());
    Ok(())
}
