use clap::Parser;

#[derive(Parser)]
#[command(name = "diskschedsim")]
#[command(about = "Multi-disk object-storage scheduler simulator", long_about = None)]
pub struct Cli {
    /// Log level (trace|debug|info|warn|error); overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Run one scripted scenario in-process instead of reading stdin.
    #[arg(long, default_value_t = false)]
    pub selftest: bool,
}
