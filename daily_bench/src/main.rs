use anyhow::Result;
use daily_bench::cli;

// Main entry point
fn main() -> Result<()> {
    cli::handle_calls()
}
