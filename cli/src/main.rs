use chronicle_cli::Cli;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    chronicle_cli::init_tracing();
    let output = chronicle_cli::run(Cli::parse())?;
    print!("{output}");
    Ok(())
}
