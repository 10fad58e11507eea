use anyhow::Context;
use tracegraph::mkgraph::{parse_cli, run};
use tracegraph::{init_tracing, EXIT_CONFIG};

fn main() -> anyhow::Result<()> {
    let args = match parse_cli() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("   {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    init_tracing(args.verbose());
    run(&args).context("could not make the graph")?;
    Ok(())
}
