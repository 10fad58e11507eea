use anyhow::Context;
use tracegraph::voxelmap::{parse_cli, run};
use tracegraph::{init_tracing, EXIT_CONFIG};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = match parse_cli() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("   {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    init_tracing(args.verbose);
    info!(
        "read data from {} and plot to {}",
        args.input,
        args.output.display()
    );
    run(&args).with_context(|| format!("could not make the 3D heatmap {}", args.output.display()))?;
    Ok(())
}
