use clap::Parser;
use miette::Result;
use pmug::cli::{Cli, Commands};
use pmug::config::PipelineConfig;
use pmug::logging::{effective_level, init_logging};
use pmug::output::Printer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PipelineConfig::discover(cli.config.as_deref())?;
    init_logging(&effective_level(&config.logging, cli.verbose));
    let printer = Printer::new();

    match cli.command {
        Commands::Convert(args) => pmug::cli::convert::run(args, &config, &printer)?,
        Commands::SendImage(args) => pmug::cli::send::run_image(args, &config, &printer).await?,
        Commands::SendGif(args) => pmug::cli::send::run_gif(args, &config, &printer).await?,
        Commands::ResizeGif(args) => pmug::cli::resize::run(args, &config, &printer)?,
        Commands::Colours(args) => pmug::cli::colours::run(args, &printer)?,
        Commands::Completions(args) => pmug::cli::completions::run(args)?,
    }

    Ok(())
}
