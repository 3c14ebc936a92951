use clap::Parser;

use tmdb_addon::cli::{self, Cli};
use tmdb_addon::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match cli::load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{:#}", e);
            eprintln!("{}", Cli::get_validation_help());
            std::process::exit(1);
        }
    };

    cli::init_logger_from_settings(&settings)?;

    cli::execute_command(&cli, settings.clone()).await?;

    if cli.starts_server() {
        Server::new(settings).run().await?;
    }

    Ok(())
}
