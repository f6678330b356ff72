use clap::Parser;
use stampedeless_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Get(args) => cli::store::get(args).await,
        Command::Set(args) => cli::store::set(args).await,
        Command::Delete(args) => cli::store::delete(args).await,
        Command::Flush(args) => cli::store::flush(args).await,
        Command::Simulate(args) => cli::simulate::run(args).await,
    }
}
