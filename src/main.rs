use cardsearch::Opts;
use cardsearch::cli::SubCommandExtend;
use cardsearch::config::SubCommand;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Server(config) => config.run(&opts).await,
        SubCommand::Lookup(config) => config.run(&opts).await,
        SubCommand::Similar(config) => config.run(&opts).await,
        SubCommand::Counter(config) => config.run(&opts).await,
        SubCommand::Identify(config) => config.run(&opts).await,
    }
}
