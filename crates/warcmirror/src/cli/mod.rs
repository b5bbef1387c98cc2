mod crawl;
mod item;

use clap::{Parser, Subcommand};

use crate::run::RunStatus;

#[derive(Debug, Parser)]
#[command(name = "warcmirror", version, about)]
pub struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Mirror every WARC segment of a web crawl
    Crawl(crawl::Crawl),

    /// Mirror the archive files of library items
    Item(item::Item),
}

impl App {
    pub async fn run(self) -> anyhow::Result<RunStatus> {
        match self.command {
            Commands::Crawl(cmd) => cmd.run().await,
            Commands::Item(cmd) => cmd.run().await,
        }
    }
}
