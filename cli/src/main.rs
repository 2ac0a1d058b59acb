mod commands;
mod terminal;

use commands::{CommandLine, Commands, claim, interfaces};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init();

    match commands.command {
        Commands::Claim(args) => {
            print::header("address conflict detection");
            claim::claim(args).await
        }
        Commands::Interfaces => {
            print::header("viable interfaces");
            interfaces::interfaces();
            Ok(())
        }
    }
}
