mod commands;
mod terminal;

use commands::{CommandLine, Commands, info, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    match commands.command {
        Commands::Info => {
            logging::init_console()?;
            print::header("about the tool", false);
            info::info();
            Ok(())
        }
        Commands::Scan(args) => scan::scan(args).await,
    }
}
