use crate::demo::{run_demo, run_quote, DemoArgs, QuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hostel_ledger::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hostel Ledger",
    about = "Price rooms, reconcile fees, and settle room changes for hostel operations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the price breakdown for a room type and amenity selection
    Quote(QuoteArgs),
    /// Run a scripted walkthrough of allocation, late fees, and room changes
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Quote(args) => run_quote(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostel_ledger::ledger::RoomType;

    #[test]
    fn quote_flags_parse_into_an_amenity_selection() {
        let cli = Cli::try_parse_from([
            "hostel-ledger",
            "quote",
            "--room-type",
            "Double",
            "--ac",
            "--wifi",
            "--fans",
            "2",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Quote(args)) => {
                assert_eq!(args.room_type, RoomType::Double);
                let amenities = args.amenities();
                assert!(amenities.ac && amenities.wifi);
                assert!(!amenities.geyser);
                assert_eq!(amenities.fan_count, 2);
            }
            other => panic!("expected quote command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_room_type_is_rejected() {
        assert!(Cli::try_parse_from(["hostel-ledger", "quote", "--room-type", "suite"]).is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["hostel-ledger"]).expect("no arguments");
        assert!(cli.command.is_none());
    }
}
