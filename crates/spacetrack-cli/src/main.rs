use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "spacetrack", version, about = "Spacetrack CLI")]
struct Cli {
    /// Space to act on (defaults to `current_space` from config)
    #[arg(long, global = true)]
    space: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Space management
    Space {
        #[command(subcommand)]
        action: commands::space::SpaceAction,
    },
    /// Clock in and out
    Clock {
        #[command(subcommand)]
        action: commands::clock::ClockAction,
    },
    /// Single actions
    Action {
        #[command(subcommand)]
        action: commands::action::ActionAction,
    },
    /// Multi-step actions
    Multistep {
        #[command(subcommand)]
        action: commands::multistep::MultistepAction,
    },
    /// Waste log
    Waste {
        #[command(subcommand)]
        action: commands::waste::WasteAction,
    },
    /// To-do items
    Todo {
        #[command(subcommand)]
        action: commands::todo::TodoAction,
    },
    /// Comments
    Comment {
        #[command(subcommand)]
        action: commands::comment::CommentAction,
    },
    /// Action ledger
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Scoreboard for the space
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SPACETRACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let space = cli.space;
    let result = match cli.command {
        Commands::Space { action } => commands::space::run(action, space),
        Commands::Clock { action } => commands::clock::run(action, space),
        Commands::Action { action } => commands::action::run(action, space),
        Commands::Multistep { action } => commands::multistep::run(action, space),
        Commands::Waste { action } => commands::waste::run(action, space),
        Commands::Todo { action } => commands::todo::run(action, space),
        Commands::Comment { action } => commands::comment::run(action, space),
        Commands::Log { action } => commands::log::run(action, space),
        Commands::Stats => commands::stats::run(space),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "spacetrack", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
