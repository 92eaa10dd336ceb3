use anyhow::Result;
use clap::{Parser, Subcommand};

use sheetbook::app::App;
use sheetbook::cli::{
    handle_debt_command, handle_expense_command, handle_login, handle_logout, handle_open,
    handle_register, handle_sheet_command, handle_whoami, DebtCommands, ExpenseCommands,
    SheetCommands,
};
use sheetbook::config::{paths::SheetbookPaths, settings::Settings};
use sheetbook::error::SheetbookResult;
use sheetbook::logging;

#[derive(Parser)]
#[command(
    name = "sheetbook",
    version,
    about = "Income sheets, expenses and debts from the terminal",
    long_about = "Sheetbook tracks income sheets, the expenses paid out of each one, \
                  and debts with partial payments. Log in once; the session and the \
                  last opened view are remembered between runs."
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        username: String,
        #[arg(short, long, env = "SHEETBOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log in to an existing account
    Login {
        username: String,
        #[arg(short, long, env = "SHEETBOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Open a route (e.g. /sheets, /debt/dbt-1a2b3c4d); defaults to the last one
    Open { route: Option<String> },

    /// Income sheet commands
    #[command(subcommand)]
    Sheet(SheetCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Debt commands
    #[command(subcommand)]
    Debt(DebtCommands),

    /// Show current configuration and paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = SheetbookPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    logging::init(&settings, cli.verbose);

    let command = match cli.command {
        Some(Commands::Config) => {
            print_config(&paths, &settings);
            return Ok(());
        }
        Some(command) => command,
        None => Commands::Open { route: None },
    };

    let app = App::open(settings, &paths)?;
    app.start().await?;

    let result = run(&app, command).await;
    app.shutdown().await?;
    result?;

    Ok(())
}

async fn run(app: &App, command: Commands) -> SheetbookResult<()> {
    match command {
        Commands::Register { username, password } => handle_register(app, &username, password).await,
        Commands::Login { username, password } => handle_login(app, &username, password).await,
        Commands::Logout => handle_logout(app).await,
        Commands::Whoami => handle_whoami(app),
        Commands::Open { route } => handle_open(app, route).await,
        Commands::Sheet(cmd) => handle_sheet_command(app, cmd).await,
        Commands::Expense(cmd) => handle_expense_command(app, cmd).await,
        Commands::Debt(cmd) => handle_debt_command(app, cmd).await,
        Commands::Config => Ok(()),
    }
}

fn print_config(paths: &SheetbookPaths, settings: &Settings) {
    println!("Sheetbook Configuration");
    println!("=======================");
    println!("Base directory:  {}", paths.base_dir().display());
    println!("Settings file:   {}", paths.settings_file().display());
    println!("Data directory:  {}", paths.data_dir().display());
    println!("State directory: {}", paths.state_dir().display());
    println!();
    println!("Settings:");
    println!("  Currency symbol: {}", settings.currency_symbol);
    println!("  Date format:     {}", settings.date_format);
    println!("  Default route:   {}", settings.default_route);
    println!("  Persisted state: {}", settings.persisted_fields.join(", "));
    println!("  Log level:       {}", settings.log_level);
}
