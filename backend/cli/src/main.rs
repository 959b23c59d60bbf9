mod config_cmd;
mod context;
mod image_cmd;
mod order_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use bendline_config::defaults::{DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL};
use bendline_config::{config_dir, config_file_path, load_and_prepare, load_config};
use bendline_logging::init_logger;

use config_cmd::ConfigAction;
use context::AppContext;
use order_cmd::MapArgs;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "bendline")]
#[command(about = "Bendline: read bent-iron order drawings into order records")]
#[command(version)]
struct Cli {
    /// Config file (default: $BENDLINE_CONFIG_DIR/config.yaml or ~/.bendline/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every page of an order PDF to PNG
    Pages {
        pdf: PathBuf,
        out: PathBuf,
        #[arg(long, default_value_t = 200)]
        dpi: u32,
    },
    /// Detect the order table on a page and crop the shape cell of each row
    Rows {
        image: PathBuf,
        out: PathBuf,
        /// 1-based shape column; defaults to the widest column
        #[arg(long)]
        column: Option<u32>,
    },
    /// Check whether a crop holds a drawing
    Check { image: PathBuf },
    /// Map catalog letters onto an order drawing and merge into the order
    Map {
        #[arg(long)]
        order: String,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        line: u32,
        /// Catalog shape number
        #[arg(long)]
        shape: String,
        order_image: PathBuf,
    },
    /// Print an order record
    Show {
        order: String,
        /// Raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set one letter value on an order line (marks it reviewed)
    Set {
        #[arg(long)]
        order: String,
        #[arg(long)]
        page: u32,
        #[arg(long)]
        line: u32,
        letter: String,
        /// Number, or "null" to clear
        value: String,
    },
    /// List stored orders
    Orders,
    /// Show or edit the config file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn parse_value(raw: &str) -> Result<Option<f64>> {
    match raw.trim() {
        "null" | "none" | "" => Ok(None),
        s => s
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("'{raw}' is not a number")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn context(path: &Path) -> Result<AppContext> {
    Ok(AppContext::new(load_and_prepare(path).await?))
}

/// Returns `Ok(false)` when the command ran but its check did not pass.
async fn run(cli: Cli) -> Result<bool> {
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    // Logging settings come from the raw file so that warnings raised while
    // preparing the config already reach the log.
    let logging = load_config(&path).await?.logging.unwrap_or_default();
    init_logger(
        logging.dir.as_deref().unwrap_or(DEFAULT_LOG_DIR),
        logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
    );

    match cli.command {
        Commands::Pages { pdf, out, dpi } => image_cmd::pages(&pdf, &out, dpi).await?,
        Commands::Rows { image, out, column } => {
            image_cmd::rows(&context(&path).await?, &image, &out, column).await?
        }
        Commands::Check { image } => return image_cmd::check(&context(&path).await?, &image).await,
        Commands::Map {
            order,
            page,
            line,
            shape,
            order_image,
        } => {
            order_cmd::map(
                &context(&path).await?,
                MapArgs {
                    order: &order,
                    page,
                    line,
                    shape: &shape,
                    order_image: &order_image,
                },
            )
            .await?
        }
        Commands::Show { order, json } => {
            order_cmd::show(&context(&path).await?, &order, json).await?
        }
        Commands::Set {
            order,
            page,
            line,
            letter,
            value,
        } => {
            let value = parse_value(&value)?;
            order_cmd::set(&context(&path).await?, &order, page, line, &letter, value).await?
        }
        Commands::Orders => order_cmd::list(&context(&path).await?).await?,
        Commands::Config { action } => {
            return config_cmd::run(&path, action.unwrap_or_default()).await
        }
    }
    Ok(true)
}
