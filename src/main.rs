mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qbank::config::QbankConfig;

#[derive(Parser)]
#[command(name = "qbank", version, about = "Question bank toolkit: storage, image formatting, embedding and labeling")]
struct Cli {
    /// Config file (defaults to ~/.qbank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty question bank and its image directory
    Init,
    /// Show chapter and question counts
    Stats,
    /// Reshape one image onto a fixed-size canvas
    Reshape {
        /// File name without extension
        name: String,
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long, default_value = "jpg")]
        input_ext: String,
        #[arg(long, default_value = "jpg")]
        output_ext: String,
        /// Defaults to [format].width
        #[arg(long)]
        width: Option<u32>,
        /// Defaults to [format].height
        #[arg(long)]
        height: Option<u32>,
    },
    /// Reshape every question image and save the result as a new bank
    Format {
        /// Directory for the reshaped images
        #[arg(long)]
        img_dir: PathBuf,
        /// Where to write the formatted bank
        #[arg(long)]
        output_db: PathBuf,
    },
    /// Embed every question and write the vectors as JSON
    Embed {
        #[arg(long, default_value = "embeddings.json")]
        output: PathBuf,
    },
    /// Automatic labeling through a batch chat API
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Write the batch request JSONL file
    Request {
        #[arg(long, default_value = "batch_requests.jsonl")]
        output: PathBuf,
    },
    /// Apply a batch result JSONL file to the bank
    Apply {
        results: PathBuf,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.qbank/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QbankConfig::load_from(path)?,
        None => QbankConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init => cli::init::init(&config)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Reshape {
            name,
            input_dir,
            output_dir,
            input_ext,
            output_ext,
            width,
            height,
        } => cli::reshape::reshape(cli::reshape::ReshapeArgs {
            name: &name,
            input_dir: &input_dir,
            output_dir: &output_dir,
            input_extension: &input_ext,
            output_extension: &output_ext,
            width: width.unwrap_or(config.format.width),
            height: height.unwrap_or(config.format.height),
            padding: config.format.padding,
        })?,
        Command::Format { img_dir, output_db } => cli::format::format(&config, &img_dir, &output_db)?,
        Command::Embed { output } => cli::embed::embed(&config, &output).await?,
        Command::Label { action } => match action {
            LabelAction::Request { output } => cli::label::request(&config, &output)?,
            LabelAction::Apply { results } => cli::label::apply(&config, &results)?,
        },
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
