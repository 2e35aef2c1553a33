mod cache;
mod commands;
mod config;
mod diagnostics;
mod error;
mod extract;
mod fetch;
mod localize;
mod reconcile;
mod resolve;
mod rewrite;
mod scanner;
mod stats;
mod types;
mod validate;
mod zoom;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "mdimg",
    about = "Localize, validate, and prune image references in markdown",
    version
)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download remote images next to each document and rewrite references
    Localize {
        /// Markdown file or directory to process
        path: PathBuf,
        /// Also copy referenced local files into the asset directory
        #[arg(long)]
        copy_local: bool,
        /// Asset directory name (defaults to config `image_dir`)
        #[arg(long)]
        image_dir: Option<String>,
        /// Proxy URL for remote traffic
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Verify that every image reference is reachable
    Check {
        /// Markdown file or directory to check
        path: PathBuf,
        /// Proxy URL for remote traffic
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Move or delete images no document references
    Prune {
        /// Markdown file or directory to reconcile
        path: PathBuf,
        /// Backup directory for pruned files (defaults to config `backup_dir`)
        #[arg(long, conflicts_with = "delete")]
        backup_dir: Option<String>,
        /// Delete unused files instead of backing them up
        #[arg(long)]
        delete: bool,
        /// Asset directory name (defaults to config `image_dir`)
        #[arg(long)]
        image_dir: Option<String>,
    },
    /// Convert image references to zoom-styled <img> tags
    Zoom {
        /// Markdown file or directory to rewrite
        path: PathBuf,
        /// Zoom percentage applied to every image
        #[arg(long, default_value_t = 67)]
        factor: u32,
    },
    /// Count image references by kind
    Stats {
        /// Markdown file or directory to analyze
        path: PathBuf,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let result = match cli.command {
        Commands::Localize {
            path,
            copy_local,
            image_dir,
            proxy,
        } => commands::localize(&path, image_dir, copy_local, proxy).map(|()| ExitCode::SUCCESS),
        Commands::Check { path, proxy } => commands::check(&path, proxy),
        Commands::Prune {
            path,
            backup_dir,
            delete,
            image_dir,
        } => commands::prune(&path, image_dir, backup_dir, delete).map(|()| ExitCode::SUCCESS),
        Commands::Zoom { path, factor } => {
            commands::zoom(&path, factor).map(|()| ExitCode::SUCCESS)
        }
        Commands::Stats { path, json } => {
            commands::stats(&path, json).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
