use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use spawrious_data::app::{App, DownloadAction, DownloadOptions, DownloadResult};
use spawrious_data::config::{ConfigLoader, ConfigOverrides};
use spawrious_data::error::SpawriousError;
use spawrious_data::fetch::HttpArchiveClient;
use spawrious_data::output::{JsonOutput, OutputMode};
use spawrious_data::tui::Tui;

#[derive(Parser)]
#[command(name = "spawrious")]
#[command(about = "Download and extract the Spawrious spurious-correlation benchmark")]
#[command(version, author)]
struct Cli {
    /// entire_dataset, o2o_easy, o2o_medium, o2o_hard, m2m, m2m_easy, m2m_medium or m2m_hard
    #[arg(long)]
    dataset_name: Option<String>,

    /// Directory holding archives, the manifest and extracted images
    #[arg(long)]
    root_dir: Option<String>,

    /// JSON config file (defaults to ./spawrious.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Leave the downloaded archive on disk after extraction
    #[arg(long)]
    keep_archive: bool,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SpawriousError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SpawriousError) -> u8 {
    if error.is_configuration() {
        2
    } else if error.is_transfer() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            dataset_name: cli.dataset_name,
            root_dir: cli.root_dir,
        },
    )?;
    let options = DownloadOptions {
        delete_archive: !cli.keep_archive,
    };
    let client = HttpArchiveClient::new()?;
    let app = App::new(client);
    let name = resolved.dataset_name.to_string();
    let root = resolved.root_dir;

    match output_mode {
        OutputMode::Interactive => {
            let mut tui = Tui::new(format!("Dataset: {name}   Root: {root}"));
            let result = tui.run(move |sink| app.download(&name, &root, &options, sink))?;
            print_download_summary(&result);
            Ok(())
        }
        OutputMode::NonInteractive => {
            let result = app.download(&name, &root, &options, &JsonOutput)?;
            JsonOutput::print_download(&result).into_diagnostic()
        }
    }
}

fn print_download_summary(result: &DownloadResult) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}Spawrious summary{reset}");
    let action = match result.action {
        DownloadAction::AlreadyExtracted => "already downloaded and extracted",
        DownloadAction::ExtractedExisting => "extracted archive found on disk",
        DownloadAction::Downloaded => "downloaded and extracted",
    };
    println!(
        "{green}{} (archive {}): {action}{reset}",
        result.dataset, result.archive
    );
    if let Some(bytes) = result.bytes {
        println!("{green}   bytes: {bytes}{reset}");
    }
    if let Some(entries) = result.entries {
        println!("{green}   entries: {entries}{reset}");
    }
    println!("{green}   root: {}{reset}", result.root);
}
