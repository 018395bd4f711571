use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use scry_dl::app::{App, CardBatchResult, ProgressSinkKind, SetBatchResult, SetListResult};
use scry_dl::catalog::ScryfallHttpClient;
use scry_dl::config::{ConfigLoader, Settings, SettingsOverrides};
use scry_dl::domain::{ConcurrencyLimit, Quality, SetSelection};
use scry_dl::error::report_exit_code;
use scry_dl::fs_util::ensure_dir;
use scry_dl::output::{JsonOutput, OutputMode};
use scry_dl::tui::Tui;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser)]
#[command(name = "scry-dl")]
#[command(about = "Download card images from the Scryfall catalog, organized by set")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Settings file (defaults to ./scry-dl.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct OverrideArgs {
    #[arg(long, global = true)]
    download_dir: Option<Utf8PathBuf>,

    #[arg(long, global = true, value_enum)]
    quality: Option<Quality>,

    /// Concurrent downloads (1-50)
    #[arg(long, global = true)]
    workers: Option<ConcurrencyLimit>,
}

impl From<OverrideArgs> for SettingsOverrides {
    fn from(value: OverrideArgs) -> Self {
        SettingsOverrides {
            download_dir: value.download_dir,
            quality: value.quality,
            workers: value.workers,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List or search sets, newest first")]
    Sets(SetsArgs),
    #[command(about = "Download every card image of one or more sets (comma-separated, or ALL)")]
    Download(DownloadArgs),
    #[command(about = "Download every printing of a single card")]
    Card(CardArgs),
    #[command(about = "Show or change saved settings")]
    Config(ConfigArgs),
}

#[derive(Args)]
struct SetsArgs {
    /// Case-insensitive match on code, name or set type
    filter: Option<String>,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct DownloadArgs {
    /// e.g. `dom`, `dom,war,m21` or `ALL`
    sets: String,
}

#[derive(Args)]
struct CardArgs {
    #[arg(required = true, num_args = 1..)]
    name: Vec<String>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    #[command(about = "Print the resolved settings")]
    Show,
    #[command(about = "Save the current settings, including --download-dir/--quality/--workers")]
    Set,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(report_exit_code(&report))
        }
    }
}

fn run() -> miette::Result<ExitCode> {
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

    let overrides = SettingsOverrides::from(cli.overrides);
    let settings = ConfigLoader::resolve(cli.config.as_deref())
        .map_err(miette::Report::new)?
        .apply(&overrides);

    match cli.command {
        Commands::Sets(args) => run_sets(args, &settings, output_mode),
        Commands::Download(args) => run_download(args, &settings, output_mode),
        Commands::Card(args) => run_card(args, &settings, output_mode),
        Commands::Config(args) => run_config(args, cli.config.as_deref(), settings, output_mode),
    }
}

fn build_app(settings: &Settings) -> miette::Result<App<ScryfallHttpClient, ScryfallHttpClient>> {
    let client = ScryfallHttpClient::new().map_err(miette::Report::new)?;
    Ok(App::new(settings, client.clone(), client))
}

fn run_sets(args: SetsArgs, settings: &Settings, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let app = build_app(settings)?;
    let result = app
        .list_sets(args.filter.as_deref(), args.limit, &JsonOutput)
        .map_err(miette::Report::new)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_sets(&result).into_diagnostic()?,
        OutputMode::Interactive => print_set_list(&result),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_download(
    args: DownloadArgs,
    settings: &Settings,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let selection = args
        .sets
        .parse::<SetSelection>()
        .map_err(miette::Report::new)?;
    let app = build_app(settings)?;

    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .download_sets(&selection, &JsonOutput)
                .map_err(miette::Report::new)?;
            JsonOutput::print_set_batch(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let tracker = app.tracker();
            let mut tui = Tui::new(ProgressSinkKind::Sets);
            let result = tui.run(tracker, move |sink| app.download_sets(&selection, sink))?;
            print_set_summary(&result);
            result
        }
    };
    Ok(batch_exit_code(result.report.success))
}

fn run_card(args: CardArgs, settings: &Settings, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let name = args.name.join(" ");
    let app = build_app(settings)?;

    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app
                .download_card(&name, &JsonOutput)
                .map_err(miette::Report::new)?;
            JsonOutput::print_card_batch(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let tracker = app.tracker();
            let mut tui = Tui::new(ProgressSinkKind::Card);
            let result = tui.run(tracker, move |sink| app.download_card(&name, sink))?;
            print_card_summary(&result);
            result
        }
    };
    Ok(batch_exit_code(result.report.success))
}

fn run_config(
    args: ConfigArgs,
    config_path: Option<&str>,
    settings: Settings,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let settings = match args.command {
        ConfigCommand::Show => settings,
        ConfigCommand::Set => {
            ensure_dir(settings.download_dir.as_std_path()).map_err(miette::Report::new)?;
            let path = ConfigLoader::locate(config_path);
            ConfigLoader::save(&path, &settings).map_err(miette::Report::new)?;
            if matches!(output_mode, OutputMode::Interactive) {
                println!("{GREEN}settings saved to {}{RESET}", path.display());
            }
            settings
        }
    };

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_settings(&settings).into_diagnostic()?,
        OutputMode::Interactive => {
            println!("{CYAN}download dir:{RESET} {}", settings.download_dir);
            println!("{CYAN}quality:{RESET}      {}", settings.quality);
            println!("{CYAN}workers:{RESET}      {}", settings.workers);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn batch_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_set_list(result: &SetListResult) {
    for set in &result.sets {
        let digital = if set.digital { " (digital)" } else { "" };
        println!(
            "{CYAN}{:<6}{RESET} {}{digital}  {YELLOW}{} | {} cards | {}{RESET}",
            set.code.to_uppercase(),
            set.name,
            set.set_type,
            set.card_count,
            set.released_at
        );
    }
    println!("total: {} | showing: {}", result.total, result.sets.len());
}

fn print_report_line(report: &scry_dl::app::BatchReport) {
    let color = if report.success { GREEN } else { RED };
    println!("{color}{}{RESET}", report.message);
    println!(
        "{CYAN}planned {} | completed {} | succeeded {} ({} already on disk){RESET}",
        report.planned, report.completed, report.succeeded, report.already_present
    );
}

fn print_set_summary(result: &SetBatchResult) {
    print_report_line(&result.report);
    if !result.recognized.is_empty() {
        println!("{GREEN}sets recognized ({}):{RESET}", result.recognized.len());
        for code in &result.recognized {
            println!("{GREEN}  + {}{RESET}", code.to_uppercase());
        }
    }
    if !result.not_found.is_empty() {
        println!("{RED}sets not found ({}):{RESET}", result.not_found.len());
        for code in &result.not_found {
            println!("{RED}  x {}{RESET}", code.to_uppercase());
        }
    }
    if !result.listing_failed.is_empty() {
        println!("{YELLOW}sets with failed listings ({}):{RESET}", result.listing_failed.len());
        for code in &result.listing_failed {
            println!("{YELLOW}  ! {}{RESET}", code.to_uppercase());
        }
    }
}

fn print_card_summary(result: &CardBatchResult) {
    println!("{CYAN}{} ({} printings){RESET}", result.card_name, result.printings);
    print_report_line(&result.report);
}
