use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use casewatch::app::App;
use casewatch::config::{CliOverrides, ConfigLoader, Settings};
use casewatch::error::WatchError;
use casewatch::mail::MailHttpClient;
use casewatch::output::JsonOutput;
use casewatch::search::SearchHttpClient;
use casewatch::sheets::SheetsHttpClient;
use casewatch::store::Store;

#[derive(Parser)]
#[command(name = "casewatch")]
#[command(about = "Keyword-searches a support-case API and republishes summaries of cached cases")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "Path to a casewatch.json config file")]
    config: Option<String>,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[arg(long, global = true)]
    url: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(long, global = true)]
    query: Option<String>,

    #[arg(long, global = true)]
    expression: Option<String>,

    #[arg(long, global = true, help = "Path of the local case database")]
    db: Option<String>,

    #[arg(long, global = true)]
    spreadsheet: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a keyword search for relevant cases and cache them")]
    Search(SearchArgs),
    #[command(about = "Print a summary report of cached cases")]
    Report,
    #[command(about = "Email a summary report of cached cases")]
    Email,
    #[command(about = "Update a spreadsheet with cached case data")]
    Spreadsheet,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, help = "Fetch account detail for account numbers missing it")]
    enrich_accounts: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(watch) = report.downcast_ref::<WatchError>() {
            return ExitCode::from(map_exit_code(watch));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &WatchError) -> u8 {
    match error {
        WatchError::MissingParam(_)
        | WatchError::ConfigRead(_)
        | WatchError::ConfigParse(_)
        | WatchError::InvalidRegion(_)
        | WatchError::InvalidSender(_) => 2,
        WatchError::SearchHttp(_)
        | WatchError::SearchStatus { .. }
        | WatchError::MailHttp(_)
        | WatchError::MailStatus { .. }
        | WatchError::SheetsHttp(_)
        | WatchError::SheetsStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        url: cli.url.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
        query: cli.query.clone(),
        expression: cli.expression.clone(),
        db: cli.db.clone(),
        spreadsheet: cli.spreadsheet.clone(),
    };
    let settings = ConfigLoader::resolve(cli.config.as_deref(), overrides).into_diagnostic()?;

    match cli.command {
        Commands::Search(args) => run_search(&settings, args, cli.json),
        Commands::Report => run_report(&settings, cli.json),
        Commands::Email => run_email(&settings, cli.json),
        Commands::Spreadsheet => run_spreadsheet(&settings, cli.json),
    }
}

fn run_search(settings: &Settings, args: SearchArgs, json: bool) -> miette::Result<()> {
    let params = settings.search_params().into_diagnostic()?;
    // The report commands only display the spreadsheet URL, but every
    // invocation is expected to be fully configured; fail fast here too.
    settings.spreadsheet_id().into_diagnostic()?;

    let store = Store::open(&settings.db_path).into_diagnostic()?;
    let client = SearchHttpClient::new(&params).into_diagnostic()?;
    let app = App::new(store, client);

    let summary = app
        .search_and_store(&params.query, &params.expression, args.enrich_accounts)
        .into_diagnostic()?;

    if json {
        return JsonOutput::print(&summary).into_diagnostic();
    }
    println!(
        "Search matched {} cases; stored {}.",
        summary.num_found, summary.stored
    );
    if summary.missing_account_numbers.is_empty() {
        println!("All referenced accounts have detail records.");
    } else {
        println!(
            "{} account numbers missing detail: {}",
            summary.missing_account_numbers.len(),
            summary.missing_account_numbers.join(", ")
        );
    }
    if args.enrich_accounts {
        println!("Enriched {} accounts.", summary.enriched_accounts);
    }
    Ok(())
}

fn run_report(settings: &Settings, json: bool) -> miette::Result<()> {
    settings.search_params().into_diagnostic()?;
    let spreadsheet_id = settings.spreadsheet_id().into_diagnostic()?;

    let store = Store::open(&settings.db_path).into_diagnostic()?;
    let app = App::new(store, NopSearch);
    let summary = app.report(&spreadsheet_id).into_diagnostic()?;

    if json {
        return JsonOutput::print(&summary).into_diagnostic();
    }
    println!("Spreadsheet URL: {}", summary.spreadsheet_url);
    println!("Subject line: {}", summary.subject_line);
    println!("{}:  active cases over the past week", summary.active_cases);
    println!("{}:  open cases", summary.open_cases);
    println!("{}:  closed cases", summary.closed_cases);
    println!();
    println!("HTML Report");
    println!("{}", summary.html);
    println!();
    println!(
        "Debug:\n\t {} unique status values: {:?}",
        summary.distinct_statuses.len(),
        summary.distinct_statuses
    );
    Ok(())
}

fn run_email(settings: &Settings, json: bool) -> miette::Result<()> {
    settings.search_params().into_diagnostic()?;
    let spreadsheet_id = settings.spreadsheet_id().into_diagnostic()?;
    let mail_params = settings.mail_params().into_diagnostic()?;

    let store = Store::open(&settings.db_path).into_diagnostic()?;
    let mailer = MailHttpClient::new(&mail_params).into_diagnostic()?;
    let app = App::new(store, NopSearch);
    let summary = app
        .email(&mailer, &mail_params, &spreadsheet_id)
        .into_diagnostic()?;

    if json {
        return JsonOutput::print(&summary).into_diagnostic();
    }
    println!(
        "Report '{}' emailed to {} recipients.",
        summary.subject, summary.recipients
    );
    Ok(())
}

fn run_spreadsheet(settings: &Settings, json: bool) -> miette::Result<()> {
    settings.search_params().into_diagnostic()?;
    let spreadsheet_id = settings.spreadsheet_id().into_diagnostic()?;
    let key = settings.sheets_key().into_diagnostic()?;

    let store = Store::open(&settings.db_path).into_diagnostic()?;
    let sheets = SheetsHttpClient::new(&key).into_diagnostic()?;
    let app = App::new(store, NopSearch);
    let summary = app.spreadsheet(&sheets, &spreadsheet_id).into_diagnostic()?;

    if json {
        return JsonOutput::print(&summary).into_diagnostic();
    }
    println!(
        "Updated '{}' with {} cases and '{}' with {} cases.",
        summary.open_sheet, summary.open_rows, summary.closed_sheet, summary.closed_rows
    );
    Ok(())
}

/// Placeholder for commands that never touch the search API.
struct NopSearch;

impl casewatch::search::SearchClient for NopSearch {
    fn search(
        &self,
        _query: &str,
        _expression: &str,
    ) -> Result<casewatch::api::CasesPage, WatchError> {
        Err(WatchError::SearchHttp(
            "search client not configured".to_string(),
        ))
    }

    fn fetch_account(&self, _account_number: &str) -> Result<casewatch::api::ApiAccount, WatchError> {
        Err(WatchError::SearchHttp(
            "search client not configured".to_string(),
        ))
    }
}
