//! Rebate Application CLI

use std::{io, path::PathBuf, process};

use clap::{Args, Parser, Subcommand, ValueEnum};
use jiff::Timestamp;
use rebate::{
    fixtures::Fixture,
    ids::{BusinessId, CustomerId, PromotionId},
    ledger::RedemptionReport,
    receipt::Receipt,
};
use rebate_app::context::{self, AppContext};
use tabled::{builder::Builder, settings::Style};
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

#[derive(Debug, Parser)]
#[command(name = "rebate-app", about = "Rebate promotions CLI", long_about = None)]
struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

#[derive(Debug, Args)]
struct LoggingArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    /// Log format (compact, json)
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value = "compact")]
    log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Quote a fixture cart and print its receipt
    Quote(QuoteArgs),

    /// Load a fixture's promotions into the database
    Import(ImportArgs),

    /// Record redemptions for a committed sale
    Redeem(RedeemArgs),

    /// List a business's promotions and their status
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct FixtureArgs {
    /// Fixture set name
    #[arg(long)]
    fixture: String,

    /// Directory holding `promotions/` and `carts/`
    #[arg(long, default_value = "./fixtures")]
    fixtures_dir: PathBuf,
}

#[derive(Debug, Args)]
struct QuoteArgs {
    #[command(flatten)]
    fixture: FixtureArgs,

    /// Customer checking out; overrides the cart file
    #[arg(long)]
    customer: Option<String>,

    /// Also record the applied promotions against in-memory usage counters
    #[arg(long)]
    commit: bool,
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[command(flatten)]
    fixture: FixtureArgs,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct RedeemArgs {
    /// Applied promotion IDs
    #[arg(long = "promotion", required = true)]
    promotions: Vec<String>,

    /// Customer who made the purchase
    #[arg(long)]
    customer: Option<String>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct StatusArgs {
    /// Business whose promotions to list
    #[arg(long)]
    business: String,

    /// Evaluate status at this time (RFC 3339); defaults to now
    #[arg(long)]
    at: Option<Timestamp>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = init_logging(&cli.logging) {
        eprintln!("failed to initialise logging: {error}");
        process::exit(1);
    }

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

fn init_logging(args: &LoggingArgs) -> Result<(), TryInitError> {
    match args.log_format {
        LogFormat::Compact => init_with_layer(
            args,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true),
        ),
        LogFormat::Json => init_with_layer(
            args,
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
        ),
    }
}

fn init_with_layer<L>(args: &LoggingArgs, fmt_layer: L) -> Result<(), TryInitError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", args.log_level)));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Quote(args) => quote(args).await,
        Commands::Import(args) => import(args).await,
        Commands::Redeem(args) => redeem(args).await,
        Commands::Status(args) => status(args).await,
    }
}

async fn quote(args: QuoteArgs) -> Result<(), String> {
    let fixture = Fixture::from_set_in(&args.fixture.fixtures_dir, &args.fixture.fixture)
        .map_err(|error| format!("failed to load fixture {}: {error}", args.fixture.fixture))?;

    let cart = fixture.cart().map_err(|error| error.to_string())?;
    let business = fixture.business().map_err(|error| error.to_string())?;

    let customer = args
        .customer
        .map(CustomerId::from)
        .or_else(|| fixture.customer().cloned());

    let service = context::fixture_service(&fixture);

    let discount = service
        .quote(business, cart, fixture.claimed_subtotal(), fixture.now())
        .await
        .map_err(|error| format!("failed to quote cart: {error}"))?;

    let applied: Vec<PromotionId> = discount.promotion_ids().cloned().collect();

    let receipt =
        Receipt::new(cart, discount).map_err(|error| format!("failed to build receipt: {error}"))?;

    receipt
        .write_to(io::stdout(), cart)
        .map_err(|error| format!("failed to print receipt: {error}"))?;

    if args.commit {
        let report = service.redeem(&applied, customer.as_ref()).await;

        print_report(&report)?;
    }

    Ok(())
}

async fn import(args: ImportArgs) -> Result<(), String> {
    let mut fixture = Fixture::with_base_path(&args.fixture.fixtures_dir);

    fixture
        .load_promotions(&args.fixture.fixture)
        .map_err(|error| format!("failed to load fixture {}: {error}", args.fixture.fixture))?;

    let ctx = connect(&args.database_url).await?;

    ctx.catalog
        .import(fixture.promotions())
        .await
        .map_err(|error| format!("failed to import promotions: {error}"))?;

    println!("imported {} promotions", fixture.promotions().len());

    Ok(())
}

async fn redeem(args: RedeemArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;

    let promotions: Vec<PromotionId> = args
        .promotions
        .into_iter()
        .map(PromotionId::from)
        .collect();
    let customer = args.customer.map(CustomerId::from);

    let report = ctx.promotions.redeem(&promotions, customer.as_ref()).await;

    print_report(&report)
}

async fn status(args: StatusArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let now = args.at.unwrap_or_else(Timestamp::now);

    let promotions = ctx
        .catalog
        .fetch_all(&BusinessId::from(args.business))
        .await
        .map_err(|error| format!("failed to load promotions: {error}"))?;

    let mut table = Builder::default();

    table.push_record(["Promotion", "Name", "Kind", "Status", "Used", "Limit"]);

    for promotion in &promotions {
        let usage = promotion.usage();

        table.push_record([
            promotion.id().to_string(),
            promotion.name().to_string(),
            promotion.kind().tag().to_string(),
            promotion.status_at(now).to_string(),
            usage.usage_count.to_string(),
            usage
                .usage_limit
                .map_or_else(|| "-".to_string(), |limit| limit.to_string()),
        ]);
    }

    println!("{}", table.build().with(Style::modern_rounded()));

    Ok(())
}

async fn connect(database_url: &str) -> Result<AppContext, String> {
    AppContext::from_database_url(database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

fn print_report(report: &RedemptionReport) -> Result<(), String> {
    for (promotion, usage_count) in report.recorded() {
        println!("{promotion}: recorded (usage {usage_count})");
    }

    for (promotion, outcome) in report.rejected() {
        println!("{promotion}: rejected ({})", outcome.as_str());
    }

    for (promotion, error) in report.failed() {
        println!("{promotion}: failed ({error})");
    }

    if report.failed().is_empty() {
        Ok(())
    } else {
        Err(format!("failed to record {} redemptions", report.failed().len()))
    }
}
