//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use firmscope_core::{ProfilePipeline, ProgressReporter};
use firmscope_shared::{
    AppConfig, CompanyRequest, Credentials, LinkedInProfile, ProfileReport, init_config,
    load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Firmscope: company profiles from the open web.
#[derive(Parser)]
#[command(
    name = "firmscope",
    version,
    about = "Build structured company profiles from web search, scraping, and LLM extraction.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.firmscope/firmscope.toml).
    #[arg(long, global = true, env = "FIRMSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Company identification shared by the lookup commands.
#[derive(clap::Args, Debug)]
pub(crate) struct CompanyArgs {
    /// Company name.
    name: String,

    /// Location hint, e.g. "Springfield, USA".
    #[arg(short, long)]
    location: Option<String>,

    /// Industry hint, e.g. "Industrial Robotics".
    #[arg(short, long)]
    industry: Option<String>,
}

impl CompanyArgs {
    fn to_request(&self) -> CompanyRequest {
        CompanyRequest {
            name: self.name.clone(),
            location: self.location.clone(),
            industry: self.industry.clone(),
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a full company profile.
    Profile {
        #[command(flatten)]
        company: CompanyArgs,

        /// Render source pages in headless Chrome (needs a WebDriver).
        #[arg(long)]
        render: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List companies with names similar to the given one.
    Similar {
        #[command(flatten)]
        company: CompanyArgs,

        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "firmscope=info",
        1 => "firmscope=debug",
        _ => "firmscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Profile {
            company,
            render,
            json,
        } => cmd_profile(config, &company, render, json).await,
        Command::Similar { company, json } => cmd_similar(&config, &company, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn build_pipeline(config: &AppConfig) -> Result<ProfilePipeline> {
    let credentials = Credentials::from_env(config)?;
    ProfilePipeline::from_config(config, &credentials).wrap_err("failed to set up pipeline")
}

async fn cmd_profile(
    mut config: AppConfig,
    company: &CompanyArgs,
    render: bool,
    json: bool,
) -> Result<()> {
    if render {
        config.render.enabled = true;
    }
    let pipeline = build_pipeline(&config)?;
    let request = company.to_request();

    info!(company = %request.name, render = config.render.enabled, "building company profile");

    let reporter = CliProgress::new();
    let result = pipeline.run(&request, &reporter).await;
    reporter.spinner.finish_and_clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn cmd_similar(config: &AppConfig, company: &CompanyArgs, json: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let companies = pipeline.similar(&company.to_request()).await?;

    if companies.is_empty() {
        return Err(eyre!("no similar companies found for '{}'", company.name));
    }

    if json {
        let body = serde_json::json!({ "similar_companies": companies });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    for c in &companies {
        println!(
            "  {:<32} {:<24} {}",
            c.name,
            c.location.as_deref().unwrap_or("-"),
            c.industry.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}

fn print_report(report: &ProfileReport) {
    let p = &report.profile;
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!();
    println!("  {}", p.name.clone().unwrap_or_else(|| report.company.clone()));
    println!("  Location:  {}", field(&p.location));
    println!("  Industry:  {}", field(&p.industry));
    println!("  Website:   {}", field(&p.website));
    println!("  LinkedIn:  {}", field(&p.linkedin));
    println!("  Email:     {}", field(&p.email));
    println!(
        "  Founded:   {}",
        p.founded_year.map_or_else(|| "-".to_string(), |y| y.to_string())
    );
    println!("  Stock:     {}", field(&p.stock_price));
    println!("  Employees: {}", field(&p.employee_count));
    println!("  Revenue:   {}", field(&p.revenue));

    if !p.executives.is_empty() {
        println!();
        println!("  Executives");
        for exec in &p.executives {
            let linkedin = match &exec.linkedin {
                LinkedInProfile::Found(url) => url.as_str(),
                LinkedInProfile::NotFound => "",
            };
            println!("    {:<28} {:<28} {linkedin}", exec.name, exec.title);
        }
    }

    if !p.news.is_empty() {
        println!();
        println!("  News");
        for item in &p.news {
            let sentiment = item
                .sentiment
                .map(|s| format!(" [{}]", s.as_str()))
                .unwrap_or_default();
            println!(
                "    {} {}{sentiment}",
                item.date.as_deref().unwrap_or("          "),
                item.title.as_deref().unwrap_or("(untitled)")
            );
        }
    }

    println!();
    println!("  Sources:   {}", report.sources.len());
    println!("  Run:       {}", report.run_id);
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn sources_fetched(&self, succeeded: usize, attempted: usize) {
        self.spinner
            .set_message(format!("Fetched {succeeded}/{attempted} sources"));
    }

    fn done(&self, _report: &ProfileReport) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
