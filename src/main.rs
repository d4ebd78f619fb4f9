use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use price_utils::config::{
    DEFAULT_SELECTOR, DEFAULT_URL, DriverProfile, WatcherConfig,
};
use price_utils::pricing::DEFAULT_FREQUENCY;
use price_utils::{Backend, get_pricing, output};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Scrape the current product price and print the response envelope.
    Watch {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// CSS selector of the price element.
        #[arg(long, default_value = DEFAULT_SELECTOR)]
        selector: String,

        /// Browser location profile. Detected from LAMBDA_TASK_ROOT when omitted.
        #[arg(long, value_enum)]
        profile: Option<DriverProfile>,

        /// Override the Firefox binary from the profile.
        #[arg(long)]
        firefox: Option<PathBuf>,

        /// Override the geckodriver binary from the profile.
        #[arg(long)]
        geckodriver: Option<PathBuf>,

        /// geckodriver port. A free port is picked when omitted.
        #[arg(long)]
        port: Option<u16>,

        /// Limit on each WebDriver command. Unlimited when omitted.
        #[arg(long)]
        command_timeout_secs: Option<u64>,

        /// How long to wait for the price to render.
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        #[arg(long, default_value_t = 250)]
        poll_ms: u64,

        /// Report whether the price is at or below this amount.
        #[arg(long)]
        limit: Option<f64>,

        /// Download the page over plain HTTP instead of launching a browser.
        #[arg(long = "static")]
        static_page: bool,
    },
    /// Fetch a historical series in the legacy get_pricing layout.
    Pricing {
        ticker: String,
        /// YYYY-MM-DD, inclusive.
        start_date: String,
        /// YYYY-MM-DD, exclusive.
        end_date: String,
        #[arg(long, default_value = DEFAULT_FREQUENCY)]
        frequency: String,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();
    let args = Args::parse();

    match args.command {
        Cmd::Watch {
            url,
            selector,
            profile,
            firefox,
            geckodriver,
            port,
            command_timeout_secs,
            timeout_secs,
            poll_ms,
            limit,
            static_page,
        } => {
            let profile = profile.unwrap_or_else(DriverProfile::from_env);
            info!("Using {:?} driver profile", profile);

            let mut config = WatcherConfig::new(profile);
            config.url = url;
            config.selector = selector;
            config.webdriver_port = port;
            config.command_timeout = command_timeout_secs.map(Duration::from_secs);
            config.wait.timeout = Duration::from_secs(timeout_secs);
            config.wait.poll_interval = Duration::from_millis(poll_ms);
            config.limit = limit;
            if let Some(path) = firefox {
                config.driver.binary = path;
            }
            if let Some(path) = geckodriver {
                config.driver.driver_path = path;
            }

            let backend = if static_page { Backend::Static } else { Backend::Firefox };
            let response = price_utils::watcher::watch(&config, backend)?;
            output::write_json(&response, io::stdout().lock())?;
        }
        Cmd::Pricing {
            ticker,
            start_date,
            end_date,
            frequency,
            format,
        } => {
            let series = get_pricing(&ticker, &start_date, &end_date, &frequency)?;
            let out = io::stdout().lock();
            match format {
                Format::Table => output::write_table(&series, out)?,
                Format::Json => output::write_json(&series, out)?,
            }
        }
    }
    Ok(())
}
