use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment marker set by the serverless runtime.
pub const SERVERLESS_MARKER: &str = "LAMBDA_TASK_ROOT";

pub const DEFAULT_URL: &str = "https://www.bulk.com/uk/products/sports-multi-am-pm/bpps-smul";
pub const DEFAULT_SELECTOR: &str =
    "span.dropin-price.dropin-price--default.dropin-price--small.dropin-price--bold";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DriverProfile {
    /// Paths provided by the serverless layer under `/opt`.
    Serverless,
    /// Paths on a developer machine.
    Local,
}

impl DriverProfile {
    /// Picks the profile from the value of the serverless marker variable.
    /// Presence alone matters, the value is ignored.
    pub fn from_marker(marker: Option<OsString>) -> Self {
        match marker {
            Some(_) => DriverProfile::Serverless,
            None => DriverProfile::Local,
        }
    }

    pub fn from_env() -> Self {
        Self::from_marker(std::env::var_os(SERVERLESS_MARKER))
    }
}

/// Browser binary and driver service locations. Paths are not checked here;
/// a missing binary is reported by the driver when the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub binary: PathBuf,
    pub driver_path: PathBuf,
    pub headless: bool,
}

impl DriverConfig {
    pub fn for_profile(profile: DriverProfile) -> Self {
        let (binary, driver_path) = match profile {
            DriverProfile::Serverless => ("/opt/firefox/firefox", "/opt/geckodriver"),
            DriverProfile::Local => (
                "/Applications/Firefox Developer Edition.app/Contents/MacOS/firefox",
                "/usr/local/bin/geckodriver",
            ),
        };
        Self {
            binary: PathBuf::from(binary),
            driver_path: PathBuf::from(driver_path),
            headless: true,
        }
    }
}

/// Deadline and poll interval for waiting on client-side rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub url: String,
    pub selector: String,
    pub driver: DriverConfig,
    pub wait: WaitConfig,
    /// Fixed geckodriver port, otherwise a free one is picked per run.
    pub webdriver_port: Option<u16>,
    /// Per-command limit on WebDriver calls. `None` leaves navigation to the
    /// driver's own page-load timeout.
    pub command_timeout: Option<Duration>,
    /// Price at or below which the quote counts as a hit.
    pub limit: Option<f64>,
}

impl WatcherConfig {
    pub fn new(profile: DriverProfile) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
            driver: DriverConfig::for_profile(profile),
            wait: WaitConfig::default(),
            webdriver_port: None,
            command_timeout: None,
            limit: None,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::new(DriverProfile::from_env())
    }
}
