// # ifddnsd - Interface DDNS Daemon
//
// The ifddnsd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables and the domains file
// 2. Initializing logging and the runtime
// 3. Registering providers and building the gateway from configuration
// 4. Registering every binding (retrying until each resolves)
// 5. Running the reconciliation loop until SIGTERM/SIGINT
//
// All reconciliation logic lives in ifddns-core.
//
// ## Configuration
//
// ### Credentials
// - `DDNS_ALIYUN_ACCESS_KEY_ID`: Access key id
// - `DDNS_ALIYUN_ACCESS_KEY_SECRET`: Access key secret
// - `DDNS_ALIYUN_ENDPOINT`: API endpoint (default: the access file's
//   `Endpoint`, then alidns.cn-hangzhou.aliyuncs.com)
// - `DDNS_ACCESS_FILE`: INI file read when the key id or secret is unset
//   (default: `<executable dir>/config/access.ini`)
//
// ```ini
// [AccessKey]
// Id = LTAI...
// KeySecret = ...
// Endpoint = alidns.cn-hangzhou.aliyuncs.com
// ```
//
// ### Bindings
// - `DDNS_DOMAINS_FILE`: JSON file listing bindings
//   (default: `<executable dir>/config/domain.json`)
//
// ```json
// [
//   { "Name": "example.com", "Type": "A", "RR": "home", "NetCard": "eth0" }
// ]
// ```
//
// ### Engine
// - `DDNS_POLL_INTERVAL_SECS`: Seconds between ticks (default: 30)
// - `DDNS_REGISTRATION_RETRY_SECS`: Seconds between registration attempts (default: 10)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export DDNS_ALIYUN_ACCESS_KEY_ID=LTAI...
// export DDNS_ALIYUN_ACCESS_KEY_SECRET=...
// export DDNS_DOMAINS_FILE=/etc/ifddns/domain.json
//
// ifddnsd
// ```

use anyhow::{Context, Result};
use ifddns_core::config::DEFAULT_ALIYUN_ENDPOINT;
use ifddns_core::{
    BindingConfig, Credentials, DdnsConfig, EngineConfig, ProviderConfig, ProviderRegistry,
    Reconciler,
};
use ifddns_ip_ifaddrs::IfaddrsIpSource;
use ini::Ini;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Aliyun access key from the environment or the access file
#[derive(Debug, PartialEq, Eq)]
struct AccessKey {
    id: String,
    secret: String,
    endpoint: Option<String>,
}

/// Daemon settings gathered from the environment
struct Settings {
    access_key_id: String,
    access_key_secret: String,
    endpoint: String,
    domains_file: PathBuf,
    poll_interval_secs: Option<u64>,
    registration_retry_secs: Option<u64>,
    log_level: String,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        let domains_file = match env::var("DDNS_DOMAINS_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_config_file("domain.json")?,
        };

        let access = match (
            env::var("DDNS_ALIYUN_ACCESS_KEY_ID"),
            env::var("DDNS_ALIYUN_ACCESS_KEY_SECRET"),
        ) {
            (Ok(id), Ok(secret)) => AccessKey {
                id,
                secret,
                endpoint: None,
            },
            _ => {
                let path = match env::var("DDNS_ACCESS_FILE") {
                    Ok(path) => PathBuf::from(path),
                    Err(_) => default_config_file("access.ini")?,
                };
                load_access_file(&path).context(
                    "Set DDNS_ALIYUN_ACCESS_KEY_ID and DDNS_ALIYUN_ACCESS_KEY_SECRET \
                    or provide an access file",
                )?
            }
        };

        Ok(Self {
            access_key_id: access.id,
            access_key_secret: access.secret,
            endpoint: env::var("DDNS_ALIYUN_ENDPOINT")
                .ok()
                .or(access.endpoint)
                .unwrap_or_else(|| DEFAULT_ALIYUN_ENDPOINT.to_string()),
            domains_file,
            poll_interval_secs: parse_secs("DDNS_POLL_INTERVAL_SECS")?,
            registration_retry_secs: parse_secs("DDNS_REGISTRATION_RETRY_SECS")?,
            log_level: env::var("DDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Map the log level name to a tracing level
    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Build and validate the full configuration, reading the domains file
    fn into_config(self) -> Result<DdnsConfig> {
        let credentials = Credentials::new(self.access_key_id, self.access_key_secret)
            .with_endpoint(self.endpoint);

        let mut engine = EngineConfig::default();
        if let Some(secs) = self.poll_interval_secs {
            engine.poll_interval_secs = secs;
        }
        if let Some(secs) = self.registration_retry_secs {
            engine.registration_retry_secs = secs;
        }

        let mut config = DdnsConfig::new(ProviderConfig::Aliyun { credentials });
        config.bindings = load_bindings(&self.domains_file)?;
        config.engine = engine;
        config.validate()?;

        Ok(config)
    }
}

/// `<executable dir>/config/<name>`
fn default_config_file(name: &str) -> Result<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the executable")?;
    let dir = exe
        .parent()
        .context("Executable path has no parent directory")?;
    Ok(dir.join("config").join(name))
}

/// Read the `[AccessKey]` section of an access file
fn load_access_file(path: &Path) -> Result<AccessKey> {
    let ini = Ini::load_from_file(path)
        .with_context(|| format!("Failed to read access file {}", path.display()))?;

    let section = ini
        .section(Some("AccessKey"))
        .with_context(|| format!("Access file {} has no [AccessKey] section", path.display()))?;

    let field = |key: &str| {
        section
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Ok(AccessKey {
        id: field("Id")
            .with_context(|| format!("Access file {} has no Id", path.display()))?,
        secret: field("KeySecret")
            .with_context(|| format!("Access file {} has no KeySecret", path.display()))?,
        endpoint: field("Endpoint"),
    })
}

fn parse_secs(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{var} must be a whole number of seconds. Got: {value}")),
        Err(_) => Ok(None),
    }
}

/// Read the bindings list from a JSON file
fn load_bindings(path: &Path) -> Result<Vec<BindingConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read domains file {}", path.display()))?;

    let bindings: Vec<BindingConfig> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse domains file {}", path.display()))?;

    if bindings.is_empty() {
        anyhow::bail!("Domains file {} lists no bindings", path.display());
    }

    Ok(bindings)
}

fn main() -> ExitCode {
    // Load configuration from environment
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let config = match settings.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ifddnsd daemon");
    info!("Configuration loaded: {} binding(s)", config.bindings.len());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                exit_code_for(&e)
            }
        }
    });

    result.into()
}

/// Startup-class failures exit with 1, anything else with 2
fn exit_code_for(err: &anyhow::Error) -> DdnsExitCode {
    match err.downcast_ref::<ifddns_core::Error>() {
        Some(e) if e.is_fatal() => DdnsExitCode::ConfigError,
        _ => DdnsExitCode::RuntimeError,
    }
}

/// Run the daemon
async fn run_daemon(config: DdnsConfig) -> Result<()> {
    // Create provider registry
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "aliyun")]
    {
        info!("Registering Aliyun provider");
        ifddns_provider_aliyun::register(&mut registry);
    }

    let provider = registry.create_provider(&config.provider)?;
    let ip_source = Box::new(IfaddrsIpSource::new());

    let (mut engine, mut events) = Reconciler::new(ip_source, provider, &config.engine)?;

    // Engine events are informational; the engine logs its own outcomes
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    // Handlers are installed before registration so a failure aborts startup
    let signals = ShutdownSignals::install()?;

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    // Registration retries until every binding resolves or we are stopped
    tokio::select! {
        result = engine.register_all(config.bindings) => result?,
        _ = &mut shutdown_rx => {
            info!("Shutting down during registration");
            return Ok(());
        }
    }

    info!("Starting reconciliation engine");
    engine.run_with_shutdown(shutdown_rx).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Shutdown signal handlers (SIGTERM, SIGINT)
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    /// Wait for the first signal and return its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Shutdown on CTRL-C only
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
