//! strata — resolve a service configuration from flags, environment,
//! config files and remote stores, and print the result.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use strata::constants::{
    CONFIG_OPTION_KEY, ENV_CONSUL_ADDR, ENV_CONSUL_TOKEN, ENV_GCE_METADATA_HOST, ENV_LOG,
    ENV_PREFIX, JSON_CANDIDATES, TOML_CANDIDATES, YAML_CANDIDATES,
};
use strata::{
    ConsulProvider, Env, EnvProvider, FileProvider, FlagProvider, LoadError, Loader,
    MetadataProvider, Opt, ProviderError, Providers, Registry, Validate, Validator,
};

fn main() {
    init_logging();
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

/// Log to stderr, filtered by `STRATA_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn schema() -> Result<Registry> {
    let registry = Registry::from_opts([
        Opt::string(CONFIG_OPTION_KEY, "")
            .short('c')
            .doc("Path to a YAML, JSON or TOML config file."),
        Opt::string("Server.HostName", "localhost")
            .short('w')
            .doc("Host name to listen on."),
        Opt::new("Server.Port", strata::OptionType::Uint16, strata::OptionValue::Uint(8080))
            .short('p')
            .doc("TCP port to listen on."),
        Opt::duration("Server.ReadTimeout", Duration::from_secs(10))
            .doc("Maximum time to read a request, e.g. 5s or 1m30s."),
        Opt::string_list("Server.AllowedOrigins", Vec::<String>::new())
            .doc("Origins allowed for cross-site requests. Repeat the flag or separate with commas."),
        Opt::int("Worker.Count", 4).doc("Number of worker threads."),
        Opt::byte_size("Worker.BufferSize", 10 * 1024)
            .doc("Per-worker buffer, e.g. 64KB or 1MB."),
        Opt::string_map("Worker.Labels", Vec::<(String, String)>::new())
            .doc("Labels attached to worker metrics, as key=value pairs."),
        Opt::bool("Log.Json", false).doc("Emit logs as JSON."),
        Opt::int("Worker.Threads", 0)
            .doc("Number of worker threads.\nDeprecated: use Worker.Count"),
    ])?;
    Ok(registry)
}

/// Remote stores, enabled by the same variables their own clients honour.
fn remote_providers(env: &Env) -> Vec<Box<dyn strata::Provider>> {
    let mut remotes: Vec<Box<dyn strata::Provider>> = Vec::new();
    if let Ok(addr) = env.var(ENV_CONSUL_ADDR) {
        let addr = if addr.contains("://") {
            addr
        } else {
            format!("http://{addr}")
        };
        let mut consul = ConsulProvider::new(addr, ENV_PREFIX);
        if let Ok(token) = env.var(ENV_CONSUL_TOKEN) {
            consul = consul.token(token);
        }
        remotes.push(Box::new(consul));
    }
    if let Ok(host) = env.var(ENV_GCE_METADATA_HOST) {
        remotes.push(Box::new(MetadataProvider::gce_at(format!(
            "http://{host}/computeMetadata/v1/?recursive=true"
        ))));
    }
    remotes
}

struct ServerSection {
    host: String,
    port: u16,
    read_timeout: Duration,
}

impl Validate for ServerSection {
    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.host.trim().is_empty() {
            problems.push("host name must not be empty".to_string());
        }
        if self.port == 0 {
            problems.push("port must be non-zero".to_string());
        }
        if self.read_timeout.is_zero() {
            problems.push("read timeout must be positive".to_string());
        }
        problems
    }
}

struct WorkerSection {
    count: i64,
    buffer_size: u64,
}

impl Validate for WorkerSection {
    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.count < 1 {
            problems.push(format!("count must be at least 1, got {}", self.count));
        }
        if self.buffer_size < 1024 {
            problems.push(format!("buffer size must be at least 1KB, got {}", self.buffer_size));
        }
        problems
    }
}

/// Load, validate and print. Returns `Ok(false)` when problems were reported.
fn run() -> Result<bool> {
    let env = Env::real();
    let registry = schema().context("invalid option schema")?;

    let candidates = YAML_CANDIDATES
        .iter()
        .chain(JSON_CANDIDATES)
        .chain(TOML_CANDIDATES)
        .copied();
    let file = FileProvider::new(candidates)
        .override_key(CONFIG_OPTION_KEY)
        .with_global_candidate("config.yaml")
        .with_global_candidate("config.toml");
    let remotes = remote_providers(&env);

    let mut loader = Loader::new(registry)
        .provider(FlagProvider::from_env().about("Resolve and print the service configuration."))
        .provider(EnvProvider::new(ENV_PREFIX))
        .provider(file);
    if !remotes.is_empty() {
        loader = loader.provider(Providers::new(remotes).skip_failed());
    }
    let mut loaded = loader.load();

    if let Some(help) = loaded.errors().iter().find_map(help_text) {
        print!("{help}");
        return Ok(true);
    }

    let reg = loaded.registry();
    let server = ServerSection {
        host: reg.get_as("Server.HostName").unwrap_or_default(),
        port: reg.get_as("Server.Port").unwrap_or_default(),
        read_timeout: reg.get_as("Server.ReadTimeout").unwrap_or_default(),
    };
    let worker = WorkerSection {
        count: reg.get_as("Worker.Count").unwrap_or_default(),
        buffer_size: reg.get_as("Worker.BufferSize").unwrap_or_default(),
    };
    loaded.validate(
        &Validator::new()
            .section("Server", &server)
            .section("Worker", &worker),
    );

    print_registry(loaded.registry());
    for err in loaded.errors() {
        eprintln!("{} {err}", "warning:".yellow().bold());
    }
    Ok(loaded.is_ok())
}

fn help_text(err: &LoadError) -> Option<&str> {
    match err {
        LoadError::ProviderInit {
            source: ProviderError::HelpRequested(text),
            ..
        } => Some(text),
        _ => None,
    }
}

fn print_registry(registry: &Registry) {
    let width = registry
        .keys()
        .map(|k| k.to_string().len())
        .max()
        .unwrap_or_default();
    for opt in registry.opts() {
        let key = format!("{:width$}", opt.key().to_string());
        let origin = match opt.source() {
            Some(source) => format!("({source})").green(),
            None => "(default)".dimmed(),
        };
        println!("{}  {}  {origin}", key.bold(), opt.value());
    }
}
