//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and metadata endpoints so a rename only requires changing this file.

use std::time::Duration;

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "strata";

/// Prefix prepended to every option key when reading environment variables.
pub const ENV_PREFIX: &str = "strata";

/// Directory name under `~/.config/` for the global config file.
pub const CONFIG_DIR: &str = "strata";

/// Option key whose value, when set by an earlier provider, overrides the
/// static config file candidates.
pub const CONFIG_OPTION_KEY: &str = "config";

/// Config file candidates tried in order by the default file providers.
pub const YAML_CANDIDATES: &[&str] = &["config.yaml", "config.yml"];
pub const JSON_CANDIDATES: &[&str] = &["config.json"];
pub const TOML_CANDIDATES: &[&str] = &["config.toml"];

/// Google Compute Engine metadata server (recursive dump of the whole tree).
pub const GCE_METADATA_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/?recursive=true";

/// OpenStack metadata service.
pub const OPENSTACK_METADATA_URL: &str = "http://169.254.169.254/openstack/latest/meta_data.json";

/// Upper bound on any single remote fetch, so an unreachable endpoint
/// cannot stall a load cycle.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

// ── Environment variable names ──────────────────────────────────────

pub const ENV_LOG: &str = "STRATA_LOG";

/// Host override for the GCE metadata server, as honoured by Google's own
/// client libraries.
pub const ENV_GCE_METADATA_HOST: &str = "GCE_METADATA_HOST";

/// Consul agent address, e.g. `http://127.0.0.1:8500`.
pub const ENV_CONSUL_ADDR: &str = "CONSUL_HTTP_ADDR";

/// ACL token sent as `X-Consul-Token`.
pub const ENV_CONSUL_TOKEN: &str = "CONSUL_HTTP_TOKEN";
