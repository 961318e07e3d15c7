//! Remote providers: cloud metadata services and the Consul KV store.
//!
//! Both fetch their whole document once during init with a blocking
//! request bounded by [`METADATA_TIMEOUT`], then answer lookups from memory.
//! Remote keys are normalized the same way as option keys, with `-` read as
//! `_`, and may use either the dotted or the underscored spelling:
//! `worker.buffer_size`, `worker_buffer_size` and `worker-buffer-size` all
//! address `Worker.BufferSize`. The option path itself matches in any case,
//! so `server.hostname` addresses `Server.HostName`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{GCE_METADATA_URL, METADATA_TIMEOUT, OPENSTACK_METADATA_URL};
use crate::error::{LoadError, ProviderError};
use crate::key::{Key, dot_key, underscore_key};
use crate::registry::Registry;
use crate::value::{RawValue, flatten};

use super::Provider;

/// Normalize a remote field name to the dotted option spelling.
fn normalize(field: &str) -> String {
    dot_key(&Key::parse(&field.replace('-', "_")))
}

/// The part of `field` below the normalized `prefix` segments, if any.
fn below_prefix(field: &str, prefix: &[String]) -> Option<String> {
    let segments: Vec<&str> = field.split('.').filter(|s| !s.is_empty()).collect();
    if segments.len() <= prefix.len() {
        return None;
    }
    segments
        .iter()
        .zip(prefix)
        .all(|(segment, expected)| normalize(segment) == *expected)
        .then(|| segments[prefix.len()..].join("."))
}

/// Remote fields held in memory after init, keyed by normalized spelling.
#[derive(Debug, Default)]
struct Fields {
    entries: IndexMap<String, (String, RawValue)>,
    /// Raw field paths folded by case, pointing into `entries`.
    paths: HashMap<Key, usize>,
}

impl Fields {
    fn clear(&mut self) {
        self.entries.clear();
        self.paths.clear();
    }

    fn insert(&mut self, field: String, value: RawValue) {
        let path = Key::parse(&field);
        let (idx, _) = self.entries.insert_full(normalize(&field), (field, value));
        self.paths.entry(path).or_insert(idx);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, key: &Key) -> Option<RawValue> {
        self.entries
            .get(&dot_key(key))
            .or_else(|| self.entries.get(&underscore_key(key)))
            .or_else(|| {
                let idx = *self.paths.get(key)?;
                self.entries.get_index(idx).map(|(_, entry)| entry)
            })
            .map(|(_, value)| value.clone())
    }

    fn unknown(&self, provider: &str, registry: &Registry) -> Vec<LoadError> {
        let known: HashSet<String> = registry
            .keys()
            .flat_map(|k| [dot_key(k), underscore_key(k)])
            .collect();
        self.entries
            .iter()
            .filter(|(normalized, (field, value))| {
                !value.is_null()
                    && !known.contains(*normalized)
                    && registry.opt(Key::parse(field)).is_none()
            })
            .map(|(_, (field, _))| LoadError::UnknownField {
                provider: provider.to_string(),
                field: field.clone(),
            })
            .collect()
    }
}

fn client(timeout: Duration, url: &str) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })
}

/// Reads options from a JSON metadata endpoint such as the GCE or
/// OpenStack metadata service.
///
/// The document is flattened, and only fields below `strip_prefix` are
/// kept, with the prefix removed.
pub struct MetadataProvider {
    name: String,
    url: String,
    strip_prefix: Vec<String>,
    headers: Vec<(String, String)>,
    timeout: Duration,
    fields: Fields,
}

impl MetadataProvider {
    pub fn new(url: impl Into<String>, strip_prefix: &str) -> Self {
        Self {
            name: "metadata".to_string(),
            url: url.into(),
            strip_prefix: normalize(strip_prefix)
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            headers: Vec::new(),
            timeout: METADATA_TIMEOUT,
            fields: Fields::default(),
        }
    }

    /// Google Compute Engine instance attributes.
    pub fn gce() -> Self {
        Self::gce_at(GCE_METADATA_URL)
    }

    /// GCE metadata served from a non-default URL.
    pub fn gce_at(url: impl Into<String>) -> Self {
        Self::new(url, "instance.attributes")
            .named("gce")
            .header("Metadata-Flavor", "Google")
    }

    /// OpenStack instance `meta` properties.
    pub fn openstack() -> Self {
        Self::new(OPENSTACK_METADATA_URL, "meta").named("openstack")
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Send an extra request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<serde_json::Value, ProviderError> {
        let http_err = |message: String| ProviderError::Http {
            url: self.url.clone(),
            message,
        };
        let mut request = client(self.timeout, &self.url)?.get(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        let response = request.send().map_err(|e| http_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_err(format!("unexpected status {status}")));
        }
        response.json().map_err(|e| ProviderError::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }
}

impl Provider for MetadataProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _registry: &Registry) -> Result<(), ProviderError> {
        self.fields.clear();
        let RawValue::Map(doc) = RawValue::from(self.fetch()?) else {
            return Err(ProviderError::Decode {
                url: self.url.clone(),
                message: "expected a JSON object".to_string(),
            });
        };

        for (field, value) in flatten(doc) {
            if let Some(rest) = below_prefix(&field, &self.strip_prefix) {
                self.fields.insert(rest, value);
            }
        }
        info!(url = %self.url, keys = self.fields.len(), "loaded instance metadata");
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        self.fields.get(key)
    }
}

#[derive(Debug, Deserialize)]
struct KvEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// Reads options from the Consul KV store below a key prefix.
///
/// `myapp/worker/buffer_size` under prefix `myapp` supplies
/// `Worker.BufferSize`. A prefix with no keys is not an error.
pub struct ConsulProvider {
    address: String,
    prefix: String,
    token: Option<String>,
    timeout: Duration,
    fields: Fields,
}

impl ConsulProvider {
    /// `address` is the agent's base URL, e.g. `http://127.0.0.1:8500`.
    pub fn new(address: impl Into<String>, prefix: &str) -> Self {
        Self {
            address: address.into().trim_end_matches('/').to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            token: None,
            timeout: METADATA_TIMEOUT,
            fields: Fields::default(),
        }
    }

    /// ACL token sent as `X-Consul-Token`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/kv/{}?recurse=true", self.address, self.prefix)
    }

    fn fetch(&self) -> Result<Vec<KvEntry>, ProviderError> {
        let url = self.url();
        let http_err = |message: String| ProviderError::Http {
            url: url.clone(),
            message,
        };
        let mut request = client(self.timeout, &url)?.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Consul-Token", token);
        }
        let response = request.send().map_err(|e| http_err(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status if !status.is_success() => {
                return Err(http_err(format!("unexpected status {status}")));
            }
            _ => {}
        }
        response.json().map_err(|e| ProviderError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })
    }

    fn decode(&self, entry: KvEntry) -> Result<Option<(String, RawValue)>, ProviderError> {
        let Some(rest) = entry
            .key
            .strip_prefix(&self.prefix)
            .filter(|rest| self.prefix.is_empty() || rest.is_empty() || rest.starts_with('/'))
        else {
            return Ok(None);
        };
        let rest = rest.trim_matches('/');
        // Folders come back as entries with a trailing slash and no value.
        let (false, Some(encoded)) = (rest.is_empty(), entry.value) else {
            return Ok(None);
        };
        let decode_err = |message: String| ProviderError::Decode {
            url: self.url(),
            message: format!("{}: {message}", entry.key),
        };
        let bytes = BASE64.decode(encoded).map_err(|e| decode_err(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))?;
        Ok(Some((rest.replace('/', "."), RawValue::String(text))))
    }
}

impl Provider for ConsulProvider {
    fn name(&self) -> &str {
        "consul"
    }

    fn init(&mut self, _registry: &Registry) -> Result<(), ProviderError> {
        self.fields.clear();
        let entries = self.fetch()?;
        debug!(entries = entries.len(), prefix = %self.prefix, "fetched consul keys");
        for entry in entries {
            if let Some((field, value)) = self.decode(entry)? {
                self.fields.insert(field, value);
            }
        }
        info!(prefix = %self.prefix, keys = self.fields.len(), "loaded consul keys");
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        self.fields.get(key)
    }

    fn drain_diagnostics(&mut self, registry: &Registry) -> Vec<LoadError> {
        self.fields.unknown(self.name(), registry)
    }
}
