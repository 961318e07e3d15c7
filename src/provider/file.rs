//! Structured config file provider (YAML, JSON, TOML).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::coerce::OptionValue;
use crate::constants::{
    CONFIG_DIR, CONFIG_OPTION_KEY, JSON_CANDIDATES, TOML_CANDIDATES, YAML_CANDIDATES,
};
use crate::env::Env;
use crate::error::{LoadError, ProviderError};
use crate::key::{Key, dot_key};
use crate::registry::Registry;
use crate::value::{RawValue, flatten};

use super::Provider;

/// Supported document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FileFormat {
    #[strum(serialize = "yaml", serialize = "yml")]
    Yaml,
    #[strum(serialize = "json")]
    Json,
    #[strum(serialize = "toml")]
    Toml,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
            .map_err(|_| ProviderError::UnsupportedFormat(ext.to_string()))
    }

    /// Decode a document into a nested map.
    pub fn decode(self, content: &str, path: &Path) -> Result<RawValue, ProviderError> {
        let parse_err = |message: String| ProviderError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let raw = match self {
            FileFormat::Yaml => {
                let doc: serde_yaml_ng::Value =
                    serde_yaml_ng::from_str(content).map_err(|e| parse_err(e.to_string()))?;
                RawValue::from(doc)
            }
            FileFormat::Json => {
                let doc: serde_json::Value =
                    serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?;
                RawValue::from(doc)
            }
            FileFormat::Toml => {
                let doc: toml::Table =
                    toml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
                RawValue::from(toml::Value::Table(doc))
            }
        };
        match raw {
            RawValue::Map(_) => Ok(raw),
            // An empty YAML file decodes to null.
            RawValue::Null => Ok(RawValue::Map(IndexMap::new())),
            other => Err(parse_err(format!(
                "expected a mapping at the top level, found {}",
                other.kind()
            ))),
        }
    }
}

/// A flattened entry, keyed by its normalized spelling.
#[derive(Debug, Clone)]
struct Entry {
    field: String,
    path: Key,
    value: RawValue,
}

/// Reads options from the first config file that exists.
///
/// Candidates are tried in order after `$NAME` expansion. When an override
/// key is configured and an earlier provider set that option to a non-empty
/// path, the path is tried before all static candidates.
///
/// File keys are matched case-insensitively, either against the option path
/// itself or against its dotted spelling, so `worker: {bufferSize: 1}`,
/// `worker: {buffersize: 1}` and `worker.buffer_size: 1` all address
/// `Worker.BufferSize`.
pub struct FileProvider {
    candidates: Vec<String>,
    override_key: Option<Key>,
    required: bool,
    format: Option<FileFormat>,
    env: Env,
    loaded_from: Option<PathBuf>,
    entries: IndexMap<String, Entry>,
    /// Raw paths folded by case, pointing into `entries`.
    paths: HashMap<Key, usize>,
}

impl FileProvider {
    pub fn new<S: Into<String>>(candidates: impl IntoIterator<Item = S>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            override_key: None,
            required: false,
            format: None,
            env: Env::real(),
            loaded_from: None,
            entries: IndexMap::new(),
            paths: HashMap::new(),
        }
    }

    /// `config.yaml` / `config.yml` in the working directory, overridable
    /// through the `config` option.
    pub fn yaml_defaults() -> Self {
        Self::new(YAML_CANDIDATES.iter().copied()).override_key(CONFIG_OPTION_KEY)
    }

    pub fn json_defaults() -> Self {
        Self::new(JSON_CANDIDATES.iter().copied()).override_key(CONFIG_OPTION_KEY)
    }

    pub fn toml_defaults() -> Self {
        Self::new(TOML_CANDIDATES.iter().copied()).override_key(CONFIG_OPTION_KEY)
    }

    /// Take the file path from the option at `key` when it is non-empty.
    pub fn override_key(mut self, key: impl Into<Key>) -> Self {
        self.override_key = Some(key.into());
        self
    }

    /// Fail init when no candidate exists.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Decode every file as `format`, ignoring extensions.
    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Expand candidate paths against `env` instead of the process environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Append `~/.config/strata/<file_name>` as the last candidate.
    pub fn with_global_candidate(mut self, file_name: &str) -> Self {
        if let Some(dir) = dirs::config_dir() {
            self.candidates
                .push(dir.join(CONFIG_DIR).join(file_name).to_string_lossy().into_owned());
        }
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Path of the file read by the last init, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Number of flattened keys read by the last init.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The override path from the registry, and whether it was explicitly set.
    fn override_path(&self, registry: &Registry) -> Option<(String, bool)> {
        let key = self.override_key.as_ref()?;
        match registry.get(key) {
            Some(OptionValue::String(path)) if !path.is_empty() => {
                Some((path.clone(), registry.is_set(key)))
            }
            _ => None,
        }
    }

    fn read(&self, path: &Path) -> Result<IndexMap<String, Entry>, ProviderError> {
        let format = match self.format {
            Some(format) => format,
            None => FileFormat::from_path(path)?,
        };
        let content = std::fs::read_to_string(path).map_err(|e| ProviderError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let RawValue::Map(doc) = format.decode(&content, path)? else {
            return Ok(IndexMap::new());
        };
        Ok(flatten(doc)
            .into_iter()
            .map(|(field, value)| {
                let path = Key::parse(&field);
                (dot_key(&path), Entry { field, path, value })
            })
            .collect())
    }
}

impl Provider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn init(&mut self, registry: &Registry) -> Result<(), ProviderError> {
        self.entries.clear();
        self.paths.clear();
        self.loaded_from = None;

        let mut paths: Vec<(String, bool)> = Vec::new();
        if let Some(explicit) = self.override_path(registry) {
            paths.push(explicit);
        }
        paths.extend(self.candidates.iter().map(|c| (c.clone(), false)));

        let mut tried = Vec::new();
        for (candidate, explicit) in paths {
            let expanded = self.env.expand(&candidate);
            if expanded.is_empty() {
                continue;
            }
            let path = PathBuf::from(&expanded);
            if !path.is_file() {
                // A path the user asked for by name must exist.
                if explicit {
                    return Err(ProviderError::MissingFile(expanded));
                }
                debug!(path = %path.display(), "config file candidate not found");
                tried.push(expanded);
                continue;
            }
            self.entries = self.read(&path)?;
            for (idx, entry) in self.entries.values().enumerate() {
                self.paths.entry(entry.path.clone()).or_insert(idx);
            }
            info!(path = %path.display(), keys = self.entries.len(), "loaded config file");
            self.loaded_from = Some(path);
            return Ok(());
        }

        if self.required {
            return Err(ProviderError::MissingFile(tried.join(", ")));
        }
        debug!("no config file found, continuing without one");
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        self.entries
            .get(&dot_key(key))
            .or_else(|| {
                let idx = *self.paths.get(key)?;
                self.entries.get_index(idx).map(|(_, e)| e)
            })
            .map(|e| e.value.clone())
    }

    fn drain_diagnostics(&mut self, registry: &Registry) -> Vec<LoadError> {
        let known: HashSet<String> = registry.keys().map(dot_key).collect();
        self.entries
            .iter()
            .filter(|(_, e)| !e.value.is_null())
            .filter(|(spelling, e)| {
                !known.contains(*spelling) && registry.opt(&e.path).is_none()
            })
            .map(|(_, e)| LoadError::UnknownField {
                provider: self.name().to_string(),
                field: e.field.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Opt;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn registry() -> Registry {
        Registry::from_opts([
            Opt::string("config", ""),
            Opt::string("Server.HostName", "localhost"),
            Opt::byte_size("Worker.BufferSize", 10240),
        ])
        .unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a/config.YML")).unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("config.json")).unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("config.toml")).unwrap(), FileFormat::Toml);
        assert!(matches!(
            FileFormat::from_path(Path::new("config.ini")),
            Err(ProviderError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml").to_string_lossy().into_owned();
        let json = write(&dir, "config.json", r#"{"server": {"hostName": "fromjson"}}"#);
        let toml = write(&dir, "config.toml", "[server]\nhost_name = \"fromtoml\"\n");

        let mut p = FileProvider::new([missing, json.clone(), toml]);
        p.init(&registry()).unwrap();
        assert_eq!(p.loaded_from(), Some(Path::new(&json)));
        assert_eq!(p.lookup(&Key::parse("Server.HostName")), Some("fromjson".into()));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "Worker:\n  BufferSize: 11KB\n");
        let mut p = FileProvider::new([path]);
        p.init(&registry()).unwrap();
        assert_eq!(p.lookup(&Key::parse("worker.buffer_size")), Some("11KB".into()));
    }

    #[test]
    fn keys_match_option_path_ignoring_case() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "server:\n  hostname: fromfile\nWORKER:\n  BUFFERSIZE: 1MB\n");
        let mut p = FileProvider::new([path]);
        let reg = registry();
        p.init(&reg).unwrap();
        assert_eq!(p.lookup(&Key::parse("Server.HostName")), Some("fromfile".into()));
        assert_eq!(p.lookup(&Key::parse("Worker.BufferSize")), Some("1MB".into()));
        assert!(p.drain_diagnostics(&reg).is_empty());
    }

    #[test]
    fn candidates_expand_environment_references() {
        let dir = TempDir::new().unwrap();
        write(&dir, "app.toml", "[server]\nhost_name = \"expanded\"\n");
        let env = Env::fixed([("CONF_DIR", dir.path().to_string_lossy().into_owned())]);
        let mut p = FileProvider::new(["${CONF_DIR}/app.toml"]).with_env(env);
        p.init(&registry()).unwrap();
        assert_eq!(p.lookup(&Key::parse("Server.HostName")), Some("expanded".into()));
    }

    #[test]
    fn missing_optional_file_is_not_an_error() {
        let mut p = FileProvider::new(["/nonexistent/strata/config.yaml"]);
        p.init(&registry()).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.loaded_from(), None);
    }

    #[test]
    fn missing_required_file_fails() {
        let mut p = FileProvider::new(["/nonexistent/strata/config.yaml"]).required();
        assert!(matches!(p.init(&registry()), Err(ProviderError::MissingFile(_))));
    }

    #[test]
    fn override_option_is_tried_first() {
        let dir = TempDir::new().unwrap();
        let default = write(&dir, "config.yaml", "server:\n  host_name: default\n");
        let other = write(&dir, "other.yaml", "server:\n  host_name: override\n");

        let mut reg = registry();
        reg.set(&Key::parse("config"), &RawValue::from(other)).unwrap();
        let mut p = FileProvider::new([default]).override_key("config");
        p.init(&reg).unwrap();
        assert_eq!(p.lookup(&Key::parse("Server.HostName")), Some("override".into()));
    }

    #[test]
    fn explicit_override_must_exist() {
        let mut reg = registry();
        reg.set(&Key::parse("config"), &RawValue::from("/nonexistent/other.yaml"))
            .unwrap();
        let mut p = FileProvider::yaml_defaults();
        assert!(matches!(p.init(&reg), Err(ProviderError::MissingFile(path)) if path == "/nonexistent/other.yaml"));
    }

    #[test]
    fn unknown_fields_are_reported_and_nulls_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.yaml",
            "server:\n  host_name: x\n  colour: blue\nworker:\n  buffer_size: ~\n  extra: ~\n",
        );
        let mut p = FileProvider::new([path]);
        let reg = registry();
        p.init(&reg).unwrap();
        let fields: Vec<String> = p
            .drain_diagnostics(&reg)
            .iter()
            .filter_map(|e| e.unknown_field().map(str::to_string))
            .collect();
        assert_eq!(fields, ["server.colour"]);
        assert_eq!(p.lookup(&Key::parse("Worker.BufferSize")), Some(RawValue::Null));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.json", "{not json");
        let mut p = FileProvider::new([path]);
        assert!(matches!(p.init(&registry()), Err(ProviderError::Parse { .. })));
    }

    #[test]
    fn scalar_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "just a string\n");
        let mut p = FileProvider::new([path]);
        assert!(matches!(p.init(&registry()), Err(ProviderError::Parse { .. })));
    }
}
