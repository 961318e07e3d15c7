//! Provider trait and the composite provider.
//!
//! A provider turns one backing store (process environment, a config file,
//! command-line flags, a metadata service) into key → raw value lookups.
//! The loader drives each provider through the same lifecycle:
//!
//! 1. [`Provider::init`] once, with read access to the registry as filled by
//!    the providers before it (this is how `--config` chooses the file);
//! 2. [`Provider::lookup`] for every option not yet set;
//! 3. [`Provider::drain_diagnostics`] to collect non-fatal problems such as
//!    unknown fields.

pub mod env;
pub mod file;
pub mod flags;
pub mod remote;

pub use env::EnvProvider;
pub use file::{FileFormat, FileProvider};
pub use flags::FlagProvider;
pub use remote::{ConsulProvider, MetadataProvider};

use tracing::warn;

use crate::error::{LoadError, ProviderError};
use crate::key::Key;
use crate::registry::Registry;
use crate::value::RawValue;

/// A source of option values.
pub trait Provider {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Prepare the provider: parse flags, read a file, fetch a document.
    ///
    /// A failed init disables the provider for the rest of the load cycle.
    fn init(&mut self, registry: &Registry) -> Result<(), ProviderError>;

    /// Look up the raw value for `key`, if this source has one.
    fn lookup(&self, key: &Key) -> Option<RawValue>;

    /// Non-fatal problems found while providing, handed over once.
    fn drain_diagnostics(&mut self, _registry: &Registry) -> Vec<LoadError> {
        Vec::new()
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self, registry: &Registry) -> Result<(), ProviderError> {
        (**self).init(registry)
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        (**self).lookup(key)
    }

    fn drain_diagnostics(&mut self, registry: &Registry) -> Vec<LoadError> {
        (**self).drain_diagnostics(registry)
    }
}

/// How [`Providers`] reacts when a child fails to initialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitPolicy {
    /// The first failure fails the whole composite.
    #[default]
    StopOnError,
    /// Failed children are reported and left out of lookups.
    SkipFailed,
}

/// Several providers acting as one, in declared priority order.
///
/// `lookup` returns the first child hit, so earlier children win.
pub struct Providers {
    name: String,
    children: Vec<Box<dyn Provider>>,
    active: Vec<bool>,
    policy: InitPolicy,
    failures: Vec<LoadError>,
}

impl Providers {
    pub fn new(children: Vec<Box<dyn Provider>>) -> Self {
        let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
        let name = format!("providers({})", names.join(", "));
        Self {
            name,
            active: vec![false; children.len()],
            children,
            policy: InitPolicy::default(),
            failures: Vec::new(),
        }
    }

    /// Keep going past children that fail to initialize.
    pub fn skip_failed(mut self) -> Self {
        self.policy = InitPolicy::SkipFailed;
        self
    }

    pub fn policy(&self) -> InitPolicy {
        self.policy
    }
}

impl Provider for Providers {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, registry: &Registry) -> Result<(), ProviderError> {
        self.failures.clear();
        for (idx, child) in self.children.iter_mut().enumerate() {
            match child.init(registry) {
                Ok(()) => self.active[idx] = true,
                Err(err) => {
                    self.active[idx] = false;
                    match self.policy {
                        InitPolicy::StopOnError => {
                            self.active.iter_mut().for_each(|a| *a = false);
                            return Err(err);
                        }
                        InitPolicy::SkipFailed => {
                            warn!(provider = child.name(), error = %err, "skipping provider");
                            self.failures.push(LoadError::ProviderInit {
                                provider: child.name().to_string(),
                                source: err,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        self.children
            .iter()
            .zip(&self.active)
            .filter(|(_, active)| **active)
            .find_map(|(child, _)| child.lookup(key))
    }

    fn drain_diagnostics(&mut self, registry: &Registry) -> Vec<LoadError> {
        let mut out = std::mem::take(&mut self.failures);
        for (child, active) in self.children.iter_mut().zip(&self.active) {
            if *active {
                out.extend(child.drain_diagnostics(registry));
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory provider for tests.
    pub(crate) struct MapProvider {
        pub name: String,
        pub values: HashMap<String, RawValue>,
        pub fail_init: bool,
        pub inits: usize,
    }

    impl MapProvider {
        pub fn new(name: &str, values: &[(&str, RawValue)]) -> Self {
            Self {
                name: name.to_string(),
                values: values
                    .iter()
                    .map(|(k, v)| (crate::key::dot_key(&Key::parse(k)), v.clone()))
                    .collect(),
                fail_init: false,
                inits: 0,
            }
        }

        pub fn failing(name: &str) -> Self {
            Self {
                fail_init: true,
                ..Self::new(name, &[])
            }
        }
    }

    impl Provider for MapProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(&mut self, _registry: &Registry) -> Result<(), ProviderError> {
            self.inits += 1;
            if self.fail_init {
                return Err(ProviderError::Http {
                    url: format!("test://{}", self.name),
                    message: "unreachable".to_string(),
                });
            }
            Ok(())
        }

        fn lookup(&self, key: &Key) -> Option<RawValue> {
            self.values.get(&crate::key::dot_key(key)).cloned()
        }
    }

    #[test]
    fn composite_lookup_prefers_earlier_children() {
        let mut p = Providers::new(vec![
            Box::new(MapProvider::new("a", &[("Server.HostName", "from-a".into())])),
            Box::new(MapProvider::new(
                "b",
                &[("Server.HostName", "from-b".into()), ("Worker.Count", "3".into())],
            )),
        ]);
        p.init(&Registry::new()).unwrap();
        assert_eq!(p.lookup(&Key::parse("server.hostname")), Some("from-a".into()));
        assert_eq!(p.lookup(&Key::parse("Worker.Count")), Some("3".into()));
        assert_eq!(p.lookup(&Key::parse("Worker.Missing")), None);
        assert_eq!(p.name(), "providers(a, b)");
    }

    #[test]
    fn composite_stops_on_first_failure_by_default() {
        let mut p = Providers::new(vec![
            Box::new(MapProvider::new("a", &[("X", "1".into())])),
            Box::new(MapProvider::failing("b")),
        ]);
        assert!(p.init(&Registry::new()).is_err());
        assert_eq!(p.lookup(&Key::parse("X")), None);
    }

    #[test]
    fn composite_can_skip_failed_children() {
        let mut p = Providers::new(vec![
            Box::new(MapProvider::failing("a")),
            Box::new(MapProvider::new("b", &[("X", "1".into())])),
        ])
        .skip_failed();
        assert_eq!(p.policy(), InitPolicy::SkipFailed);
        p.init(&Registry::new()).unwrap();
        assert_eq!(p.lookup(&Key::parse("X")), Some("1".into()));

        let diagnostics = p.drain_diagnostics(&Registry::new());
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(&diagnostics[0], LoadError::ProviderInit { provider, .. } if provider == "a"));
        assert!(p.drain_diagnostics(&Registry::new()).is_empty());
    }
}
