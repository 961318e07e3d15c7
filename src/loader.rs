//! The load cycle: walk providers in priority order and fill the registry.
//!
//! Priority is declaration order. The first provider to supply a value for
//! an option wins; later providers are only asked about options still unset.
//! Every provider is initialized just before it is consulted, so a provider
//! can read what earlier ones set (the file providers read `config` this way).
//!
//! Nothing in a load aborts it: provider failures, coercion failures and
//! unknown fields are collected and returned next to the registry.

use tracing::{debug, info, warn};

use crate::error::{LoadError, ProviderError};
use crate::provider::Provider;
use crate::registry::Registry;
use crate::validate::Validator;

/// Configures one load cycle. Consumed by [`Loader::load`].
pub struct Loader {
    registry: Registry,
    providers: Vec<Box<dyn Provider>>,
}

impl Loader {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            providers: Vec::new(),
        }
    }

    /// Append a provider. Earlier providers take precedence.
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn boxed_provider(mut self, provider: Box<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the load cycle.
    pub fn load(self) -> Loaded {
        let Loader {
            mut registry,
            providers,
        } = self;
        let mut errors = Vec::new();

        for mut provider in providers {
            let name = provider.name().to_string();
            if let Err(source) = provider.init(&registry) {
                if matches!(source, ProviderError::HelpRequested(_)) {
                    debug!(provider = %name, "help requested");
                } else {
                    warn!(provider = %name, error = %source, "provider failed to initialize");
                }
                errors.push(LoadError::ProviderInit {
                    provider: name,
                    source,
                });
                continue;
            }

            let pending: Vec<_> = registry
                .keys()
                .filter(|key| !registry.is_set(*key))
                .cloned()
                .collect();
            let mut applied = 0usize;
            for key in pending {
                let Some(raw) = provider.lookup(&key) else {
                    continue;
                };
                if raw.is_null() {
                    continue;
                }
                match registry.set_from(&key, &raw, &name) {
                    Ok(true) => applied += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(provider = %name, error = %err, "ignoring value");
                        errors.push(err);
                    }
                }
            }

            let diagnostics = provider.drain_diagnostics(&registry);
            for diagnostic in &diagnostics {
                warn!(provider = %name, "{diagnostic}");
            }
            errors.extend(diagnostics);
            debug!(provider = %name, applied, "provider done");
        }

        let set = registry.opts().iter().filter(|o| o.is_set()).count();
        info!(options = registry.len(), set, errors = errors.len(), "configuration loaded");
        Loaded { registry, errors }
    }
}

/// Outcome of a load cycle: the filled registry and everything that went
/// wrong on the way.
#[derive(Debug)]
pub struct Loaded {
    registry: Registry,
    errors: Vec<LoadError>,
}

impl Loaded {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Run `validator` and append its findings to the error list.
    /// Returns how many were added.
    pub fn validate(&mut self, validator: &Validator<'_>) -> usize {
        let found = validator.run();
        let count = found.len();
        self.errors.extend(found.into_iter().map(LoadError::Validation));
        count
    }

    pub fn into_parts(self) -> (Registry, Vec<LoadError>) {
        (self.registry, self.errors)
    }
}
