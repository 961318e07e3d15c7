//! Environment variable provider.

use crate::env::Env;
use crate::error::ProviderError;
use crate::key::{self, Key, KeyFunc};
use crate::registry::Registry;
use crate::value::RawValue;

use super::Provider;

/// Reads options from environment variables.
///
/// With prefix `strata`, option `Worker.BufferSize` is read from
/// `STRATA_WORKER_BUFFER_SIZE`. An empty prefix drops the leading segment.
pub struct EnvProvider {
    env: Env,
    key_func: KeyFunc,
}

impl EnvProvider {
    pub fn new(prefix: &str) -> Self {
        Self {
            env: Env::real(),
            key_func: key::prefix_key_func(prefix, key::key_func(key::env_key)),
        }
    }

    /// Read from `env` instead of the process environment.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Replace the variable naming scheme.
    pub fn with_key_func(mut self, key_func: KeyFunc) -> Self {
        self.key_func = key_func;
        self
    }

    /// Variable name consulted for `key`.
    pub fn var_name(&self, key: &Key) -> String {
        (self.key_func)(key)
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn init(&mut self, _registry: &Registry) -> Result<(), ProviderError> {
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        let name = self.var_name(key);
        if name.is_empty() {
            return None;
        }
        self.env.var(&name).ok().map(RawValue::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_variable_names() {
        let p = EnvProvider::new("strata");
        assert_eq!(p.var_name(&Key::parse("Worker.BufferSize")), "STRATA_WORKER_BUFFER_SIZE");
        assert_eq!(p.var_name(&Key::parse("Server.HostName")), "STRATA_SERVER_HOST_NAME");
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let p = EnvProvider::new("");
        assert_eq!(p.var_name(&Key::parse("Worker.BufferSize")), "WORKER_BUFFER_SIZE");
    }

    #[test]
    fn lookup_reads_injected_env() {
        let mut p = EnvProvider::new("app").with_env(Env::fixed([("APP_WORKER_BUFFER_SIZE", "11KB")]));
        p.init(&Registry::new()).unwrap();
        assert_eq!(p.lookup(&Key::parse("Worker.BufferSize")), Some("11KB".into()));
        assert_eq!(p.lookup(&Key::parse("Worker.Timeout")), None);
        assert_eq!(p.lookup(&Key::default()), None);
    }

    #[test]
    fn custom_key_func() {
        let p = EnvProvider::new("")
            .with_key_func(key::key_func(key::dash_key))
            .with_env(Env::fixed([("worker-buffer-size", "1MB")]));
        assert_eq!(p.lookup(&Key::parse("Worker.BufferSize")), Some("1MB".into()));
    }
}
