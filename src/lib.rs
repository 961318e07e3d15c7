//! strata — layered configuration resolution (library crate).
//!
//! Declare a schema of typed options in a [`Registry`], list the sources in
//! priority order on a [`Loader`], and load. Each option takes its value from
//! the highest-priority source that supplies a valid one, or keeps its default.
//!
//! ```no_run
//! use strata::{EnvProvider, FileProvider, FlagProvider, Loader, Opt, Registry};
//!
//! let registry = Registry::from_opts([
//!     Opt::string("config", "").doc("Path to a config file."),
//!     Opt::string("Server.HostName", "localhost").short('w'),
//!     Opt::byte_size("Worker.BufferSize", 10 * 1024),
//! ])?;
//! let loaded = Loader::new(registry)
//!     .provider(FlagProvider::from_env())
//!     .provider(EnvProvider::new("myapp"))
//!     .provider(FileProvider::yaml_defaults())
//!     .load();
//! for err in loaded.errors() {
//!     eprintln!("{err}");
//! }
//! let buffer: u64 = loaded.registry().get_as("Worker.BufferSize").unwrap_or_default();
//! # Ok::<(), strata::SchemaError>(())
//! ```

pub mod coerce;
pub mod constants;
pub mod env;
pub mod error;
pub mod key;
pub mod loader;
pub mod provider;
pub mod registry;
pub mod validate;
pub mod value;

pub use coerce::{CoerceError, FromOptionValue, OptionType, OptionValue};
pub use env::Env;
pub use error::{LoadError, ProviderError, SchemaError};
pub use key::{Key, KeyFunc};
pub use loader::{Loaded, Loader};
pub use provider::{
    ConsulProvider, EnvProvider, FileFormat, FileProvider, FlagProvider, InitPolicy,
    MetadataProvider, Provider, Providers,
};
pub use registry::{Opt, Registry};
pub use validate::{Validate, ValidationError, Validator};
pub use value::RawValue;
