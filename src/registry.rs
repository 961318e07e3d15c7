//! Option descriptors and the registry that holds them.
//!
//! The schema is declared up front as a list of [`Opt`] values, one per
//! configuration slot. The [`Registry`] stores them in registration order
//! and is the only thing providers write into, through [`Registry::set`].

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::coerce::{self, FromOptionValue, OptionType, OptionValue};
use crate::error::{LoadError, SchemaError};
use crate::key::{self, Key};
use crate::value::RawValue;

/// A single named, typed configuration slot.
#[derive(Debug, Clone)]
pub struct Opt {
    key: Key,
    ty: OptionType,
    default: OptionValue,
    value: OptionValue,
    doc: String,
    short: Option<char>,
    hidden: bool,
    is_set: bool,
    source: Option<String>,
}

impl Opt {
    /// Declare an option with an explicit type tag. The default must conform
    /// to `ty`; this is checked by [`Registry::register`].
    pub fn new(key: impl Into<Key>, ty: OptionType, default: OptionValue) -> Self {
        Self {
            key: key.into(),
            ty,
            value: default.clone(),
            default,
            doc: String::new(),
            short: None,
            hidden: false,
            is_set: false,
            source: None,
        }
    }

    pub fn int(key: impl Into<Key>, default: i64) -> Self {
        Self::new(key, OptionType::Int, OptionValue::Int(default))
    }

    pub fn uint(key: impl Into<Key>, default: u64) -> Self {
        Self::new(key, OptionType::Uint, OptionValue::Uint(default))
    }

    pub fn float(key: impl Into<Key>, default: f64) -> Self {
        Self::new(key, OptionType::Float64, OptionValue::Float(default))
    }

    pub fn bool(key: impl Into<Key>, default: bool) -> Self {
        Self::new(key, OptionType::Bool, OptionValue::Bool(default))
    }

    pub fn string(key: impl Into<Key>, default: impl Into<String>) -> Self {
        Self::new(key, OptionType::String, OptionValue::String(default.into()))
    }

    pub fn string_list<S: Into<String>>(
        key: impl Into<Key>,
        default: impl IntoIterator<Item = S>,
    ) -> Self {
        let items = default.into_iter().map(Into::into).collect();
        Self::new(key, OptionType::StringList, OptionValue::StringList(items))
    }

    pub fn string_map<K: Into<String>, V: Into<String>>(
        key: impl Into<Key>,
        default: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let map = default
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(key, OptionType::StringMap, OptionValue::StringMap(map))
    }

    pub fn duration(key: impl Into<Key>, default: std::time::Duration) -> Self {
        Self::new(key, OptionType::Duration, OptionValue::Duration(default))
    }

    /// A byte-count option; `default` is in bytes.
    pub fn byte_size(key: impl Into<Key>, default: u64) -> Self {
        Self::new(key, OptionType::ByteSize, OptionValue::ByteSize(default))
    }

    /// Attach documentation. The first sentence becomes the flag help text;
    /// a line starting with `Deprecated: ` marks the option deprecated.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Register a one-letter flag alias, e.g. `-w`.
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Omit this option from flag help. It can still be set.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn ty(&self) -> OptionType {
        self.ty
    }

    pub fn value(&self) -> &OptionValue {
        &self.value
    }

    pub fn default_value(&self) -> &OptionValue {
        &self.default
    }

    pub fn raw_doc(&self) -> &str {
        &self.doc
    }

    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden || self.deprecated().is_some()
    }

    /// True once any provider has supplied a value. Never reset.
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// Name of the provider that supplied the current value, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// First sentence of the doc, ignoring `Deprecated:` lines.
    pub fn synopsis(&self) -> String {
        let paragraph: Vec<&str> = self
            .doc
            .lines()
            .map(str::trim)
            .take_while(|line| !line.is_empty())
            .filter(|line| !line.starts_with("Deprecated: "))
            .collect();
        let text = paragraph.join(" ");
        match text.find(". ") {
            Some(end) => text[..=end].to_string(),
            None => text,
        }
    }

    /// The deprecation note, when the doc contains a `Deprecated: ` line.
    pub fn deprecated(&self) -> Option<&str> {
        self.doc
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("Deprecated: "))
    }
}

/// The flat, ordered set of options for one load cycle.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    opts: Vec<Opt>,
    index: HashMap<Key, usize>,
    /// Normalized spellings already claimed, for collision checks.
    spellings: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a full schema.
    pub fn from_opts(opts: impl IntoIterator<Item = Opt>) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for opt in opts {
            registry.register(opt)?;
        }
        Ok(registry)
    }

    /// Add an option to the schema.
    ///
    /// Rejects empty keys, case-insensitive duplicates, defaults that do not
    /// fit the declared type, reused short flags, and keys whose dotted,
    /// underscored or dashed spelling collides with an existing option.
    pub fn register(&mut self, opt: Opt) -> Result<(), SchemaError> {
        if opt.key.is_empty() {
            return Err(SchemaError::EmptyKey);
        }
        if self.index.contains_key(&opt.key) {
            return Err(SchemaError::DuplicateKey(opt.key));
        }
        if !opt.default.conforms_to(opt.ty) {
            return Err(SchemaError::DefaultTypeMismatch {
                value: opt.default.to_string(),
                key: opt.key,
                ty: opt.ty,
            });
        }

        if let Some(short) = opt.short {
            if let Some(existing) = self.opts.iter().find(|o| o.short == Some(short)) {
                return Err(SchemaError::DuplicateShort {
                    short,
                    first: existing.key.clone(),
                    second: opt.key,
                });
            }
        }

        let spellings = [
            key::dot_key(&opt.key),
            key::underscore_key(&opt.key),
            key::dash_key(&opt.key),
        ];
        for spelling in &spellings {
            if let Some(&existing) = self.spellings.get(spelling) {
                return Err(SchemaError::KeyCollision {
                    first: self.opts[existing].key.clone(),
                    second: opt.key,
                    spelling: spelling.clone(),
                });
            }
        }

        let idx = self.opts.len();
        for spelling in spellings {
            self.spellings.insert(spelling, idx);
        }
        self.index.insert(opt.key.clone(), idx);
        self.opts.push(opt);
        Ok(())
    }

    /// Keys of all options, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.opts.iter().map(|opt| &opt.key)
    }

    pub fn opts(&self) -> &[Opt] {
        &self.opts
    }

    pub fn len(&self) -> usize {
        self.opts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opts.is_empty()
    }

    pub fn opt(&self, key: impl Into<Key>) -> Option<&Opt> {
        let key = key.into();
        self.index.get(&key).map(|&idx| &self.opts[idx])
    }

    /// Current value of the option at `key`.
    pub fn get(&self, key: impl Into<Key>) -> Option<&OptionValue> {
        self.opt(key).map(Opt::value)
    }

    /// Current value converted to `T`; `None` if the key is unknown or the
    /// value does not fit `T`.
    pub fn get_as<T: FromOptionValue>(&self, key: impl Into<Key>) -> Option<T> {
        self.get(key).and_then(T::from_option_value)
    }

    pub fn is_set(&self, key: impl Into<Key>) -> bool {
        self.opt(key).is_some_and(Opt::is_set)
    }

    /// Set the option at `key` from a raw value.
    ///
    /// The first successful write wins: once an option is set, further calls
    /// are silent no-ops returning `Ok(false)`. A value that fails coercion
    /// leaves the option untouched and unset, so a later source may still
    /// supply it.
    pub fn set(&mut self, key: &Key, raw: &RawValue) -> Result<bool, LoadError> {
        self.set_from(key, raw, "direct")
    }

    pub(crate) fn set_from(
        &mut self,
        key: &Key,
        raw: &RawValue,
        source: &str,
    ) -> Result<bool, LoadError> {
        let Some(&idx) = self.index.get(key) else {
            return Err(LoadError::UnknownKey { key: key.clone() });
        };
        let opt = &mut self.opts[idx];
        if opt.is_set {
            debug!(key = %opt.key, source, "already set, ignoring");
            return Ok(false);
        }

        let value = coerce::coerce(opt.ty, raw).map_err(|e| e.for_key(&opt.key))?;
        if let Some(note) = opt.deprecated() {
            warn!(key = %opt.key, source, "option is deprecated: {note}");
        }
        debug!(key = %opt.key, source, value = %value, "option set");
        opt.value = value;
        opt.is_set = true;
        opt.source = Some(source.to_string());
        Ok(true)
    }
}
