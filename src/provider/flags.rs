//! Command-line flag provider built on clap.
//!
//! The clap [`Command`] is generated from the registry at init time: one
//! long flag per option, spelled with the dotted key (`--worker.buffer_size`),
//! plus any short alias declared on the option. Only flags actually present
//! on the command line are reported, so clap defaults never shadow a lower
//! priority source. List and map flags may be repeated and split each value
//! on `,`.
//!
//! The built-in `-h`/`--help` gives way to any option that claims either
//! spelling; if both are claimed there is no help flag.

use std::collections::HashSet;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use crate::coerce::{OptionType, OptionValue};
use crate::constants::APP_NAME;
use crate::error::ProviderError;
use crate::key::{self, Key, KeyFunc};
use crate::registry::{Opt, Registry};
use crate::value::RawValue;

use super::Provider;

const POSITIONAL_ID: &str = "__positional";
const HELP_ID: &str = "__help";

pub struct FlagProvider {
    args: Vec<String>,
    key_func: KeyFunc,
    about: Option<String>,
    matches: Option<ArgMatches>,
    ids: HashSet<String>,
    list_ids: HashSet<String>,
    positional: Vec<String>,
}

impl FlagProvider {
    /// Parse `args`; the first element is the program name.
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            key_func: key::key_func(key::dot_key),
            about: None,
            matches: None,
            ids: HashSet::new(),
            list_ids: HashSet::new(),
            positional: Vec::new(),
        }
    }

    /// Parse the process arguments.
    pub fn from_env() -> Self {
        Self::new(std::env::args())
    }

    /// One-line description shown at the top of `--help`.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Replace the flag naming scheme, e.g. with [`key::dash_key`].
    pub fn with_key_func(mut self, key_func: KeyFunc) -> Self {
        self.key_func = key_func;
        self
    }

    /// Arguments left over after flag parsing.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Build the clap command for `registry`.
    pub fn command(&self, registry: &Registry) -> Command {
        let program = self
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| APP_NAME.to_string());
        let mut cmd = Command::new(program)
            .no_binary_name(false)
            .disable_help_flag(true)
            .disable_version_flag(true);
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }

        let short_taken = registry.opts().iter().any(|o| o.short_flag() == Some('h'));
        let long_taken = registry.keys().any(|k| (self.key_func)(k) == "help");
        if !(short_taken && long_taken) {
            let mut help = Arg::new(HELP_ID).action(ArgAction::Help).help("Print help");
            if !long_taken {
                help = help.long("help");
            }
            if !short_taken {
                help = help.short('h');
            }
            cmd = cmd.arg(help);
        }

        for opt in registry.opts() {
            cmd = cmd.arg(self.arg_for(opt));
        }
        cmd.arg(
            Arg::new(POSITIONAL_ID)
                .value_name("ARGS")
                .num_args(0..)
                .action(ArgAction::Append),
        )
    }

    fn arg_for(&self, opt: &Opt) -> Arg {
        let id = (self.key_func)(opt.key());
        let mut help = opt.synopsis();
        if !is_empty_value(opt.default_value()) {
            help = format!("{help} [default: {}]", opt.default_value());
        }

        let mut arg = Arg::new(id.clone())
            .long(id)
            .help(help.trim().to_string())
            .hide(opt.is_hidden())
            .value_name(opt.ty().to_string().to_uppercase())
            .value_parser(clap::value_parser!(String));
        if let Some(short) = opt.short_flag() {
            arg = arg.short(short);
        }
        match opt.ty() {
            OptionType::Bool => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .action(ArgAction::Set),
            ty if ty.is_list() => arg.value_delimiter(',').action(ArgAction::Append),
            _ => arg.action(ArgAction::Set),
        }
    }
}

fn is_empty_value(value: &OptionValue) -> bool {
    match value {
        OptionValue::String(s) => s.is_empty(),
        OptionValue::StringList(items) => items.is_empty(),
        OptionValue::StringMap(map) => map.is_empty(),
        _ => false,
    }
}

impl Provider for FlagProvider {
    fn name(&self) -> &str {
        "flags"
    }

    fn init(&mut self, registry: &Registry) -> Result<(), ProviderError> {
        if self.matches.is_some() {
            return Ok(());
        }
        let matches = self
            .command(registry)
            .try_get_matches_from(&self.args)
            .map_err(|e| match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    ProviderError::HelpRequested(e.render().to_string())
                }
                _ => ProviderError::Flags(e.render().to_string().trim().to_string()),
            })?;

        self.ids.clear();
        self.list_ids.clear();
        for opt in registry.opts() {
            let id = (self.key_func)(opt.key());
            if opt.ty().is_list() {
                self.list_ids.insert(id.clone());
            }
            self.ids.insert(id);
        }
        self.positional = matches
            .get_many::<String>(POSITIONAL_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        debug!(positional = self.positional.len(), "parsed command-line flags");
        self.matches = Some(matches);
        Ok(())
    }

    fn lookup(&self, key: &Key) -> Option<RawValue> {
        let matches = self.matches.as_ref()?;
        let id = (self.key_func)(key);
        if !self.ids.contains(&id) || matches.value_source(&id) != Some(ValueSource::CommandLine) {
            return None;
        }
        if self.list_ids.contains(&id) {
            let values = matches.try_get_many::<String>(&id).ok()??;
            Some(RawValue::List(values.cloned().map(RawValue::String).collect()))
        } else {
            let value = matches.try_get_one::<String>(&id).ok()??;
            Some(RawValue::String(value.clone()))
        }
    }
}
