//! Post-load validation of configuration sections.
//!
//! Applications typically read a group of options into a plain struct once
//! loading finishes. Implementing [`Validate`] on that struct lets the
//! cross-option checks live next to it; the [`Validator`] runs every
//! registered section and tags each failure with its section name.

use thiserror::Error;

use crate::key::Key;

/// A failed check within one configuration section.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("validation error {section}: {message}")]
pub struct ValidationError {
    pub section: Key,
    pub message: String,
}

/// A configuration section that can check its own values.
pub trait Validate {
    /// Describe every problem found; empty when valid.
    fn validate(&self) -> Vec<String>;
}

/// Runs [`Validate`] over named sections.
#[derive(Default)]
pub struct Validator<'a> {
    sections: Vec<(Key, &'a dyn Validate)>,
}

impl<'a> Validator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, name: impl Into<Key>, section: &'a dyn Validate) -> Self {
        self.sections.push((name.into(), section));
        self
    }

    /// Validate all sections in registration order.
    pub fn run(&self) -> Vec<ValidationError> {
        self.sections
            .iter()
            .flat_map(|(name, section)| {
                section.validate().into_iter().map(|message| ValidationError {
                    section: name.clone(),
                    message,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Server {
        host: String,
        port: u16,
    }

    impl Validate for Server {
        fn validate(&self) -> Vec<String> {
            let mut problems = Vec::new();
            if self.host.is_empty() {
                problems.push("host name must not be empty".to_string());
            }
            if self.port == 0 {
                problems.push("port must be non-zero".to_string());
            }
            problems
        }
    }

    #[test]
    fn collects_problems_per_section() {
        let bad = Server {
            host: String::new(),
            port: 0,
        };
        let good = Server {
            host: "localhost".into(),
            port: 80,
        };
        let errors = Validator::new()
            .section("Server", &bad)
            .section("Admin", &good)
            .run();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            [
                "validation error Server: host name must not be empty",
                "validation error Server: port must be non-zero",
            ]
        );
    }

    #[test]
    fn empty_validator_passes() {
        assert!(Validator::new().run().is_empty());
    }
}
