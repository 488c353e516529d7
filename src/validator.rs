//! Field validation handed through the loader chain.
//!
//! The loader itself never validates anything. It carries a [`Validator`]
//! from the tree origin to every child so the code reading overlay content
//! can check declared values against the same rules.

use regex::Regex;

use crate::error::{Error, Result};

/// Checks values declared in overlay files.
pub trait Validator: Send + Sync {
    fn validate_namespace(&self, namespace: &str) -> Result<()>;

    fn validate_label(&self, key: &str, value: &str) -> Result<()>;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl Validator for PermissiveValidator {
    fn validate_namespace(&self, _namespace: &str) -> Result<()> {
        Ok(())
    }

    fn validate_label(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }
}

/// RFC 1123 label rules for namespaces and label keys/values.
#[derive(Debug, Clone)]
pub struct Dns1123Validator {
    dns_label: Regex,
    label_value: Regex,
}

impl Dns1123Validator {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Validation {
                field: "pattern".to_string(),
                value: pattern.to_string(),
                message: e.to_string(),
            })
        };
        Ok(Self {
            dns_label: compile(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$")?,
            label_value: compile(r"^(([A-Za-z0-9][-A-Za-z0-9_.]{0,61})?[A-Za-z0-9])?$")?,
        })
    }

    fn reject(field: &str, value: &str, message: &str) -> Error {
        Error::Validation {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }
}

impl Validator for Dns1123Validator {
    fn validate_namespace(&self, namespace: &str) -> Result<()> {
        if self.dns_label.is_match(namespace) {
            Ok(())
        } else {
            Err(Self::reject(
                "namespace",
                namespace,
                "must be a lowercase RFC 1123 label of at most 63 characters",
            ))
        }
    }

    fn validate_label(&self, key: &str, value: &str) -> Result<()> {
        let name = key.rsplit('/').next().unwrap_or(key);
        if name.is_empty() || name.len() > 63 || !self.label_value.is_match(name) {
            return Err(Self::reject("label key", key, "invalid label name"));
        }
        if value.len() > 63 || !self.label_value.is_match(value) {
            return Err(Self::reject("label value", value, "invalid label value"));
        }
        Ok(())
    }
}
