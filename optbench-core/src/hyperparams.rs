//! Named optimizer hyperparameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BenchError, Result};

/// Declares one hyperparameter an optimizer accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperparameterSpec {
    pub name: &'static str,
    /// `None` marks the hyperparameter as required.
    pub default: Option<f64>,
}

impl HyperparameterSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: f64) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Mapping from hyperparameter name to value, kept in name order so that
/// derived directory names are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(BTreeMap<String, f64>);

impl Hyperparameters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Look up a hyperparameter that must be present after resolution.
    pub fn require(&self, optimizer: &str, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| BenchError::MissingHyperparameter {
                optimizer: optimizer.to_string(),
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `name=value` assignments, as given on the command line.
    pub fn from_assignments<'a, I>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hyperparams = Self::new();
        for assignment in assignments {
            let (name, value) = parse_assignment(assignment)?;
            hyperparams.insert(name, value);
        }
        Ok(hyperparams)
    }

    /// Check against an optimizer's declared hyperparameters: fill defaults,
    /// reject unknown names and missing required ones.
    pub fn resolve(&self, optimizer: &str, specs: &[HyperparameterSpec]) -> Result<Self> {
        if let Some(unknown) = self
            .0
            .keys()
            .find(|name| !specs.iter().any(|s| s.name == name.as_str()))
        {
            return Err(BenchError::UnknownHyperparameter {
                optimizer: optimizer.to_string(),
                name: unknown.clone(),
            });
        }

        let mut resolved = Self::new();
        for spec in specs {
            let value = match (self.get(spec.name), spec.default) {
                (Some(v), _) => v,
                (None, Some(default)) => default,
                (None, None) => {
                    return Err(BenchError::MissingHyperparameter {
                        optimizer: optimizer.to_string(),
                        name: spec.name.to_string(),
                    });
                }
            };
            resolved.insert(spec.name, value);
        }
        Ok(resolved)
    }
}

impl FromIterator<(String, f64)> for Hyperparameters {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_assignment(assignment: &str) -> Result<(String, f64)> {
    let (name, value) = assignment.split_once('=').ok_or_else(|| {
        BenchError::config(format!(
            "hyperparameter '{assignment}' is not of the form name=value"
        ))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(BenchError::config(format!(
            "hyperparameter '{assignment}' has an empty name"
        )));
    }
    let value = value.trim().parse::<f64>().map_err(|e| {
        BenchError::config(format!("hyperparameter '{name}' has invalid value: {e}"))
    })?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[HyperparameterSpec] = &[
        HyperparameterSpec::required("lr"),
        HyperparameterSpec::optional("momentum", 0.0),
    ];

    #[test]
    fn test_resolve_fills_defaults() {
        let hp = Hyperparameters::new().with("lr", 0.1);
        let resolved = hp.resolve("sgd", SPECS).unwrap();
        assert_eq!(resolved.get("lr"), Some(0.1));
        assert_eq!(resolved.get("momentum"), Some(0.0));
    }

    #[test]
    fn test_resolve_missing_required() {
        let err = Hyperparameters::new().resolve("sgd", SPECS).unwrap_err();
        assert!(matches!(
            err,
            BenchError::MissingHyperparameter { ref name, .. } if name == "lr"
        ));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let hp = Hyperparameters::new().with("lr", 0.1).with("gamma", 2.0);
        let err = hp.resolve("sgd", SPECS).unwrap_err();
        assert!(matches!(err, BenchError::UnknownHyperparameter { .. }));
    }

    #[test]
    fn test_from_assignments() {
        let hp = Hyperparameters::from_assignments(["lr=0.01", " momentum = 0.9 "]).unwrap();
        assert_eq!(hp.get("lr"), Some(0.01));
        assert_eq!(hp.get("momentum"), Some(0.9));
        assert!(Hyperparameters::from_assignments(["lr"]).is_err());
        assert!(Hyperparameters::from_assignments(["lr=fast"]).is_err());
        assert!(Hyperparameters::from_assignments(["=1"]).is_err());
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let hp = Hyperparameters::new().with("lr", 0.5);
        assert_eq!(serde_json::to_string(&hp).unwrap(), r#"{"lr":0.5}"#);
    }
}
