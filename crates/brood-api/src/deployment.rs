//! Deployment model
//!
//! A deployment is the immutable input to the supervisor: the application
//! name, a deployment identifier, the component catalog, and the colocate
//! stanza that groups components into shared worker processes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected while validating a deployment manifest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeploymentError {
    #[error("colocate stanza {index} is empty")]
    EmptyColocationGroup { index: usize },

    #[error("colocate stanza references unknown component {component:?}")]
    UnknownComponent { component: String },

    #[error("component {component:?} appears in more than one colocate stanza")]
    DuplicateColocation { component: String },
}

/// Application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name.
    pub name: String,
    /// Full component catalog.
    pub components: Vec<String>,
    /// Colocation stanzas. Each stanza is a non-empty list of component
    /// names that must share a worker process; the first listed component
    /// names the group. Components absent from every stanza form singleton
    /// groups named after themselves.
    #[serde(default)]
    pub colocate: Vec<Vec<String>>,
}

/// An immutable deployment of an application.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deployment {
    pub app: AppConfig,
    /// Unique identifier for this deployment.
    pub id: String,
}

impl Deployment {
    /// Validate the colocate stanza against the component catalog.
    ///
    /// Malformed colocation aborts the supervisor at construction, before
    /// any worker is launched.
    pub fn validate(&self) -> Result<(), DeploymentError> {
        let catalog: std::collections::BTreeSet<&str> =
            self.app.components.iter().map(String::as_str).collect();
        let mut seen = std::collections::BTreeSet::new();
        for (index, stanza) in self.app.colocate.iter().enumerate() {
            if stanza.is_empty() {
                return Err(DeploymentError::EmptyColocationGroup { index });
            }
            for component in stanza {
                if !catalog.contains(component.as_str()) {
                    return Err(DeploymentError::UnknownComponent {
                        component: component.clone(),
                    });
                }
                if !seen.insert(component.clone()) {
                    return Err(DeploymentError::DuplicateColocation {
                        component: component.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(components: &[&str], colocate: &[&[&str]]) -> Deployment {
        Deployment {
            app: AppConfig {
                name: "app".to_string(),
                components: components.iter().map(|c| c.to_string()).collect(),
                colocate: colocate
                    .iter()
                    .map(|g| g.iter().map(|c| c.to_string()).collect())
                    .collect(),
            },
            id: "deadbeef".to_string(),
        }
    }

    #[test]
    fn test_valid_deployment() {
        let d = deployment(&["A", "B", "C", "D"], &[&["A", "B"], &["C"]]);
        assert_eq!(d.validate(), Ok(()));
    }

    #[test]
    fn test_empty_stanza_rejected() {
        let d = deployment(&["A"], &[&[]]);
        assert_eq!(
            d.validate(),
            Err(DeploymentError::EmptyColocationGroup { index: 0 })
        );
    }

    #[test]
    fn test_unknown_component_rejected() {
        let d = deployment(&["A"], &[&["A", "Z"]]);
        assert_eq!(
            d.validate(),
            Err(DeploymentError::UnknownComponent {
                component: "Z".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_colocation_rejected() {
        let d = deployment(&["A", "B"], &[&["A", "B"], &["B"]]);
        assert_eq!(
            d.validate(),
            Err(DeploymentError::DuplicateColocation {
                component: "B".to_string()
            })
        );
    }
}
