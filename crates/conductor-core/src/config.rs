//! Environment-based service configuration

use crate::error::{ConductorError, ConductorResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable naming the service project endpoint
pub const ENDPOINT_VAR: &str = "CONDUCTOR_PROJECT_ENDPOINT";

/// Environment variable naming the model deployment to run agents against
pub const DEPLOYMENT_VAR: &str = "CONDUCTOR_MODEL_DEPLOYMENT";

/// Connection settings for the backing agent service
///
/// Both fields are required before any agent or run is created; a missing
/// value is a startup-fatal configuration error, never a run-time one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Project endpoint of the backing service
    pub endpoint: String,
    /// Model deployment name used when creating agents
    pub model_deployment: String,
}

impl ServiceConfig {
    /// Create a config from explicit values
    pub fn new(endpoint: impl Into<String>, model_deployment: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_deployment: model_deployment.into(),
        }
    }

    /// Load the config from the environment
    ///
    /// Returns a `Config` error listing every missing variable so the
    /// caller can print one actionable message and exit.
    pub fn from_env() -> ConductorResult<Self> {
        let endpoint = non_empty_var(ENDPOINT_VAR);
        let deployment = non_empty_var(DEPLOYMENT_VAR);

        match (endpoint, deployment) {
            (Some(endpoint), Some(model_deployment)) => Ok(Self {
                endpoint,
                model_deployment,
            }),
            (endpoint, deployment) => {
                let mut missing = Vec::new();
                if endpoint.is_none() {
                    missing.push(ENDPOINT_VAR);
                }
                if deployment.is_none() {
                    missing.push(DEPLOYMENT_VAR);
                }
                Err(ConductorError::config(format!(
                    "missing environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
