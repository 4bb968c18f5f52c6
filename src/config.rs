//! Runtime configuration from command-line flags and the environment

use std::path::PathBuf;

use clap::Args;
use tracing::{debug, warn};

use crate::categorize::{AnthropicClient, Categorizer, DEFAULT_MODEL};
use crate::models::RequestContext;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Path to the SQLite database
    #[arg(short, long, global = true, env = "KITCHEN_DATABASE", default_value = "kitchen.db")]
    pub database: PathBuf,

    /// User the command acts for
    #[arg(short, long, global = true, env = "KITCHEN_USER", default_value = "local")]
    pub user: String,

    /// Log filter, e.g. "debug" or "kitchen_planner=trace"
    #[arg(long, global = true, env = "KITCHEN_LOG", default_value = "info")]
    pub log_level: String,

    /// API key for ingredient categorization
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for ingredient categorization
    #[arg(long, global = true, env = "KITCHEN_AI_MODEL", default_value = DEFAULT_MODEL)]
    pub ai_model: String,

    /// File every new ingredient under the fallback category
    #[arg(long, global = true, env = "KITCHEN_AI_DISABLED")]
    pub no_ai: bool,
}

impl Config {
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.user.trim())
    }

    /// Build the categorizer; a missing or unusable key disables it.
    pub fn categorizer(&self) -> Categorizer {
        if self.no_ai {
            debug!("categorization disabled by configuration");
            return Categorizer::disabled();
        }

        let Some(api_key) = self.api_key.clone() else {
            debug!("no API key configured, new ingredients use the fallback category");
            return Categorizer::disabled();
        };

        match AnthropicClient::new(api_key, Some(self.ai_model.clone())) {
            Ok(client) => Categorizer::new(Box::new(client)),
            Err(e) => {
                warn!(error = %e, "could not set up categorization client");
                Categorizer::disabled()
            }
        }
    }
}
