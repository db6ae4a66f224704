//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pipeline::ModelName;

#[derive(Debug, Parser)]
#[command(name = "restaurant-agent", version, about = "Plan-execute restaurant recommendation agent")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
    },
    /// Run one recommendation and print the result as JSON.
    Ask {
        /// The request, e.g. "我在北京想吃川菜".
        query: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Args)]
pub struct Settings {
    #[arg(long, global = true, env = "ALIYUN_API_KEY", hide_env_values = true)]
    pub aliyun_api_key: Option<String>,

    #[arg(long, global = true, env = "ALIYUN_BASE_URL", default_value = llm::DEFAULT_BASE_URL)]
    pub aliyun_base_url: String,

    #[arg(long, global = true, env = "ALIYUN_MODEL", default_value = llm::DEFAULT_MODEL)]
    pub aliyun_model: String,

    /// Oracle request timeout in seconds.
    #[arg(long, global = true, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    #[arg(long, global = true, env = "GAODE_API_KEY", hide_env_values = true)]
    pub gaode_api_key: Option<String>,

    #[arg(long, global = true, env = "AMAP_BASE_URL", default_value = amap::DEFAULT_BASE_URL)]
    pub amap_base_url: String,

    /// AMap search timeout in seconds.
    #[arg(long, global = true, env = "AMAP_TIMEOUT_SECS", default_value_t = 10)]
    pub amap_timeout_secs: u64,

    /// City assumed when a request names none.
    #[arg(long, global = true, env = "DEFAULT_CITY", default_value = capabilities::parse_query::DEFAULT_CITY)]
    pub default_city: String,

    /// "lng,lat" of the default city; defaults to its built-in coordinate.
    #[arg(long, global = true, env = "DEFAULT_LOCATION")]
    pub default_location: Option<String>,

    /// JSON file replacing the built-in restaurant taxonomy.
    #[arg(long, global = true, env = "TAXONOMY_PATH")]
    pub taxonomy_path: Option<PathBuf>,

    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    pub fn llm_config(&self) -> anyhow::Result<llm::LlmConfig> {
        let model = ModelName::new(self.aliyun_model.trim())
            .context("ALIYUN_MODEL must not be empty")?;
        Ok(llm::LlmConfig {
            base_url: self.aliyun_base_url.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
            ..llm::LlmConfig::new(model, non_empty(&self.aliyun_api_key))
        })
    }

    pub fn amap_config(&self) -> amap::AmapConfig {
        amap::AmapConfig {
            base_url: self.amap_base_url.clone(),
            search_timeout: Duration::from_secs(self.amap_timeout_secs),
            ..amap::AmapConfig::new(non_empty(&self.gaode_api_key))
        }
    }

    pub fn location_defaults(&self) -> capabilities::LocationDefaults {
        capabilities::LocationDefaults {
            city: self.default_city.clone(),
            location: non_empty(&self.default_location),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
