use std::{
    net::IpAddr,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;
use tracing::{info, instrument};

static ENV_PREFIX: &str = "VISITS";
static DEFAULT_CONFIG_PATH: &str = "./config.jsonc";

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    pub template: PathBuf,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub paths: PathsConfig,
    /// Page ids that are rendered but never counted.
    pub ignored_pages: Vec<String>,
}

impl ServerConfig {
    /// Reads the file named by `CONFIG_PATH` (if present) over the defaults,
    /// then `VISITS_*` environment variables over both.
    #[instrument(level = "info")]
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 8080)?
            .set_default("paths.template", "./templates/index.html")?
            .set_default("paths.static_dir", "./static")?
            .set_default("ignored_pages", vec!["/favicon.ico"])?;

        if config_path.exists() {
            info!("Reading configuration from {:?}", config_path);
            builder = builder.add_source(
                config::File::from(config_path).format(config::FileFormat::Json5),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ignored_pages")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize::<ServerConfig>()
            .context("Failed to deserialize configuration")
    }
}
