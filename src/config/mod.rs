use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for job queue
    pub redis_url: String,

    /// OpenAI API key for the vision model
    pub openai_api_key: String,

    /// OpenAI model identifier
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Directory where uploaded images are stored
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_upload_dir() -> String {
    "./data/uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
