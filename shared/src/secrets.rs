//! AWS Secrets Manager integration for database credentials.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Config, Error, Result};

/// Secret strings already fetched by this process, keyed by ARN.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials as stored by RDS in Secrets Manager.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

impl DatabaseCredentials {
    /// Postgres connection string. Values in the secret win over `config`.
    pub fn connection_url(&self, config: &Config) -> Result<String> {
        let host = self
            .host
            .as_deref()
            .or(config.db_host.as_deref())
            .ok_or_else(|| Error::Config("DB_HOST not set".to_string()))?;
        let port = self.port.unwrap_or(config.db_port);
        let dbname = self.dbname.as_deref().unwrap_or(&config.db_name);

        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, host, port, dbname
        ))
    }
}

/// Get a secret string, fetching from Secrets Manager at most once per ARN.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    if let Some(value) = cache().read().await.get(secret_arn) {
        return Ok(value.clone());
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret_string.clone());

    Ok(secret_string)
}

/// Load the credentials secret named by `DB_SECRET_ARN`.
pub async fn get_database_credentials(config: &Config) -> Result<DatabaseCredentials> {
    let secret_arn = config
        .db_secret_arn
        .as_deref()
        .ok_or_else(|| Error::Config("DATABASE_URL or DB_SECRET_ARN must be set".to_string()))?;

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let client = SecretsClient::new(&sdk_config);

    let secret_string = get_secret(&client, secret_arn).await?;
    parse_credentials(&secret_string)
}

fn parse_credentials(secret_string: &str) -> Result<DatabaseCredentials> {
    serde_json::from_str(secret_string)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
}
