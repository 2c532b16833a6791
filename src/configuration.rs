use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub password: PasswordSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub store: StoreBackend,
}

/// Which user record store backs the service
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Session token signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64, // 604800 = 7 days
    pub issuer: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    pub bcrypt_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self { bcrypt_cost: 10 }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_token_ttl() -> i64 {
    7 * 24 * 60 * 60
}

/// Reads `configuration.yaml` (optional) then `APP_*` environment overrides,
/// e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;

    if settings.jwt.secret.trim().is_empty() {
        return Err(ConfigError::Message("jwt.secret must not be empty".to_string()));
    }
    if settings.jwt.token_ttl_seconds <= 0 {
        return Err(ConfigError::Message("jwt.token_ttl_seconds must be positive".to_string()));
    }

    Ok(settings)
}
