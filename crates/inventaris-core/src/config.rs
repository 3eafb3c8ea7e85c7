/// Error raised when configuration cannot be read from the environment.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] pub envy::Error);

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        match self.0 {
            envy::Error::MissingValue(_) => "CONFIG_MISSING",
            envy::Error::Custom(_) => "CONFIG_INVALID",
        }
    }
}

/// Trait for loading configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-case
/// env vars (`supabase_url` reads `SUPABASE_URL`). Load `.env` first if the
/// binary supports it.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env()?)
    }

    /// Load from an explicit key/value iterator instead of the process env.
    fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter(vars)?)
    }
}
