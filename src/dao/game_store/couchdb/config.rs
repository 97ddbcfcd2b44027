use super::error::{CouchDaoError, CouchResult};

const BASE_URL_VAR: &str = "COUCH_BASE_URL";
const DATABASE_VAR: &str = "COUCH_DB";
const USERNAME_VAR: &str = "COUCH_USERNAME";
const PASSWORD_VAR: &str = "COUCH_PASSWORD";

/// Database holding `gameState_*` documents when `COUCH_DB` is not set.
const DEFAULT_DATABASE: &str = "deck_ban";

/// Where game documents live: server URL, database and optional basic-auth account.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CouchConfig {
    /// Point at `database` on the server reachable at `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Authenticate every request with this account.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL`, `COUCH_DB`, `COUCH_USERNAME` and `COUCH_PASSWORD`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let present = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let base_url = present(BASE_URL_VAR)
            .ok_or(CouchDaoError::MissingEnvVar { var: BASE_URL_VAR })?;
        let database = present(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let config = Self::new(base_url, database);

        // Credentials only count as a pair.
        Ok(match (present(USERNAME_VAR), present(PASSWORD_VAR)) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        })
    }
}
