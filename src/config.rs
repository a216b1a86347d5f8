use std::str::FromStr;

/// Which table store backend the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgREST-compatible REST endpoint (Supabase).
    Rest,
    /// In-process table, lost on restart. Local runs only.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Ok(StoreBackend::Rest),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("LEADS_STORE must be 'rest' or 'memory', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_key: String,
    pub leads_table: String,
    pub port: u16,
    pub store_timeout_secs: u64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Store backend: {:?}", config.store_backend);
        tracing::debug!("Supabase URL: {}", config.supabase_url);
        tracing::debug!("Leads table: {}", config.leads_table);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `from_env` feeds this with the process environment; tests feed it a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("LEADS_STORE") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => StoreBackend::Rest,
        };
        let remote = store_backend == StoreBackend::Rest;

        let supabase_url = match lookup("SUPABASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let parsed = url::Url::parse(raw.trim())
                    .map_err(|e| anyhow::anyhow!("SUPABASE_URL is not a valid URL: {}", e))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    anyhow::bail!("SUPABASE_URL must start with http:// or https://");
                }
                raw.trim().trim_end_matches('/').to_string()
            }
            None if remote => {
                anyhow::bail!("SUPABASE_URL and SUPABASE_KEY must be set in .env")
            }
            None => String::new(),
        };

        let supabase_key = match lookup("SUPABASE_KEY").filter(|s| !s.trim().is_empty()) {
            Some(key) => key,
            None if remote => {
                anyhow::bail!("SUPABASE_URL and SUPABASE_KEY must be set in .env")
            }
            None => String::new(),
        };

        Ok(Self {
            store_backend,
            supabase_url,
            supabase_key,
            leads_table: lookup("LEADS_TABLE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "leads_table".to_string()),
            port: parse_or("PORT", &lookup, 5000)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            store_timeout_secs: parse_or("STORE_TIMEOUT_SECS", &lookup, 30)?,
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", &lookup, 10)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", &lookup, 20)?,
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", &lookup, 1024 * 1024)?,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_rest_backend_requires_credentials() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL and SUPABASE_KEY"));

        let err = Config::from_lookup(lookup_from(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert!(err.to_string().contains("SUPABASE_KEY"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://x.supabase.co/"),
            ("SUPABASE_KEY", "anon-key"),
        ]))
        .unwrap();

        assert_eq!(config.store_backend, StoreBackend::Rest);
        assert_eq!(config.supabase_url, "https://x.supabase.co");
        assert_eq!(config.leads_table, "leads_table");
        assert_eq!(config.port, 5000);
        assert_eq!(config.store_timeout_secs, 30);
        assert_eq!(config.rate_limit_per_second, 10);
        assert_eq!(config.rate_limit_burst, 20);
    }

    #[test]
    fn test_memory_backend_needs_no_credentials() {
        let config = Config::from_lookup(lookup_from(&[("LEADS_STORE", "memory"), ("PORT", "8080")]))
            .unwrap();

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.port, 8080);
        assert!(config.supabase_url.is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "ftp://x.supabase.co"),
            ("SUPABASE_KEY", "k"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup_from(&[
            ("LEADS_STORE", "memory"),
            ("PORT", "not-a-port"),
        ]))
        .is_err());

        assert!(Config::from_lookup(lookup_from(&[("LEADS_STORE", "sqlite")])).is_err());
    }
}
