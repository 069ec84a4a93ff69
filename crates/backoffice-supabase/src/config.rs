use anyhow::Result;
use backoffice::config::StoreConfig;

/// Connection settings for one Supabase project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,
    /// Anon or service-role key, sent as both `apikey` and bearer token
    pub api_key: String,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs: 30,
        }
    }

    /// Build from the console's store section. An API key is required.
    pub fn from_store(store: &StoreConfig) -> Result<Self> {
        let api_key = store
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for {} (set store.api_key or BACKOFFICE_API_KEY)",
                    store.url
                )
            })?;

        Ok(Self {
            timeout_secs: store.timeout_secs,
            ..Self::new(store.url.clone(), api_key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_section_without_key_is_rejected() {
        let store = StoreConfig::default();

        let err = SupabaseConfig::from_store(&store).unwrap_err();

        assert!(err.to_string().contains("BACKOFFICE_API_KEY"));
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let store = StoreConfig {
            url: "https://abc.supabase.co/".into(),
            api_key: Some("anon".into()),
            timeout_secs: 5,
        };

        let config = SupabaseConfig::from_store(&store).unwrap();

        assert_eq!(config.url, "https://abc.supabase.co");
        assert_eq!(config.timeout_secs, 5);
    }
}
