/// Trait for loading component configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-cased
/// env vars (`poll_interval_ms` ← `POLL_INTERVAL_MS`). Use `#[serde(default)]`
/// for optional values so a missing variable falls back instead of failing.
pub trait Config: Sized + serde::de::DeserializeOwned {
    fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Like [`Config::from_env`], but only reads variables starting with `prefix`
    /// (the prefix is stripped before matching field names).
    fn from_env_prefixed(prefix: &str) -> Result<Self, envy::Error> {
        envy::prefixed(prefix).from_env()
    }

    /// Build from an explicit key/value iterator instead of the process environment.
    fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(pairs)
    }
}
