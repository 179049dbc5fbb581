use anyhow::Context;

/// Where we store secrets in the OS keyring.
///
/// Kept constant so upgrades don't orphan secrets.
const SERVICE: &str = "symptomcheck";

/// Checked before the keyring, for headless and CI use.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    GeminiApiKey,
}

impl SecretKey {
    fn user(self) -> &'static str {
        match self {
            SecretKey::GeminiApiKey => "gemini_api_key",
        }
    }
}

pub fn set_secret(key: SecretKey, value: &str) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")?;
    entry.set_password(value).context("set secret")
}

pub fn get_secret(key: SecretKey) -> anyhow::Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")?;

    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e)).context("get secret"),
    }
}

/// Picks the Gemini key: a non-blank environment value wins over the keyring.
pub fn resolve_gemini_api_key(env_value: Option<String>) -> anyhow::Result<Option<String>> {
    if let Some(v) = non_blank(env_value) {
        return Ok(Some(v));
    }
    Ok(non_blank(get_secret(SecretKey::GeminiApiKey)?))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
