// Email resolution: attribute email, then the provider's secondary
// email-list endpoint (GitHub keeps email out of /user when set to private),
// then a deterministic placeholder that keeps the unique-email invariant
// intact for email-less logins.

use std::time::Duration;

use serde::Deserialize;

use identity_link_core::LinkLogger;

/// Default base URL of the GitHub API; overridable for tests.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of the provider's email-list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// A resolved email plus whether it had to be synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmail {
    pub email: String,
    pub synthesized: bool,
}

/// Resolves a non-empty email for every login.
#[derive(Debug, Clone)]
pub struct EmailResolver {
    http: reqwest::Client,
    github_api_base: String,
    timeout: Duration,
    logger: LinkLogger,
}

impl Default for EmailResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailResolver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            github_api_base: GITHUB_API_BASE.to_string(),
            timeout: FETCH_TIMEOUT,
            logger: LinkLogger::default(),
        }
    }

    /// Point the email-list fetch at a different base URL (tests).
    pub fn with_github_api_base(mut self, base: impl Into<String>) -> Self {
        self.github_api_base = base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: LinkLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Resolve an email for a login.
    ///
    /// `provider` is the lowercase provider name; `attribute_email` is the
    /// email from the attribute payload if present; `access_token` is the
    /// bearer credential for the secondary call. Never fails: any fetch
    /// problem degrades to the synthesized placeholder.
    pub async fn resolve(
        &self,
        provider: &str,
        attribute_email: Option<&str>,
        provider_user_id: &str,
        access_token: Option<&str>,
    ) -> ResolvedEmail {
        if let Some(email) = attribute_email.filter(|e| !e.trim().is_empty()) {
            return ResolvedEmail {
                email: email.to_string(),
                synthesized: false,
            };
        }

        if supports_email_listing(provider) {
            if let Some(token) = access_token {
                match self.fetch_provider_emails(token).await {
                    Ok(entries) => {
                        if let Some(email) = pick_email(&entries) {
                            return ResolvedEmail {
                                email,
                                synthesized: false,
                            };
                        }
                    }
                    Err(err) => {
                        self.logger
                            .warn(&format!("unable to fetch {provider} emails: {err}"));
                    }
                }
            }
        }

        ResolvedEmail {
            email: placeholder_email(provider, provider_user_id),
            synthesized: true,
        }
    }

    async fn fetch_provider_emails(&self, access_token: &str) -> Result<Vec<ProviderEmail>, String> {
        let url = format!("{}/user/emails", self.github_api_base);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, "identity-link")
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("email listing returned {}", response.status()));
        }

        response
            .json::<Vec<ProviderEmail>>()
            .await
            .map_err(|e| format!("malformed email listing: {e}"))
    }
}

/// Whether a provider has a secondary email-list endpoint.
fn supports_email_listing(provider: &str) -> bool {
    provider == "github"
}

/// Select an email from the provider's list: primary and verified first,
/// then any verified, then the first entry.
pub fn pick_email(entries: &[ProviderEmail]) -> Option<String> {
    if let Some(entry) = entries.iter().find(|e| e.primary && e.verified) {
        return Some(entry.email.clone());
    }
    if let Some(entry) = entries.iter().find(|e| e.verified) {
        return Some(entry.email.clone());
    }
    entries.first().map(|e| e.email.clone())
}

/// Deterministic placeholder for logins without any obtainable email:
/// `{provider}_{providerUserId}@no-email.local`, traceable back to the
/// provider account. When even the subject id is missing, a random uuid
/// keeps the address unique.
pub fn placeholder_email(provider: &str, provider_user_id: &str) -> String {
    if provider_user_id.is_empty() {
        format!("{provider}_unknown_{}@no-email.local", uuid::Uuid::new_v4())
    } else {
        format!("{provider}_{provider_user_id}@no-email.local")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, primary: bool, verified: bool) -> ProviderEmail {
        ProviderEmail {
            email: email.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn pick_prefers_primary_and_verified() {
        let entries = vec![
            entry("unverified@x.com", false, false),
            entry("verified@x.com", false, true),
            entry("both@x.com", true, true),
        ];
        assert_eq!(pick_email(&entries).as_deref(), Some("both@x.com"));
    }

    #[test]
    fn pick_skips_unverified_primary() {
        // An unverified primary loses to a verified non-primary.
        let entries = vec![
            entry("primary@x.com", true, false),
            entry("v@x.com", false, true),
        ];
        assert_eq!(pick_email(&entries).as_deref(), Some("v@x.com"));
    }

    #[test]
    fn pick_falls_back_to_first() {
        let entries = vec![entry("a@x.com", false, false), entry("b@x.com", false, false)];
        assert_eq!(pick_email(&entries).as_deref(), Some("a@x.com"));
    }

    #[test]
    fn pick_from_empty_list() {
        assert_eq!(pick_email(&[]), None);
    }

    #[test]
    fn placeholder_is_deterministic_for_known_subject() {
        let a = placeholder_email("github", "583231");
        let b = placeholder_email("github", "583231");
        assert_eq!(a, "github_583231@no-email.local");
        assert_eq!(a, b);
    }

    #[test]
    fn placeholder_without_subject_is_unique() {
        let a = placeholder_email("github", "");
        let b = placeholder_email("github", "");
        assert!(a.starts_with("github_unknown_"));
        assert!(a.ends_with("@no-email.local"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn attribute_email_wins() {
        let resolver = EmailResolver::new();
        let resolved = resolver
            .resolve("google", Some("alice@gmail.com"), "g-1", None)
            .await;
        assert_eq!(resolved.email, "alice@gmail.com");
        assert!(!resolved.synthesized);
    }

    #[tokio::test]
    async fn blank_attribute_email_is_ignored() {
        let resolver = EmailResolver::new();
        let resolved = resolver.resolve("google", Some("  "), "g-1", None).await;
        assert_eq!(resolved.email, "google_g-1@no-email.local");
        assert!(resolved.synthesized);
    }

    #[tokio::test]
    async fn provider_without_listing_synthesizes_directly() {
        let resolver = EmailResolver::new();
        let resolved = resolver
            .resolve("google", None, "g-1", Some("token"))
            .await;
        assert!(resolved.synthesized);
        assert_eq!(resolved.email, "google_g-1@no-email.local");
    }

    #[tokio::test]
    async fn github_without_token_synthesizes() {
        let resolver = EmailResolver::new();
        let resolved = resolver.resolve("github", None, "42", None).await;
        assert_eq!(resolved.email, "github_42@no-email.local");
        assert!(resolved.synthesized);
    }
}
