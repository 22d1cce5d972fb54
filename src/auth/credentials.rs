//! Credential resolution for SAS-URL authenticated blob containers
//!
//! A run is authorised by a single Shared Access Signature URL. Users supply
//! it either literally or as a path to a file that contains it, which is how
//! dataset providers usually distribute it.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use url::Url;

use crate::constants::env as env_constants;
use crate::errors::{CredentialError, CredentialResult};

/// Access credential for one run: the SAS URL split into endpoint and token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Full SAS URL exactly as resolved
    sas_url: String,
    /// URL with the query string removed
    endpoint: Url,
    /// Query string carrying the signature (if any)
    token: Option<String>,
}

impl Credential {
    /// Parse a SAS URL into a credential
    pub fn from_sas_url(sas_url: &str) -> CredentialResult<Self> {
        if sas_url.trim().is_empty() {
            return Err(CredentialError::Empty);
        }

        let parsed = Url::parse(sas_url).map_err(|e| CredentialError::InvalidUrl {
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CredentialError::InvalidUrl {
                reason: format!("unsupported scheme '{}', expected https", parsed.scheme()),
            });
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(CredentialError::InvalidUrl {
                reason: "URL has no host".to_string(),
            });
        }

        let token = parsed
            .query()
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let mut endpoint = parsed;
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Ok(Self {
            sas_url: sas_url.to_string(),
            endpoint,
            token,
        })
    }

    /// The SAS URL as supplied
    pub fn as_str(&self) -> &str {
        &self.sas_url
    }

    /// Connection endpoint (URL without signature)
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Signature query string, without the leading `?`
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Storage account URL (scheme, host and port only)
    pub fn account_url(&self) -> Url {
        let mut account = self.endpoint.clone();
        account.set_path("/");
        account
    }

    /// Container the SAS URL is scoped to, if it names one
    pub fn container(&self) -> Option<&str> {
        self.endpoint
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token {
            Some(_) => write!(f, "{}?<redacted>", self.endpoint),
            None => write!(f, "{}", self.endpoint),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Turn a literal SAS URL or a path to a file containing one into a string
///
/// If `input` names an existing local file its trimmed contents are returned,
/// otherwise `input` is returned unchanged.
pub fn resolve_credential_source(input: &str) -> CredentialResult<String> {
    let path = Path::new(input);

    if !input.is_empty() && path.exists() {
        info!("Loading SAS URL from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| CredentialError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(contents.trim().to_string());
    }

    Ok(input.to_string())
}

/// Resolve user input into a usable credential
///
/// Only the first use against the store can tell whether the signature itself
/// is valid; this function checks the URL shape.
pub fn resolve_credential(input: &str) -> CredentialResult<Credential> {
    let resolved = resolve_credential_source(input)?;
    let credential = Credential::from_sas_url(&resolved)?;

    if credential.token().is_none() {
        warn!(
            "SAS URL for {} carries no signature; only public containers will be readable",
            credential.endpoint()
        );
    }

    debug!("Resolved credential for {}", credential);
    Ok(credential)
}

/// Credential input from the environment, if set
pub fn credential_from_env() -> Option<String> {
    env::var(env_constants::CREDENTIAL)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_from_file_trims_contents() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "https://example/sas?token=xyz\n").unwrap();

        let resolved = resolve_credential_source(file.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved, "https://example/sas?token=xyz");

        let credential = resolve_credential(file.path().to_str().unwrap()).unwrap();
        assert_eq!(credential.as_str(), "https://example/sas?token=xyz");
        assert_eq!(credential.token(), Some("token=xyz"));
    }

    #[test]
    fn test_resolve_literal_is_unchanged() {
        let input = "https://account.blob.core.windows.net/container?sv=2020&sig=abc";
        assert_eq!(resolve_credential_source(input).unwrap(), input);

        let credential = resolve_credential(input).unwrap();
        assert_eq!(credential.as_str(), input);
        assert_eq!(credential.container(), Some("container"));
        assert_eq!(
            credential.account_url().as_str(),
            "https://account.blob.core.windows.net/"
        );
        assert_eq!(
            credential.endpoint().as_str(),
            "https://account.blob.core.windows.net/container"
        );
    }

    #[test]
    fn test_empty_credential_rejected() {
        assert!(matches!(resolve_credential(""), Err(CredentialError::Empty)));

        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            resolve_credential(file.path().to_str().unwrap()),
            Err(CredentialError::Empty)
        ));
    }

    #[test]
    fn test_malformed_credential_rejected() {
        assert!(matches!(
            resolve_credential("not a url"),
            Err(CredentialError::InvalidUrl { .. })
        ));
        assert!(matches!(
            resolve_credential("ftp://example.com/container?sig=1"),
            Err(CredentialError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_credential_without_container() {
        let credential = Credential::from_sas_url("https://account.example/?sig=1").unwrap();
        assert_eq!(credential.container(), None);
    }

    #[test]
    fn test_token_is_redacted() {
        let credential =
            Credential::from_sas_url("https://account.example/data?sv=1&sig=secret").unwrap();

        let shown = format!("{} {:?}", credential, credential);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }
}
