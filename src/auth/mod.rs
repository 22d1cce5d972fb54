//! Credential handling for SAS-URL access
//!
//! # Examples
//!
//! ```rust,no_run
//! use blob_fetcher::auth::resolve_credential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Either the URL itself or a file that contains it
//! let credential = resolve_credential("sas_url.txt")?;
//! println!("Using {}", credential);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    credential_from_env, resolve_credential, resolve_credential_source, Credential,
};
