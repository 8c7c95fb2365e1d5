//! Types shared by every part of the crate: credentials and errors.

mod credential;
mod error;

pub use credential::{Saml2X509Credential, Saml2X509CredentialType};
pub use error::Saml2Error;
