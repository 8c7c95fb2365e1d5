/// Errors raised while assembling or loading SAML 2.0 registrations.
#[derive(Debug, thiserror::Error)]
pub enum Saml2Error {
    /// A credential was constructed with an inconsistent key/usage combination.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// A registration or asserting-party section failed validation at build time.
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// An entity descriptor lacks what a registration needs.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Asserting-party metadata could not be retrieved.
    #[error("Failed to fetch metadata from {location}: {message}")]
    MetadataFetch { location: String, message: String },

    /// Certificate or key material could not be decoded.
    #[error("Crypto error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),

    /// A binding URN or name that is neither HTTP-POST nor HTTP-Redirect.
    #[error("Unknown SAML binding: {0}")]
    UnknownBinding(String),

    /// A URL failed validation.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl Saml2Error {
    pub(crate) fn registration(message: impl Into<String>) -> Self {
        Self::InvalidRegistration(message.into())
    }

    pub(crate) fn metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata(message.into())
    }
}
