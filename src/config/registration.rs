use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::{
    core::{Saml2Error, Saml2X509Credential, Saml2X509CredentialType},
    registration::{
        AssertingPartyDetailsBuilder, MetadataFetchOptions, RelyingPartyRegistration,
        RelyingPartyRegistrationBuilder, RelyingPartyRegistrations, Saml2MessageBinding,
    },
};

/// Where PEM material comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PemSource {
    /// Path to a PEM file.
    File(PathBuf),
    /// Inline PEM text (usually via `${VAR}` expansion).
    Pem(String),
}

impl PemSource {
    async fn read(&self) -> Result<String, Saml2Error> {
        match self {
            PemSource::Pem(pem) => Ok(pem.clone()),
            PemSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                Saml2Error::InvalidCredential(format!("failed to read {}: {e}", path.display()))
            }),
        }
    }
}

/// A relying-party key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPairConfig {
    pub certificate: PemSource,
    pub private_key: PemSource,
}

impl KeyPairConfig {
    async fn load(
        &self,
        credential_type: Saml2X509CredentialType,
    ) -> Result<Saml2X509Credential, Saml2Error> {
        let certificate = self.certificate.read().await?;
        let private_key = self.private_key.read().await?;
        Saml2X509Credential::from_pem(&certificate, Some(&private_key), [credential_type])
    }
}

/// Fetch settings for `metadata_location` asserting parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataFetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Permit `http://` and internal hosts. Never enable in production.
    #[serde(default)]
    pub allow_insecure: bool,
}

impl Default for MetadataFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allow_insecure: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

impl From<&MetadataFetchConfig> for MetadataFetchOptions {
    fn from(config: &MetadataFetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            allow_insecure: config.allow_insecure,
        }
    }
}

/// One `[[registrations]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Unique id; appears in `{registrationId}` placeholders.
    pub registration_id: String,

    /// Relying party entity id. Defaults to
    /// `{baseUrl}/saml2/service-provider-metadata/{registrationId}`.
    #[serde(default)]
    pub entity_id: Option<String>,

    #[serde(default)]
    pub assertion_consumer_service_location: Option<String>,

    #[serde(default)]
    pub assertion_consumer_service_binding: Option<Saml2MessageBinding>,

    #[serde(default)]
    pub single_logout_service_location: Option<String>,

    #[serde(default)]
    pub single_logout_service_response_location: Option<String>,

    /// Defaults to `["post"]`.
    #[serde(default)]
    pub single_logout_service_bindings: Vec<Saml2MessageBinding>,

    #[serde(default)]
    pub name_id_format: Option<String>,

    #[serde(default)]
    pub authn_requests_signed: bool,

    #[serde(default)]
    pub signing_credentials: Vec<KeyPairConfig>,

    #[serde(default)]
    pub decryption_credentials: Vec<KeyPairConfig>,

    pub asserting_party: AssertingPartyConfig,
}

/// The asserting party, from metadata and/or inline settings.
///
/// Inline settings override what metadata provides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertingPartyConfig {
    /// HTTPS URL of the asserting party's metadata.
    #[serde(default)]
    pub metadata_location: Option<String>,

    /// Local copy of the asserting party's metadata.
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,

    #[serde(default)]
    pub entity_id: Option<String>,

    #[serde(default)]
    pub want_authn_requests_signed: Option<bool>,

    #[serde(default)]
    pub signing_algorithms: Vec<String>,

    #[serde(default)]
    pub verification_certificates: Vec<PemSource>,

    #[serde(default)]
    pub encryption_certificates: Vec<PemSource>,

    #[serde(default)]
    pub single_sign_on_service_location: Option<String>,

    #[serde(default)]
    pub single_sign_on_service_binding: Option<Saml2MessageBinding>,

    #[serde(default)]
    pub single_logout_service_location: Option<String>,

    #[serde(default)]
    pub single_logout_service_response_location: Option<String>,

    #[serde(default)]
    pub single_logout_service_binding: Option<Saml2MessageBinding>,
}

impl AssertingPartyConfig {
    pub fn has_metadata(&self) -> bool {
        self.metadata_location.is_some() || self.metadata_file.is_some()
    }

    fn validate(&self, registration_id: &str) -> Result<(), ConfigError> {
        if self.metadata_location.is_some() && self.metadata_file.is_some() {
            return Err(ConfigError::Validation(format!(
                "registration '{registration_id}': set either asserting_party.metadata_location \
                 or asserting_party.metadata_file, not both"
            )));
        }
        if !self.has_metadata()
            && (self.entity_id.is_none() || self.single_sign_on_service_location.is_none())
        {
            return Err(ConfigError::Validation(format!(
                "registration '{registration_id}': asserting_party needs metadata_location, \
                 metadata_file, or both entity_id and single_sign_on_service_location"
            )));
        }
        Ok(())
    }

    async fn load_certificates(
        sources: &[PemSource],
        credential_type: Saml2X509CredentialType,
    ) -> Result<Vec<Saml2X509Credential>, Saml2Error> {
        let mut credentials = Vec::with_capacity(sources.len());
        for source in sources {
            let pem = source.read().await?;
            credentials.push(Saml2X509Credential::from_pem(&pem, None, [credential_type])?);
        }
        Ok(credentials)
    }

    fn apply(
        &self,
        mut builder: AssertingPartyDetailsBuilder,
        verification: Vec<Saml2X509Credential>,
        encryption: Vec<Saml2X509Credential>,
    ) -> AssertingPartyDetailsBuilder {
        if let Some(entity_id) = &self.entity_id {
            builder = builder.entity_id(entity_id);
        }
        if let Some(want) = self.want_authn_requests_signed {
            builder = builder.want_authn_requests_signed(want);
        }
        if !self.signing_algorithms.is_empty() {
            let algorithms = self.signing_algorithms.clone();
            builder = builder.signing_algorithms(|a| *a = algorithms);
        }
        if !verification.is_empty() {
            builder = builder.verification_x509_credentials(|c| *c = verification);
        }
        if !encryption.is_empty() {
            builder = builder.encryption_x509_credentials(|c| *c = encryption);
        }
        if let Some(location) = &self.single_sign_on_service_location {
            builder = builder.single_sign_on_service_location(location);
        }
        if let Some(binding) = self.single_sign_on_service_binding {
            builder = builder.single_sign_on_service_binding(binding);
        }
        if let Some(location) = &self.single_logout_service_location {
            builder = builder.single_logout_service_location(location);
        }
        if let Some(location) = &self.single_logout_service_response_location {
            builder = builder.single_logout_service_response_location(location);
        }
        if let Some(binding) = self.single_logout_service_binding {
            builder = builder.single_logout_service_binding(binding);
        }
        builder
    }
}

impl RegistrationConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.registration_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "registrations[].registration_id cannot be empty".into(),
            ));
        }
        self.asserting_party.validate(&self.registration_id)
    }

    /// Assemble the registration, fetching or reading asserting-party metadata
    /// where configured. Inline settings are applied on top of the metadata.
    pub async fn load(
        &self,
        fetch: &MetadataFetchOptions,
    ) -> Result<RelyingPartyRegistration, Saml2Error> {
        let ap = &self.asserting_party;

        let metadata = if let Some(location) = &ap.metadata_location {
            tracing::info!(
                registration_id = %self.registration_id,
                url = %location,
                "Loading asserting party metadata"
            );
            Some(RelyingPartyRegistrations::from_metadata_location(location, fetch).await?)
        } else if let Some(path) = &ap.metadata_file {
            tracing::info!(
                registration_id = %self.registration_id,
                path = %path.display(),
                "Loading asserting party metadata"
            );
            Some(RelyingPartyRegistrations::from_metadata_file(path).await?)
        } else {
            None
        };

        // The generic builder keeps the entity descriptor inside the
        // asserting-party details.
        let builder = match metadata {
            Some(metadata) => metadata.build()?.into_inner().mutate(),
            None => RelyingPartyRegistration::with_registration_id(&self.registration_id),
        };

        let verification = AssertingPartyConfig::load_certificates(
            &ap.verification_certificates,
            Saml2X509CredentialType::Verification,
        )
        .await?;
        let encryption = AssertingPartyConfig::load_certificates(
            &ap.encryption_certificates,
            Saml2X509CredentialType::Encryption,
        )
        .await?;
        let mut signing = Vec::with_capacity(self.signing_credentials.len());
        for pair in &self.signing_credentials {
            signing.push(pair.load(Saml2X509CredentialType::Signing).await?);
        }
        let mut decryption = Vec::with_capacity(self.decryption_credentials.len());
        for pair in &self.decryption_credentials {
            decryption.push(pair.load(Saml2X509CredentialType::Decryption).await?);
        }

        let registration = self
            .apply(builder)
            .signing_x509_credentials(|c| c.extend(signing))
            .decryption_x509_credentials(|c| c.extend(decryption))
            .asserting_party_details(|builder| ap.apply(builder, verification, encryption))
            .build()?;

        tracing::debug!(
            registration_id = %registration.registration_id(),
            asserting_party = %registration.asserting_party_details().entity_id(),
            "Loaded relying party registration"
        );
        Ok(registration)
    }

    fn apply(
        &self,
        mut builder: RelyingPartyRegistrationBuilder,
    ) -> RelyingPartyRegistrationBuilder {
        builder = builder
            .registration_id(&self.registration_id)
            .authn_requests_signed(self.authn_requests_signed);
        if let Some(entity_id) = &self.entity_id {
            builder = builder.entity_id(entity_id);
        }
        if let Some(location) = &self.assertion_consumer_service_location {
            builder = builder.assertion_consumer_service_location(location);
        }
        if let Some(binding) = self.assertion_consumer_service_binding {
            builder = builder.assertion_consumer_service_binding(binding);
        }
        if let Some(location) = &self.single_logout_service_location {
            builder = builder.single_logout_service_location(location);
        }
        if let Some(location) = &self.single_logout_service_response_location {
            builder = builder.single_logout_service_response_location(location);
        }
        if !self.single_logout_service_bindings.is_empty() {
            let bindings = self.single_logout_service_bindings.clone();
            builder = builder.single_logout_service_bindings(|b| *b = bindings);
        }
        if let Some(format) = &self.name_id_format {
            builder = builder.name_id_format(format);
        }
        builder
    }
}
