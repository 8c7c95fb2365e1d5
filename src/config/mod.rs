//! Configuration for relying-party registrations.
//!
//! Registrations are configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [[registrations]]
//! registration_id = "okta"
//! signing_credentials = [
//!     { certificate = { file = "sp.crt" }, private_key = { pem = "${SP_SIGNING_KEY}" } },
//! ]
//!
//! [registrations.asserting_party]
//! metadata_location = "https://example.okta.com/app/abc/sso/saml/metadata"
//! ```

mod observability;
mod registration;

use std::{collections::HashSet, path::Path};

pub use observability::{LogFormat, LogLevel, LoggingConfig};
pub use registration::{
    AssertingPartyConfig, KeyPairConfig, MetadataFetchConfig, PemSource, RegistrationConfig,
};
use serde::{Deserialize, Serialize};

use crate::{
    core::Saml2Error,
    registration::{
        InMemoryRelyingPartyRegistrationRepository, MetadataFetchOptions,
        RelyingPartyRegistration,
    },
};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Saml2Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metadata_fetch: MetadataFetchConfig,

    #[serde(default)]
    pub registrations: Vec<RegistrationConfig>,
}

impl Saml2Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Catch feature-gated settings before typed deserialization
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: Saml2Config = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.registrations.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[registrations]] entry is required".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            registration.validate()?;
            if !seen.insert(registration.registration_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate registration_id '{}'",
                    registration.registration_id
                )));
            }
        }

        if self.metadata_fetch.allow_insecure {
            tracing::warn!(
                "metadata_fetch.allow_insecure is enabled. Metadata may be fetched over plain \
                 HTTP or from internal addresses."
            );
        }

        Ok(())
    }

    pub fn metadata_fetch_options(&self) -> MetadataFetchOptions {
        MetadataFetchOptions::from(&self.metadata_fetch)
    }

    /// Build every configured registration, in file order.
    pub async fn load_registrations(&self) -> Result<Vec<RelyingPartyRegistration>, Saml2Error> {
        let fetch = self.metadata_fetch_options();
        let mut registrations = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            registrations.push(registration.load(&fetch).await?);
        }
        tracing::info!(count = registrations.len(), "Loaded SAML registrations");
        Ok(registrations)
    }

    /// Build every registration into an in-memory repository.
    pub async fn load_repository(
        &self,
    ) -> Result<InMemoryRelyingPartyRegistrationRepository, Saml2Error> {
        InMemoryRelyingPartyRegistrationRepository::new(self.load_registrations().await?)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Reject settings this build cannot honour, with a hint about which cargo
/// feature to enable.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<(String, &str)> = Vec::new();

    if let Some(registrations) = raw.get("registrations").and_then(|v| v.as_array()) {
        for registration in registrations {
            let id = registration
                .get("registration_id")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>");
            if let Some(location) = registration
                .get("asserting_party")
                .and_then(|v| v.get("metadata_location"))
                .and_then(|v| v.as_str())
            {
                check_metadata_fetch_feature(id, location, &mut issues);
            }
        }
    }

    if issues.is_empty() {
        return Ok(());
    }

    let details = issues
        .iter()
        .map(|(msg, _)| msg.as_str())
        .collect::<Vec<_>>()
        .join("\n  - ");
    let mut features = issues.iter().map(|(_, feat)| *feat).collect::<Vec<_>>();
    features.dedup();

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  \
         - {details}\n\n\
         Rebuild with: cargo build --features {}",
        features.join(",")
    )))
}

fn check_metadata_fetch_feature(_id: &str, _location: &str, _issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "native-http"))]
    if _location.starts_with("https://") {
        _issues.push((
            format!(
                "registration '{_id}' fetches metadata over HTTPS which requires the \
                 'native-http' feature"
            ),
            "native-http",
        ));
    }
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("env var pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{
        registration::{RelyingPartyRegistrationRepository, Saml2MessageBinding},
        tests::{default_idp_metadata, generate_test_certificate, idp_metadata_xml, pem_body},
    };

    const INLINE: &str = r#"
        [[registrations]]
        registration_id = "inline"

        [registrations.asserting_party]
        entity_id = "https://idp.example.com"
        single_sign_on_service_location = "https://idp.example.com/sso"
    "#;

    #[test]
    fn test_minimal_config() {
        let config = Saml2Config::from_str(INLINE).unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.metadata_fetch.timeout_secs, 10);
        assert_eq!(config.registrations.len(), 1);
        assert!(!config.registrations[0].asserting_party.has_metadata());
    }

    #[test]
    fn test_logging_and_bindings_parse() {
        let config = Saml2Config::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"
            filter = "reqwest=warn"

            [[registrations]]
            registration_id = "okta"
            assertion_consumer_service_binding = "redirect"
            single_logout_service_bindings = ["post", "redirect"]

            [registrations.asserting_party]
            metadata_file = "/etc/saml/okta.xml"
            single_sign_on_service_binding = "post"
        "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("reqwest=warn"));
        let registration = &config.registrations[0];
        assert_eq!(
            registration.assertion_consumer_service_binding,
            Some(Saml2MessageBinding::Redirect)
        );
        assert_eq!(
            registration.single_logout_service_bindings,
            [Saml2MessageBinding::Post, Saml2MessageBinding::Redirect]
        );
        assert!(registration.asserting_party.has_metadata());
    }

    #[test]
    fn test_rejects_empty_registrations() {
        let err = Saml2Config::from_str("[logging]\nlevel = \"info\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_duplicate_registration_ids() {
        let toml = format!("{INLINE}\n{INLINE}");
        let err = Saml2Config::from_str(&toml).unwrap_err();
        assert!(err.to_string().contains("duplicate registration_id 'inline'"));
    }

    #[test]
    fn test_rejects_two_metadata_sources() {
        let err = Saml2Config::from_str(
            r#"
            [[registrations]]
            registration_id = "okta"

            [registrations.asserting_party]
            metadata_location = "https://idp.example.com/metadata"
            metadata_file = "okta.xml"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn test_rejects_incomplete_inline_asserting_party() {
        let err = Saml2Config::from_str(
            r#"
            [[registrations]]
            registration_id = "okta"

            [registrations.asserting_party]
            entity_id = "https://idp.example.com"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("single_sign_on_service_location"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = Saml2Config::from_str(&format!("{INLINE}\nunknown = 1")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_SAML_IDP", Some("https://idp.env.example.com"), || {
            let result = expand_env_vars("entity_id = \"${TEST_SAML_IDP}\"").unwrap();
            assert_eq!(result, "entity_id = \"https://idp.env.example.com\"");
        });
    }

    #[test]
    fn test_env_var_missing() {
        temp_env::with_var_unset("TEST_SAML_MISSING", || {
            let err = expand_env_vars("key = \"${TEST_SAML_MISSING}\"").unwrap_err();
            assert!(
                matches!(err, ConfigError::EnvVarNotFound(name) if name == "TEST_SAML_MISSING")
            );
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# key = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# key = \"${NONEXISTENT_VAR}\"");

        let result = expand_env_vars("key = \"value\" # ${NONEXISTENT_VAR}").unwrap();
        assert_eq!(result, "key = \"value\" # ${NONEXISTENT_VAR}");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Saml2Config::from_file("/nonexistent/saml2.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[tokio::test]
    async fn test_load_inline_registration_with_credentials() {
        let (cert_pem, key_pem) = generate_test_certificate("sp.example.com");
        let (idp_cert_pem, _) = generate_test_certificate("idp.example.com");
        let mut cert_file = tempfile::NamedTempFile::new().unwrap();
        cert_file.write_all(cert_pem.as_bytes()).unwrap();

        let toml = r#"
            [[registrations]]
            registration_id = "inline"
            name_id_format = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress"
            signing_credentials = [
                { certificate = { file = "CERT_PATH" }, private_key = { pem = "${TEST_SAML_SP_KEY}" } },
            ]

            [registrations.asserting_party]
            entity_id = "https://idp.example.com"
            single_sign_on_service_location = "https://idp.example.com/sso"
            want_authn_requests_signed = false
            verification_certificates = [{ pem = "${TEST_SAML_IDP_CERT}" }]
        "#
        .replace("CERT_PATH", &cert_file.path().display().to_string());

        let config = temp_env::with_vars(
            [
                ("TEST_SAML_SP_KEY", Some(key_pem.replace('\n', "\\n"))),
                ("TEST_SAML_IDP_CERT", Some(idp_cert_pem.replace('\n', "\\n"))),
            ],
            || Saml2Config::from_str(&toml).unwrap(),
        );

        let repository = config.load_repository().await.unwrap();
        let registration = repository.find_by_registration_id("inline").unwrap();

        assert_eq!(registration.signing_x509_credentials().len(), 1);
        assert!(registration.signing_x509_credentials()[0].is_signing_credential());
        assert!(!registration.is_authn_requests_signed());
        assert_eq!(
            registration.name_id_format(),
            Some("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress")
        );
        let ap = registration.asserting_party_details();
        assert_eq!(ap.entity_id(), "https://idp.example.com");
        assert_eq!(ap.verification_x509_credentials().len(), 1);
        assert!(ap.entity_descriptor().is_none());
    }

    #[tokio::test]
    async fn test_load_metadata_file_registration_with_overrides() {
        let (cert_pem, _) = generate_test_certificate("idp.example.com");
        let xml = idp_metadata_xml(&default_idp_metadata(pem_body(&cert_pem)));
        let mut metadata_file = tempfile::NamedTempFile::new().unwrap();
        metadata_file.write_all(xml.as_bytes()).unwrap();

        let config = Saml2Config::from_str(&format!(
            r#"
            [[registrations]]
            registration_id = "okta"
            assertion_consumer_service_location = "https://sp.example.com/acs"

            [registrations.asserting_party]
            metadata_file = "{}"
            single_sign_on_service_location = "https://idp.example.com/sso/override"
        "#,
            metadata_file.path().display()
        ))
        .unwrap();

        let registrations = config.load_registrations().await.unwrap();
        assert_eq!(registrations.len(), 1);
        let registration = &registrations[0];

        assert_eq!(registration.registration_id(), "okta");
        assert_eq!(
            registration.assertion_consumer_service_location(),
            "https://sp.example.com/acs"
        );
        // Metadata asks for signed requests
        assert!(registration.is_authn_requests_signed());
        let ap = registration.asserting_party_details();
        assert_eq!(ap.entity_id(), "https://idp.example.com/metadata");
        assert_eq!(
            ap.single_sign_on_service_location(),
            "https://idp.example.com/sso/override"
        );
        assert_eq!(ap.verification_x509_credentials().len(), 1);
        assert!(ap.entity_descriptor().is_some());
    }

    #[tokio::test]
    async fn test_load_missing_metadata_file_fails() {
        let config = Saml2Config::from_str(
            r#"
            [[registrations]]
            registration_id = "okta"

            [registrations.asserting_party]
            metadata_file = "/nonexistent/okta.xml"
        "#,
        )
        .unwrap();

        let err = config.load_registrations().await.unwrap_err();
        assert!(matches!(err, Saml2Error::InvalidMetadata(_)));
    }
}
