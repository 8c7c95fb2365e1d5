//! Building registrations from asserting-party metadata documents.

use std::{path::Path, time::Duration};

use samael::metadata::EntityDescriptor;

use super::{OpenSamlRelyingPartyRegistration, OpenSamlRelyingPartyRegistrationBuilder};
use crate::{
    core::Saml2Error,
    validation::{UrlValidationOptions, validate_metadata_location},
};

/// How asserting-party metadata is fetched over HTTP.
#[derive(Debug, Clone)]
pub struct MetadataFetchOptions {
    pub timeout: Duration,
    /// Accept `http://` locations and loopback/private hosts. Development only.
    pub allow_insecure: bool,
}

impl Default for MetadataFetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            allow_insecure: false,
        }
    }
}

/// Entry points that turn metadata into registration builders.
pub struct RelyingPartyRegistrations;

impl RelyingPartyRegistrations {
    /// Parse an `EntityDescriptor` document and bind it to a new builder.
    pub fn from_metadata(
        xml: &str,
    ) -> Result<OpenSamlRelyingPartyRegistrationBuilder, Saml2Error> {
        let entity_descriptor: EntityDescriptor =
            samael::metadata::de::from_str(xml).map_err(|e| {
                tracing::error!(error = %e, "Failed to parse SAML metadata");
                Saml2Error::metadata(format!("Failed to parse metadata: {e}"))
            })?;
        OpenSamlRelyingPartyRegistration::with_asserting_party_entity_descriptor(entity_descriptor)
    }

    /// Read metadata from a local file.
    pub async fn from_metadata_file(
        path: impl AsRef<Path>,
    ) -> Result<OpenSamlRelyingPartyRegistrationBuilder, Saml2Error> {
        let path = path.as_ref();
        let xml = tokio::fs::read_to_string(path).await.map_err(|e| {
            Saml2Error::metadata(format!("Failed to read metadata file {}: {e}", path.display()))
        })?;
        Self::from_metadata(&xml)
    }

    /// Fetch metadata from `location` and bind it to a new builder.
    pub async fn from_metadata_location(
        location: &str,
        options: &MetadataFetchOptions,
    ) -> Result<OpenSamlRelyingPartyRegistrationBuilder, Saml2Error> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(metadata_redirect_policy(options))
            .build()
            .map_err(|e| fetch_error(location, e))?;
        Self::from_metadata_location_with_client(&client, location, options).await
    }

    /// Like [`from_metadata_location`](Self::from_metadata_location) with a
    /// caller-provided HTTP client.
    ///
    /// Only `location` itself is validated here. Build `client` with
    /// [`metadata_redirect_policy`] (or `Policy::none()`) so redirect targets
    /// are held to the same rules.
    pub async fn from_metadata_location_with_client(
        client: &reqwest::Client,
        location: &str,
        options: &MetadataFetchOptions,
    ) -> Result<OpenSamlRelyingPartyRegistrationBuilder, Saml2Error> {
        let url = validate_metadata_location(location, url_options(options))
            .map_err(|e| Saml2Error::Url(format!("metadata location {location}: {e}")))?;

        tracing::debug!(url = %url, "Fetching SAML asserting party metadata");

        let response = client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %location, "Failed to fetch SAML metadata");
                fetch_error(location, e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(
                status = %status,
                url = %location,
                "SAML metadata endpoint returned error"
            );
            return Err(fetch_error(location, format!("server returned {status}")));
        }

        let xml = response.text().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read SAML metadata response");
            fetch_error(location, e)
        })?;

        Self::from_metadata(&xml)
    }
}

/// A redirect policy that re-validates every hop like the initial location.
pub fn metadata_redirect_policy(options: &MetadataFetchOptions) -> reqwest::redirect::Policy {
    let opts = url_options(options);
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match validate_metadata_location(attempt.url().as_str(), opts) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                tracing::warn!(url = %attempt.url(), error = %e, "Refusing metadata redirect");
                attempt.error(e)
            }
        }
    })
}

const MAX_REDIRECTS: usize = 10;

fn url_options(options: &MetadataFetchOptions) -> UrlValidationOptions {
    UrlValidationOptions {
        allow_http: options.allow_insecure,
        allow_internal: options.allow_insecure,
    }
}

fn fetch_error(location: &str, message: impl ToString) -> Saml2Error {
    Saml2Error::MetadataFetch {
        location: location.to_string(),
        message: message.to_string(),
    }
}
