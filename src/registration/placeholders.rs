//! Resolution of URI templates in relying-party locations.
//!
//! Registrations default their entity id and ACS location to templates such as
//! `{baseUrl}/login/saml2/sso/{registrationId}`, because the externally visible
//! base URL is often only known per request (behind proxies) or per deployment.
//!
//! | Placeholder        | Example for `https://sp.example.com:8443/app` |
//! |--------------------|-----------------------------------------------|
//! | `{baseUrl}`        | `https://sp.example.com:8443/app`             |
//! | `{baseScheme}`     | `https`                                       |
//! | `{baseHost}`       | `sp.example.com`                              |
//! | `{basePort}`       | `:8443` (empty for the scheme's default port) |
//! | `{basePath}`       | `/app`                                        |
//! | `{registrationId}` | the registration's id                         |

use super::{OpenSamlRelyingPartyRegistration, RelyingPartyRegistration};
use crate::core::Saml2Error;

/// Resolves placeholders against one base URL.
#[derive(Debug, Clone)]
pub struct PlaceholderResolver {
    base_url: String,
    base_scheme: String,
    base_host: String,
    base_port: String,
    base_path: String,
}

impl PlaceholderResolver {
    pub fn new(base_url: &str) -> Result<Self, Saml2Error> {
        let url = url::Url::parse(base_url)
            .map_err(|e| Saml2Error::Url(format!("base URL {base_url}: {e}")))?;
        let base_host = url
            .host_str()
            .ok_or_else(|| Saml2Error::Url(format!("base URL {base_url} has no host")))?
            .to_string();
        let base_scheme = url.scheme().to_string();
        let base_port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            base_url: format!("{base_scheme}://{base_host}{base_port}{base_path}"),
            base_scheme,
            base_host,
            base_port,
            base_path,
        })
    }

    /// Substitute every known placeholder in `template`. Unknown placeholders
    /// are left untouched.
    pub fn resolve(&self, template: &str, registration_id: &str) -> String {
        template
            .replace("{baseUrl}", &self.base_url)
            .replace("{baseScheme}", &self.base_scheme)
            .replace("{baseHost}", &self.base_host)
            .replace("{basePort}", &self.base_port)
            .replace("{basePath}", &self.base_path)
            .replace("{registrationId}", registration_id)
    }

    /// A copy of `registration` with its entity id, ACS location and logout
    /// locations resolved.
    pub fn resolve_registration(
        &self,
        registration: &RelyingPartyRegistration,
    ) -> Result<RelyingPartyRegistration, Saml2Error> {
        let id = registration.registration_id();
        let mut builder = registration
            .mutate()
            .entity_id(self.resolve(registration.entity_id(), id))
            .assertion_consumer_service_location(
                self.resolve(registration.assertion_consumer_service_location(), id),
            );
        if let Some(location) = registration.single_logout_service_location() {
            builder = builder.single_logout_service_location(self.resolve(location, id));
        }
        if let Some(location) = registration.single_logout_service_response_location() {
            builder = builder.single_logout_service_response_location(self.resolve(location, id));
        }
        builder.build()
    }

    /// As [`resolve_registration`](Self::resolve_registration), keeping the
    /// metadata binding.
    pub fn resolve_open_saml_registration(
        &self,
        registration: &OpenSamlRelyingPartyRegistration,
    ) -> Result<OpenSamlRelyingPartyRegistration, Saml2Error> {
        OpenSamlRelyingPartyRegistration::try_from(self.resolve_registration(registration)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::tests::{
        default_idp_metadata, generate_test_certificate, idp_entity_descriptor, pem_body,
    };

    fn registration() -> RelyingPartyRegistration {
        RelyingPartyRegistration::with_registration_id("okta")
            .single_logout_service_location("{baseUrl}/logout/saml2/slo")
            .asserting_party_details(|ap| {
                ap.entity_id("https://idp.example.com")
                    .single_sign_on_service_location("https://idp.example.com/sso")
            })
            .build()
            .unwrap()
    }

    #[rstest]
    #[case("https://sp.example.com", "https://sp.example.com")]
    #[case("https://sp.example.com/", "https://sp.example.com")]
    #[case("https://sp.example.com:443/", "https://sp.example.com")]
    #[case("http://localhost:8080/app/", "http://localhost:8080/app")]
    fn test_base_url_normalisation(#[case] base_url: &str, #[case] expected: &str) {
        let resolver = PlaceholderResolver::new(base_url).unwrap();
        assert_eq!(resolver.resolve("{baseUrl}", "id"), expected);
    }

    #[test]
    fn test_resolve_individual_parts() {
        let resolver = PlaceholderResolver::new("https://sp.example.com:8443/app").unwrap();
        assert_eq!(
            resolver.resolve(
                "{baseScheme}|{baseHost}|{basePort}|{basePath}|{registrationId}|{unknown}",
                "okta"
            ),
            "https|sp.example.com|:8443|/app|okta|{unknown}"
        );
    }

    #[test]
    fn test_rejects_base_url_without_host() {
        assert!(PlaceholderResolver::new("mailto:sp@example.com").is_err());
        assert!(PlaceholderResolver::new("not a url").is_err());
    }

    #[test]
    fn test_resolve_registration() {
        let resolver = PlaceholderResolver::new("https://sp.example.com").unwrap();
        let resolved = resolver.resolve_registration(&registration()).unwrap();

        assert_eq!(
            resolved.entity_id(),
            "https://sp.example.com/saml2/service-provider-metadata/okta"
        );
        assert_eq!(
            resolved.assertion_consumer_service_location(),
            "https://sp.example.com/login/saml2/sso/okta"
        );
        assert_eq!(
            resolved.single_logout_service_location(),
            Some("https://sp.example.com/logout/saml2/slo")
        );
        assert_eq!(
            resolved.single_logout_service_response_location(),
            Some("https://sp.example.com/logout/saml2/slo")
        );
        // Asserting party untouched
        assert_eq!(
            resolved.asserting_party_details(),
            registration().asserting_party_details()
        );
    }

    #[test]
    fn test_resolve_open_saml_registration_keeps_descriptor() {
        let (cert_pem, _) = generate_test_certificate("idp.example.com");
        let registration = OpenSamlRelyingPartyRegistration::with_asserting_party_entity_descriptor(
            idp_entity_descriptor(&default_idp_metadata(pem_body(&cert_pem))),
        )
        .unwrap()
        .registration_id("example")
        .build()
        .unwrap();

        let resolver = PlaceholderResolver::new("https://sp.example.com").unwrap();
        let resolved = resolver
            .resolve_open_saml_registration(&registration)
            .unwrap();

        assert_eq!(
            resolved.assertion_consumer_service_location(),
            "https://sp.example.com/login/saml2/sso/example"
        );
        assert!(std::sync::Arc::ptr_eq(
            resolved.entity_descriptor(),
            registration.entity_descriptor()
        ));
    }
}
