//! The relying party (service provider) registration.

use super::{AssertingPartyDetails, AssertingPartyDetailsBuilder, Saml2MessageBinding};
use crate::core::{Saml2Error, Saml2X509Credential};

/// Default entity id: the relying party's metadata endpoint.
pub const DEFAULT_ENTITY_ID_TEMPLATE: &str =
    "{baseUrl}/saml2/service-provider-metadata/{registrationId}";

/// Default assertion consumer service location.
pub const DEFAULT_ACS_LOCATION_TEMPLATE: &str = "{baseUrl}/login/saml2/sso/{registrationId}";

/// How a relying party is wired to a single asserting party.
///
/// Registrations are immutable; use [`mutate`](Self::mutate) to derive a
/// modified copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RelyingPartyRegistration {
    registration_id: String,
    entity_id: String,
    assertion_consumer_service_location: String,
    assertion_consumer_service_binding: Saml2MessageBinding,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_bindings: Vec<Saml2MessageBinding>,
    name_id_format: Option<String>,
    authn_requests_signed: bool,
    // What the caller asked for, before the asserting party's wish is applied
    authn_requests_signed_explicitly: bool,
    decryption_x509_credentials: Vec<Saml2X509Credential>,
    signing_x509_credentials: Vec<Saml2X509Credential>,
    asserting_party_details: AssertingPartyDetails,
}

impl RelyingPartyRegistration {
    /// Start a builder for `registration_id` with an empty asserting party.
    pub fn with_registration_id(
        registration_id: impl Into<String>,
    ) -> RelyingPartyRegistrationBuilder {
        RelyingPartyRegistrationBuilder::new(registration_id, AssertingPartyDetailsBuilder::new())
    }

    /// Start a builder whose asserting party is a copy of `details`. The
    /// registration id defaults to the asserting party's entity id.
    pub fn with_asserting_party_details(
        details: &AssertingPartyDetails,
    ) -> RelyingPartyRegistrationBuilder {
        RelyingPartyRegistrationBuilder::new(details.entity_id(), details.mutate())
    }

    /// A builder that rebuilds this registration; further calls override.
    pub fn mutate(&self) -> RelyingPartyRegistrationBuilder {
        RelyingPartyRegistrationBuilder {
            registration_id: self.registration_id.clone(),
            entity_id: self.entity_id.clone(),
            assertion_consumer_service_location: self.assertion_consumer_service_location.clone(),
            assertion_consumer_service_binding: self.assertion_consumer_service_binding,
            single_logout_service_location: self.single_logout_service_location.clone(),
            single_logout_service_response_location: self
                .single_logout_service_response_location
                .clone(),
            single_logout_service_bindings: self.single_logout_service_bindings.clone(),
            name_id_format: self.name_id_format.clone(),
            authn_requests_signed: self.authn_requests_signed_explicitly,
            decryption_x509_credentials: self.decryption_x509_credentials.clone(),
            signing_x509_credentials: self.signing_x509_credentials.clone(),
            asserting_party_details: self.asserting_party_details.mutate(),
        }
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn assertion_consumer_service_location(&self) -> &str {
        &self.assertion_consumer_service_location
    }

    pub fn assertion_consumer_service_binding(&self) -> Saml2MessageBinding {
        self.assertion_consumer_service_binding
    }

    pub fn single_logout_service_location(&self) -> Option<&str> {
        self.single_logout_service_location.as_deref()
    }

    pub fn single_logout_service_response_location(&self) -> Option<&str> {
        self.single_logout_service_response_location.as_deref()
    }

    pub fn single_logout_service_bindings(&self) -> &[Saml2MessageBinding] {
        &self.single_logout_service_bindings
    }

    pub fn name_id_format(&self) -> Option<&str> {
        self.name_id_format.as_deref()
    }

    /// Whether AuthnRequests are signed, either by choice or because the
    /// asserting party asks for it.
    pub fn is_authn_requests_signed(&self) -> bool {
        self.authn_requests_signed
    }

    pub fn decryption_x509_credentials(&self) -> &[Saml2X509Credential] {
        &self.decryption_x509_credentials
    }

    pub fn signing_x509_credentials(&self) -> &[Saml2X509Credential] {
        &self.signing_x509_credentials
    }

    pub fn asserting_party_details(&self) -> &AssertingPartyDetails {
        &self.asserting_party_details
    }
}

/// Builder for [`RelyingPartyRegistration`].
#[derive(Clone, Debug)]
pub struct RelyingPartyRegistrationBuilder {
    registration_id: String,
    entity_id: String,
    assertion_consumer_service_location: String,
    assertion_consumer_service_binding: Saml2MessageBinding,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_bindings: Vec<Saml2MessageBinding>,
    name_id_format: Option<String>,
    authn_requests_signed: bool,
    decryption_x509_credentials: Vec<Saml2X509Credential>,
    signing_x509_credentials: Vec<Saml2X509Credential>,
    asserting_party_details: AssertingPartyDetailsBuilder,
}

impl RelyingPartyRegistrationBuilder {
    pub(crate) fn new(
        registration_id: impl Into<String>,
        asserting_party_details: AssertingPartyDetailsBuilder,
    ) -> Self {
        Self {
            registration_id: registration_id.into(),
            entity_id: DEFAULT_ENTITY_ID_TEMPLATE.to_string(),
            assertion_consumer_service_location: DEFAULT_ACS_LOCATION_TEMPLATE.to_string(),
            assertion_consumer_service_binding: Saml2MessageBinding::Post,
            single_logout_service_location: None,
            single_logout_service_response_location: None,
            single_logout_service_bindings: vec![Saml2MessageBinding::Post],
            name_id_format: None,
            authn_requests_signed: false,
            decryption_x509_credentials: Vec::new(),
            signing_x509_credentials: Vec::new(),
            asserting_party_details,
        }
    }

    pub fn registration_id(mut self, registration_id: impl Into<String>) -> Self {
        self.registration_id = registration_id.into();
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = entity_id.into();
        self
    }

    pub fn signing_x509_credentials(
        mut self,
        f: impl FnOnce(&mut Vec<Saml2X509Credential>),
    ) -> Self {
        f(&mut self.signing_x509_credentials);
        self
    }

    pub fn decryption_x509_credentials(
        mut self,
        f: impl FnOnce(&mut Vec<Saml2X509Credential>),
    ) -> Self {
        f(&mut self.decryption_x509_credentials);
        self
    }

    pub fn assertion_consumer_service_location(mut self, location: impl Into<String>) -> Self {
        self.assertion_consumer_service_location = location.into();
        self
    }

    pub fn assertion_consumer_service_binding(mut self, binding: Saml2MessageBinding) -> Self {
        self.assertion_consumer_service_binding = binding;
        self
    }

    /// Replace the logout bindings with exactly `binding`.
    pub fn single_logout_service_binding(self, binding: Saml2MessageBinding) -> Self {
        self.single_logout_service_bindings(|bindings| {
            bindings.clear();
            bindings.push(binding);
        })
    }

    pub fn single_logout_service_bindings(
        mut self,
        f: impl FnOnce(&mut Vec<Saml2MessageBinding>),
    ) -> Self {
        f(&mut self.single_logout_service_bindings);
        self
    }

    pub fn single_logout_service_location(mut self, location: impl Into<String>) -> Self {
        self.single_logout_service_location = Some(location.into());
        self
    }

    pub fn single_logout_service_response_location(mut self, location: impl Into<String>) -> Self {
        self.single_logout_service_response_location = Some(location.into());
        self
    }

    pub fn name_id_format(mut self, name_id_format: impl Into<String>) -> Self {
        self.name_id_format = Some(name_id_format.into());
        self
    }

    pub fn authn_requests_signed(mut self, authn_requests_signed: bool) -> Self {
        self.authn_requests_signed = authn_requests_signed;
        self
    }

    /// Edit the nested asserting-party builder.
    pub fn asserting_party_details(
        mut self,
        f: impl FnOnce(AssertingPartyDetailsBuilder) -> AssertingPartyDetailsBuilder,
    ) -> Self {
        self.asserting_party_details = f(self.asserting_party_details);
        self
    }

    pub fn build(self) -> Result<RelyingPartyRegistration, Saml2Error> {
        if self.registration_id.is_empty() {
            return Err(Saml2Error::registration("registrationId cannot be empty"));
        }
        if self.entity_id.is_empty() {
            return Err(Saml2Error::registration("entityId cannot be empty"));
        }
        if self.assertion_consumer_service_location.is_empty() {
            return Err(Saml2Error::registration(
                "assertionConsumerServiceLocation cannot be empty",
            ));
        }
        if !self
            .signing_x509_credentials
            .iter()
            .all(Saml2X509Credential::is_signing_credential)
        {
            return Err(Saml2Error::registration(
                "All signingX509Credentials must have a usage of SIGNING set",
            ));
        }
        if !self
            .decryption_x509_credentials
            .iter()
            .all(Saml2X509Credential::is_decryption_credential)
        {
            return Err(Saml2Error::registration(
                "All decryptionX509Credentials must have a usage of DECRYPTION set",
            ));
        }

        let asserting_party_details = self.asserting_party_details.build()?;

        // Insertion-ordered set semantics
        let mut single_logout_service_bindings = Vec::new();
        for binding in self.single_logout_service_bindings {
            if !single_logout_service_bindings.contains(&binding) {
                single_logout_service_bindings.push(binding);
            }
        }
        if single_logout_service_bindings.is_empty() {
            single_logout_service_bindings.push(Saml2MessageBinding::Post);
        }

        let single_logout_service_response_location = self
            .single_logout_service_response_location
            .or_else(|| self.single_logout_service_location.clone());
        let authn_requests_signed =
            self.authn_requests_signed || asserting_party_details.want_authn_requests_signed();

        Ok(RelyingPartyRegistration {
            registration_id: self.registration_id,
            entity_id: self.entity_id,
            assertion_consumer_service_location: self.assertion_consumer_service_location,
            assertion_consumer_service_binding: self.assertion_consumer_service_binding,
            single_logout_service_location: self.single_logout_service_location,
            single_logout_service_response_location,
            single_logout_service_bindings,
            name_id_format: self.name_id_format,
            authn_requests_signed,
            authn_requests_signed_explicitly: self.authn_requests_signed,
            decryption_x509_credentials: self.decryption_x509_credentials,
            signing_x509_credentials: self.signing_x509_credentials,
            asserting_party_details,
        })
    }
}
