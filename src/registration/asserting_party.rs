//! The asserting party (identity provider) half of a registration.

use std::{fmt, sync::Arc};

use samael::metadata::{EntityDescriptor, IdpSsoDescriptor};

use super::Saml2MessageBinding;
use crate::core::{Saml2Error, Saml2X509Credential};

/// `http://www.w3.org/2001/04/xmldsig-more#rsa-sha256`, the algorithm assumed
/// when an asserting party advertises none.
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

const SAML20_PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// Endpoints, bindings and credentials of the identity provider a relying
/// party trusts.
#[derive(Clone)]
pub struct AssertingPartyDetails {
    entity_id: String,
    want_authn_requests_signed: bool,
    signing_algorithms: Vec<String>,
    verification_x509_credentials: Vec<Saml2X509Credential>,
    encryption_x509_credentials: Vec<Saml2X509Credential>,
    single_sign_on_service_location: String,
    single_sign_on_service_binding: Saml2MessageBinding,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_binding: Saml2MessageBinding,
    entity_descriptor: Option<Arc<EntityDescriptor>>,
}

impl AssertingPartyDetails {
    /// Start an empty builder.
    pub fn builder() -> AssertingPartyDetailsBuilder {
        AssertingPartyDetailsBuilder::new()
    }

    /// Start a builder populated from the first SAML 2.0 `IDPSSODescriptor` of
    /// `entity_descriptor`. The descriptor stays attached to the built details.
    pub fn with_entity_descriptor(
        entity_descriptor: impl Into<Arc<EntityDescriptor>>,
    ) -> Result<AssertingPartyDetailsBuilder, Saml2Error> {
        let entity_descriptor = entity_descriptor.into();
        let entity_id = entity_descriptor
            .entity_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Saml2Error::metadata("Metadata is missing an entityID"))?;

        let idp = find_saml2_idp_descriptor(&entity_descriptor).ok_or_else(|| {
            Saml2Error::metadata(
                "Metadata is missing the IDPSSODescriptor element necessary for SAML 2.0",
            )
        })?;

        let mut verification = Vec::new();
        let mut encryption = Vec::new();
        for key_descriptor in &idp.key_descriptors {
            let Some(x509_data) = &key_descriptor.key_info.x509_data else {
                continue;
            };
            for certificate in &x509_data.certificates {
                let certificate = Saml2X509Credential::certificate_from_base64_der(certificate)?;
                match key_descriptor.key_use.as_deref() {
                    Some("signing") => {
                        verification.push(Saml2X509Credential::verification(certificate));
                    }
                    Some("encryption") => {
                        encryption.push(Saml2X509Credential::encryption(certificate));
                    }
                    // Unspecified use covers both
                    None => {
                        verification.push(Saml2X509Credential::verification(certificate.clone()));
                        encryption.push(Saml2X509Credential::encryption(certificate));
                    }
                    Some(other) => {
                        tracing::debug!(
                            key_use = %other,
                            "Ignoring KeyDescriptor with unknown use"
                        );
                    }
                }
            }
        }
        if verification.is_empty() {
            return Err(Saml2Error::metadata(
                "Metadata is missing verification certificates, necessary for verifying SAML assertions",
            ));
        }

        let sso = idp
            .single_sign_on_services
            .iter()
            .find_map(|endpoint| {
                Saml2MessageBinding::from_urn(&endpoint.binding).map(|b| (b, endpoint))
            })
            .ok_or_else(|| {
                Saml2Error::metadata(
                    "Metadata is missing a SingleSignOnService with an HTTP-POST or HTTP-Redirect binding",
                )
            })?;

        let mut builder = AssertingPartyDetailsBuilder::new()
            .entity_id(entity_id)
            .want_authn_requests_signed(idp.want_authn_requests_signed.unwrap_or(false))
            .verification_x509_credentials(|c| c.extend(verification))
            .encryption_x509_credentials(|c| c.extend(encryption))
            .single_sign_on_service_binding(sso.0)
            .single_sign_on_service_location(sso.1.location.clone());

        if let Some((binding, endpoint)) = idp.single_logout_services.iter().find_map(|endpoint| {
            Saml2MessageBinding::from_urn(&endpoint.binding).map(|b| (b, endpoint))
        }) {
            builder = builder
                .single_logout_service_binding(binding)
                .single_logout_service_location(endpoint.location.clone());
            if let Some(response_location) = &endpoint.response_location {
                builder = builder
                    .single_logout_service_response_location(response_location.clone());
            }
        }

        builder.entity_descriptor = Some(entity_descriptor);
        Ok(builder)
    }

    /// A builder that rebuilds these details; further calls override.
    pub fn mutate(&self) -> AssertingPartyDetailsBuilder {
        AssertingPartyDetailsBuilder {
            entity_id: Some(self.entity_id.clone()),
            want_authn_requests_signed: self.want_authn_requests_signed,
            signing_algorithms: self.signing_algorithms.clone(),
            verification_x509_credentials: self.verification_x509_credentials.clone(),
            encryption_x509_credentials: self.encryption_x509_credentials.clone(),
            single_sign_on_service_location: Some(self.single_sign_on_service_location.clone()),
            single_sign_on_service_binding: self.single_sign_on_service_binding,
            single_logout_service_location: self.single_logout_service_location.clone(),
            single_logout_service_response_location: self
                .single_logout_service_response_location
                .clone(),
            single_logout_service_binding: self.single_logout_service_binding,
            entity_descriptor: self.entity_descriptor.clone(),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn want_authn_requests_signed(&self) -> bool {
        self.want_authn_requests_signed
    }

    pub fn signing_algorithms(&self) -> &[String] {
        &self.signing_algorithms
    }

    pub fn verification_x509_credentials(&self) -> &[Saml2X509Credential] {
        &self.verification_x509_credentials
    }

    pub fn encryption_x509_credentials(&self) -> &[Saml2X509Credential] {
        &self.encryption_x509_credentials
    }

    pub fn single_sign_on_service_location(&self) -> &str {
        &self.single_sign_on_service_location
    }

    pub fn single_sign_on_service_binding(&self) -> Saml2MessageBinding {
        self.single_sign_on_service_binding
    }

    pub fn single_logout_service_location(&self) -> Option<&str> {
        self.single_logout_service_location.as_deref()
    }

    pub fn single_logout_service_response_location(&self) -> Option<&str> {
        self.single_logout_service_response_location.as_deref()
    }

    pub fn single_logout_service_binding(&self) -> Saml2MessageBinding {
        self.single_logout_service_binding
    }

    /// The metadata these details were read from, if any.
    pub fn entity_descriptor(&self) -> Option<&Arc<EntityDescriptor>> {
        self.entity_descriptor.as_ref()
    }
}

fn find_saml2_idp_descriptor(entity_descriptor: &EntityDescriptor) -> Option<&IdpSsoDescriptor> {
    entity_descriptor
        .idp_sso_descriptors
        .as_ref()?
        .iter()
        .find(|d| {
            d.protocol_support_enumeration
                .as_deref()
                .is_some_and(|p| p.split_whitespace().any(|p| p == SAML20_PROTOCOL))
        })
}

// Descriptors are compared by identity: two parses of the same document are
// distinct metadata snapshots.
impl PartialEq for AssertingPartyDetails {
    fn eq(&self, other: &Self) -> bool {
        let descriptors_match = match (&self.entity_descriptor, &other.entity_descriptor) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        descriptors_match
            && self.entity_id == other.entity_id
            && self.want_authn_requests_signed == other.want_authn_requests_signed
            && self.signing_algorithms == other.signing_algorithms
            && self.verification_x509_credentials == other.verification_x509_credentials
            && self.encryption_x509_credentials == other.encryption_x509_credentials
            && self.single_sign_on_service_location == other.single_sign_on_service_location
            && self.single_sign_on_service_binding == other.single_sign_on_service_binding
            && self.single_logout_service_location == other.single_logout_service_location
            && self.single_logout_service_response_location
                == other.single_logout_service_response_location
            && self.single_logout_service_binding == other.single_logout_service_binding
    }
}

impl fmt::Debug for AssertingPartyDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertingPartyDetails")
            .field("entity_id", &self.entity_id)
            .field("want_authn_requests_signed", &self.want_authn_requests_signed)
            .field("signing_algorithms", &self.signing_algorithms)
            .field(
                "verification_x509_credentials",
                &self.verification_x509_credentials,
            )
            .field(
                "encryption_x509_credentials",
                &self.encryption_x509_credentials,
            )
            .field(
                "single_sign_on_service_location",
                &self.single_sign_on_service_location,
            )
            .field(
                "single_sign_on_service_binding",
                &self.single_sign_on_service_binding,
            )
            .field(
                "single_logout_service_location",
                &self.single_logout_service_location,
            )
            .field(
                "single_logout_service_response_location",
                &self.single_logout_service_response_location,
            )
            .field(
                "single_logout_service_binding",
                &self.single_logout_service_binding,
            )
            .field("has_entity_descriptor", &self.entity_descriptor.is_some())
            .finish()
    }
}

/// Builder for [`AssertingPartyDetails`].
#[derive(Clone, Debug)]
pub struct AssertingPartyDetailsBuilder {
    entity_id: Option<String>,
    want_authn_requests_signed: bool,
    signing_algorithms: Vec<String>,
    verification_x509_credentials: Vec<Saml2X509Credential>,
    encryption_x509_credentials: Vec<Saml2X509Credential>,
    single_sign_on_service_location: Option<String>,
    single_sign_on_service_binding: Saml2MessageBinding,
    single_logout_service_location: Option<String>,
    single_logout_service_response_location: Option<String>,
    single_logout_service_binding: Saml2MessageBinding,
    entity_descriptor: Option<Arc<EntityDescriptor>>,
}

impl Default for AssertingPartyDetailsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertingPartyDetailsBuilder {
    pub fn new() -> Self {
        Self {
            entity_id: None,
            want_authn_requests_signed: true,
            signing_algorithms: Vec::new(),
            verification_x509_credentials: Vec::new(),
            encryption_x509_credentials: Vec::new(),
            single_sign_on_service_location: None,
            single_sign_on_service_binding: Saml2MessageBinding::Redirect,
            single_logout_service_location: None,
            single_logout_service_response_location: None,
            single_logout_service_binding: Saml2MessageBinding::Redirect,
            entity_descriptor: None,
        }
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn want_authn_requests_signed(mut self, want_authn_requests_signed: bool) -> Self {
        self.want_authn_requests_signed = want_authn_requests_signed;
        self
    }

    pub fn signing_algorithms(mut self, f: impl FnOnce(&mut Vec<String>)) -> Self {
        f(&mut self.signing_algorithms);
        self
    }

    pub fn verification_x509_credentials(
        mut self,
        f: impl FnOnce(&mut Vec<Saml2X509Credential>),
    ) -> Self {
        f(&mut self.verification_x509_credentials);
        self
    }

    pub fn encryption_x509_credentials(
        mut self,
        f: impl FnOnce(&mut Vec<Saml2X509Credential>),
    ) -> Self {
        f(&mut self.encryption_x509_credentials);
        self
    }

    pub fn single_sign_on_service_location(mut self, location: impl Into<String>) -> Self {
        self.single_sign_on_service_location = Some(location.into());
        self
    }

    pub fn single_sign_on_service_binding(mut self, binding: Saml2MessageBinding) -> Self {
        self.single_sign_on_service_binding = binding;
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

    pub fn single_logout_service_binding(mut self, binding: Saml2MessageBinding) -> Self {
        self.single_logout_service_binding = binding;
        self
    }

    pub fn build(self) -> Result<AssertingPartyDetails, Saml2Error> {
        let entity_id = self
            .entity_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Saml2Error::registration("assertingParty entityId cannot be empty"))?;
        let single_sign_on_service_location = self
            .single_sign_on_service_location
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                Saml2Error::registration(
                    "assertingParty singleSignOnServiceLocation cannot be empty",
                )
            })?;

        if !self
            .verification_x509_credentials
            .iter()
            .all(Saml2X509Credential::is_verification_credential)
        {
            return Err(Saml2Error::registration(
                "All verificationX509Credentials must have a usage of VERIFICATION set",
            ));
        }
        if !self
            .encryption_x509_credentials
            .iter()
            .all(Saml2X509Credential::is_encryption_credential)
        {
            return Err(Saml2Error::registration(
                "All encryptionX509Credentials must have a usage of ENCRYPTION set",
            ));
        }

        let signing_algorithms = if self.signing_algorithms.is_empty() {
            vec![RSA_SHA256.to_string()]
        } else {
            self.signing_algorithms
        };
        let single_logout_service_response_location = self
            .single_logout_service_response_location
            .or_else(|| self.single_logout_service_location.clone());

        Ok(AssertingPartyDetails {
            entity_id,
            want_authn_requests_signed: self.want_authn_requests_signed,
            signing_algorithms,
            verification_x509_credentials: self.verification_x509_credentials,
            encryption_x509_credentials: self.encryption_x509_credentials,
            single_sign_on_service_location,
            single_sign_on_service_binding: self.single_sign_on_service_binding,
            single_logout_service_location: self.single_logout_service_location,
            single_logout_service_response_location,
            single_logout_service_binding: self.single_logout_service_binding,
            entity_descriptor: self.entity_descriptor,
        })
    }
}
