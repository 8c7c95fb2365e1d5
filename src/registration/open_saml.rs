//! Registrations bound to an asserting party's SAML metadata.
//!
//! An [`OpenSamlRelyingPartyRegistration`] is a [`RelyingPartyRegistration`]
//! whose asserting-party section was read from a `samael` [`EntityDescriptor`]
//! and still carries it, so callers that need metadata the generic details do
//! not model (organisation, contact people, extensions) can reach it.

use std::{fmt, ops::Deref, sync::Arc};

use samael::metadata::EntityDescriptor;

use super::{
    AssertingPartyDetails, AssertingPartyDetailsBuilder, RelyingPartyRegistration,
    RelyingPartyRegistrationBuilder, Saml2MessageBinding,
};
use crate::core::{Saml2Error, Saml2X509Credential};

/// A [`RelyingPartyRegistration`] with an attached asserting-party
/// [`EntityDescriptor`].
#[derive(Clone)]
pub struct OpenSamlRelyingPartyRegistration {
    registration: RelyingPartyRegistration,
    entity_descriptor: Arc<EntityDescriptor>,
}

impl OpenSamlRelyingPartyRegistration {
    /// Start a builder whose asserting party is populated from
    /// `entity_descriptor`. The registration id defaults to the descriptor's
    /// entity id.
    pub fn with_asserting_party_entity_descriptor(
        entity_descriptor: impl Into<Arc<EntityDescriptor>>,
    ) -> Result<OpenSamlRelyingPartyRegistrationBuilder, Saml2Error> {
        OpenSamlRelyingPartyRegistrationBuilder::new(entity_descriptor.into())
    }

    /// A builder seeded from the attached descriptor with every field of this
    /// registration applied on top; further calls override.
    pub fn mutate(&self) -> OpenSamlRelyingPartyRegistrationBuilder {
        OpenSamlRelyingPartyRegistrationBuilder {
            inner: self.registration.mutate(),
            entity_descriptor: Arc::clone(&self.entity_descriptor),
        }
    }

    /// The asserting party's metadata.
    pub fn entity_descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.entity_descriptor
    }

    pub fn asserting_party_details(&self) -> &AssertingPartyDetails {
        self.registration.asserting_party_details()
    }

    /// Drop the metadata binding and keep the generic registration.
    pub fn into_inner(self) -> RelyingPartyRegistration {
        self.registration
    }
}

impl TryFrom<RelyingPartyRegistration> for OpenSamlRelyingPartyRegistration {
    type Error = Saml2Error;

    fn try_from(registration: RelyingPartyRegistration) -> Result<Self, Self::Error> {
        let Some(entity_descriptor) = registration
            .asserting_party_details()
            .entity_descriptor()
            .cloned()
        else {
            return Err(Saml2Error::registration(format!(
                "registration '{}' has no asserting party entity descriptor",
                registration.registration_id()
            )));
        };
        Ok(Self {
            registration,
            entity_descriptor,
        })
    }
}

impl From<OpenSamlRelyingPartyRegistration> for RelyingPartyRegistration {
    fn from(registration: OpenSamlRelyingPartyRegistration) -> Self {
        registration.registration
    }
}

// The descriptor is part of the asserting-party details, which the inner
// registration already compares.
impl PartialEq for OpenSamlRelyingPartyRegistration {
    fn eq(&self, other: &Self) -> bool {
        self.registration == other.registration
    }
}

impl fmt::Debug for OpenSamlRelyingPartyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSamlRelyingPartyRegistration")
            .field("registration", &self.registration)
            .field("entity_descriptor", &self.entity_descriptor.entity_id)
            .finish()
    }
}

impl Deref for OpenSamlRelyingPartyRegistration {
    type Target = RelyingPartyRegistration;

    fn deref(&self) -> &Self::Target {
        &self.registration
    }
}

impl AsRef<RelyingPartyRegistration> for OpenSamlRelyingPartyRegistration {
    fn as_ref(&self) -> &RelyingPartyRegistration {
        &self.registration
    }
}

/// Builder for [`OpenSamlRelyingPartyRegistration`].
///
/// Mirrors [`RelyingPartyRegistrationBuilder`]; every setter returns this
/// builder so chains keep the metadata binding.
#[derive(Clone, Debug)]
pub struct OpenSamlRelyingPartyRegistrationBuilder {
    inner: RelyingPartyRegistrationBuilder,
    entity_descriptor: Arc<EntityDescriptor>,
}

impl OpenSamlRelyingPartyRegistrationBuilder {
    fn new(entity_descriptor: Arc<EntityDescriptor>) -> Result<Self, Saml2Error> {
        let asserting_party =
            AssertingPartyDetails::with_entity_descriptor(Arc::clone(&entity_descriptor))?;
        // with_entity_descriptor has already required a non-empty entityID
        let registration_id = entity_descriptor.entity_id.clone().unwrap_or_default();
        Ok(Self {
            inner: RelyingPartyRegistrationBuilder::new(registration_id, asserting_party),
            entity_descriptor,
        })
    }

    /// The descriptor this builder is bound to.
    pub fn entity_descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.entity_descriptor
    }

    pub fn registration_id(self, registration_id: impl Into<String>) -> Self {
        self.map(|b| b.registration_id(registration_id))
    }

    pub fn entity_id(self, entity_id: impl Into<String>) -> Self {
        self.map(|b| b.entity_id(entity_id))
    }

    pub fn signing_x509_credentials(self, f: impl FnOnce(&mut Vec<Saml2X509Credential>)) -> Self {
        self.map(|b| b.signing_x509_credentials(f))
    }

    pub fn decryption_x509_credentials(
        self,
        f: impl FnOnce(&mut Vec<Saml2X509Credential>),
    ) -> Self {
        self.map(|b| b.decryption_x509_credentials(f))
    }

    pub fn assertion_consumer_service_location(self, location: impl Into<String>) -> Self {
        self.map(|b| b.assertion_consumer_service_location(location))
    }

    pub fn assertion_consumer_service_binding(self, binding: Saml2MessageBinding) -> Self {
        self.map(|b| b.assertion_consumer_service_binding(binding))
    }

    /// Replace the logout bindings with exactly `binding`.
    pub fn single_logout_service_binding(self, binding: Saml2MessageBinding) -> Self {
        self.single_logout_service_bindings(|bindings| {
            bindings.clear();
            bindings.push(binding);
        })
    }

    pub fn single_logout_service_bindings(
        self,
        f: impl FnOnce(&mut Vec<Saml2MessageBinding>),
    ) -> Self {
        self.map(|b| b.single_logout_service_bindings(f))
    }

    pub fn single_logout_service_location(self, location: impl Into<String>) -> Self {
        self.map(|b| b.single_logout_service_location(location))
    }

    pub fn single_logout_service_response_location(self, location: impl Into<String>) -> Self {
        self.map(|b| b.single_logout_service_response_location(location))
    }

    pub fn name_id_format(self, name_id_format: impl Into<String>) -> Self {
        self.map(|b| b.name_id_format(name_id_format))
    }

    pub fn authn_requests_signed(self, authn_requests_signed: bool) -> Self {
        self.map(|b| b.authn_requests_signed(authn_requests_signed))
    }

    /// Edit the asserting-party builder that was populated from the descriptor.
    pub fn asserting_party_details(
        self,
        f: impl FnOnce(AssertingPartyDetailsBuilder) -> AssertingPartyDetailsBuilder,
    ) -> Self {
        self.map(|b| b.asserting_party_details(f))
    }

    pub fn build(self) -> Result<OpenSamlRelyingPartyRegistration, Saml2Error> {
        OpenSamlRelyingPartyRegistration::try_from(self.inner.build()?)
    }

    fn map(
        self,
        f: impl FnOnce(RelyingPartyRegistrationBuilder) -> RelyingPartyRegistrationBuilder,
    ) -> Self {
        Self {
            inner: f(self.inner),
            entity_descriptor: self.entity_descriptor,
        }
    }
}
