//! Lookup of registrations by id or by asserting party.

use std::collections::HashMap;

use super::RelyingPartyRegistration;
use crate::core::Saml2Error;

/// A source of relying-party registrations.
pub trait RelyingPartyRegistrationRepository: Send + Sync {
    /// The registration with `registration_id`, if any.
    fn find_by_registration_id(&self, registration_id: &str) -> Option<&RelyingPartyRegistration>;

    /// All registrations, in registration order.
    fn iter(&self) -> Box<dyn Iterator<Item = &RelyingPartyRegistration> + '_>;

    /// The single registration trusting `entity_id`. `None` when no registration
    /// or more than one does, since the asserting party alone cannot then pick one.
    fn find_unique_by_asserting_party_entity_id(
        &self,
        entity_id: &str,
    ) -> Option<&RelyingPartyRegistration> {
        let mut matches = self
            .iter()
            .filter(|r| r.asserting_party_details().entity_id() == entity_id);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }
}

/// A fixed set of registrations held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRelyingPartyRegistrationRepository {
    registrations: Vec<RelyingPartyRegistration>,
    by_id: HashMap<String, usize>,
}

impl InMemoryRelyingPartyRegistrationRepository {
    pub fn new(
        registrations: impl IntoIterator<Item = impl Into<RelyingPartyRegistration>>,
    ) -> Result<Self, Saml2Error> {
        let registrations: Vec<RelyingPartyRegistration> =
            registrations.into_iter().map(Into::into).collect();
        if registrations.is_empty() {
            return Err(Saml2Error::registration("registrations cannot be empty"));
        }

        let mut by_id = HashMap::with_capacity(registrations.len());
        for (index, registration) in registrations.iter().enumerate() {
            let id = registration.registration_id().to_string();
            if by_id.insert(id, index).is_some() {
                return Err(Saml2Error::registration(format!(
                    "duplicate registrationId '{}'",
                    registration.registration_id()
                )));
            }
        }

        Ok(Self {
            registrations,
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl RelyingPartyRegistrationRepository for InMemoryRelyingPartyRegistrationRepository {
    fn find_by_registration_id(&self, registration_id: &str) -> Option<&RelyingPartyRegistration> {
        self.by_id
            .get(registration_id)
            .map(|&index| &self.registrations[index])
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &RelyingPartyRegistration> + '_> {
        Box::new(self.registrations.iter())
    }
}
