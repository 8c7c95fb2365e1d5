//! Immutable SAML 2.0 relying-party registrations.
//!
//! A registration pairs one relying party (this service) with one asserting
//! party (the identity provider). Registrations are assembled with builders,
//! validated once at build time, and never change afterwards; derive a modified
//! copy with `mutate()`.
//!
//! Registrations built from asserting-party metadata keep the parsed
//! `EntityDescriptor`, so callers can reach metadata the generic fields do not
//! model.

pub mod config;
pub mod core;
#[cfg(feature = "cli")]
pub mod observability;
pub mod registration;
pub mod validation;

#[cfg(test)]
mod tests;

pub use crate::{
    core::{Saml2Error, Saml2X509Credential, Saml2X509CredentialType},
    registration::{
        AssertingPartyDetails, OpenSamlRelyingPartyRegistration, RelyingPartyRegistration,
        RelyingPartyRegistrations,
    },
};
