//! Relying-party registrations.
//!
//! A [`RelyingPartyRegistration`] describes one relying party / asserting party
//! pairing. Registrations read from asserting-party metadata are
//! [`OpenSamlRelyingPartyRegistration`]s, which keep the parsed
//! `EntityDescriptor` alongside the generic fields.
//!
//! ```rust,ignore
//! let registration = RelyingPartyRegistrations::from_metadata(&xml)?
//!     .registration_id("okta")
//!     .signing_x509_credentials(|c| c.push(signing))
//!     .build()?;
//!
//! let resolved = PlaceholderResolver::new("https://sp.example.com")?
//!     .resolve_open_saml_registration(&registration)?;
//! ```

mod asserting_party;
mod binding;
mod metadata;
mod open_saml;
mod placeholders;
mod relying_party;
mod repository;
mod sp_metadata;

pub use asserting_party::{AssertingPartyDetails, AssertingPartyDetailsBuilder, RSA_SHA256};
pub use binding::{HTTP_POST_BINDING, HTTP_REDIRECT_BINDING, Saml2MessageBinding};
pub use metadata::{MetadataFetchOptions, RelyingPartyRegistrations, metadata_redirect_policy};
pub use open_saml::{OpenSamlRelyingPartyRegistration, OpenSamlRelyingPartyRegistrationBuilder};
pub use placeholders::PlaceholderResolver;
pub use relying_party::{
    DEFAULT_ACS_LOCATION_TEMPLATE, DEFAULT_ENTITY_ID_TEMPLATE, RelyingPartyRegistration,
    RelyingPartyRegistrationBuilder,
};
pub use repository::{
    InMemoryRelyingPartyRegistrationRepository, RelyingPartyRegistrationRepository,
};
pub use sp_metadata::generate_sp_metadata;
