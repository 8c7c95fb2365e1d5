use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::core::Saml2Error;

pub const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";
pub const HTTP_REDIRECT_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";

/// The HTTP bindings a relying party can use to exchange SAML messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Saml2MessageBinding {
    Post,
    Redirect,
}

impl Saml2MessageBinding {
    /// The binding's URN as it appears in metadata `Binding` attributes.
    pub fn urn(self) -> &'static str {
        match self {
            Self::Post => HTTP_POST_BINDING,
            Self::Redirect => HTTP_REDIRECT_BINDING,
        }
    }

    /// Map a metadata `Binding` attribute to a binding, ignoring bindings
    /// (artifact, SOAP, PAOS) a browser-based relying party cannot use.
    pub fn from_urn(urn: &str) -> Option<Self> {
        match urn {
            HTTP_POST_BINDING => Some(Self::Post),
            HTTP_REDIRECT_BINDING => Some(Self::Redirect),
            _ => None,
        }
    }
}

impl FromStr for Saml2MessageBinding {
    type Err = Saml2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(binding) = Self::from_urn(s) {
            return Ok(binding);
        }
        match s.to_ascii_lowercase().as_str() {
            "post" | "http-post" => Ok(Self::Post),
            "redirect" | "http-redirect" => Ok(Self::Redirect),
            _ => Err(Saml2Error::UnknownBinding(s.to_string())),
        }
    }
}

impl fmt::Display for Saml2MessageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.urn())
    }
}
