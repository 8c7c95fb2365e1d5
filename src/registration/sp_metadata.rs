//! SAML 2.0 metadata describing the relying party.
//!
//! Asserting parties import this document to learn where to send responses and
//! which certificates to trust for signed requests and encrypted assertions.

use super::RelyingPartyRegistration;
use crate::core::{Saml2Error, Saml2X509Credential};

/// Render an `EntityDescriptor` with one `SPSSODescriptor` for `registration`.
///
/// Locations are emitted as-is; resolve placeholders first.
pub fn generate_sp_metadata(registration: &RelyingPartyRegistration) -> Result<String, Saml2Error> {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
  <md:SPSSODescriptor AuthnRequestsSigned="{}" WantAssertionsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">"#,
        escape(registration.entity_id()),
        registration.is_authn_requests_signed()
    );

    for credential in registration.signing_x509_credentials() {
        push_key_descriptor(&mut xml, "signing", credential)?;
    }
    for credential in registration.decryption_x509_credentials() {
        push_key_descriptor(&mut xml, "encryption", credential)?;
    }

    if let Some(location) = registration.single_logout_service_location() {
        let response_location = registration
            .single_logout_service_response_location()
            .unwrap_or(location);
        for binding in registration.single_logout_service_bindings() {
            xml.push_str(&format!(
                r#"
    <md:SingleLogoutService Binding="{}" Location="{}" ResponseLocation="{}"/>"#,
                binding.urn(),
                escape(location),
                escape(response_location)
            ));
        }
    }

    if let Some(name_id_format) = registration.name_id_format() {
        xml.push_str(&format!(
            r#"
    <md:NameIDFormat>{}</md:NameIDFormat>"#,
            escape(name_id_format)
        ));
    }

    xml.push_str(&format!(
        r#"
    <md:AssertionConsumerService Binding="{}" Location="{}" index="1"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#,
        registration.assertion_consumer_service_binding().urn(),
        escape(registration.assertion_consumer_service_location())
    ));

    Ok(xml)
}

fn push_key_descriptor(
    xml: &mut String,
    key_use: &str,
    credential: &Saml2X509Credential,
) -> Result<(), Saml2Error> {
    xml.push_str(&format!(
        r#"
    <md:KeyDescriptor use="{}">
      <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
        <ds:X509Data>
          <ds:X509Certificate>{}</ds:X509Certificate>
        </ds:X509Data>
      </ds:KeyInfo>
    </md:KeyDescriptor>"#,
        key_use,
        credential.certificate_base64()?
    ));
    Ok(())
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
