//! Shared fixtures for unit tests.

use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    hash::MessageDigest,
    pkey::PKey,
    rsa::Rsa,
    x509::{X509Builder, X509NameBuilder},
};

/// Generate a self-signed X.509 certificate and private key for testing.
///
/// Returns (certificate_pem, private_key_pem).
pub(crate) fn generate_test_certificate(common_name: &str) -> (String, String) {
    let rsa = Rsa::generate(2048).unwrap();
    let private_key = PKey::from_rsa(rsa).unwrap();

    let mut x509_name = X509NameBuilder::new().unwrap();
    x509_name.append_entry_by_text("CN", common_name).unwrap();
    let x509_name = x509_name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial_number = BigNum::from_u32(1).unwrap();
    builder
        .set_serial_number(&serial_number.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&x509_name).unwrap();
    builder.set_issuer_name(&x509_name).unwrap();
    builder.set_pubkey(&private_key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(&private_key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let cert_pem = String::from_utf8(cert.to_pem().unwrap()).unwrap();
    let key_pem = String::from_utf8(private_key.private_key_to_pem_pkcs8().unwrap()).unwrap();
    (cert_pem, key_pem)
}

/// Strip PEM armour, leaving the base64 body on one line.
pub(crate) fn pem_body(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----BEGIN") && !line.starts_with("-----END"))
        .collect::<Vec<_>>()
        .join("")
}

/// Options for [`idp_metadata_xml`].
pub(crate) struct IdpMetadata<'a> {
    pub entity_id: &'a str,
    pub want_authn_requests_signed: Option<bool>,
    /// (use attribute, base64 DER)
    pub keys: Vec<(Option<&'a str>, String)>,
    /// (binding URN, location)
    pub sso: Vec<(&'a str, &'a str)>,
    /// (binding URN, location, response location)
    pub slo: Vec<(&'a str, &'a str, Option<&'a str>)>,
}

/// A typical asserting-party metadata document with one signing key, POST and
/// Redirect SSO endpoints and a Redirect logout endpoint.
pub(crate) fn default_idp_metadata(cert_b64: String) -> IdpMetadata<'static> {
    IdpMetadata {
        entity_id: "https://idp.example.com/metadata",
        want_authn_requests_signed: Some(true),
        keys: vec![(Some("signing"), cert_b64)],
        sso: vec![
            (
                "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
                "https://idp.example.com/sso/post",
            ),
            (
                "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
                "https://idp.example.com/sso/redirect",
            ),
        ],
        slo: vec![(
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            "https://idp.example.com/slo",
            Some("https://idp.example.com/slo/response"),
        )],
    }
}

/// Render an `EntityDescriptor` with a single `IDPSSODescriptor`.
pub(crate) fn idp_metadata_xml(metadata: &IdpMetadata<'_>) -> String {
    let mut xml = format!(
        r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
    <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"{}>"#,
        metadata.entity_id,
        metadata
            .want_authn_requests_signed
            .map(|w| format!(r#" WantAuthnRequestsSigned="{w}""#))
            .unwrap_or_default()
    );
    for (key_use, cert) in &metadata.keys {
        xml.push_str(&format!(
            r#"
        <md:KeyDescriptor{}>
            <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
                <ds:X509Data>
                    <ds:X509Certificate>{}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>"#,
            key_use
                .map(|u| format!(r#" use="{u}""#))
                .unwrap_or_default(),
            cert
        ));
    }
    for (binding, location, response_location) in &metadata.slo {
        xml.push_str(&format!(
            r#"
        <md:SingleLogoutService Binding="{binding}" Location="{location}"{}/>"#,
            response_location
                .map(|r| format!(r#" ResponseLocation="{r}""#))
                .unwrap_or_default()
        ));
    }
    for (binding, location) in &metadata.sso {
        xml.push_str(&format!(
            r#"
        <md:SingleSignOnService Binding="{binding}" Location="{location}"/>"#
        ));
    }
    xml.push_str(
        r#"
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
    );
    xml
}

/// Parse metadata produced by [`idp_metadata_xml`].
pub(crate) fn idp_entity_descriptor(
    metadata: &IdpMetadata<'_>,
) -> samael::metadata::EntityDescriptor {
    samael::metadata::de::from_str(&idp_metadata_xml(metadata)).unwrap()
}
