//! X.509 credentials used by relying parties and asserting parties.
//!
//! A credential pairs a certificate with an optional private key and records
//! what it may be used for. Certificate-only usages (verification, encryption)
//! describe the *other* party's keys; key-bearing usages (signing, decryption)
//! describe our own.

use std::{collections::BTreeSet, fmt};

use base64::{Engine, engine::general_purpose::STANDARD};
use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};

use super::Saml2Error;

/// The purposes a [`Saml2X509Credential`] may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Saml2X509CredentialType {
    /// Verify signatures made by the other party.
    Verification,
    /// Encrypt data for the other party.
    Encryption,
    /// Sign our own messages.
    Signing,
    /// Decrypt data encrypted for us.
    Decryption,
}

impl Saml2X509CredentialType {
    fn requires_private_key(self) -> bool {
        matches!(self, Self::Signing | Self::Decryption)
    }
}

/// An X.509 certificate, optionally with its private key, tagged with usages.
#[derive(Clone)]
pub struct Saml2X509Credential {
    private_key: Option<PKey<Private>>,
    certificate: X509,
    credential_types: BTreeSet<Saml2X509CredentialType>,
}

impl Saml2X509Credential {
    /// Create a credential, checking that the key and usages are consistent.
    pub fn new(
        private_key: Option<PKey<Private>>,
        certificate: X509,
        types: impl IntoIterator<Item = Saml2X509CredentialType>,
    ) -> Result<Self, Saml2Error> {
        let credential_types: BTreeSet<_> = types.into_iter().collect();
        if credential_types.is_empty() {
            return Err(Saml2Error::InvalidCredential(
                "credential types cannot be empty".to_string(),
            ));
        }

        let key_bearing = credential_types
            .iter()
            .filter(|t| t.requires_private_key())
            .count();
        if key_bearing > 0 && key_bearing != credential_types.len() {
            return Err(Saml2Error::InvalidCredential(
                "signing and decryption usages cannot be combined with verification or encryption"
                    .to_string(),
            ));
        }
        if key_bearing > 0 && private_key.is_none() {
            return Err(Saml2Error::InvalidCredential(
                "signing and decryption credentials require a private key".to_string(),
            ));
        }

        Ok(Self {
            private_key,
            certificate,
            credential_types,
        })
    }

    /// A certificate used to verify the asserting party's signatures.
    pub fn verification(certificate: X509) -> Self {
        Self::single(None, certificate, Saml2X509CredentialType::Verification)
    }

    /// A certificate used to encrypt data for the asserting party.
    pub fn encryption(certificate: X509) -> Self {
        Self::single(None, certificate, Saml2X509CredentialType::Encryption)
    }

    /// A key pair used to sign relying-party messages.
    pub fn signing(private_key: PKey<Private>, certificate: X509) -> Self {
        Self::single(
            Some(private_key),
            certificate,
            Saml2X509CredentialType::Signing,
        )
    }

    /// A key pair used to decrypt assertions sent to the relying party.
    pub fn decryption(private_key: PKey<Private>, certificate: X509) -> Self {
        Self::single(
            Some(private_key),
            certificate,
            Saml2X509CredentialType::Decryption,
        )
    }

    fn single(
        private_key: Option<PKey<Private>>,
        certificate: X509,
        credential_type: Saml2X509CredentialType,
    ) -> Self {
        Self {
            private_key,
            certificate,
            credential_types: BTreeSet::from([credential_type]),
        }
    }

    /// Load a credential from a PEM certificate and an optional PEM private key
    /// (PKCS#8 or PKCS#1).
    pub fn from_pem(
        certificate_pem: &str,
        private_key_pem: Option<&str>,
        types: impl IntoIterator<Item = Saml2X509CredentialType>,
    ) -> Result<Self, Saml2Error> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())?;
        let private_key = private_key_pem
            .map(|pem| PKey::private_key_from_pem(pem.as_bytes()))
            .transpose()?;
        Self::new(private_key, certificate, types)
    }

    /// Parse the base64 DER body of a `<ds:X509Certificate>` element.
    ///
    /// Metadata documents commonly wrap the value across lines, so all
    /// whitespace is ignored.
    pub fn certificate_from_base64_der(value: &str) -> Result<X509, Saml2Error> {
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD.decode(compact).map_err(|e| {
            Saml2Error::InvalidCredential(format!("certificate is not valid base64: {e}"))
        })?;
        Ok(X509::from_der(&der)?)
    }

    pub fn private_key(&self) -> Option<&PKey<Private>> {
        self.private_key.as_ref()
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn credential_types(&self) -> &BTreeSet<Saml2X509CredentialType> {
        &self.credential_types
    }

    /// Base64 DER of the certificate, as embedded in metadata.
    pub fn certificate_base64(&self) -> Result<String, Saml2Error> {
        Ok(STANDARD.encode(self.certificate.to_der()?))
    }

    pub fn is_verification_credential(&self) -> bool {
        self.has(Saml2X509CredentialType::Verification)
    }

    pub fn is_encryption_credential(&self) -> bool {
        self.has(Saml2X509CredentialType::Encryption)
    }

    pub fn is_signing_credential(&self) -> bool {
        self.has(Saml2X509CredentialType::Signing)
    }

    pub fn is_decryption_credential(&self) -> bool {
        self.has(Saml2X509CredentialType::Decryption)
    }

    fn has(&self, credential_type: Saml2X509CredentialType) -> bool {
        self.credential_types.contains(&credential_type)
    }
}

impl PartialEq for Saml2X509Credential {
    fn eq(&self, other: &Self) -> bool {
        let keys_match = match (&self.private_key, &other.private_key) {
            (None, None) => true,
            (Some(a), Some(b)) => a.public_eq(b),
            _ => false,
        };
        let certs_match = match (self.certificate.to_der(), other.certificate.to_der()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        keys_match && certs_match && self.credential_types == other.credential_types
    }
}

impl fmt::Debug for Saml2X509Credential {
    // Never print key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = self
            .certificate
            .subject_name()
            .entries()
            .filter_map(|e| e.data().as_utf8().ok().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        f.debug_struct("Saml2X509Credential")
            .field("subject", &subject)
            .field("has_private_key", &self.private_key.is_some())
            .field("credential_types", &self.credential_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::generate_test_certificate;

    fn key_and_cert() -> (PKey<Private>, X509) {
        let (cert_pem, key_pem) = generate_test_certificate("sp.example.com");
        (
            PKey::private_key_from_pem(key_pem.as_bytes()).unwrap(),
            X509::from_pem(cert_pem.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_factory_constructors_set_single_usage() {
        let (key, cert) = key_and_cert();

        let signing = Saml2X509Credential::signing(key.clone(), cert.clone());
        assert!(signing.is_signing_credential());
        assert!(!signing.is_decryption_credential());
        assert!(signing.private_key().is_some());

        let verification = Saml2X509Credential::verification(cert);
        assert!(verification.is_verification_credential());
        assert!(!verification.is_encryption_credential());
        assert!(verification.private_key().is_none());
    }

    #[test]
    fn test_new_rejects_empty_types() {
        let (_, cert) = key_and_cert();
        let result = Saml2X509Credential::new(None, cert, []);
        assert!(matches!(result, Err(Saml2Error::InvalidCredential(_))));
    }

    #[test]
    fn test_new_rejects_signing_without_key() {
        let (_, cert) = key_and_cert();
        let err = Saml2X509Credential::new(None, cert, [Saml2X509CredentialType::Signing])
            .unwrap_err();
        assert!(err.to_string().contains("require a private key"));
    }

    #[test]
    fn test_new_rejects_mixed_usages() {
        let (key, cert) = key_and_cert();
        let err = Saml2X509Credential::new(
            Some(key),
            cert,
            [
                Saml2X509CredentialType::Signing,
                Saml2X509CredentialType::Verification,
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_new_allows_signing_and_decryption_together() {
        let (key, cert) = key_and_cert();
        let credential = Saml2X509Credential::new(
            Some(key),
            cert,
            [
                Saml2X509CredentialType::Signing,
                Saml2X509CredentialType::Decryption,
            ],
        )
        .unwrap();
        assert!(credential.is_signing_credential());
        assert!(credential.is_decryption_credential());
    }

    #[test]
    fn test_from_pem() {
        let (cert_pem, key_pem) = generate_test_certificate("sp.example.com");
        let credential = Saml2X509Credential::from_pem(
            &cert_pem,
            Some(&key_pem),
            [Saml2X509CredentialType::Decryption],
        )
        .unwrap();
        assert!(credential.is_decryption_credential());

        let err = Saml2X509Credential::from_pem("not a certificate", None, [
            Saml2X509CredentialType::Verification,
        ])
        .unwrap_err();
        assert!(matches!(err, Saml2Error::Crypto(_)));
    }

    #[test]
    fn test_certificate_base64_round_trips_through_metadata_form() {
        let (_, cert) = key_and_cert();
        let credential = Saml2X509Credential::verification(cert);
        let encoded = credential.certificate_base64().unwrap();

        // Metadata often wraps certificates over several lines
        let wrapped = encoded
            .as_bytes()
            .chunks(64)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n    ");
        let parsed = Saml2X509Credential::certificate_from_base64_der(&wrapped).unwrap();
        assert_eq!(
            Saml2X509Credential::verification(parsed),
            credential
        );
    }

    #[test]
    fn test_certificate_from_invalid_base64() {
        let err = Saml2X509Credential::certificate_from_base64_der("!!!").unwrap_err();
        assert!(err.to_string().contains("not valid base64"));
    }

    #[test]
    fn test_equality_considers_usage_and_key() {
        let (key, cert) = key_and_cert();
        let signing = Saml2X509Credential::signing(key.clone(), cert.clone());
        let decryption = Saml2X509Credential::decryption(key, cert.clone());
        let verification = Saml2X509Credential::verification(cert);

        assert_eq!(signing, signing.clone());
        assert_ne!(signing, decryption);
        assert_ne!(signing, verification);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let (key, cert) = key_and_cert();
        let debug = format!("{:?}", Saml2X509Credential::signing(key, cert));
        assert!(debug.contains("sp.example.com"));
        assert!(debug.contains("has_private_key: true"));
        assert!(!debug.contains("PRIVATE KEY"));
    }
}
