//! Metadata location validation.
//!
//! Asserting-party metadata carries the certificates used to trust assertions,
//! so it must come over TLS, and the fetcher must not be steerable towards
//! internal services by a configured URL.

use std::net::IpAddr;

/// Errors from URL validation.
#[derive(Debug, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL scheme must be https")]
    InsecureScheme,

    #[error("URL scheme must be http or https")]
    InvalidScheme,

    #[error("URL must include a hostname")]
    MissingHost,

    #[error("URL points at a blocked address")]
    BlockedAddress,
}

/// Relaxations for development and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlValidationOptions {
    /// Accept plain `http://` locations.
    pub allow_http: bool,
    /// Accept loopback and private literal IP hosts.
    pub allow_internal: bool,
}

/// Check a metadata location before fetching it.
///
/// Only literal IP hosts are screened; names are resolved by the HTTP client.
pub fn validate_metadata_location(
    location: &str,
    opts: UrlValidationOptions,
) -> Result<url::Url, UrlValidationError> {
    let parsed =
        url::Url::parse(location).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "https" => {}
        "http" if opts.allow_http => {}
        "http" => return Err(UrlValidationError::InsecureScheme),
        _ => return Err(UrlValidationError::InvalidScheme),
    }

    let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;
    let ip = match host {
        url::Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
        url::Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
        url::Host::Domain(name) if name.eq_ignore_ascii_case("localhost") => {
            if opts.allow_internal {
                None
            } else {
                return Err(UrlValidationError::BlockedAddress);
            }
        }
        url::Host::Domain(_) => None,
    };
    if let Some(ip) = ip
        && is_blocked_ip(ip, opts)
    {
        return Err(UrlValidationError::BlockedAddress);
    }

    Ok(parsed)
}

fn is_blocked_ip(ip: IpAddr, opts: UrlValidationOptions) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            // Cloud instance metadata is never a legitimate SAML metadata host
            if v4.octets() == [169, 254, 169, 254] {
                return true;
            }
            if v4.is_unspecified() || v4.is_broadcast() {
                return true;
            }
            let internal = v4.is_loopback() || v4.is_private() || v4.is_link_local();
            internal && !opts.allow_internal
        }
        IpAddr::V6(v6) => {
            if v6.is_unspecified() {
                return true;
            }
            // ::ffff:a.b.c.d reaches the embedded IPv4 host
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_blocked_ip(IpAddr::V4(v4), opts);
            }
            let segments = v6.segments();
            let unique_local = (segments[0] & 0xfe00) == 0xfc00;
            let link_local = (segments[0] & 0xffc0) == 0xfe80;
            let internal = v6.is_loopback() || unique_local || link_local;
            internal && !opts.allow_internal
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_accepts_https() {
        let url = validate_metadata_location(
            "https://idp.example.com/metadata",
            UrlValidationOptions::default(),
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("idp.example.com"));
    }

    #[test]
    fn test_rejects_http_by_default() {
        assert!(matches!(
            validate_metadata_location("http://idp.example.com/metadata", Default::default()),
            Err(UrlValidationError::InsecureScheme)
        ));
    }

    #[test]
    fn test_rejects_other_schemes_even_when_http_allowed() {
        let opts = UrlValidationOptions {
            allow_http: true,
            allow_internal: true,
        };
        assert!(matches!(
            validate_metadata_location("file:///etc/passwd", opts),
            Err(UrlValidationError::InvalidScheme)
        ));
    }

    #[rstest]
    #[case("https://127.0.0.1/metadata")]
    #[case("https://10.1.2.3/metadata")]
    #[case("https://192.168.0.10/metadata")]
    #[case("https://localhost/metadata")]
    #[case("https://[::1]/metadata")]
    #[case("https://[fd00::1]/metadata")]
    #[case("https://[::ffff:127.0.0.1]/metadata")]
    #[case("https://[::ffff:10.0.0.1]/metadata")]
    #[case("https://[::ffff:169.254.169.254]/metadata")]
    fn test_rejects_internal_hosts(#[case] location: &str) {
        assert!(matches!(
            validate_metadata_location(location, Default::default()),
            Err(UrlValidationError::BlockedAddress)
        ));
    }

    #[test]
    fn test_allows_internal_hosts_when_enabled() {
        let opts = UrlValidationOptions {
            allow_http: true,
            allow_internal: true,
        };
        assert!(validate_metadata_location("http://127.0.0.1:8080/metadata", opts).is_ok());
    }

    #[test]
    fn test_always_rejects_instance_metadata() {
        let opts = UrlValidationOptions {
            allow_http: true,
            allow_internal: true,
        };
        assert!(matches!(
            validate_metadata_location("http://169.254.169.254/latest", opts),
            Err(UrlValidationError::BlockedAddress)
        ));
    }

    #[test]
    fn test_always_rejects_mapped_instance_metadata() {
        let opts = UrlValidationOptions {
            allow_http: true,
            allow_internal: true,
        };
        assert!(matches!(
            validate_metadata_location("http://[::ffff:169.254.169.254]/latest", opts),
            Err(UrlValidationError::BlockedAddress)
        ));
        assert!(validate_metadata_location("http://[::ffff:127.0.0.1]/metadata", opts).is_ok());
    }

    #[test]
    fn test_rejects_unparseable_url() {
        assert!(matches!(
            validate_metadata_location("not a url", Default::default()),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
