//! Structural format checks for string fields
//!
//! Each check is a small pure function over the raw input string. None of
//! them perform I/O, resolve hosts, or consult clocks; a format check is a
//! shape test, nothing more.

use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use url::Url;
use uuid::Uuid;

use crate::field::StringFormat;

/// Checks a raw string against a declared format.
pub fn check_format(format: StringFormat, value: &str) -> bool {
    match format {
        StringFormat::Email => is_email(value),
        StringFormat::Url => Url::parse(value).is_ok(),
        StringFormat::Uuid => Uuid::parse_str(value).is_ok(),
        StringFormat::Ipv4 => value.parse::<Ipv4Addr>().is_ok(),
        StringFormat::Ipv6 => value.parse::<Ipv6Addr>().is_ok(),
        StringFormat::Base64 => !value.is_empty() && STANDARD.decode(value).is_ok(),
        StringFormat::Jwt => is_jwt(value),
        StringFormat::Slug => is_slug(value),
        StringFormat::HexColor => is_hex_color(value),
        StringFormat::Semver => is_semver(value),
    }
}

/// Structural email shape: one `@`, non-empty local part, dotted domain,
/// no whitespace. Deliverability is not this engine's concern.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    domain.contains('.') && !domain.contains("..")
}

/// Three dot-separated base64url segments, each non-empty and decodable.
fn is_jwt(value: &str) -> bool {
    let segments: Vec<&str> = value.split('.').collect();
    if segments.len() != 3 {
        return false;
    }
    segments
        .iter()
        .all(|segment| !segment.is_empty() && URL_SAFE_NO_PAD.decode(segment).is_ok())
}

/// Lowercase alphanumeric runs separated by single hyphens.
fn is_slug(value: &str) -> bool {
    if value.is_empty() || value.starts_with('-') || value.ends_with('-') {
        return false;
    }
    if value.contains("--") {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `#RGB` or `#RRGGBB`.
fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    (digits.len() == 3 || digits.len() == 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// `MAJOR.MINOR.PATCH` with optional `-prerelease` and `+build` parts.
fn is_semver(value: &str) -> bool {
    let (core, rest) = match value.find(['-', '+']) {
        Some(index) => value.split_at(index),
        None => (value, ""),
    };

    let mut numbers = core.split('.');
    let core_ok = (0..3).all(|_| {
        numbers
            .next()
            .is_some_and(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    }) && numbers.next().is_none();
    if !core_ok {
        return false;
    }

    if rest.is_empty() {
        return true;
    }

    // Split an optional build suffix off the prerelease part.
    let (pre, build) = if let Some(stripped) = rest.strip_prefix('+') {
        ("", stripped)
    } else if let Some(stripped) = rest.strip_prefix('-') {
        match stripped.split_once('+') {
            Some((pre, build)) => (pre, build),
            None => (stripped, ""),
        }
    } else {
        return false;
    };

    let ident_ok = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    let pre_ok = pre.is_empty() || pre.split('.').all(ident_ok);
    let build_ok = build.is_empty() || build.split('.').all(ident_ok);
    pre_ok && build_ok && (rest.starts_with('+') || !pre.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(check_format(StringFormat::Email, "alice@example.com"));
        assert!(check_format(StringFormat::Email, "a.b+tag@sub.example.org"));
        assert!(!check_format(StringFormat::Email, "alice"));
        assert!(!check_format(StringFormat::Email, "alice@"));
        assert!(!check_format(StringFormat::Email, "@example.com"));
        assert!(!check_format(StringFormat::Email, "alice@localhost"));
        assert!(!check_format(StringFormat::Email, "a lice@example.com"));
        assert!(!check_format(StringFormat::Email, "alice@ex..com"));
    }

    #[test]
    fn test_url_format() {
        assert!(check_format(StringFormat::Url, "https://example.com/path"));
        assert!(check_format(StringFormat::Url, "ftp://host"));
        assert!(!check_format(StringFormat::Url, "not a url"));
    }

    #[test]
    fn test_uuid_format() {
        assert!(check_format(
            StringFormat::Uuid,
            "550e8400-e29b-41d4-a716-446655440000"
        ));
        assert!(!check_format(StringFormat::Uuid, "550e8400"));
    }

    #[test]
    fn test_ip_formats() {
        assert!(check_format(StringFormat::Ipv4, "192.168.0.1"));
        assert!(!check_format(StringFormat::Ipv4, "192.168.0.256"));
        assert!(check_format(StringFormat::Ipv6, "::1"));
        assert!(check_format(StringFormat::Ipv6, "2001:db8::8a2e:370:7334"));
        assert!(!check_format(StringFormat::Ipv6, "192.168.0.1"));
    }

    #[test]
    fn test_base64_format() {
        assert!(check_format(StringFormat::Base64, "aGVsbG8="));
        assert!(!check_format(StringFormat::Base64, ""));
        assert!(!check_format(StringFormat::Base64, "not base64!"));
    }

    #[test]
    fn test_jwt_format() {
        // Header and payload are base64url("{}"), signature is arbitrary.
        assert!(check_format(StringFormat::Jwt, "e30.e30.c2ln"));
        assert!(!check_format(StringFormat::Jwt, "e30.e30"));
        assert!(!check_format(StringFormat::Jwt, "..sig"));
    }

    #[test]
    fn test_slug_format() {
        assert!(check_format(StringFormat::Slug, "my-first-post"));
        assert!(check_format(StringFormat::Slug, "post2"));
        assert!(!check_format(StringFormat::Slug, "My-Post"));
        assert!(!check_format(StringFormat::Slug, "-leading"));
        assert!(!check_format(StringFormat::Slug, "double--hyphen"));
        assert!(!check_format(StringFormat::Slug, ""));
    }

    #[test]
    fn test_hex_color_format() {
        assert!(check_format(StringFormat::HexColor, "#fff"));
        assert!(check_format(StringFormat::HexColor, "#00FF00"));
        assert!(!check_format(StringFormat::HexColor, "00FF00"));
        assert!(!check_format(StringFormat::HexColor, "#00FF0"));
        assert!(!check_format(StringFormat::HexColor, "#gggggg"));
    }

    #[test]
    fn test_semver_format() {
        assert!(check_format(StringFormat::Semver, "1.2.3"));
        assert!(check_format(StringFormat::Semver, "0.1.0-alpha.1"));
        assert!(check_format(StringFormat::Semver, "1.0.0+build.5"));
        assert!(check_format(StringFormat::Semver, "1.0.0-rc.1+build.5"));
        assert!(!check_format(StringFormat::Semver, "1.2"));
        assert!(!check_format(StringFormat::Semver, "1.2.x"));
        assert!(!check_format(StringFormat::Semver, "1.2.3-"));
    }
}
