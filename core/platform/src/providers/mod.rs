//! Concrete storage providers.

mod aws_s3;
mod backblaze_b2;
mod cloudflare_r2;
mod digitalocean_spaces;

pub use aws_s3::AwsS3;
pub use backblaze_b2::BackblazeB2;
pub use cloudflare_r2::CloudflareR2;
pub use digitalocean_spaces::DigitalOceanSpaces;

use url::Url;

/// Host part of a URL, empty when it does not parse.
pub(crate) fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// Whether `host` is `domain` or one of its sub-domains.
pub(crate) fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Strip the first matching prefix.
pub(crate) fn strip_any<'a>(url: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| url.strip_prefix(p.as_str()))
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_helpers() {
        assert_eq!(host_of("https://Media.S3.amazonaws.com/a"), "media.s3.amazonaws.com");
        assert_eq!(host_of("not a url"), "");
        assert!(host_matches("media.s3.amazonaws.com", "amazonaws.com"));
        assert!(!host_matches("evilamazonaws.com", "amazonaws.com"));
    }

    #[test]
    fn test_strip_any() {
        let prefixes = vec![String::new(), "https://a/".to_string(), "x://".to_string()];
        assert_eq!(strip_any("x://k", &prefixes), "k");
        assert_eq!(strip_any("https://a/k/l", &prefixes), "k/l");
        assert_eq!(strip_any("other", &prefixes), "other");
    }
}
