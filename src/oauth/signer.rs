// src/oauth/signer.rs — OAuth 1.0a HMAC-SHA1 request signing
//
// The server recomputes the same signature from the request it receives, so
// canonicalization has to be bit-for-bit reproducible: every key and value is
// percent-encoded on its own, then entries are sorted by encoded key and
// encoded value.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

use super::TokenPair;

/// RFC 3986 unreserved characters pass through; everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Nonce and timestamp for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningStamp {
    pub nonce: String,
    pub timestamp: i64,
}

impl SigningStamp {
    /// A fresh stamp: 32 random bytes of nonce and the current epoch second.
    pub fn fresh() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .expect("getrandom failed: OS CSPRNG unavailable, cannot generate OAuth nonce");
        Self {
            nonce: hex::encode(bytes),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Signs upstream requests on behalf of the configured consumer (app) keys.
#[derive(Clone)]
pub struct RequestSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl RequestSigner {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `url` must not carry a query string; query and form parameters go in
    /// `params` so they are covered by the signature. `token` is the request
    /// or access credential, when the call is made on behalf of a user.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        token: Option<&TokenPair>,
    ) -> String {
        self.sign_with(method, url, params, token, &SigningStamp::fresh())
    }

    /// Deterministic variant of [`sign`](Self::sign) with a caller-chosen stamp.
    pub fn sign_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        token: Option<&TokenPair>,
        stamp: &SigningStamp,
    ) -> String {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), stamp.nonce.clone()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), stamp.timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(t) = token {
            oauth_params.push(("oauth_token".to_string(), t.token.clone()));
        }

        let mut all_params = oauth_params.clone();
        all_params.extend(params.iter().cloned());

        let base = signature_base_string(method, url, &all_params);
        let key = signing_key(&self.consumer_secret, token.map(|t| t.secret.as_str()));
        let signature = hmac_sha1_base64(&key, &base);

        // Caller-supplied oauth_* params (callback, verifier) belong in the header too
        oauth_params.extend(
            params
                .iter()
                .filter(|(k, _)| k.starts_with("oauth_"))
                .cloned(),
        );
        oauth_params.push(("oauth_signature".to_string(), signature));

        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .collect();
        encoded.sort();

        let header = encoded
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");

        format!("OAuth {header}")
    }
}

/// Percent-encode per RFC 3986 (the OAuth 1.0a flavour).
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Sorted, encoded `k=v&k=v` serialization of the parameters.
pub fn canonical_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    // Tuple ordering: encoded key first, encoded value breaks ties
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// `METHOD&enc(url)&enc(canonical params)`
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&canonical_parameters(params))
    )
}

fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    )
}

fn hmac_sha1_base64(key: &str, data: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .expect("HMAC-SHA1 accepts keys of any length");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_percent_encode_reserved_set() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("test-_.~"), "test-_.~");
        assert_eq!(percent_encode("a+b*c"), "a%2Bb%2Ac");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_canonical_parameters_sorted_by_encoded_key_then_value() {
        let params = vec![p("b", "2"), p("a", "z"), p("a", "y"), p("a b", "1")];
        assert_eq!(canonical_parameters(&params), "a=y&a=z&a%20b=1&b=2");
    }

    #[test]
    fn test_signing_key_without_token_secret() {
        assert_eq!(signing_key("cs&x", None), "cs%26x&");
        assert_eq!(signing_key("cs", Some("ts")), "cs&ts");
    }

    #[test]
    fn test_fresh_stamps_differ() {
        let a = SigningStamp::fresh();
        let b = SigningStamp::fresh();
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.nonce.len(), 64);
        assert!(a.nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(a.timestamp > 1_600_000_000);
    }

    #[test]
    fn test_header_lists_only_oauth_params() {
        let signer = RequestSigner::new("ck", "cs");
        let stamp = SigningStamp {
            nonce: "n".into(),
            timestamp: 1,
        };
        let header = signer.sign_with(
            "GET",
            "https://api.example.com/2/users/1/tweets",
            &[p("max_results", "100"), p("oauth_verifier", "v")],
            Some(&TokenPair::new("t", "ts")),
            &stamp,
        );
        assert!(header.starts_with("OAuth oauth_consumer_key=\"ck\", oauth_nonce=\"n\""));
        assert!(header.contains("oauth_token=\"t\""));
        assert!(header.contains("oauth_verifier=\"v\""));
        assert!(!header.contains("max_results"));
        assert!(header.contains("oauth_signature=\""));
    }
}
