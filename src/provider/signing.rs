//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849).
//!
//! Builds the signature base string from the request method, base URL and
//! all request parameters, signs it with the consumer and token secrets,
//! and renders the `Authorization: OAuth …` header.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

type HmacSha1 = Hmac<Sha1>;

/// Percent-encodes per RFC 3986 (the OAuth "unreserved" set).
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Random nonce for one signed request.
pub fn nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Seconds since the epoch, rendered as a decimal string.
pub fn timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Builds the signature base string from method, base URL and the full
/// parameter set (oauth_* plus query/body parameters).
fn signature_base(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url),
        encode(&param_string)
    )
}

/// Computes the base64 HMAC-SHA1 signature over the base string.
fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    // HMAC accepts any key length; new_from_slice cannot fail
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("hmac key");
    mac.update(base.as_bytes());

    BASE64.encode(mac.finalize().into_bytes())
}

/// Signs a request and renders the `OAuth` authorization header value.
///
/// `oauth_params` are the protocol parameters for this call (consumer
/// key, nonce, timestamp, and the call-specific ones like
/// `oauth_callback` or `oauth_verifier`); `extra_params` are query or
/// form parameters that participate in the signature but live outside
/// the header.
pub fn authorization_header(
    method: &str,
    base_url: &str,
    oauth_params: &[(String, String)],
    extra_params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut all: Vec<(String, String)> = oauth_params.to_vec();
    all.extend_from_slice(extra_params);

    let base = signature_base(method, base_url, &all);
    let signature = sign(&base, consumer_secret, token_secret);

    let mut header_params: Vec<(String, String)> = oauth_params.to_vec();
    header_params.push(("oauth_signature".to_string(), signature));
    header_params.sort();

    let rendered = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {rendered}")
}

/// The standard oauth_* parameter set shared by every signed call.
pub fn base_oauth_params(consumer_key: &str, token: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce()),
        (
            "oauth_signature_method".to_string(),
            "HMAC-SHA1".to_string(),
        ),
        ("oauth_timestamp".to_string(), timestamp()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    if let Some(token) = token {
        params.push(("oauth_token".to_string(), token.to_string()));
    }
    params
}
