//! OAuth 1.0a (HMAC-SHA1) request signing for user-context Twitter requests.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use urlencoding::encode;

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    credentials: Credentials,
}

impl OAuth1Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Builds the `Authorization` header for a request.
    /// `url` must not carry a query string; pass query (and form body) parameters in `params`.
    pub fn authorization(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut oauth_params = self.oauth_params(nonce, timestamp);
        let signature = self.signature(method, url, params, &oauth_params);
        oauth_params.push(("oauth_signature", signature));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("oauth_consumer_key", self.credentials.api_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.credentials.access_token.clone()),
            ("oauth_version", "1.0".to_string()),
        ]
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        oauth_params: &[(&'static str, String)],
    ) -> String {
        let base = signature_base(method, url, params, oauth_params);
        let key = format!(
            "{}&{}",
            encode(&self.credentials.api_key_secret),
            encode(&self.credentials.access_token_secret)
        );

        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// `METHOD&url&params`, every part percent encoded, params sorted by encoded key then value.
fn signature_base(
    method: &str,
    url: &str,
    params: &[(String, String)],
    oauth_params: &[(&'static str, String)],
) -> String {
    let mut encoded = params
        .iter()
        .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned()))
        .chain(
            oauth_params
                .iter()
                .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned())),
        )
        .collect::<Vec<_>>();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&param_string)
    )
}
