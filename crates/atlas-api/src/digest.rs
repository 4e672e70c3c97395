//! HTTP digest authentication (RFC 7616, MD5 with `qop=auth`).
//!
//! The organization API answers unauthenticated requests with a `401` and a
//! `WWW-Authenticate: Digest ...` challenge; the client answers it once.

use md5::{Digest, Md5};
use rand::RngCore;

use atlas_core::ApiCredentials;

/// A parsed `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    qop_auth: bool,
    session: bool,
}

impl DigestChallenge {
    /// Parses a challenge header value.
    ///
    /// Returns `None` for non-digest schemes, missing realm/nonce, or
    /// algorithms other than `MD5` / `MD5-sess`.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_auth = false;
        let mut session = false;

        for (key, value) in parse_params(params) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop_auth = value.split(',').any(|q| q.trim() == "auth"),
                "algorithm" => match value.to_ascii_uppercase().as_str() {
                    "MD5" => session = false,
                    "MD5-SESS" => session = true,
                    _ => return None,
                },
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            nonce: nonce?,
            opaque,
            qop_auth,
            session,
        })
    }

    /// Builds the `Authorization` header value with a fresh client nonce.
    #[must_use]
    pub fn authorize(&self, method: &str, uri: &str, credentials: &ApiCredentials) -> String {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        self.authorize_with(method, uri, credentials, &hex::encode(bytes), 1)
    }

    /// Builds the `Authorization` header value for a given client nonce and count.
    #[must_use]
    pub fn authorize_with(
        &self,
        method: &str,
        uri: &str,
        credentials: &ApiCredentials,
        cnonce: &str,
        nonce_count: u32,
    ) -> String {
        let mut ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.public_key, self.realm, credentials.private_key
        ));
        if self.session {
            ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nc = format!("{nonce_count:08x}");

        let response = if self.qop_auth {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let algorithm = if self.session { "MD5-sess" } else { "MD5" };
        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{uri}", algorithm={algorithm}, response="{response}""#,
            credentials.public_key, self.realm, self.nonce
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        if self.qop_auth {
            header.push_str(&format!(r#", qop=auth, nc={nc}, cnonce="{cnonce}""#));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Splits `key=value, key="quoted, value"` lists.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim();

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            rest = quoted.get(end + 1..).unwrap_or_default();
            quoted[..end].to_string()
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_string();
            rest = &rest[end..];
            value
        };

        rest = rest.trim_start().trim_start_matches(',').trim_start();
        params.push((key, value));
    }

    params
}
