//! SharedKey signing for hand-built Azure Storage REST requests.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::Method;
use sha2::Sha256;
use std::collections::BTreeMap;
use url::Url;

use crate::error::{Result, StorageTourError};

type HmacSha256 = Hmac<Sha256>;

/// Standard headers in string-to-sign order, after the verb.
const STANDARD_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Builds the `Authorization` header value for a request.
pub fn authorization_header(
    account: &str,
    account_key: &str,
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
) -> Result<String> {
    let string_to_sign = build_string_to_sign(account, method, url, headers);
    let signature = compute_signature(&string_to_sign, account_key)?;
    Ok(format!("SharedKey {account}:{signature}"))
}

/// Builds the string-to-sign for the Blob, Queue and File services.
pub fn build_string_to_sign(account: &str, method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec![method.as_str().to_uppercase()];

    for name in STANDARD_HEADERS {
        let value = header_str(headers, name);
        let value = match name {
            // Content-Length is signed as empty when zero
            "content-length" if value == "0" => "",
            // x-ms-date supersedes Date
            "date" if headers.contains_key("x-ms-date") => "",
            _ => value,
        };
        parts.push(value.to_string());
    }

    format!(
        "{}\n{}{}",
        parts.join("\n"),
        canonicalized_headers(headers),
        canonicalized_resource(account, url)
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// `x-ms-*` headers, lowercased, sorted, one `name:value\n` line each.
fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str().to_lowercase();
        if name.starts_with("x-ms-") {
            let value = value.to_str().unwrap_or("");
            let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
            ms_headers.insert(name, normalized);
        }
    }

    let mut result = String::new();
    for (name, value) in ms_headers {
        result.push_str(&name);
        result.push(':');
        result.push_str(&value);
        result.push('\n');
    }
    result
}

/// `/{account}{path}` followed by the decoded query parameters sorted by name.
fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        params
            .entry(key.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }

    for (key, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&key);
        resource.push(':');
        resource.push_str(&values.join(","));
    }

    resource
}

/// Computes the base64 HMAC-SHA256 of `string_to_sign` with a base64 account key.
pub fn compute_signature(string_to_sign: &str, account_key: &str) -> Result<String> {
    let key_bytes = BASE64
        .decode(account_key)
        .map_err(|e| StorageTourError::connection_string(format!("AccountKey is not valid base64: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(&key_bytes)
        .map_err(|e| StorageTourError::connection_string(format!("unusable account key: {e}")))?;

    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
