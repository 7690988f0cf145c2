//! File share manager speaking the Azure Files REST API
//!
//! Requests are signed with the account key (SharedKey) or carry the SAS
//! token from the connection string.

use crate::auth::shared_key::authorization_header;
use crate::auth::{AccountCredential, StorageAccount, StorageService};
use crate::error::{is_already_exists_code, Result, StorageTourError};
use crate::share::store::FileShareStore;
use async_trait::async_trait;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// REST API version sent with every request
pub const API_VERSION: &str = "2021-06-08";

/// Largest body the service accepts for one Put Range call
pub const MAX_RANGE_BYTES: u64 = 4 * 1024 * 1024;

/// File share collaborator talking to a real storage account
#[derive(Debug, Clone)]
pub struct ShareManager {
    http_client: Client,
    account: String,
    credential: AccountCredential,
    endpoint: Url,
}

impl ShareManager {
    pub fn new(account: &StorageAccount) -> Result<Self> {
        let endpoint = account.endpoint(StorageService::File)?.clone();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            http_client,
            account: account.name.clone(),
            credential: account.credential.clone(),
            endpoint,
        })
    }

    /// URL for `share[/path]` with the given query parameters
    fn resource_url(&self, share: &str, path: Option<&str>, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageTourError::config(format!("file endpoint '{}' cannot hold a path", self.endpoint)))?;
            segments.pop_if_empty().push(share);
            if let Some(path) = path {
                segments.extend(path.split('/').filter(|s| !s.is_empty()));
            }
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Sign (or SAS-authorize) and send one request
    async fn send(
        &self,
        method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<Response> {
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert("x-ms-date", header_value(&rfc1123_now())?);
        if method != Method::GET {
            headers.insert("content-length", header_value(&body.len().to_string())?);
        }

        match &self.credential {
            AccountCredential::SharedKey(key) => {
                let authorization = authorization_header(&self.account, key, &method, &url, &headers)?;
                headers.insert("authorization", header_value(&authorization)?);
            }
            AccountCredential::SasToken(token) => append_sas(&mut url, token),
        }

        let mut request = self.http_client.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }

    async fn put_range(&self, share: &str, path: &str, start: u64, chunk: Vec<u8>) -> Result<()> {
        let end = start + chunk.len() as u64 - 1;
        let url = self.resource_url(share, Some(path), &[("comp", "range")])?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-write", HeaderValue::from_static("update"));
        headers.insert("x-ms-range", header_value(&format!("bytes={start}-{end}"))?);

        let response = self.send(Method::PUT, url, headers, chunk).await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl FileShareStore for ShareManager {
    async fn create_share_if_not_exists(&self, share: &str) -> Result<()> {
        debug!("Creating share '{}'", share);

        let url = self.resource_url(share, None, &[("restype", "share")])?;
        let response = self.send(Method::PUT, url, HeaderMap::new(), Vec::new()).await?;

        if share_already_exists(response.status(), response.headers()) {
            warn!("Share '{}' already exists", share);
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<()> {
        debug!("Creating file {}/{} ({} bytes)", share, path, size);

        let url = self.resource_url(share, Some(path), &[])?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-type", HeaderValue::from_static("file"));
        headers.insert("x-ms-content-length", header_value(&size.to_string())?);
        headers.insert("x-ms-file-permission", HeaderValue::from_static("inherit"));
        headers.insert("x-ms-file-attributes", HeaderValue::from_static("None"));
        headers.insert("x-ms-file-creation-time", HeaderValue::from_static("now"));
        headers.insert("x-ms-file-last-write-time", HeaderValue::from_static("now"));

        let response = self.send(Method::PUT, url, headers, Vec::new()).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn upload_file(&self, share: &str, path: &str, content: Vec<u8>) -> Result<()> {
        let ranges = split_ranges(content.len() as u64, MAX_RANGE_BYTES);
        debug!(
            "Uploading {} bytes to {}/{} in {} range(s)",
            content.len(),
            share,
            path,
            ranges.len()
        );

        for (start, len) in ranges {
            let chunk = content[start as usize..(start + len) as usize].to_vec();
            self.put_range(share, path, start, chunk).await?;
        }

        Ok(())
    }

    async fn download_file(&self, share: &str, path: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}/{}", share, path);

        let url = self.resource_url(share, Some(path), &[])?;
        let response = self.send(Method::GET, url, HeaderMap::new(), Vec::new()).await?;
        let response = ensure_success(response).await?;

        Ok(response.bytes().await?.to_vec())
    }
}

/// Split `len` bytes into `(offset, length)` ranges of at most `max` bytes
pub fn split_ranges(len: u64, max: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    while offset < len {
        let chunk = max.min(len - offset);
        ranges.push((offset, chunk));
        offset += chunk;
    }
    ranges
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StorageTourError::invalid_argument(format!("invalid header value '{value}': {e}")))
}

/// Append the SAS token after any query the request already carries
fn append_sas(url: &mut Url, token: &str) {
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{token}"),
        _ => token.to_string(),
    };
    url.set_query(Some(&query));
}

fn error_code(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(HeaderName::from_static("x-ms-error-code"))
        .and_then(|v| v.to_str().ok())
}

/// A create-share 409 that only says the share is already there
fn share_already_exists(status: StatusCode, headers: &HeaderMap) -> bool {
    is_already_exists_code(status.as_u16(), error_code(headers))
}

/// Map a non-2xx response to a service error carrying the `x-ms-error-code`
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_code = error_code(response.headers()).map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    let detail = ErrorDetail::parse(&body);

    let code = header_code
        .or(detail.code)
        .unwrap_or_else(|| "Unknown".to_string());
    let message = detail.message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(StorageTourError::service(status.as_u16(), code, message))
}

/// `Code` and `Message` of an Azure XML error body
#[derive(Debug, Default, PartialEq, Eq)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

impl ErrorDetail {
    fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut detail = Self::default();
        let mut buf = Vec::new();
        let mut current_element: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current_element = Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
                }
                Ok(Event::End(_)) => {
                    current_element = None;
                }
                Ok(Event::Text(e)) => {
                    let Ok(text) = e.unescape() else {
                        break;
                    };
                    match current_element.as_deref() {
                        Some("Code") => detail.code = Some(text.trim().to_string()),
                        // The service appends RequestId and Time lines
                        Some("Message") => {
                            let first = text.lines().next().unwrap_or("").trim();
                            if !first.is_empty() {
                                detail.message = Some(first.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn manager(endpoint: &str, credential: AccountCredential) -> ShareManager {
        ShareManager {
            http_client: Client::new(),
            account: "acct".to_string(),
            credential,
            endpoint: Url::parse(endpoint).unwrap(),
        }
    }

    #[test]
    fn test_split_ranges() {
        assert!(split_ranges(0, MAX_RANGE_BYTES).is_empty());
        assert_eq!(split_ranges(10, 4), vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(split_ranges(8, 4), vec![(0, 4), (4, 4)]);
        assert_eq!(split_ranges(3, MAX_RANGE_BYTES), vec![(0, 3)]);
    }

    #[test]
    fn test_resource_url_for_public_endpoint() {
        let m = manager(
            "https://acct.file.core.windows.net/",
            AccountCredential::SasToken(Zeroizing::new("sig=x".to_string())),
        );
        let url = m.resource_url("sampleshare", None, &[("restype", "share")]).unwrap();
        assert_eq!(url.as_str(), "https://acct.file.core.windows.net/sampleshare?restype=share");

        let url = m.resource_url("sampleshare", Some("dir/sample.txt"), &[]).unwrap();
        assert_eq!(url.as_str(), "https://acct.file.core.windows.net/sampleshare/dir/sample.txt");
    }

    #[test]
    fn test_resource_url_keeps_endpoint_path() {
        let m = manager(
            "http://127.0.0.1:10004/acct",
            AccountCredential::SasToken(Zeroizing::new("sig=x".to_string())),
        );
        let url = m.resource_url("share", Some("my file.txt"), &[("comp", "range")]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:10004/acct/share/my%20file.txt?comp=range");
    }

    #[test]
    fn test_error_detail_reads_code_and_first_message_line() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ShareNotFound</Code>\
<Message>The specified share does not exist.\nRequestId:abc\nTime:2026-10-16T10:00:00Z</Message></Error>";
        assert_eq!(
            ErrorDetail::parse(body),
            ErrorDetail {
                code: Some("ShareNotFound".to_string()),
                message: Some("The specified share does not exist.".to_string()),
            }
        );
    }

    #[test]
    fn test_error_detail_unescapes_entities() {
        let body = "<Error><Code>InvalidHeaderValue</Code>\
<Message>a &amp; b &lt;c&gt;\nRequestId:1</Message></Error>";
        assert_eq!(ErrorDetail::parse(body).message.as_deref(), Some("a & b <c>"));
    }

    #[test]
    fn test_error_detail_of_empty_or_foreign_body() {
        assert_eq!(ErrorDetail::parse(""), ErrorDetail::default());
        assert_eq!(ErrorDetail::parse("not xml at all"), ErrorDetail::default());
    }

    #[test]
    fn test_sas_token_appended_after_existing_query() {
        let m = manager(
            "https://acct.file.core.windows.net/",
            AccountCredential::SasToken(Zeroizing::new("sv=2022-11-02&sig=abc".to_string())),
        );
        let mut url = m.resource_url("share", Some("sample.txt"), &[("comp", "range")]).unwrap();
        append_sas(&mut url, "sv=2022-11-02&sig=abc");
        assert_eq!(
            url.as_str(),
            "https://acct.file.core.windows.net/share/sample.txt?comp=range&sv=2022-11-02&sig=abc"
        );

        let mut url = m.resource_url("share", Some("sample.txt"), &[]).unwrap();
        append_sas(&mut url, "sv=2022-11-02&sig=abc");
        assert_eq!(
            url.as_str(),
            "https://acct.file.core.windows.net/share/sample.txt?sv=2022-11-02&sig=abc"
        );
    }

    #[test]
    fn test_create_share_conflict_only_tolerated_when_share_exists() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-error-code", HeaderValue::from_static("ShareAlreadyExists"));
        assert!(share_already_exists(StatusCode::CONFLICT, &headers));

        headers.insert("x-ms-error-code", HeaderValue::from_static("ShareBeingDeleted"));
        assert!(!share_already_exists(StatusCode::CONFLICT, &headers));

        assert!(!share_already_exists(StatusCode::FORBIDDEN, &HeaderMap::new()));
        assert!(!share_already_exists(StatusCode::CREATED, &HeaderMap::new()));
    }

    #[test]
    fn test_rfc1123_format() {
        let now = rfc1123_now();
        assert!(now.ends_with(" GMT"));
        assert_eq!(now.len(), "Fri, 16 Oct 2026 10:00:00 GMT".len());
    }
}
