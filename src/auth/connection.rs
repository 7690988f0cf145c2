//! Azure Storage connection string parsing
//!
//! Wraps the SDK's [`ConnectionString`] into a [`StorageAccount`] holding
//! the account name, its credential and one endpoint per service. The SDK
//! parser does not derive endpoints or cover the emulator layout, so those
//! are filled in here.

use crate::error::{Result, StorageTourError};
use azure_storage::{CloudLocation, ConnectionString, EndpointProtocol, StorageCredentials};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::fmt;
use url::Url;
use zeroize::Zeroizing;

/// Well-known account used by the local storage emulator
pub const EMULATOR_ACCOUNT: &str = "devstoreaccount1";

/// Well-known key used by the local storage emulator
pub const EMULATOR_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// The four storage sub-APIs an account exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageService {
    Blob,
    Queue,
    Table,
    File,
}

impl StorageService {
    fn subdomain(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Queue => "queue",
            Self::Table => "table",
            Self::File => "file",
        }
    }

    fn emulator_port(self) -> Option<u16> {
        match self {
            Self::Blob => Some(10000),
            Self::Queue => Some(10001),
            Self::Table => Some(10002),
            Self::File => None,
        }
    }
}

impl fmt::Display for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdomain())
    }
}

/// Credential carried by a connection string
#[derive(Clone)]
pub enum AccountCredential {
    /// Account key, already validated as base64
    SharedKey(Zeroizing<String>),
    /// SAS token without the leading `?`
    SasToken(Zeroizing<String>),
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Self::SasToken(_) => f.write_str("SasToken(<redacted>)"),
        }
    }
}

/// A storage account resolved from a connection string
#[derive(Clone)]
pub struct StorageAccount {
    pub name: String,
    pub credential: AccountCredential,
    sdk_credentials: StorageCredentials,
    endpoints: HashMap<StorageService, Url>,
}

impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccount")
            .field("name", &self.name)
            .field("credential", &self.credential)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl StorageAccount {
    /// Parse an Azure Storage connection string
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let parsed = ConnectionString::new(connection_string)
            .map_err(|e| StorageTourError::connection_string(e.to_string()))?;

        if parsed.use_development_storage == Some(true) {
            return Self::emulator(parsed.development_storage_proxy_uri);
        }

        let credential = match (parsed.account_key, parsed.sas) {
            (Some(key), _) => {
                BASE64.decode(key).map_err(|e| {
                    StorageTourError::connection_string(format!("AccountKey is not valid base64: {e}"))
                })?;
                if parsed.account_name.is_none() {
                    return Err(StorageTourError::connection_string(
                        "AccountName is required when AccountKey is used",
                    ));
                }
                AccountCredential::SharedKey(Zeroizing::new(key.to_string()))
            }
            (None, Some(sas)) => {
                AccountCredential::SasToken(Zeroizing::new(sas.trim_start_matches('?').to_string()))
            }
            (None, None) => {
                return Err(StorageTourError::connection_string(
                    "either AccountKey or SharedAccessSignature is required",
                ))
            }
        };

        let protocol = match parsed.default_endpoints_protocol {
            Some(EndpointProtocol::Http) => "http",
            _ => DEFAULT_PROTOCOL,
        };
        let suffix = parsed.endpoint_suffix.unwrap_or(DEFAULT_ENDPOINT_SUFFIX);

        let mut endpoints = HashMap::new();
        for (service, explicit) in [
            (StorageService::Blob, parsed.blob_endpoint),
            (StorageService::Queue, parsed.queue_endpoint),
            (StorageService::Table, parsed.table_endpoint),
            (StorageService::File, parsed.file_endpoint),
        ] {
            let endpoint = match (explicit, parsed.account_name) {
                (Some(explicit), _) => parse_endpoint(explicit)?,
                (None, Some(account)) => parse_endpoint(&format!(
                    "{protocol}://{account}.{}.{suffix}",
                    service.subdomain()
                ))?,
                (None, None) => continue,
            };
            endpoints.insert(service, endpoint);
        }

        let name = match parsed.account_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => account_from_endpoints(&endpoints)
                .ok_or_else(|| StorageTourError::connection_string("AccountName is required"))?,
        };

        let sdk_credentials = match &credential {
            AccountCredential::SharedKey(_) => parsed.storage_credentials(),
            AccountCredential::SasToken(token) => StorageCredentials::sas_token(token.as_str()),
        }
        .map_err(|e| StorageTourError::connection_string(format!("unusable credential: {e}")))?;

        Ok(Self {
            name,
            credential,
            sdk_credentials,
            endpoints,
        })
    }

    fn emulator(proxy: Option<&str>) -> Result<Self> {
        let proxy = parse_endpoint(proxy.unwrap_or("http://127.0.0.1"))?;
        let host = proxy.host_str().unwrap_or("127.0.0.1").to_string();

        let mut endpoints = HashMap::new();
        for service in [
            StorageService::Blob,
            StorageService::Queue,
            StorageService::Table,
        ] {
            if let Some(port) = service.emulator_port() {
                let endpoint = parse_endpoint(&format!(
                    "{}://{host}:{port}/{EMULATOR_ACCOUNT}",
                    proxy.scheme()
                ))?;
                endpoints.insert(service, endpoint);
            }
        }

        Ok(Self {
            name: EMULATOR_ACCOUNT.to_string(),
            credential: AccountCredential::SharedKey(Zeroizing::new(EMULATOR_KEY.to_string())),
            sdk_credentials: StorageCredentials::access_key(
                EMULATOR_ACCOUNT.to_string(),
                EMULATOR_KEY.to_string(),
            ),
            endpoints,
        })
    }

    /// Endpoint for one service, if the connection string provides one
    pub fn endpoint(&self, service: StorageService) -> Result<&Url> {
        self.endpoints.get(&service).ok_or_else(|| {
            StorageTourError::config(format!(
                "connection string does not define a {service} endpoint for account '{}'",
                self.name
            ))
        })
    }

    /// Credentials in the form the Azure SDK clients expect
    pub fn storage_credentials(&self) -> StorageCredentials {
        self.sdk_credentials.clone()
    }

    /// SDK cloud location pointing at the endpoint of `service`
    pub fn cloud_location(&self, service: StorageService) -> Result<CloudLocation> {
        let endpoint = self.endpoint(service)?;
        Ok(CloudLocation::Custom {
            account: self.name.clone(),
            uri: endpoint.as_str().trim_end_matches('/').to_string(),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| StorageTourError::connection_string(format!("invalid endpoint '{raw}': {e}")))
}

fn account_from_endpoints(endpoints: &HashMap<StorageService, Url>) -> Option<String> {
    endpoints
        .values()
        .filter_map(|url| url.host_str())
        .find_map(|host| host.split_once('.').map(|(account, _)| account.to_string()))
}
