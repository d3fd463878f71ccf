//! HTTPS ring-state store backed by a Kubernetes Secret.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::traits::{ArtifactMap, StateRecord, StateStore};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Construction parameters for [`HttpStateStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreOptions {
    /// Base URL of the cluster API, e.g. `https://kubernetes.default.svc`.
    pub api_url: String,
    /// Name of the Secret holding the ring state.
    pub record: String,
    /// Directory with the service-account `token`, `ca.crt` and
    /// `namespace` files.
    pub credentials_dir: PathBuf,
    /// Namespace override; when `None` the `namespace` credential file is
    /// used.
    pub namespace: Option<String>,
    /// Finalizer marker written into the record metadata. Empty disables it.
    pub finalizer: String,
    /// Owner reference written into the record metadata, if any.
    pub owner: Option<OwnerReference>,
    /// Hard per-request timeout. No store call blocks past this.
    pub request_timeout: Duration,
}

/// Owner reference attached to the published record so the cluster garbage
/// collector ties its lifetime to the owning resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// The `v1` Secret shape, reduced to the fields this client touches.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    api_version: String,
    kind: String,
    metadata: Metadata,
    #[serde(default)]
    data: ArtifactMap,
    #[serde(rename = "type")]
    secret_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    name: String,
    namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    finalizers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Production store client.
///
/// Talks to the cluster API over HTTPS with the pod's service-account
/// credentials: bearer token from `token`, the API server CA from `ca.crt`
/// added as a trust root, and the namespace from `namespace` unless
/// overridden. Credentials are read once at construction.
///
/// Errors are never retried here. The client carries a hard request timeout
/// so a wedged API server fails the invocation instead of hanging it;
/// retry policy belongs to whatever schedules the invocation.
#[derive(Debug)]
pub struct HttpStateStore {
    client: reqwest::Client,
    token: String,
    api_url: String,
    namespace: String,
    record: String,
    finalizer: String,
    owner: Option<OwnerReference>,
}

impl HttpStateStore {
    /// Build a client from the given options, reading credentials from
    /// `credentials_dir`.
    ///
    /// `ca.crt` is loaded when present; a deployment terminating TLS
    /// elsewhere (or a plain-HTTP test stand-in) simply omits the file.
    pub fn new(options: HttpStoreOptions) -> Result<Self, StoreError> {
        let token = read_credential(&options.credentials_dir.join("token"))?;
        let namespace = match options.namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => read_credential(&options.credentials_dir.join("namespace"))?,
        };

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(options.request_timeout);

        let ca_path = options.credentials_dir.join("ca.crt");
        if ca_path.exists() {
            let pem = std::fs::read(&ca_path).map_err(|source| StoreError::Credentials {
                path: ca_path.clone(),
                source,
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            token,
            api_url: options.api_url.trim_end_matches('/').to_string(),
            namespace,
            record: options.record,
            finalizer: options.finalizer,
            owner: options.owner,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/api/v1/namespaces/{}/secrets", self.api_url, self.namespace)
    }

    fn record_url(&self) -> String {
        format!("{}/{}", self.collection_url(), self.record)
    }

    fn envelope(&self, version: Option<&str>, data: ArtifactMap) -> Envelope {
        let finalizers = if self.finalizer.is_empty() {
            Vec::new()
        } else {
            vec![self.finalizer.clone()]
        };
        Envelope {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata: Metadata {
                name: self.record.clone(),
                namespace: self.namespace.clone(),
                resource_version: version.map(str::to_string),
                owner_references: self.owner.clone().into_iter().collect(),
                finalizers,
            },
            data,
            secret_type: "Opaque".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl StateStore for HttpStateStore {
    async fn fetch(&self) -> Result<Option<StateRecord>, StoreError> {
        let resp = self
            .client
            .get(self.record_url())
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let envelope: Envelope = resp.json().await?;
                let version = envelope.metadata.resource_version.ok_or_else(|| {
                    StoreError::InvalidRecord("record carries no resourceVersion".to_string())
                })?;
                debug!(%version, entries = envelope.data.len(), "fetched ring state");
                Ok(Some(StateRecord {
                    version,
                    data: envelope.data,
                }))
            }
            StatusCode::NOT_FOUND => {
                debug!(record = %self.record, "ring state record does not exist yet");
                Ok(None)
            }
            status => Err(unexpected(status, resp).await),
        }
    }

    async fn publish(&self, version: Option<&str>, data: ArtifactMap) -> Result<(), StoreError> {
        let entries = data.len();
        let envelope = self.envelope(version, data);

        let resp = match version {
            None => self.client.post(self.collection_url()),
            Some(_) => self.client.put(self.record_url()),
        }
        .header("Authorization", format!("Bearer {}", self.token))
        .json(&envelope)
        .send()
        .await?;

        match resp.status() {
            StatusCode::CONFLICT => {
                let detail = resp.text().await.unwrap_or_default();
                Err(StoreError::VersionConflict { detail })
            }
            status if status.is_success() => {
                info!(
                    record = %self.record,
                    entries,
                    created = version.is_none(),
                    "published ring state"
                );
                Ok(())
            }
            status => Err(unexpected(status, resp).await),
        }
    }
}

async fn unexpected(status: StatusCode, resp: reqwest::Response) -> StoreError {
    let body = resp.text().await.unwrap_or_default();
    StoreError::Unexpected {
        status: status.as_u16(),
        body,
    }
}

fn read_credential(path: &Path) -> Result<String, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().to_string()),
        Err(source) => Err(StoreError::Credentials {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
