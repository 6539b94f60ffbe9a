//! HttpStore: RemoteStore over a REST resource repository
//!
//! Endpoints used:
//! - `GET {base}/search` - identifier and relation lookups
//! - `POST {base}/metadata` - metadata-only resource creation
//! - `POST {base}` - binary upload
//! - `PATCH {uri}/metadata` - metadata update (`X-METADATA-WRITE-MODE`)
//! - `DELETE {uri}` and `DELETE {uri}/tombstone`
//! - `POST|PUT|DELETE {base}/transaction` - transaction control
//!
//! Metadata travels as N-Triples.

use async_trait::async_trait;
use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNodeRef, SubjectRef};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BinaryPayload, Metadata, RemoteResource, RemoteStore, StoreError, WriteMode};
use crate::config::RepositoryConfig;
use crate::ontology::OntologyGraph;

const NTRIPLES: &str = "application/n-triples";
const TRANSACTION_HEADER: &str = "X-TRANSACTION-ID";
const WRITE_MODE_HEADER: &str = "X-METADATA-WRITE-MODE";
const READ_MODE_HEADER: &str = "X-METADATA-READ-MODE";

#[derive(Debug, Clone)]
struct Credentials {
    user: String,
    password: Option<String>,
}

pub struct HttpStore {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    id_predicate: String,
    managed_prefixes: Vec<String>,
    transaction: RwLock<Option<String>>,
}

impl Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    /// Create a repository client
    ///
    /// # Arguments
    /// * `base_url` - Repository API root, e.g. `https://repo.example.org/api`
    /// * `id_predicate` - Predicate holding resource identifiers
    pub fn new(base_url: &str, id_predicate: NamedNodeRef<'_>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
            id_predicate: id_predicate.as_str().to_string(),
            managed_prefixes: Vec::new(),
            transaction: RwLock::new(None),
        })
    }

    /// Client configured from the `repository` section of the config file.
    /// The password never lives in the config file.
    pub fn from_config(
        repo: &RepositoryConfig,
        id_predicate: NamedNodeRef<'_>,
        password: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new(&repo.url, id_predicate)?.with_managed_prefixes(repo.managed_prefixes.clone());
        if let Some(user) = &repo.user {
            store = store.with_credentials(user, password);
        }
        Ok(store)
    }

    pub fn with_credentials(mut self, user: &str, password: Option<&str>) -> Self {
        self.credentials = Some(Credentials {
            user: user.to_string(),
            password: password.map(str::to_string),
        });
        self
    }

    pub fn with_managed_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.managed_prefixes = prefixes;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transaction_id(&self) -> Option<String> {
        self.transaction.read().map(|t| t.clone()).unwrap_or_else(|p| p.into_inner().clone())
    }

    fn set_transaction_id(&self, id: Option<String>) {
        match self.transaction.write() {
            Ok(mut t) => *t = id,
            Err(p) => *p.into_inner() = id,
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(creds) = &self.credentials {
            builder = builder.basic_auth(&creds.user, creds.password.as_ref());
        }
        if let Some(tx) = self.transaction_id() {
            builder = builder.header(TRANSACTION_HEADER, tx);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(StoreError::NotFound(url.to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body,
                })
            }
        }
    }

    fn resource_url(&self, uri: &str) -> String {
        format!("{}/metadata", uri.trim_end_matches('/'))
    }

    fn search_url(&self, predicate: &str, value: &str, relation: bool) -> Result<String, StoreError> {
        let mut url = reqwest::Url::parse(&format!("{}/search", self.base_url))
            .map_err(|e| StoreError::Request(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("property[]", predicate);
            query.append_pair("value[]", value);
            if relation {
                query.append_pair("type[]", "relation");
            }
        }
        Ok(url.to_string())
    }

    fn location(response: &Response) -> Result<String, StoreError> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_end_matches('/').to_string())
            .ok_or_else(|| StoreError::InvalidResponse("missing Location header".to_string()))
    }

    /// Group an N-Triples response into repository resources
    fn parse_resources(&self, body: &[u8]) -> Result<Vec<RemoteResource>, StoreError> {
        let graph = OntologyGraph::parse(RdfFormat::NTriples, body)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let prefix = format!("{}/", self.base_url);
        let mut resources: BTreeMap<String, Metadata> = BTreeMap::new();
        for triple in graph.inner().iter() {
            let SubjectRef::NamedNode(subject) = triple.subject else {
                continue;
            };
            let Some(local) = subject.as_str().strip_prefix(&prefix) else {
                continue;
            };
            if local.is_empty() || !local.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            resources
                .entry(subject.as_str().to_string())
                .or_default()
                .add(triple.predicate, triple.object.into_owned());
        }

        Ok(resources
            .into_iter()
            .map(|(uri, metadata)| RemoteResource { uri, metadata })
            .collect())
    }

    async fn search(&self, predicate: &str, value: &str, relation: bool) -> Result<Vec<RemoteResource>, StoreError> {
        let url = self.search_url(predicate, value, relation)?;
        let builder = self
            .request(Method::GET, &url)
            .header(reqwest::header::ACCEPT, NTRIPLES)
            .header(READ_MODE_HEADER, "resource");
        let body = self.send(builder, &url).await?.bytes().await?;
        self.parse_resources(&body)
    }

    async fn get_metadata(&self, uri: &str) -> Result<RemoteResource, StoreError> {
        let url = self.resource_url(uri);
        let builder = self
            .request(Method::GET, &url)
            .header(reqwest::header::ACCEPT, NTRIPLES)
            .header(READ_MODE_HEADER, "resource");
        let body = self.send(builder, &url).await?.bytes().await?;
        self.parse_resources(&body)?
            .into_iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| StoreError::NotFound(uri.to_string()))
    }

    /// Start a repository transaction; subsequent requests join it
    pub async fn begin_transaction(&self) -> Result<String, StoreError> {
        let url = format!("{}/transaction", self.base_url);
        let response = self.send(self.request(Method::POST, &url), &url).await?;
        let tx = response
            .headers()
            .get(TRANSACTION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::InvalidResponse(format!("missing {} header", TRANSACTION_HEADER)))?;
        info!("transaction {} started", tx);
        self.set_transaction_id(Some(tx.clone()));
        Ok(tx)
    }

    pub async fn commit(&self) -> Result<(), StoreError> {
        self.finish_transaction(Method::PUT).await
    }

    pub async fn rollback(&self) -> Result<(), StoreError> {
        self.finish_transaction(Method::DELETE).await
    }

    async fn finish_transaction(&self, method: Method) -> Result<(), StoreError> {
        let Some(tx) = self.transaction_id() else {
            return Ok(());
        };
        let url = format!("{}/transaction", self.base_url);
        let committing = method == Method::PUT;
        self.send(self.request(method, &url), &url).await?;
        self.set_transaction_id(None);
        if committing {
            info!("transaction {} committed", tx);
        } else {
            warn!("transaction {} rolled back", tx);
        }
        Ok(())
    }
}

fn ntriples_body(subject: &str, metadata: &Metadata) -> Result<Vec<u8>, StoreError> {
    let subject = NamedNodeRef::new(subject)?;
    metadata
        .to_ntriples(subject)
        .map_err(|e| StoreError::Request(e.to_string()))
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn get_resource_by_id(&self, id: &str) -> Result<RemoteResource, StoreError> {
        if id.starts_with(&format!("{}/", self.base_url)) {
            return self.get_metadata(id).await;
        }
        let mut found = self.search(&self.id_predicate, id, false).await?;
        match found.len() {
            0 => Err(StoreError::NotFound(id.to_string())),
            1 => Ok(found.remove(0)),
            n => Err(StoreError::InvalidResponse(format!("{} resources share the identifier {}", n, id))),
        }
    }

    async fn create_resource(
        &self,
        metadata: &Metadata,
        payload: Option<BinaryPayload>,
    ) -> Result<RemoteResource, StoreError> {
        match payload {
            Some(binary) => {
                let mut headers = HeaderMap::new();
                let content_type = HeaderValue::from_str(&binary.media_type)
                    .map_err(|e| StoreError::Request(e.to_string()))?;
                let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", binary.filename))
                    .map_err(|e| StoreError::Request(e.to_string()))?;
                headers.insert(CONTENT_TYPE, content_type);
                headers.insert(CONTENT_DISPOSITION, disposition);
                let builder = self.request(Method::POST, &self.base_url).headers(headers).body(binary.data);
                let response = self.send(builder, &self.base_url).await?;
                let uri = Self::location(&response)?;
                debug!("uploaded {} as {}", binary.filename, uri);

                // the binary upload carries no metadata of its own
                self.update_metadata(&uri, metadata, WriteMode::Merge).await
            }
            None => {
                let url = format!("{}/metadata", self.base_url);
                let builder = self
                    .request(Method::POST, &url)
                    .header(CONTENT_TYPE, NTRIPLES)
                    .body(ntriples_body(&self.base_url, metadata)?);
                let response = self.send(builder, &url).await?;
                let uri = Self::location(&response)?;
                debug!("created {}", uri);
                Ok(RemoteResource {
                    uri,
                    metadata: metadata.clone(),
                })
            }
        }
    }

    async fn update_metadata(
        &self,
        uri: &str,
        metadata: &Metadata,
        mode: WriteMode,
    ) -> Result<RemoteResource, StoreError> {
        let url = self.resource_url(uri);
        let builder = self
            .request(Method::PATCH, &url)
            .header(CONTENT_TYPE, NTRIPLES)
            .header(reqwest::header::ACCEPT, NTRIPLES)
            .header(WRITE_MODE_HEADER, mode.as_str())
            .header(READ_MODE_HEADER, "resource")
            .body(ntriples_body(uri, metadata)?);
        let body = self.send(builder, &url).await?.bytes().await?;

        let stored = self.parse_resources(&body)?.into_iter().find(|r| r.uri == uri);
        Ok(stored.unwrap_or_else(|| RemoteResource {
            uri: uri.to_string(),
            metadata: metadata.clone(),
        }))
    }

    /// Delete the resource, then its tombstone. A resource removed by an
    /// earlier attempt answers 410 while its tombstone may remain, so only
    /// the tombstone's answer decides whether the resource is gone.
    async fn delete_resource(&self, uri: &str) -> Result<(), StoreError> {
        let resource_gone = match self.send(self.request(Method::DELETE, uri), uri).await {
            Ok(_) => false,
            Err(StoreError::NotFound(_)) => true,
            Err(e) => return Err(e),
        };

        let tombstone = format!("{}/tombstone", uri.trim_end_matches('/'));
        match self.send(self.request(Method::DELETE, &tombstone), &tombstone).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(_)) if resource_gone => Err(StoreError::NotFound(uri.to_string())),
            Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn search_by_relation(
        &self,
        predicate: NamedNodeRef<'_>,
        value: &str,
    ) -> Result<Vec<RemoteResource>, StoreError> {
        self.search(predicate.as_str(), value, true).await
    }

    fn is_store_managed(&self, predicate: NamedNodeRef<'_>) -> bool {
        self.managed_prefixes
            .iter()
            .any(|prefix| predicate.as_str().starts_with(prefix.as_str()))
    }
}
