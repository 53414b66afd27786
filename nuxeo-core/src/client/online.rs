//! # Client State: Online
//!
//! This module defines the `NuxeoClient` behavior when it is connected to a server: the
//! repository, user manager and workflow endpoints of the REST API.
//!
//! Every call returns a nested result:
//!
//! * `Ok(Ok(T))` - The server answered with a success status and the payload converted to `T`.
//! * `Ok(Err(RemoteError))` - The server answered with an error status.
//! * `Err(CallError)` - The request could not be sent, or the payload could not be converted.
use super::{
    CallError, NuxeoClient, Online,
    config::ClientConfig,
    transport::{ApiRequest, HttpBuildError, HttpClient, HttpRequestError},
    version::NuxeoVersion,
};
use crate::{
    entity::{
        Document, Documents, Entity, EntityShape, Group, User, Workflows,
        registry::EntityRegistry,
    },
    error::RemoteError,
    marshal::{
        blob::Blob,
        converter::{ConversionTarget, Converted, ResponseConverter},
    },
};
use tracing::debug;

const API_PATH: &str = "api/v1";
/// Repository information endpoint, carrying the product version.
const CMIS_PATH: &str = "json/cmis";
const DEFAULT_REPOSITORY: &str = "default";
/// The blob of a document when no xpath is given.
pub const DEFAULT_BLOB_XPATH: &str = "blobholder:0";

/// Errors that can occur when connecting to a server.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid client configuration for '{0}': '{1}'")]
    InvalidConfig(String, #[source] HttpBuildError),
    #[error("Failed to reach '{0}': '{1}'")]
    ConnectionFailed(String, #[source] HttpRequestError),
    #[error("Server '{0}' rejected the credentials: '{1}'")]
    Rejected(String, #[source] RemoteError),
    #[error("Unexpected response from '{0}': '{1}'")]
    UnexpectedResponse(String, #[source] CallError),
}

impl NuxeoClient<Online> {
    /// Connects to a server and initializes the client in the `Online` state.
    ///
    /// The current user is fetched once to check that the server is reachable and accepts the
    /// configured credentials.
    ///
    /// # Returns
    ///
    /// * `Ok(NuxeoClient<Online>)` - The connected client.
    /// * `Err(ClientConnectError)` - If the configuration is invalid, the server is unreachable
    ///   or the credentials are rejected.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientConnectError> {
        let url = config.url.clone();
        let client = Self::from_config(config)
            .map_err(|err| ClientConnectError::InvalidConfig(url.clone(), err))?;

        let user = match client.fetch_current_user().await {
            Ok(Ok(user)) => user,
            Ok(Err(remote)) => return Err(ClientConnectError::Rejected(url, remote)),
            Err(CallError::Request(err)) => {
                return Err(ClientConnectError::ConnectionFailed(url, err));
            }
            Err(err) => return Err(ClientConnectError::UnexpectedResponse(url, err)),
        };

        debug!(url = %url, user = user.username().unwrap_or("<unknown>"), "Connected");
        Ok(client)
    }

    /// Builds an `Online` client without contacting the server.
    pub fn from_config(config: ClientConfig) -> Result<Self, HttpBuildError> {
        Self::with_registry(config, EntityRegistry::new())
    }

    /// Builds an `Online` client resolving automation results against `registry`.
    pub fn with_registry(
        config: ClientConfig,
        registry: EntityRegistry,
    ) -> Result<Self, HttpBuildError> {
        let http = HttpClient::new(&config)?;
        let mut online = Online::new(http);
        online.repository = config.repository;
        Ok(Self::new(online, ResponseConverter::new(registry)))
    }

    /// Sends `request` and converts a successful response according to `target`.
    pub async fn call(
        &self,
        request: ApiRequest,
        target: ConversionTarget,
    ) -> Result<Result<Converted, RemoteError>, CallError> {
        match self.state.http.send(request).await? {
            Ok(response) => Ok(Ok(self.converter.convert(response, target)?)),
            Err(remote) => Ok(Err(remote)),
        }
    }

    /// Sends `request` and extracts a typed entity from the response.
    pub(crate) async fn call_entity<E>(
        &self,
        request: ApiRequest,
        shape: EntityShape,
    ) -> Result<Result<E, RemoteError>, CallError>
    where
        E: TryFrom<Entity, Error = Entity>,
    {
        let converted = match self.call(request, ConversionTarget::Entity(shape)).await? {
            Ok(converted) => converted,
            Err(remote) => return Ok(Err(remote)),
        };
        Ok(Ok(extract(converted, shape)?))
    }

    /// Sends `request` and discards a successful body.
    async fn call_void(&self, request: ApiRequest) -> Result<Result<(), RemoteError>, CallError> {
        Ok(self.state.http.send(request).await?.map(drop))
    }

    /// Returns a client whose document calls target the repository `name`.
    ///
    /// The returned client shares the transport and the registry with `self`.
    pub fn repository(&self, name: impl Into<String>) -> Self {
        let mut client = self.clone();
        client.state.repository = Some(name.into());
        client
    }

    /// The repository targeted by document calls, `None` meaning the server default.
    pub fn repository_name(&self) -> Option<&str> {
        self.state.repository.as_deref()
    }

    /// Fetches the version of the server, as reported for the targeted repository.
    pub async fn fetch_server_version(
        &self,
    ) -> Result<Result<NuxeoVersion, RemoteError>, CallError> {
        let info = match self
            .call(ApiRequest::get(CMIS_PATH), ConversionTarget::Json)
            .await?
        {
            Ok(Converted::Json(info)) => info,
            Ok(other) => {
                return Err(CallError::UnexpectedPayload {
                    expected: "Json",
                    actual: other.kind(),
                });
            }
            Err(remote) => return Ok(Err(remote)),
        };

        let repository = self.repository_name().unwrap_or(DEFAULT_REPOSITORY);
        let version = info
            .get(repository)
            .and_then(|repository| repository.get("productVersion"))
            .and_then(serde_json::Value::as_str)
            .ok_or(CallError::UnexpectedPayload {
                expected: "productVersion",
                actual: "Json",
            })?;

        Ok(Ok(version.parse()?))
    }

    pub async fn fetch_document_root(&self) -> Result<Result<Document, RemoteError>, CallError> {
        self.fetch_document_by_path("/").await
    }

    pub async fn fetch_document_by_id(
        &self,
        id: &str,
    ) -> Result<Result<Document, RemoteError>, CallError> {
        let request = ApiRequest::get(self.document_path(id));
        self.call_entity(request, EntityShape::Document).await
    }

    pub async fn fetch_document_by_path(
        &self,
        path: &str,
    ) -> Result<Result<Document, RemoteError>, CallError> {
        let request = ApiRequest::get(self.path_of(path));
        self.call_entity(request, EntityShape::Document).await
    }

    pub async fn fetch_children(
        &self,
        parent_id: &str,
    ) -> Result<Result<Documents, RemoteError>, CallError> {
        let request = ApiRequest::get(format!("{}/@children", self.document_path(parent_id)));
        self.call_entity(request, EntityShape::Documents).await
    }

    /// Runs an NXQL query.
    pub async fn query(&self, nxql: &str) -> Result<Result<Documents, RemoteError>, CallError> {
        let request =
            ApiRequest::get(format!("{}/query", self.repository_root())).query("query", nxql);
        self.call_entity(request, EntityShape::Documents).await
    }

    /// Creates `document` under the document at `parent_path`.
    pub async fn create_document_by_path(
        &self,
        parent_path: &str,
        document: &Document,
    ) -> Result<Result<Document, RemoteError>, CallError> {
        let request = ApiRequest::post(self.path_of(parent_path), to_body(document)?);
        self.call_entity(request, EntityShape::Document).await
    }

    /// Creates `document` under the document with id `parent_id`.
    pub async fn create_document_by_id(
        &self,
        parent_id: &str,
        document: &Document,
    ) -> Result<Result<Document, RemoteError>, CallError> {
        let request = ApiRequest::post(self.document_path(parent_id), to_body(document)?);
        self.call_entity(request, EntityShape::Document).await
    }

    /// Sends the properties of `document`, which must carry its id.
    pub async fn update_document(
        &self,
        document: &Document,
    ) -> Result<Result<Document, RemoteError>, CallError> {
        let id = document
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(CallError::MissingDocumentId)?;
        let request = ApiRequest::put(self.document_path(id), to_body(document)?);
        self.call_entity(request, EntityShape::Document).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<Result<(), RemoteError>, CallError> {
        self.call_void(ApiRequest::delete(self.document_path(id)))
            .await
    }

    /// Downloads a blob of a document, `xpath` defaulting to the main blob.
    pub async fn fetch_blob(
        &self,
        id: &str,
        xpath: Option<&str>,
    ) -> Result<Result<Blob, RemoteError>, CallError> {
        let xpath = xpath.unwrap_or(DEFAULT_BLOB_XPATH);
        let request = ApiRequest::get(format!(
            "{}/@blob/{}",
            self.document_path(id),
            encode_path(xpath)
        ));

        match self.call(request, ConversionTarget::Unknown).await? {
            Ok(Converted::Blob(blob)) => Ok(Ok(blob)),
            Ok(other) => Err(CallError::UnexpectedPayload {
                expected: "Blob",
                actual: other.kind(),
            }),
            Err(remote) => Ok(Err(remote)),
        }
    }

    pub async fn fetch_workflow_models(
        &self,
    ) -> Result<Result<Workflows, RemoteError>, CallError> {
        let request = ApiRequest::get(format!("{API_PATH}/workflowModel"));
        self.call_entity(request, EntityShape::Workflows).await
    }

    /// The user the client is authenticated as.
    pub async fn fetch_current_user(&self) -> Result<Result<User, RemoteError>, CallError> {
        let request = ApiRequest::get(format!("{API_PATH}/me"));
        self.call_entity(request, EntityShape::User).await
    }

    pub async fn fetch_user(&self, username: &str) -> Result<Result<User, RemoteError>, CallError> {
        let request = ApiRequest::get(format!("{API_PATH}/user/{}", encode(username)));
        self.call_entity(request, EntityShape::User).await
    }

    pub async fn create_user(&self, user: &User) -> Result<Result<User, RemoteError>, CallError> {
        let request = ApiRequest::post(format!("{API_PATH}/user"), to_body(user)?);
        self.call_entity(request, EntityShape::User).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<Result<(), RemoteError>, CallError> {
        let request = ApiRequest::delete(format!("{API_PATH}/user/{}", encode(username)));
        self.call_void(request).await
    }

    pub async fn fetch_group(&self, name: &str) -> Result<Result<Group, RemoteError>, CallError> {
        let request = ApiRequest::get(format!("{API_PATH}/group/{}", encode(name)));
        self.call_entity(request, EntityShape::Group).await
    }

    pub async fn create_group(
        &self,
        group: &Group,
    ) -> Result<Result<Group, RemoteError>, CallError> {
        let request = ApiRequest::post(format!("{API_PATH}/group"), to_body(group)?);
        self.call_entity(request, EntityShape::Group).await
    }

    pub async fn delete_group(&self, name: &str) -> Result<Result<(), RemoteError>, CallError> {
        let request = ApiRequest::delete(format!("{API_PATH}/group/{}", encode(name)));
        self.call_void(request).await
    }
}

impl NuxeoClient<Online> {
    /// `api/v1`, or `api/v1/repo/<name>` when a repository is selected.
    fn repository_root(&self) -> String {
        match self.repository_name() {
            Some(name) => format!("{API_PATH}/repo/{}", encode(name)),
            None => API_PATH.to_string(),
        }
    }

    fn document_path(&self, id: &str) -> String {
        format!("{}/id/{}", self.repository_root(), encode(id))
    }

    fn path_of(&self, path: &str) -> String {
        format!("{}/path/{}", self.repository_root(), encode_path(path))
    }
}

/// Percent-encodes a single path segment.
fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Percent-encodes every segment of a document path or xpath, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode)
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn to_body<S: serde::Serialize>(value: &S) -> Result<serde_json::Value, CallError> {
    serde_json::to_value(value).map_err(CallError::Encode)
}

fn extract<E>(converted: Converted, shape: EntityShape) -> Result<E, CallError>
where
    E: TryFrom<Entity, Error = Entity>,
{
    let actual = converted.kind();
    let entity = converted
        .into_entity()
        .ok_or(CallError::UnexpectedPayload {
            expected: shape.name(),
            actual,
        })?;
    E::try_from(entity).map_err(|entity| CallError::UnexpectedPayload {
        expected: shape.name(),
        actual: entity.shape().name(),
    })
}
