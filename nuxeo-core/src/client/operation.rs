//! # Automation Operations
//!
//! Automation calls are where the response marshalling earns its keep: the same endpoint can
//! return a document, a list of documents, a record set, a blob, a zip of blobs or nothing at
//! all, depending on the operation and its input. The call site cannot know the shape, so the
//! result is converted with [`ConversionTarget::Unknown`] and resolved from the payload itself.
//!
//! ```rust,no_run
//! # use nuxeo_core::client::{NuxeoClient, Online};
//! # async fn run(client: NuxeoClient<Online>) -> Result<(), Box<dyn std::error::Error>> {
//! let result = client
//!     .operation("Document.Create")
//!     .input_document("/default-domain/workspaces")
//!     .param("type", "File")
//!     .param("name", "report")
//!     .execute()
//!     .await??;
//! # Ok(())
//! # }
//! ```
//!
//! A blob input switches the request to `multipart/related`: the JSON request goes first, the
//! blob content second.
use super::{CallError, NuxeoClient, Online, transport::ApiRequest};
use crate::{
    error::RemoteError,
    marshal::{
        blob::Blob,
        converter::{ConversionTarget, Converted},
    },
};
use serde_json::{Map, Value, json};
use tracing::debug;

const AUTOMATION_PATH: &str = "api/v1/automation";
const REQUEST_CONTENT_TYPE: &str = "application/json+nxrequest";

/// What the operation runs on.
#[derive(Debug, Clone)]
enum Input {
    Json(Value),
    Blob(Blob),
}

/// A pending automation call, built from [`NuxeoClient::operation`].
#[derive(Debug, Clone)]
pub struct Operation<'a> {
    client: &'a NuxeoClient<Online>,
    id: String,
    params: Map<String, Value>,
    context: Map<String, Value>,
    input: Option<Input>,
}

impl NuxeoClient<Online> {
    /// Starts an automation call to the operation or chain `id`.
    pub fn operation(&self, id: impl Into<String>) -> Operation<'_> {
        Operation {
            client: self,
            id: id.into(),
            params: Map::new(),
            context: Map::new(),
            input: None,
        }
    }
}

impl Operation<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets a variable of the automation context.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Uses a single document as input, referenced by path or id.
    pub fn input_document(mut self, reference: &str) -> Self {
        self.input = Some(Input::Json(Value::String(format!("doc:{reference}"))));
        self
    }

    /// Uses several documents as input, referenced by path or id.
    pub fn input_documents<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let references: Vec<String> = references
            .into_iter()
            .map(|reference| reference.as_ref().to_string())
            .collect();
        self.input = Some(Input::Json(Value::String(format!(
            "docs:{}",
            references.join(",")
        ))));
        self
    }

    /// Uses an arbitrary JSON value as input.
    pub fn input_json(mut self, input: Value) -> Self {
        self.input = Some(Input::Json(input));
        self
    }

    /// Uses a blob as input, uploaded along with the request.
    pub fn input_blob(mut self, blob: Blob) -> Self {
        self.input = Some(Input::Blob(blob));
        self
    }

    /// The JSON request sent to the server. A blob input travels in its own part.
    pub fn body(&self) -> Value {
        let mut body = json!({
            "params": self.params,
            "context": self.context,
        });
        if let (Some(Input::Json(input)), Some(object)) = (&self.input, body.as_object_mut()) {
            object.insert("input".to_string(), input.clone());
        }
        body
    }

    fn request(&self) -> Result<ApiRequest, CallError> {
        let path = format!("{AUTOMATION_PATH}/{}", urlencoding::encode(&self.id));
        match &self.input {
            Some(Input::Blob(blob)) => {
                let boundary = format!("nuxeo-{:016x}", rand::random::<u64>());
                let content = related_body(&boundary, &self.body(), blob)?;
                let content_type = format!(
                    "multipart/related; boundary={boundary}; type=\"{REQUEST_CONTENT_TYPE}\"; start=request"
                );
                Ok(ApiRequest::new(reqwest::Method::POST, path).raw_body(content_type, content))
            }
            _ => Ok(ApiRequest::post(path, self.body())),
        }
    }

    /// Runs the operation.
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(Converted))` - Whatever the response resolves to: an entity, raw text for
    ///   unregistered entity types, a blob or a collection of blobs.
    /// * `Ok(Err(RemoteError))` - The server answered with an error status.
    /// * `Err(CallError)` - The request could not be sent, or the payload could not be converted.
    pub async fn execute(self) -> Result<Result<Converted, RemoteError>, CallError> {
        debug!(operation = %self.id, "Executing automation operation");
        let request = self.request()?;
        self.client.call(request, ConversionTarget::Unknown).await
    }
}

/// Encodes the JSON request and the blob input as a `multipart/related` body.
fn related_body(boundary: &str, request: &Value, blob: &Blob) -> Result<Vec<u8>, CallError> {
    let request = serde_json::to_vec(request).map_err(CallError::Encode)?;
    let content = blob.to_bytes().map_err(CallError::ReadBlob)?;
    let filename = blob.filename().unwrap_or("blob");

    let mut body = Vec::with_capacity(request.len() + content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: {REQUEST_CONTENT_TYPE}; charset=UTF-8\r\nContent-ID: request\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&request);
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Type: {}\r\nContent-Disposition: attachment; filename=\"{}\"\r\nContent-ID: input\r\n\r\n",
            blob.mime_type(),
            filename.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(&content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{config::ClientConfig, transport::RequestBody},
        marshal::multipart,
        media_type::MediaType,
    };

    fn client() -> NuxeoClient<Online> {
        NuxeoClient::from_config(ClientConfig::new("http://localhost:8080/nuxeo")).unwrap()
    }

    #[test]
    fn test_body_with_document_input() {
        let client = client();
        let operation = client
            .operation("Document.Fetch")
            .param("value", "/default-domain")
            .context("reason", "test")
            .input_document("/default-domain");

        assert_eq!(operation.id(), "Document.Fetch");
        assert_eq!(
            operation.body(),
            json!({
                "params": { "value": "/default-domain" },
                "context": { "reason": "test" },
                "input": "doc:/default-domain"
            })
        );
    }

    #[test]
    fn test_body_with_documents_input() {
        let client = client();
        let operation = client
            .operation("Document.Delete")
            .input_documents(["id-1", "id-2"]);
        assert_eq!(operation.body()["input"], json!("docs:id-1,id-2"));
    }

    #[test]
    fn test_blob_input_is_sent_as_related_parts() {
        let client = client();
        let blob = Blob::from_bytes(b"hello blob", Some("note.txt".to_string()), "text/plain")
            .unwrap();
        let operation = client
            .operation("Blob.AttachOnDocument")
            .param("document", "/file")
            .input_blob(blob);

        assert!(operation.body().get("input").is_none());

        let request = operation.request().unwrap();
        assert_eq!(request.path(), "api/v1/automation/Blob.AttachOnDocument");
        let Some(RequestBody::Raw {
            content_type,
            content,
        }) = request.payload()
        else {
            panic!("Expected a raw multipart body");
        };

        let media_type = MediaType::parse(content_type);
        assert_eq!(media_type.essence(), "multipart/related");
        let parts = multipart::read_parts(&media_type, &content[..]).unwrap();
        assert_eq!(parts.len(), 2);

        let request: Value = serde_json::from_slice(&parts[0].body).unwrap();
        assert_eq!(request["params"], json!({ "document": "/file" }));
        assert_eq!(
            parts[1].headers.get("content-disposition").unwrap(),
            "attachment; filename=\"note.txt\""
        );
        assert_eq!(parts[1].headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(&parts[1].body[..], b"hello blob");
    }

    #[test]
    fn test_body_without_input() {
        let client = client();
        let body = client.operation("Repository.Query").param("pageSize", 2).body();
        assert_eq!(body, json!({ "params": { "pageSize": 2 }, "context": {} }));
    }
}
