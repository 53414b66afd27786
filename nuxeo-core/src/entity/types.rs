use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ENTITY_TYPE_DOCUMENT: &str = "document";
pub const ENTITY_TYPE_DOCUMENTS: &str = "documents";
pub const ENTITY_TYPE_RECORDSET: &str = "recordSet";
pub const ENTITY_TYPE_USER: &str = "user";
pub const ENTITY_TYPE_GROUP: &str = "group";
pub const ENTITY_TYPE_WORKFLOW: &str = "workflow";
pub const ENTITY_TYPE_WORKFLOWS: &str = "workflows";

fn document_tag() -> String {
    ENTITY_TYPE_DOCUMENT.to_string()
}

fn documents_tag() -> String {
    ENTITY_TYPE_DOCUMENTS.to_string()
}

fn recordset_tag() -> String {
    ENTITY_TYPE_RECORDSET.to_string()
}

fn user_tag() -> String {
    ENTITY_TYPE_USER.to_string()
}

fn group_tag() -> String {
    ENTITY_TYPE_GROUP.to_string()
}

fn workflow_tag() -> String {
    ENTITY_TYPE_WORKFLOW.to_string()
}

fn workflows_tag() -> String {
    ENTITY_TYPE_WORKFLOWS.to_string()
}

/// A document of the repository.
///
/// Only the fields the client relies on are typed, schema values live in `properties`
/// keyed by their prefixed name (e.g. `dc:title`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "entity-type", default = "document_tag")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Document {
    /// A new document to be created under a parent, identified by its name.
    pub fn with_name(name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            doc_type: Some(doc_type.into()),
            ..Self::empty()
        }
    }

    /// A reference to an existing document, typically used for updates.
    pub fn with_id(id: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            doc_type: Some(doc_type.into()),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            entity_type: document_tag(),
            repository: None,
            id: None,
            path: None,
            doc_type: None,
            name: None,
            state: None,
            parent_ref: None,
            title: None,
            last_modified: None,
            change_token: None,
            facets: Vec::new(),
            properties: Map::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }
}

/// A page of documents, as returned by children listings and queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    #[serde(rename = "entity-type", default = "documents_tag")]
    pub entity_type: String,
    #[serde(default)]
    pub entries: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paginable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_pages: Option<i64>,
}

impl Documents {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rows returned by `Repository.ResultSetQuery` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    #[serde(rename = "entity-type", default = "recordset_tag")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paginable: Option<bool>,
    #[serde(default)]
    pub entries: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "entity-type", default = "user_tag")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_administrator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_anonymous: Option<bool>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let mut properties = Map::new();
        properties.insert("username".to_string(), Value::String(username.clone()));
        Self {
            entity_type: user_tag(),
            id: Some(username),
            is_administrator: None,
            is_anonymous: None,
            properties,
        }
    }

    fn string_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn username(&self) -> Option<&str> {
        self.string_property("username").or(self.id.as_deref())
    }

    pub fn first_name(&self) -> Option<&str> {
        self.string_property("firstName")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.string_property("lastName")
    }

    pub fn email(&self) -> Option<&str> {
        self.string_property("email")
    }

    pub fn groups(&self) -> Vec<&str> {
        self.properties
            .get("groups")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "entity-type", default = "group_tag")]
    pub entity_type: String,
    #[serde(rename = "groupname")]
    pub name: String,
    #[serde(rename = "grouplabel", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub member_users: Vec<String>,
    #[serde(default)]
    pub member_groups: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entity_type: group_tag(),
            name: name.into(),
            label: None,
            member_users: Vec::new(),
            member_groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(rename = "entity-type", default = "workflow_tag")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflows {
    #[serde(rename = "entity-type", default = "workflows_tag")]
    pub entity_type: String,
    #[serde(default)]
    pub entries: Vec<Workflow>,
}

impl Workflows {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
