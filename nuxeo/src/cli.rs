//! # CLI
//!
//! This module defines the command-line interface of `nuxeo` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring
//! operation parameters are `key=value` and headers are `key:value`).
use clap::{Args, Parser, Subcommand, ValueEnum};
use nuxeo_core::entity::EntityShape;
use nuxeo_core::marshal::converter::ConversionTarget;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nuxeo", version, about = "Nuxeo REST and automation CLI")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// The server URL (e.g. http://localhost:8080/nuxeo)
    #[arg(long, global = true, env = "NUXEO_URL")]
    pub url: Option<String>,

    /// Username for basic authentication
    #[arg(short, long, global = true, env = "NUXEO_USER")]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(long, global = true, env = "NUXEO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Authentication token, takes precedence over basic authentication
    #[arg(long, global = true, env = "NUXEO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Portal SSO secret, signs requests as --user instead of sending a password
    #[arg(long, global = true, env = "NUXEO_PORTAL_SECRET", hide_env_values = true)]
    pub portal_secret: Option<String>,

    /// Repository targeted by document commands (defaults to the server default)
    #[arg(long, global = true, env = "NUXEO_REPOSITORY")]
    pub repository: Option<String>,

    /// Document schemas to fetch (e.g. dublincore,file or *)
    #[arg(long, global = true, value_delimiter = ',')]
    pub schemas: Vec<String>,

    /// JSON configuration file, overridden by the flags above
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute an automation operation or chain
    ///
    /// The result is printed as whatever the server returned: a document, a list of documents,
    /// raw JSON for entities the client does not know, or the blobs written to disk.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// nuxeo operation Repository.Query -p query="SELECT * FROM Note" -p pageSize=10
    /// nuxeo operation Document.Fetch --input /default-domain
    /// nuxeo operation Blob.AttachOnDocument -p document=/file --blob notes.txt --blob-type text/plain
    /// ```
    Operation {
        /// Operation or chain id (e.g. Document.Fetch)
        id: String,

        /// Operation parameter, values are parsed as JSON when possible
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,

        /// Automation context variable
        #[arg(short = 'c', long = "context", value_parser = parse_param)]
        context: Vec<(String, serde_json::Value)>,

        /// Input document(s), by path or id. Several references are comma separated.
        #[arg(long, value_delimiter = ',', conflicts_with = "blob")]
        input: Vec<String>,

        /// Local file uploaded as the operation input
        #[arg(long)]
        blob: Option<PathBuf>,

        /// Mime type of the uploaded file
        #[arg(long, requires = "blob", default_value = "application/octet-stream")]
        blob_type: String,

        /// Directory where returned blobs are saved
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Browse and manage documents
    Document {
        #[command(subcommand)]
        sub: DocumentCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        sub: UserCommands,
    },

    /// Manage groups
    Group {
        #[command(subcommand)]
        sub: GroupCommands,
    },

    /// List the workflow models
    Workflows,

    /// Print the server version
    Version,

    /// Download a blob of a document
    Blob {
        /// Document id
        id: String,
        /// Blob xpath (defaults to the main blob)
        #[arg(long)]
        xpath: Option<String>,
        /// Copy the blob to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a captured response body, without contacting any server
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// nuxeo decode response.json --content-type application/json -H entity-type:document
    /// ```
    Decode {
        /// File holding the response body
        file: PathBuf,

        /// The response content type
        #[arg(long)]
        content_type: String,

        /// Additional response headers
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// The shape the caller expects
        #[arg(long, value_enum, default_value_t = Target::Unknown)]
        target: Target,
    },
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Fetch the repository root
    Root,
    /// Fetch a document by path (starting with '/') or id
    Get { reference: String },
    /// List the children of a document
    Children { id: String },
    /// Run an NXQL query
    Query { nxql: String },
    /// Delete a document
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Fetch a user, or the current one when no username is given
    Get { username: Option<String> },
    /// Delete a user
    Delete { username: String },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Fetch a group
    Get { name: String },
    /// Delete a group
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Unknown,
    Json,
    Document,
    Documents,
    RecordSet,
    User,
    Group,
    Workflow,
    Workflows,
}

impl From<Target> for ConversionTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Unknown => ConversionTarget::Unknown,
            Target::Json => ConversionTarget::Json,
            Target::Document => ConversionTarget::Entity(EntityShape::Document),
            Target::Documents => ConversionTarget::Entity(EntityShape::Documents),
            Target::RecordSet => ConversionTarget::Entity(EntityShape::RecordSet),
            Target::User => ConversionTarget::Entity(EntityShape::User),
            Target::Group => ConversionTarget::Entity(EntityShape::Group),
            Target::Workflow => ConversionTarget::Entity(EntityShape::Workflow),
            Target::Workflows => ConversionTarget::Entity(EntityShape::Workflows),
        }
    }
}

fn parse_param(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{s}'. Format must be 'key=value'"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err("Parameter name cannot be empty".to_string());
    }

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    Ok((key.to_string(), value))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("pageSize=10").unwrap(), ("pageSize".into(), json!(10)));
        assert_eq!(
            parse_param("value=/default-domain").unwrap(),
            ("value".into(), json!("/default-domain"))
        );
        assert_eq!(
            parse_param("query=SELECT * FROM Note WHERE a=1").unwrap(),
            ("query".into(), json!("SELECT * FROM Note WHERE a=1"))
        );
        assert_eq!(
            parse_param("properties={\"dc:title\":\"A\"}").unwrap(),
            ("properties".into(), json!({"dc:title": "A"}))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("entity-type: document").unwrap(),
            ("entity-type".into(), "document".into())
        );
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    fn test_cli_parses_operation() {
        let cli = Cli::try_parse_from([
            "nuxeo",
            "--url",
            "http://localhost:8080/nuxeo",
            "operation",
            "Document.Fetch",
            "-p",
            "value=/",
            "--input",
            "/a,/b",
        ])
        .unwrap();

        assert_eq!(
            cli.connection.url.as_deref(),
            Some("http://localhost:8080/nuxeo")
        );
        match cli.command {
            Commands::Operation { id, params, input, .. } => {
                assert_eq!(id, "Document.Fetch");
                assert_eq!(params, vec![("value".to_string(), json!("/"))]);
                assert_eq!(input, vec!["/a", "/b"]);
            }
            _ => panic!("Expected the operation command"),
        }
    }

    #[test]
    fn test_cli_parses_blob_input() {
        let cli = Cli::try_parse_from([
            "nuxeo",
            "--repository",
            "other",
            "operation",
            "Blob.AttachOnDocument",
            "--blob",
            "notes.txt",
            "--blob-type",
            "text/plain",
        ])
        .unwrap();

        assert_eq!(cli.connection.repository.as_deref(), Some("other"));
        match cli.command {
            Commands::Operation {
                blob, blob_type, ..
            } => {
                assert_eq!(blob, Some(PathBuf::from("notes.txt")));
                assert_eq!(blob_type, "text/plain");
            }
            _ => panic!("Expected the operation command"),
        }

        assert!(
            Cli::try_parse_from(["nuxeo", "operation", "X", "--input", "/a", "--blob", "f"])
                .is_err()
        );
    }

    #[test]
    fn test_cli_parses_decode_target() {
        let cli = Cli::try_parse_from([
            "nuxeo",
            "decode",
            "body.json",
            "--content-type",
            "application/json",
            "--target",
            "record-set",
        ])
        .unwrap();

        match cli.command {
            Commands::Decode { target, .. } => {
                assert_eq!(target, Target::RecordSet);
                assert_eq!(
                    ConversionTarget::from(target),
                    ConversionTarget::Entity(EntityShape::RecordSet)
                );
            }
            _ => panic!("Expected the decode command"),
        }
    }
}
