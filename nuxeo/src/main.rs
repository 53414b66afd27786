//! # Nuxeo CLI Entry Point
//!
//! The main executable for the `nuxeo` tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and sets up logging.
//! 2. **Configuration**: Builds a `ClientConfig` from the flags, the environment or a file.
//! 3. **Execution**: Delegates the request to a `NuxeoClient`, online or offline.
//! 4. **Presentation**: Formats and prints the resulting value or error to standard output/error.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs, DocumentCommands, GroupCommands, Target, UserCommands};
use formatter::{Done, FormattedString, GenericError, Hint};
use nuxeo_core::{
    client::{
        CallError, NuxeoClient, Online,
        config::{Authentication, ClientConfig},
    },
    entity::registry::EntityRegistry,
    error::RemoteError,
    http::{HeaderMap, HeaderName, HeaderValue, header::CONTENT_TYPE},
    marshal::{blob::Blob, converter::Converted, converter::RawResponse},
};
use std::{
    path::{Path, PathBuf},
    process,
};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

const SAVE_HINT: &str = "Blob content is discarded on exit, pass --output to keep it.";

/// What an automation call from the command line runs on.
enum OperationInput {
    Documents(Vec<String>),
    Blob(Blob),
}

#[tokio::main]
async fn main() {
    let Cli {
        connection,
        verbose,
        command,
    } = Cli::parse();

    init_tracing(verbose);

    match command {
        Commands::Decode {
            file,
            content_type,
            headers,
            target,
        } => decode(&file, &content_type, headers, target),
        Commands::Operation {
            id,
            params,
            context,
            input,
            blob,
            blob_type,
            output,
        } => {
            let client = connect_or_exit(connection).await;
            let input = match blob {
                Some(path) => OperationInput::Blob(load_blob(&path, blob_type)),
                None => OperationInput::Documents(input),
            };
            run_operation(&client, id, params, context, input, output).await;
        }
        Commands::Document { sub } => {
            let client = connect_or_exit(connection).await;
            run_document(&client, sub).await;
        }
        Commands::User { sub } => {
            let client = connect_or_exit(connection).await;
            run_user(&client, sub).await;
        }
        Commands::Group { sub } => {
            let client = connect_or_exit(connection).await;
            run_group(&client, sub).await;
        }
        Commands::Workflows => {
            let client = connect_or_exit(connection).await;
            print_outcome(client.fetch_workflow_models().await);
        }
        Commands::Version => {
            let client = connect_or_exit(connection).await;
            let version = unwrap_outcome(client.fetch_server_version().await);
            println!("{}", FormattedString::from(Done(version.to_string())));
        }
        Commands::Blob { id, xpath, output } => {
            let client = connect_or_exit(connection).await;
            let blob = unwrap_outcome(client.fetch_blob(&id, xpath.as_deref()).await);
            println!("{}", FormattedString::from(blob.clone()));
            match output {
                Some(output) => save_blob(&blob, &output),
                None => println!("{}", FormattedString::from(Hint(SAVE_HINT))),
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run_document(client: &NuxeoClient<Online>, command: DocumentCommands) {
    match command {
        DocumentCommands::Root => print_outcome(client.fetch_document_root().await),
        DocumentCommands::Get { reference } if reference.starts_with('/') => {
            print_outcome(client.fetch_document_by_path(&reference).await)
        }
        DocumentCommands::Get { reference } => {
            print_outcome(client.fetch_document_by_id(&reference).await)
        }
        DocumentCommands::Children { id } => print_outcome(client.fetch_children(&id).await),
        DocumentCommands::Query { nxql } => print_outcome(client.query(&nxql).await),
        DocumentCommands::Delete { id } => {
            let outcome = client.delete_document(&id).await;
            print_outcome(done(outcome, format!("Deleted document '{id}'")))
        }
    }
}

async fn run_user(client: &NuxeoClient<Online>, command: UserCommands) {
    match command {
        UserCommands::Get { username: None } => print_outcome(client.fetch_current_user().await),
        UserCommands::Get {
            username: Some(username),
        } => print_outcome(client.fetch_user(&username).await),
        UserCommands::Delete { username } => {
            let outcome = client.delete_user(&username).await;
            print_outcome(done(outcome, format!("Deleted user '{username}'")))
        }
    }
}

async fn run_group(client: &NuxeoClient<Online>, command: GroupCommands) {
    match command {
        GroupCommands::Get { name } => print_outcome(client.fetch_group(&name).await),
        GroupCommands::Delete { name } => {
            let outcome = client.delete_group(&name).await;
            print_outcome(done(outcome, format!("Deleted group '{name}'")))
        }
    }
}

async fn run_operation(
    client: &NuxeoClient<Online>,
    id: String,
    params: Vec<(String, serde_json::Value)>,
    context: Vec<(String, serde_json::Value)>,
    input: OperationInput,
    output: Option<PathBuf>,
) {
    let mut operation = client.operation(id);
    for (key, value) in params {
        operation = operation.param(key, value);
    }
    for (key, value) in context {
        operation = operation.context(key, value);
    }
    operation = match input {
        OperationInput::Blob(blob) => operation.input_blob(blob),
        OperationInput::Documents(references) => match references.as_slice() {
            [] => operation,
            [single] => operation.input_document(single),
            many => operation.input_documents(many),
        },
    };

    let converted = unwrap_outcome(operation.execute().await);
    let returns_blobs = matches!(converted, Converted::Blob(_) | Converted::Blobs(_));

    let saved = match (&output, &converted) {
        (Some(dir), Converted::Blob(blob)) => {
            save_blob(blob, &dir.join(blob_file_name(blob, 0)));
            true
        }
        (Some(dir), Converted::Blobs(blobs)) => {
            for (index, blob) in blobs.iter().enumerate() {
                save_blob(blob, &dir.join(blob_file_name(blob, index)));
            }
            true
        }
        _ => false,
    };

    println!("{}", FormattedString::from(converted));
    if returns_blobs && !saved {
        println!("{}", FormattedString::from(Hint(SAVE_HINT)));
    }
}

fn load_blob(path: &Path, mime_type: String) -> Blob {
    match Blob::from_file(path, mime_type) {
        Ok(blob) => blob,
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Failed to read blob", err))
            );
            process::exit(1);
        }
    }
}

fn decode(file: &Path, content_type: &str, headers: Vec<(String, String)>, target: Target) {
    let body = match std::fs::read(file) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let headers = match response_headers(content_type, headers) {
        Ok(headers) => headers,
        Err(err) => {
            eprintln!("{}", FormattedString::from(GenericError("Invalid header", err)));
            process::exit(1);
        }
    };

    let client = NuxeoClient::offline(EntityRegistry::new());
    match client.convert(RawResponse::from_bytes(headers, body), target.into()) {
        Ok(converted) => println!("{}", FormattedString::from(converted)),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn response_headers(
    content_type: &str,
    headers: Vec<(String, String)>,
) -> anyhow::Result<HeaderMap> {
    let mut map = HeaderMap::new();
    map.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .with_context(|| format!("content type '{content_type}'"))?,
    );
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("header name '{key}'"))?;
        let value =
            HeaderValue::from_str(&value).with_context(|| format!("value of header '{key}'"))?;
        map.append(name, value);
    }
    Ok(map)
}

async fn connect_or_exit(connection: ConnectionArgs) -> NuxeoClient<Online> {
    let config = match load_config(connection) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Invalid configuration", format!("{err:#}")))
            );
            process::exit(1);
        }
    };

    match NuxeoClient::connect(config).await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

/// Flags and environment variables take precedence over the configuration file.
fn load_config(connection: ConnectionArgs) -> anyhow::Result<ClientConfig> {
    let ConnectionArgs {
        url,
        user,
        password,
        token,
        portal_secret,
        repository,
        schemas,
        config,
    } = connection;

    let mut config = match (config, url) {
        (Some(path), url) => {
            let mut config = ClientConfig::from_file(&path)?;
            if let Some(url) = url {
                config.url = url;
            }
            config
        }
        (None, Some(url)) => ClientConfig::new(url),
        (None, None) => anyhow::bail!("no server URL, pass --url or set NUXEO_URL"),
    };

    match (token, user, portal_secret) {
        (Some(token), _, _) => config.authentication = Authentication::token(token),
        (None, Some(user), Some(secret)) => {
            config.authentication = Authentication::portal_sso(user, secret);
        }
        (None, Some(user), None) => {
            let password = password.context("--user requires a password")?;
            config.authentication = Authentication::basic(user, password);
        }
        (None, None, Some(_)) => anyhow::bail!("--portal-secret requires --user"),
        (None, None, None) => {}
    }

    if !schemas.is_empty() {
        config.schemas = schemas;
    }
    if repository.is_some() {
        config.repository = repository;
    }

    Ok(config)
}

/// Prints a successful value, or the failure and exits.
fn print_outcome<T>(outcome: Result<Result<T, RemoteError>, CallError>)
where
    FormattedString: From<T>,
{
    let value = unwrap_outcome(outcome);
    println!("{}", FormattedString::from(value));
}

fn unwrap_outcome<T>(outcome: Result<Result<T, RemoteError>, CallError>) -> T {
    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(remote)) => {
            eprintln!("{}", FormattedString::from(remote));
            process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn done(
    outcome: Result<Result<(), RemoteError>, CallError>,
    message: String,
) -> Result<Result<Done, RemoteError>, CallError> {
    outcome.map(|result| result.map(|()| Done(message)))
}

fn save_blob(blob: &Blob, destination: &Path) {
    match blob.save_to(destination) {
        Ok(bytes) => {
            debug!(path = %destination.display(), bytes, "Saved blob");
            println!(
                "{}",
                FormattedString::from(Done(format!("Saved to {}", destination.display())))
            );
        }
        Err(err) => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Failed to save blob", err))
            );
            process::exit(1);
        }
    }
}

fn blob_file_name(blob: &Blob, index: usize) -> String {
    blob.filename()
        .map(str::to_string)
        .unwrap_or_else(|| format!("blob-{index}"))
}
