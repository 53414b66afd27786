use colored::*;
use nuxeo_core::{
    client::{CallError, online::ClientConnectError},
    entity::{Document, Documents, Entity, Group, User, Workflows},
    error::{ConvertError, RemoteError},
    marshal::{
        blob::{Blob, Blobs},
        converter::Converted,
    },
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// A plain confirmation message.
pub struct Done(pub String);

/// A suggestion printed after the result.
pub struct Hint(pub &'static str);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<Done> for FormattedString {
    fn from(Done(message): Done) -> Self {
        FormattedString(message.green().to_string())
    }
}

impl From<Hint> for FormattedString {
    fn from(Hint(message): Hint) -> Self {
        FormattedString(message.yellow().to_string())
    }
}

impl From<RemoteError> for FormattedString {
    fn from(err: RemoteError) -> Self {
        let mut out = format!(
            "{} status={} message={:?}",
            "Server Error:".red().bold(),
            err.status(),
            err.message()
        );
        if let Some(exception) = err.exception() {
            out.push_str(&format!("\n  {} {}", "exception:".dimmed(), exception));
        }
        FormattedString(out)
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), err))
    }
}

impl From<ConvertError> for FormattedString {
    fn from(err: ConvertError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Conversion Failed:".red().bold(),
            err
        ))
    }
}

impl From<ClientConnectError> for FormattedString {
    fn from(err: ClientConnectError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Connection Error:".red().bold(), err))
    }
}

impl From<std::io::Error> for FormattedString {
    fn from(err: std::io::Error) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to read file:".red().bold(),
            err
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<Converted> for FormattedString {
    fn from(converted: Converted) -> Self {
        match converted {
            Converted::Entity(entity) => FormattedString::from(entity),
            Converted::Json(value) => FormattedString::from(value),
            Converted::Text(text) => FormattedString(text),
            Converted::Blob(blob) => FormattedString::from(blob),
            Converted::Blobs(blobs) => FormattedString::from(blobs),
        }
    }
}

impl From<Entity> for FormattedString {
    fn from(entity: Entity) -> Self {
        match entity {
            Entity::Document(document) => FormattedString::from(document),
            Entity::Documents(documents) => FormattedString::from(documents),
            Entity::User(user) => FormattedString::from(user),
            Entity::Group(group) => FormattedString::from(group),
            Entity::Workflows(workflows) => FormattedString::from(workflows),
            Entity::RecordSet(record_set) => json_of(&record_set),
            Entity::Workflow(workflow) => json_of(&workflow),
            Entity::Generic(value) => FormattedString::from(value),
        }
    }
}

impl From<Document> for FormattedString {
    fn from(document: Document) -> Self {
        let mut out = format!(
            "{} {} {}\n",
            "document".cyan(),
            document.doc_type.as_deref().unwrap_or("?").green(),
            document.path.as_deref().unwrap_or_default()
        );
        push_field(&mut out, "uid", document.id.as_deref());
        push_field(&mut out, "title", document.title.as_deref());
        push_field(&mut out, "state", document.state.as_deref());
        push_field(&mut out, "modified", document.last_modified.as_deref());
        if !document.facets.is_empty() {
            push_field(&mut out, "facets", Some(&document.facets.join(", ")));
        }
        if !document.properties.is_empty() {
            let properties = serde_json::Value::Object(document.properties);
            out.push_str(&format!("  {}\n", "properties:".dimmed()));
            let pretty = serde_json::to_string_pretty(&properties)
                .unwrap_or_else(|_| properties.to_string());
            for line in pretty.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Documents> for FormattedString {
    fn from(documents: Documents) -> Self {
        if documents.is_empty() {
            return FormattedString("No documents found.".yellow().to_string());
        }

        let mut out = String::new();
        for document in &documents.entries {
            out.push_str(&format!(
                "  - {} {} {}\n",
                document.id.as_deref().unwrap_or("?").green(),
                document.doc_type.as_deref().unwrap_or("?").cyan(),
                document
                    .path
                    .as_deref()
                    .or(document.title.as_deref())
                    .unwrap_or_default()
            ));
        }
        if let Some(total) = documents.results_count {
            out.push_str(&format!("{} {}", "total:".dimmed(), total));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<User> for FormattedString {
    fn from(user: User) -> Self {
        let mut out = format!(
            "{} {}\n",
            "user".cyan(),
            user.username().unwrap_or("?").green()
        );
        let full_name = [user.first_name(), user.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !full_name.is_empty() {
            push_field(&mut out, "name", Some(&full_name));
        }
        push_field(&mut out, "email", user.email());
        let groups = user.groups();
        if !groups.is_empty() {
            push_field(&mut out, "groups", Some(&groups.join(", ")));
        }
        if user.is_administrator == Some(true) {
            push_field(&mut out, "administrator", Some("yes"));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Group> for FormattedString {
    fn from(group: Group) -> Self {
        let mut out = format!("{} {}\n", "group".cyan(), group.name.green());
        push_field(&mut out, "label", group.label.as_deref());
        if !group.member_users.is_empty() {
            push_field(&mut out, "users", Some(&group.member_users.join(", ")));
        }
        if !group.member_groups.is_empty() {
            push_field(&mut out, "groups", Some(&group.member_groups.join(", ")));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Workflows> for FormattedString {
    fn from(workflows: Workflows) -> Self {
        if workflows.is_empty() {
            return FormattedString("No workflows found.".yellow().to_string());
        }

        let mut out = String::new();
        for workflow in &workflows.entries {
            out.push_str(&format!(
                "  - {} {}\n",
                workflow
                    .name
                    .as_deref()
                    .or(workflow.workflow_model_name.as_deref())
                    .unwrap_or("?")
                    .green(),
                workflow.title.as_deref().unwrap_or_default()
            ));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Blob> for FormattedString {
    fn from(blob: Blob) -> Self {
        FormattedString(blob_line(&blob))
    }
}

impl From<Blobs> for FormattedString {
    fn from(blobs: Blobs) -> Self {
        if blobs.is_empty() {
            return FormattedString("No blobs received.".yellow().to_string());
        }

        let mut out = format!("{} {}\n", blobs.len(), "blobs:".cyan());
        for blob in &blobs {
            out.push_str(&format!("  - {}\n", blob_line(blob)));
        }
        FormattedString(out.trim_end().to_string())
    }
}

fn blob_line(blob: &Blob) -> String {
    let length = match blob.length() {
        -1 => "unknown size".to_string(),
        length => format!("{length} bytes"),
    };
    format!(
        "{} {} ({})",
        blob.filename().unwrap_or("<unnamed>").green(),
        blob.mime_type().cyan(),
        length
    )
}

fn push_field(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("  {} {}\n", format!("{name}:").dimmed(), value));
    }
}

fn json_of<T: serde::Serialize>(value: &T) -> FormattedString {
    match serde_json::to_value(value) {
        Ok(value) => FormattedString::from(value),
        Err(err) => FormattedString::from(GenericError("Failed to format entity", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_line_hides_temporary_path() {
        let blob = Blob::from_bytes("hello", Some("hello.txt".to_string()), "text/plain").unwrap();
        let line = blob_line(&blob);

        assert!(line.contains("hello.txt"));
        assert!(line.contains("5 bytes"));
        assert!(!line.contains(&blob.path().display().to_string()));
    }
}
