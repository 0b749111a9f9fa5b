use clap::Subcommand;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::security::payload::Payload;
use crate::types::Action;

#[derive(Subcommand)]
pub enum LevelCommands {
    #[command(about = "Create a security level in a project")]
    Create {
        #[arg(help = "Level title")]
        title: String,
        #[arg(long, help = "Owning project id")]
        project: Uuid,
        #[arg(long, help = "Classification 0 (None) to 5 (Secret)")]
        level: i64,
        #[arg(long, help = "Optional description")]
        description: Option<String>,
    },

    #[command(about = "Show one security level")]
    Read {
        #[arg(help = "Security level id")]
        id: Uuid,
    },

    #[command(about = "List security levels, optionally for one project")]
    List {
        #[arg(long, help = "Only levels of this project")]
        project: Option<Uuid>,
    },

    #[command(about = "Change title, description or classification")]
    Modify {
        #[arg(help = "Security level id")]
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        level: Option<i64>,
    },

    #[command(about = "Remove a security level and every grant on it")]
    Remove {
        #[arg(help = "Security level id")]
        id: Uuid,
    },
}

pub async fn handle(cmd: LevelCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (action, data, message) = match cmd {
        LevelCommands::Create { title, project, level, description } => (
            Action::Create,
            create_payload(&title, project, level, description),
            format!("Created security level '{}'", title),
        ),
        LevelCommands::Read { id } => (Action::Read, level_payload(id), format!("Security level {}", id)),
        LevelCommands::List { project } => (Action::List, list_payload(project), "Security levels".to_string()),
        LevelCommands::Modify { id, title, description, level } => (
            Action::Modify,
            modify_payload(id, title, description, level),
            format!("Updated security level {}", id),
        ),
        LevelCommands::Remove { id } => {
            (Action::Remove, level_payload(id), format!("Removed security level {}", id))
        }
    };

    let data = client.execute(action, data).await?;
    output_success(&output_format, &message, data)
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

pub fn create_payload(title: &str, project: Uuid, level: i64, description: Option<String>) -> Payload {
    let mut data = object(json!({ "title": title, "projectId": project, "level": level }));
    if let Some(description) = description {
        data.insert("description".to_string(), json!(description));
    }
    data
}

pub fn level_payload(id: Uuid) -> Payload {
    object(json!({ "securityLevelId": id }))
}

pub fn list_payload(project: Option<Uuid>) -> Payload {
    project.map(|p| object(json!({ "projectId": p }))).unwrap_or_default()
}

/// Only the flags that were given are sent
pub fn modify_payload(
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    level: Option<i64>,
) -> Payload {
    let mut data = level_payload(id);
    if let Some(title) = title {
        data.insert("title".to_string(), json!(title));
    }
    if let Some(description) = description {
        data.insert("description".to_string(), json!(description));
    }
    if let Some(level) = level {
        data.insert("level".to_string(), json!(level));
    }
    data
}
