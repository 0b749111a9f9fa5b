use clap::{Args, Subcommand};
use serde_json::json;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::security::payload::Payload;
use crate::types::Action;

/// Exactly one recipient flag; clap enforces the choice
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct RecipientArgs {
    #[arg(long = "user", help = "Grant to a single user")]
    pub user_id: Option<Uuid>,
    #[arg(long = "team", help = "Grant to every member of a team")]
    pub team_id: Option<Uuid>,
    #[arg(long = "role", help = "Grant to holders of a project role")]
    pub project_role_id: Option<Uuid>,
}

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Grant a user, team or project role access to a level")]
    Grant {
        #[arg(help = "Security level id")]
        level: Uuid,
        #[command(flatten)]
        recipient: RecipientArgs,
    },

    #[command(about = "Revoke a previously granted access")]
    Revoke {
        #[arg(help = "Security level id")]
        level: Uuid,
        #[command(flatten)]
        recipient: RecipientArgs,
    },

    #[command(about = "Check whether a user can access a level (defaults to the caller)")]
    Check {
        #[arg(help = "Security level id")]
        level: Uuid,
        #[arg(long = "user", help = "User to check; the token's user when omitted")]
        user_id: Option<Uuid>,
    },

    #[command(about = "Check whether a user can open a ticket or project")]
    CheckEntity {
        #[arg(value_parser = ["ticket", "project"], help = "Entity type")]
        entity_type: String,
        #[arg(help = "Ticket or project id")]
        entity: Uuid,
        #[arg(long = "user", help = "User to check; the token's user when omitted")]
        user_id: Option<Uuid>,
    },
}

pub async fn handle(cmd: AccessCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AccessCommands::Grant { level, recipient } => {
            let data = client.execute(Action::Grant, recipient_payload(level, &recipient)).await?;
            output_success(&output_format, "Access granted", data)
        }
        AccessCommands::Revoke { level, recipient } => {
            let data = client.execute(Action::Revoke, recipient_payload(level, &recipient)).await?;
            output_success(&output_format, "Access revoked", data)
        }
        AccessCommands::Check { level, user_id } => {
            let data = client.execute(Action::Check, check_payload(level, user_id)).await?;
            output_success(&output_format, verdict(&data), data)
        }
        AccessCommands::CheckEntity { entity_type, entity, user_id } => {
            let data = client
                .execute(Action::CheckEntity, entity_payload(&entity_type, entity, user_id))
                .await?;
            output_success(&output_format, verdict(&data), data)
        }
    }
}

fn verdict(data: &serde_json::Value) -> &'static str {
    if data["hasAccess"].as_bool() == Some(true) {
        "Access allowed"
    } else {
        "Access denied"
    }
}

pub fn recipient_payload(level: Uuid, recipient: &RecipientArgs) -> Payload {
    let mut data = Payload::new();
    data.insert("securityLevelId".to_string(), json!(level));
    for (key, value) in [
        ("userId", recipient.user_id),
        ("teamId", recipient.team_id),
        ("projectRoleId", recipient.project_role_id),
    ] {
        if let Some(id) = value {
            data.insert(key.to_string(), json!(id));
        }
    }
    data
}

pub fn check_payload(level: Uuid, user_id: Option<Uuid>) -> Payload {
    let mut data = Payload::new();
    data.insert("securityLevelId".to_string(), json!(level));
    if let Some(user_id) = user_id {
        data.insert("userId".to_string(), json!(user_id));
    }
    data
}

pub fn entity_payload(entity_type: &str, entity: Uuid, user_id: Option<Uuid>) -> Payload {
    let mut data = Payload::new();
    data.insert("entityType".to_string(), json!(entity_type));
    data.insert("entityId".to_string(), json!(entity));
    if let Some(user_id) = user_id {
        data.insert("userId".to_string(), json!(user_id));
    }
    data
}
