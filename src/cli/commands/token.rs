use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AccessLevel, TokenCodec};
use crate::cli::config::{load_session_config, save_session_config};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::DEV_JWT_SECRET;

/// Mint a bearer token signed with the server's shared secret
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, default_value = "root", help = "Login name carried in the token")]
    pub user: String,
    #[arg(long, help = "User id (random when omitted)")]
    pub user_id: Option<Uuid>,
    #[arg(long, default_value = "default")]
    pub tenant: String,
    #[arg(long, default_value = "full", help = "root, full, edit, read or deny")]
    pub access: AccessLevel,
    #[arg(long, default_value_t = 24)]
    pub expiry_hours: u64,
    #[arg(long, env = "SECURITY_JWT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
    #[arg(long, help = "Store the token (and server) for later commands")]
    pub save: bool,
}

pub async fn handle(args: TokenArgs, server_url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let secret = args.secret.as_deref().unwrap_or(DEV_JWT_SECRET);
    let codec = TokenCodec::new(secret, args.expiry_hours)?;
    let user_id = args.user_id.unwrap_or_else(Uuid::new_v4);
    let claims = codec.claims_for(user_id, &args.user, &args.tenant, args.access);
    let token = codec.issue(&claims)?;

    if args.save {
        let mut session = load_session_config()?;
        session.server_url = Some(server_url.to_string());
        session.token = Some(token.clone());
        save_session_config(&session)?;
    }

    output_success(
        &output_format,
        &format!("Token issued for {} ({})", args.user, args.access),
        json!({
            "token": token,
            "userId": user_id,
            "expiresAt": claims.exp,
            "saved": args.save,
        }),
    )
}
