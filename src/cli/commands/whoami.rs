use serde_json::json;

use crate::cli::OutputFormat;
use crate::models::Identity;

pub fn handle(identity: &Identity, output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "identity": identity,
                    "token": identity.access_token.is_some()
                }))?
            );
        }
        OutputFormat::Text => {
            println!("User: {}", identity.id);
            if !identity.email.is_empty() {
                println!("Email: {}", identity.email);
            }
            println!(
                "Signed in with: {}",
                if identity.access_token.is_some() { "access token" } else { "user id" }
            );
        }
    }
    Ok(())
}
