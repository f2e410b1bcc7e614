use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{ensure_loaded, OutputFormat};
use crate::context::{ContextSnapshot, TenantContext};

#[derive(Subcommand)]
pub enum CompanyCommands {
    #[command(about = "List companies you belong to")]
    List,

    #[command(about = "Show current company")]
    Current,

    #[command(about = "Switch to company")]
    Use {
        #[arg(help = "Company ID")]
        company: String,
    },

    #[command(about = "Reload memberships and show the resulting selection")]
    Refresh,
}

pub async fn handle(cmd: CompanyCommands, context: &TenantContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CompanyCommands::List => list(&context.snapshot(), &output_format),
        CompanyCommands::Current => current(&context.snapshot(), &output_format),
        CompanyCommands::Use { company } => {
            if !context.snapshot().contains(&company) {
                return Err(anyhow::anyhow!("Company '{}' not found", company));
            }

            context.switch_company(&company);

            output_success(
                &output_format,
                &format!("Switched to company '{}'", company),
                Some(json!({ "current_company": company })),
            )
        }
        CompanyCommands::Refresh => {
            ensure_loaded(context.refresh().await)?;
            let snapshot = context.snapshot();

            output_success(
                &output_format,
                &format!(
                    "Loaded {} companies, current: {}",
                    snapshot.companies.len(),
                    snapshot.current_company_id().unwrap_or("none")
                ),
                Some(json!({
                    "companies": snapshot.companies.len(),
                    "current_company": snapshot.current_company_id()
                })),
            )
        }
    }
}

fn list(snapshot: &ContextSnapshot, output_format: &OutputFormat) -> anyhow::Result<()> {
    if snapshot.companies.is_empty() {
        return output_empty_collection(output_format, "companies", "You do not belong to any company");
    }

    let current_id = snapshot.current_company_id();

    match output_format {
        OutputFormat::Json => {
            let companies: Vec<_> = snapshot
                .companies
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id(),
                        "name": c.company.name,
                        "slug": c.company.slug,
                        "status": c.company.status,
                        "user_role": c.user_role,
                        "current": current_id == Some(c.id())
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "companies": companies }))?);
        }
        OutputFormat::Text => {
            println!("{:<38} {:<25} {:<20} {:<12} {}", "ID", "NAME", "SLUG", "STATUS", "ROLE");
            println!("{}", "-".repeat(110));

            for c in &snapshot.companies {
                let marker = if current_id == Some(c.id()) { "*" } else { " " };
                println!(
                    "{}{:<37} {:<25} {:<20} {:<12} {}",
                    marker,
                    c.id(),
                    c.company.name,
                    c.company.slug,
                    c.company.status,
                    c.user_role
                );
            }
        }
    }

    Ok(())
}

fn current(snapshot: &ContextSnapshot, output_format: &OutputFormat) -> anyhow::Result<()> {
    match &snapshot.current_company {
        Some(company) => {
            let details = serde_json::to_value(company)?;
            output_current_item(output_format, "company", &company.company.name, details)
        }
        None => output_no_current_item(output_format, "company"),
    }
}
