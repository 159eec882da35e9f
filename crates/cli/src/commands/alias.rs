//! Alias management commands
//!
//! Aliases are named references to S3-compatible storage endpoints,
//! including connection details and credentials.

use clap::Subcommand;
use comfy_table::{ContentArrangement, Table, presets};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use oget_core::{Alias, AliasManager, RetryConfig};

/// Alias subcommands for managing storage service connections
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add or update an alias
    Set(SetArgs),

    /// List all configured aliases
    List(ListArgs),

    /// Remove an alias
    Remove(RemoveArgs),
}

/// Arguments for the `alias set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "local", "s3", "minio")
    pub name: String,

    /// S3 endpoint URL (e.g., `http://localhost:9000`, `https://s3.amazonaws.com`)
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// AWS region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,

    /// Attempts per request before a transient failure is reported
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

/// Arguments for the `alias list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show region and bucket lookup style
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `alias remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the alias to remove
    pub name: String,
}

/// JSON output for alias list
#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<AliasInfo>,
}

/// Alias information for JSON output (without credentials)
#[derive(Serialize)]
struct AliasInfo {
    name: String,
    endpoint: String,
    region: String,
    bucket_lookup: String,
}

impl From<&Alias> for AliasInfo {
    fn from(alias: &Alias) -> Self {
        Self {
            name: alias.name.clone(),
            endpoint: alias.endpoint.clone(),
            region: alias.region.clone(),
            bucket_lookup: alias.bucket_lookup.clone(),
        }
    }
}

/// JSON output for alias set/remove operations
#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

/// Execute an alias subcommand
pub async fn execute(cmd: AliasCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let alias_manager = match AliasManager::new() {
        Ok(am) => am,
        Err(e) => {
            formatter.error(&format!("Failed to load aliases: {e}"));
            return ExitCode::GeneralError;
        }
    };

    match cmd {
        AliasCommands::Set(args) => execute_set(args, &alias_manager, &formatter),
        AliasCommands::List(args) => execute_list(args, &alias_manager, &formatter),
        AliasCommands::Remove(args) => execute_remove(args, &alias_manager, &formatter),
    }
}

fn build_alias(args: &SetArgs) -> Alias {
    let mut alias = Alias::new(
        &args.name,
        &args.endpoint,
        &args.access_key,
        &args.secret_key,
    );
    alias.region = args.region.clone();
    alias.bucket_lookup = args.bucket_lookup.clone();
    alias.retry = args.max_attempts.map(|max_attempts| RetryConfig {
        max_attempts,
        ..RetryConfig::default()
    });
    alias
}

fn execute_set(args: SetArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let alias = build_alias(&args);
    if let Err(e) = alias.validate() {
        formatter.error(&e.to_string());
        return ExitCode::UsageError;
    }

    match manager.set(alias) {
        Ok(()) => {
            if formatter.is_json() {
                let output = AliasOperationOutput {
                    success: true,
                    alias: args.name.clone(),
                    message: format!("Alias '{}' configured successfully", args.name),
                };
                formatter.json(&output);
            } else {
                let styled_name = formatter.style_name(&args.name);
                formatter.success(&format!("Alias '{styled_name}' configured successfully."));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::GeneralError
        }
    }
}

fn execute_list(args: ListArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let aliases = match manager.list() {
        Ok(aliases) => aliases,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::GeneralError;
        }
    };

    if formatter.is_json() {
        let output = AliasListOutput {
            aliases: aliases.iter().map(AliasInfo::from).collect(),
        };
        formatter.json(&output);
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else {
        formatter.println(&alias_table(&aliases, args.long, formatter).to_string());
    }
    ExitCode::Success
}

fn alias_table(aliases: &[Alias], long: bool, formatter: &Formatter) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for alias in aliases {
        let mut row = vec![
            formatter.style_name(&alias.name),
            formatter.style_url(&alias.endpoint),
        ];
        if long {
            row.push(formatter.style_dim(&format!("region: {}", alias.region)));
            row.push(formatter.style_dim(&format!("lookup: {}", alias.bucket_lookup)));
        }
        table.add_row(row);
    }
    table
}

fn execute_remove(args: RemoveArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                let output = AliasOperationOutput {
                    success: true,
                    alias: args.name.clone(),
                    message: format!("Alias '{}' removed successfully", args.name),
                };
                formatter.json(&output);
            } else {
                let styled_name = formatter.style_name(&args.name);
                formatter.success(&format!("Alias '{styled_name}' removed successfully."));
            }
            ExitCode::Success
        }
        Err(oget_core::Error::AliasNotFound(_)) => {
            formatter.error(&format!("Alias '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::GeneralError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args() -> SetArgs {
        SetArgs {
            name: "test".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            access_key: "accesskey".to_string(),
            secret_key: "secretkey".to_string(),
            region: "us-east-1".to_string(),
            bucket_lookup: "auto".to_string(),
            max_attempts: None,
        }
    }

    #[test]
    fn test_build_alias_defaults() {
        let alias = build_alias(&set_args());
        assert_eq!(alias.region, "us-east-1");
        assert_eq!(alias.bucket_lookup, "auto");
        assert!(alias.retry.is_none());
        assert!(alias.validate().is_ok());
    }

    #[test]
    fn test_build_alias_with_retry() {
        let alias = build_alias(&SetArgs {
            max_attempts: Some(7),
            ..set_args()
        });
        let retry = alias.retry_config();
        assert_eq!(retry.max_attempts, 7);
        assert_eq!(retry.initial_backoff_ms, RetryConfig::default().initial_backoff_ms);
    }

    #[test]
    fn test_invalid_lookup_rejected() {
        let alias = build_alias(&SetArgs {
            bucket_lookup: "virtual".to_string(),
            ..set_args()
        });
        assert!(alias.validate().is_err());
    }

    #[test]
    fn test_alias_info_hides_credentials() {
        let alias = Alias::new("test", "http://localhost:9000", "key", "secret");
        let json = serde_json::to_string(&AliasInfo::from(&alias)).unwrap();
        assert!(json.contains("\"name\":\"test\""));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_table_long_columns() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        let aliases = vec![Alias::new("s3", "https://s3.amazonaws.com", "k", "s")];
        let short = alias_table(&aliases, false, &formatter).to_string();
        let long = alias_table(&aliases, true, &formatter).to_string();
        assert!(short.contains("https://s3.amazonaws.com"));
        assert!(!short.contains("region"));
        assert!(long.contains("region: us-east-1"));
    }
}
