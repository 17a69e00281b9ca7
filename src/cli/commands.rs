//! CLI command implementations

use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::config::{StaticConfig, get_config};
use crate::errors::AgoraError;
use crate::services::AccountService;
use crate::storage::{SeaOrmStorage, StorageFactory};

use super::{Commands, ConfigCommands, UserCommands};

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    InputError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::InputError(msg) => format!("Input error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::InputError(msg) => {
                format!("{} {}", "Input error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<AgoraError> for CliError {
    fn from(err: AgoraError) -> Self {
        CliError::CommandError(err.format_simple())
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::InputError(err.to_string())
    }
}

async fn open_storage() -> Result<Arc<SeaOrmStorage>, CliError> {
    StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))
}

async fn account_service() -> Result<AccountService, CliError> {
    let storage = open_storage().await?;
    let media = Arc::new(crate::services::MediaStore::new(&get_config().media));
    Ok(AccountService::new(storage, media))
}

/// Run a CLI command from clap-parsed input
///
/// `Serve` is handled by the caller.
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => Err(CliError::CommandError(
            "serve is not a one-shot command".to_string(),
        )),
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path, force),
        Commands::User { action } => match action {
            UserCommands::List => list_users().await,
            UserCommands::ResetPassword {
                username,
                password,
                stdin,
            } => reset_password(&username, password, stdin).await,
        },
    }
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{}", prompt.yellow());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Generate example configuration file
fn config_generate(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| DEFAULT_SAMPLE_PATH.to_string());

    // 非 --force 模式下交互确认覆盖
    if !force && Path::new(&path).exists() {
        if !io::stdin().is_terminal() {
            return Err(CliError::CommandError(format!(
                "{} already exists, use --force to overwrite",
                path
            )));
        }
        if !confirm(&format!("File already exists: {} Overwrite? [y/N] ", path))? {
            println!("{}", "Aborted.".red());
            return Ok(());
        }
    }

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| CliError::CommandError(format!("Unable to write configuration file: {}", e)))?;

    println!(
        "{} {}",
        "Configuration file generated:".green(),
        path.blue()
    );
    println!(
        "  {}",
        "Environment variables (AGORA__SECTION__KEY) override file values".dimmed()
    );
    Ok(())
}

async fn list_users() -> Result<(), CliError> {
    let accounts = account_service().await?;
    let users = accounts.list_users().await?;

    if users.is_empty() {
        println!("{} No users found", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{}", "Users:".bold().green());
    println!();
    for user in &users {
        let mut parts = vec![
            format!("#{}", user.id).dimmed().to_string(),
            user.username.cyan().to_string(),
            format!("<{}>", user.email),
        ];
        if let Some(ref name) = user.full_name {
            parts.push(format!("({})", name));
        }
        if !user.is_active {
            parts.push("[inactive]".yellow().to_string());
        }
        parts.push(
            user.created_at
                .format("%Y-%m-%d %H:%M UTC")
                .to_string()
                .dimmed()
                .to_string(),
        );
        println!("  {}", parts.join(" "));
    }
    println!();
    println!(
        "{} Total {} users",
        "ℹ".bold().blue(),
        users.len().to_string().green()
    );
    Ok(())
}

/// 从不同来源获取密码
fn read_new_password(password: Option<String>, stdin: bool) -> Result<String, CliError> {
    if stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }
    if let Some(pwd) = password {
        return Ok(pwd);
    }

    if !io::stdin().is_terminal() {
        return Err(CliError::InputError(
            "No password provided. Use --password or --stdin flag, or run interactively."
                .to_string(),
        ));
    }

    let password = rpassword::prompt_password("Enter new password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        return Err(CliError::InputError("Passwords do not match".to_string()));
    }
    Ok(password)
}

async fn reset_password(
    username: &str,
    password: Option<String>,
    stdin: bool,
) -> Result<(), CliError> {
    let new_password = read_new_password(password, stdin)?;
    let accounts = account_service().await?;
    let user = accounts.reset_password(username, &new_password).await?;

    println!(
        "{} Password reset for {}",
        "✓".green().bold(),
        user.username.cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_from_flag() {
        let pwd = read_new_password(Some("s3cret-pass".into()), false).unwrap();
        assert_eq!(pwd, "s3cret-pass");
    }

    #[test]
    fn test_config_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agora.toml");
        let path_str = path.to_string_lossy().to_string();

        config_generate(Some(path_str.clone()), true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("[media]"));
    }

    #[test]
    fn test_agora_error_maps_to_command_error() {
        let err: CliError = AgoraError::not_found("User 'ghost' not found").into();
        assert!(matches!(err, CliError::CommandError(_)));
        assert!(err.format_simple().contains("ghost"));
    }
}
