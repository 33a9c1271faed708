//! CLI commands for tinywax using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{get_settings_path, load_settings, save_settings, Settings};

/// tinywax - Telegram-first shared jukebox bot.
#[derive(Parser)]
#[command(name = "tinywax")]
#[command(version = "0.1.0")]
#[command(about = "tinywax - the shared jukebox with a DJ booth", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Telegram bot daemon
    Run,

    /// Config commands
    #[command(subcommand)]
    Config(ConfigCommand),

    /// DJ roster commands
    #[command(subcommand)]
    Dj(DjCommand),
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a default settings file if none exists
    Init,

    /// Print the current settings
    Show,
}

#[derive(Subcommand)]
pub enum DjCommand {
    /// Grant DJ rights to a sender id
    Add {
        /// Telegram sender id
        sender_id: i64,
    },

    /// Revoke DJ rights from a sender id
    Remove {
        /// Telegram sender id
        sender_id: i64,
    },

    /// List DJ sender ids
    List,
}

impl Commands {
    /// Run the parsed command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Run => {
                crate::telegram::run_telegram_daemon().await?;
                Ok(())
            }
            Command::Config(cmd) => run_config(cmd),
            Command::Dj(cmd) => run_dj(cmd),
        }
    }
}

fn run_config(cmd: &ConfigCommand) -> Result<()> {
    let path = get_settings_path()?;
    match cmd {
        ConfigCommand::Init => {
            if path.exists() {
                println!("Settings already exist at {}", path.display());
                return Ok(());
            }
            save_settings(&Settings::default(), &path)?;
            println!("Wrote default settings to {}", path.display());
            println!("Add your bot token under channels.telegram.bot_token.");
            Ok(())
        }
        ConfigCommand::Show => {
            let settings = load_settings()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

fn run_dj(cmd: &DjCommand) -> Result<()> {
    let path = get_settings_path()?;
    let mut settings = load_settings()?;

    match cmd {
        DjCommand::Add { sender_id } => {
            if settings.djs.contains(*sender_id) {
                println!("{} is already a DJ", sender_id);
                return Ok(());
            }
            settings.djs.sender_ids.push(*sender_id);
            save_settings(&settings, &path)?;
            println!("Added DJ {}", sender_id);
            Ok(())
        }
        DjCommand::Remove { sender_id } => {
            settings.djs.sender_ids.retain(|id| id != sender_id);
            save_settings(&settings, &path)?;
            println!("Removed DJ {}", sender_id);
            Ok(())
        }
        DjCommand::List => {
            if settings.djs.sender_ids.is_empty() {
                println!("No DJs configured.");
            } else {
                for id in &settings.djs.sender_ids {
                    println!("{}", id);
                }
            }
            Ok(())
        }
    }
}
