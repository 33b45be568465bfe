//! formchat CLI - chats and interest forms from the shell

#![expect(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use console::Term;
use serde::Serialize;
use tracing::debug;

use formchat_core::{
    Api, ApiClient, Config,
    models::{DraftField, FormStatus},
    views::{
        ChatDetail, ChatList, FormHistory, HistoryState, NoticeKind, SendOutcome,
        chat_detail::{DELETE_FAILED, DELETE_PROMPT, DELETE_SUCCEEDED, failure_message},
    },
};

mod pretty;

#[derive(Debug, Parser)]
#[command(
    name = "formchat",
    author,
    version,
    about = "Chat with the formchat assistant and manage interest forms",
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend URL (overrides the config file)
    #[arg(long, global = true, env = "FORMCHAT_API_URL")]
    api_url: Option<String>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the backend answers
    Ping,

    /// List or create chats
    Chats {
        #[command(subcommand)]
        command: ChatsCommand,
    },

    /// Read or continue a chat
    Chat {
        #[command(subcommand)]
        command: ChatCommand,
    },

    /// Manage interest forms
    Forms {
        #[command(subcommand)]
        command: FormsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ChatsCommand {
    /// List all chats
    List,

    /// Start a new chat
    Create,
}

#[derive(Debug, Subcommand)]
enum ChatCommand {
    /// Show a chat transcript
    Show {
        /// Chat ID
        id: String,
    },

    /// Send a message and print the replies
    Send {
        /// Chat ID
        id: String,

        /// Message text
        text: String,
    },
}

#[derive(Debug, Subcommand)]
enum FormsCommand {
    /// List the forms of a chat
    List {
        /// Chat ID
        chat_id: String,

        /// Only forms with this status (1 = TO DO, 2 = IN PROGRESS, 3 = COMPLETED)
        #[arg(long, value_parser = parse_status)]
        status: Option<FormStatus>,
    },

    /// Update a form. Unspecified fields keep their current value.
    Update {
        /// Form ID
        form_id: String,

        /// Chat the form belongs to
        #[arg(long = "chat", value_name = "CHAT_ID")]
        chat_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// New status (0 clears it)
        #[arg(long, value_parser = parse_status_or_clear)]
        status: Option<StatusArg>,
    },

    /// Delete a form
    Delete {
        /// Form ID
        form_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the audit history of a form
    History {
        /// Form ID
        form_id: String,
    },
}

/// `--status` on update: a status or an explicit clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatusArg(Option<FormStatus>);

fn parse_status(s: &str) -> Result<FormStatus, String> {
    let code: i64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    FormStatus::try_from(code).map_err(|e| e.to_string())
}

fn parse_status_or_clear(s: &str) -> Result<StatusArg, String> {
    if s.trim() == "0" {
        return Ok(StatusArg(None));
    }
    parse_status(s).map(|status| StatusArg(Some(status)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let mut config = Config::ensure_at(&config_path)?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    debug!(api_url = %config.api_url, "using backend");

    let api = ApiClient::from_config(&config)?;
    let out = Output { json: cli.json };

    match cli.command {
        Command::Ping => cmd_ping(&api, out).await,
        Command::Chats { command } => cmd_chats(&api, out, command).await,
        Command::Chat { command } => cmd_chat(&api, out, command).await,
        Command::Forms { command } => cmd_forms(&api, out, command).await,
    }
}

#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

async fn cmd_ping(api: &ApiClient, out: Output) -> Result<()> {
    let greeting = api.ping().await?;
    if out.json {
        return out.print_json(&greeting);
    }
    println!("{} {}", api.base_url(), greeting.message);
    Ok(())
}

async fn cmd_chats(api: &ApiClient, out: Output, command: ChatsCommand) -> Result<()> {
    let mut list = ChatList::new();
    match command {
        ChatsCommand::List => {
            list.load(api).await;
            if let Some(err) = list.chats().error() {
                bail!("Failed to load chats: {err}");
            }
            if out.json {
                return out.print_json(list.chats().ready().map_or(&[][..], Vec::as_slice));
            }
            pretty::print_chats(&list.rows());
        }
        ChatsCommand::Create => {
            let route = list
                .create_chat(api)
                .await
                .ok_or_else(|| anyhow!("{}", list.status().unwrap_or("Could not create chat")))?;
            if out.json {
                return out.print_json(&serde_json::json!({ "route": route.to_string() }));
            }
            println!("{route}");
        }
    }
    Ok(())
}

async fn cmd_chat(api: &ApiClient, out: Output, command: ChatCommand) -> Result<()> {
    match command {
        ChatCommand::Show { id } => {
            let messages = api.get_chat(&id).await?;
            if out.json {
                return out.print_json(&messages);
            }
            pretty::print_transcript(&messages);
        }
        ChatCommand::Send { id, text } => {
            let mut detail = ChatDetail::new(id);
            detail.load_conversation(api).await;
            if let Some(status) = detail.status() {
                bail!("{status}");
            }
            let before = detail.transcript().len();

            detail.set_input(text);
            match detail.send_message(api).await {
                SendOutcome::Skipped => bail!("Nothing to send"),
                SendOutcome::Failed(err) => return Err(err.into()),
                SendOutcome::Sent => {}
            }

            let replies = detail.transcript().get(before..).unwrap_or_default();
            if out.json {
                return out.print_json(replies);
            }
            pretty::print_transcript(replies);
        }
    }
    Ok(())
}

async fn cmd_forms(api: &ApiClient, out: Output, command: FormsCommand) -> Result<()> {
    match command {
        FormsCommand::List { chat_id, status } => {
            let forms = api.list_forms(&chat_id, status).await?;
            if out.json {
                return out.print_json(&forms);
            }
            pretty::print_forms(&forms);
        }
        FormsCommand::Update {
            form_id,
            chat_id,
            name,
            email,
            phone,
            status,
        } => {
            let mut detail = ChatDetail::new(chat_id);
            detail.load_forms(api).await;
            if let Some(status) = detail.status() {
                bail!("{status}");
            }
            if !detail.begin_edit(&form_id) {
                bail!("Form {form_id} not found in chat {}", detail.chat_id());
            }

            let changes = [
                name.map(DraftField::Name),
                email.map(DraftField::Email),
                phone.map(DraftField::PhoneNumber),
                status.map(|StatusArg(s)| DraftField::Status(s)),
            ];
            for change in changes.into_iter().flatten() {
                detail.update_draft(change);
            }

            let saved = detail.save_edit(api).await;
            report_notice(&detail, saved)?;
        }
        FormsCommand::Delete { form_id, yes } => {
            if !yes && !confirm(DELETE_PROMPT)? {
                println!("Cancelled");
                return Ok(());
            }
            match api.delete_form(&form_id).await {
                Ok(()) => println!("{DELETE_SUCCEEDED}"),
                Err(err) => bail!("{}", failure_message(&err, DELETE_FAILED)),
            }
        }
        FormsCommand::History { form_id } => {
            let mut history = FormHistory::new(form_id);
            history.load(api).await;
            match history.state() {
                HistoryState::Failed => bail!("{}", history.lines().join("\n")),
                HistoryState::Revisions(revisions) if out.json => {
                    return out.print_json(revisions);
                }
                HistoryState::Empty if out.json => return out.print_json(&[] as &[()]),
                _ => pretty::print_history(&history),
            }
        }
    }
    Ok(())
}

fn report_notice(detail: &ChatDetail, saved: bool) -> Result<()> {
    match detail.notice() {
        Some(notice) if notice.kind == NoticeKind::Error => bail!("{}", notice.message),
        Some(notice) => println!("{}", notice.message),
        None if !saved => bail!("Nothing was saved"),
        None => {}
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
