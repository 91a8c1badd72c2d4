use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_core::config::Config;
use parley_core::identity::DirectoryResolver;
use parley_core::logging::{init_logging_with_config, LogConfig};
use parley_core::model::{GroupId, MessageId, MessageKind, UserId, VersionStamp};
use parley_core::{AsyncChatManager, ChatError, ChatManagerImpl, ChatSqlStore, OutcomeCategory};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about = "Group chat membership and message editing", long_about = None)]
struct Args {
    /// TOML configuration file. PARLEY_* variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configuration
    #[arg(long)]
    db: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and apply migrations
    Init,

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage groups and post to them
    #[command(subcommand)]
    Group(GroupCommand),

    /// Direct messages
    #[command(subcommand)]
    Dm(DmCommand),

    /// Inspect and edit sent messages
    #[command(subcommand)]
    Message(MessageCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a user
    Add { username: String },
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Create a group with the acting user as its first admin
    Create {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        name: String,
    },

    /// Add a user to a group
    AddMember {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        group: GroupId,
        user: UserId,
        /// Add the user as an admin
        #[arg(long)]
        admin: bool,
    },

    /// Promote a member to admin
    Promote {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        group: GroupId,
        user: UserId,
    },

    /// Post a message to a group
    Send {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        group: GroupId,
        content: String,
    },

    /// Show member and admin counts
    Stats { group: GroupId },
}

#[derive(Subcommand, Debug)]
enum DmCommand {
    /// Send a direct message
    Send {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        receiver: UserId,
        content: String,
    },
}

#[derive(Subcommand, Debug)]
enum MessageCommand {
    /// Show a message with its current version
    Show { kind: MessageKind, id: MessageId },

    /// Replace the content of a message you sent
    Edit {
        #[arg(long = "as", value_name = "USER")]
        actor: String,
        kind: MessageKind,
        id: MessageId,
        /// Version stamp shown by `message show`
        #[arg(long = "stamp", value_name = "VERSION")]
        version: VersionStamp,
        content: String,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };

    if let Some(db) = &args.db {
        config.store.database_path = db.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

type Chat = AsyncChatManager<ChatSqlStore>;

async fn execute(
    chat: &Chat,
    resolver: &Arc<DirectoryResolver<ChatSqlStore>>,
    command: Command,
) -> Result<Value, ChatError> {
    let data = match command {
        Command::Init => json!({ "schema_version": parley_core::storage::CURRENT_SCHEMA_VERSION }),

        Command::User(UserCommand::Add { username }) => json!(chat.register_user(&username).await?),

        Command::Group(GroupCommand::Create { actor, name }) => {
            let creator = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.create_group(creator, &name).await?)
        }
        Command::Group(GroupCommand::AddMember {
            actor,
            group,
            user,
            admin,
        }) => {
            let requester = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.add_member(requester, group, user, admin).await?)
        }
        Command::Group(GroupCommand::Promote { actor, group, user }) => {
            let requester = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.promote_admin(requester, group, user).await?)
        }
        Command::Group(GroupCommand::Send {
            actor,
            group,
            content,
        }) => {
            let sender = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.send_group_message(sender, group, &content).await?)
        }
        Command::Group(GroupCommand::Stats { group }) => json!(chat.group_stats(group).await?),

        Command::Dm(DmCommand::Send {
            actor,
            receiver,
            content,
        }) => {
            let sender = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.send_direct_message(sender, receiver, &content).await?)
        }

        Command::Message(MessageCommand::Show { kind, id }) => {
            json!(chat.get_message(kind, id).await?)
        }
        Command::Message(MessageCommand::Edit {
            actor,
            kind,
            id,
            version,
            content,
        }) => {
            let editor = chat.resolve_caller(resolver, &actor).await?;
            json!(chat.edit_message(kind, id, editor, version, &content).await?)
        }
    };

    Ok(data)
}

/// Print the outcome envelope and return the process exit code
fn report(outcome: Result<Value, ChatError>) -> i32 {
    match outcome {
        Ok(data) => {
            let success = OutcomeCategory::Success;
            println!(
                "{}",
                json!({ "status": success.as_str(), "code": success.status_code(), "data": data })
            );
            0
        }
        Err(err) => {
            let category = err.category();
            warn!(category = %category, error = %err, "command rejected");
            println!(
                "{}",
                json!({
                    "status": category.as_str(),
                    "code": category.status_code(),
                    "error": err.to_string(),
                })
            );
            1
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    debug!(?config, "configuration loaded");

    let store = Arc::new(
        ChatSqlStore::open(&config.store)
            .with_context(|| format!("failed to open {}", config.store.database_path.display()))?,
    );
    let resolver = Arc::new(DirectoryResolver::new(Arc::clone(&store)));
    let chat = AsyncChatManager::new(ChatManagerImpl::new(store, &config.limits));

    let outcome = execute(&chat, &resolver, args.command).await;
    let code = report(outcome);

    info!(exit_code = code, "parley finished");
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
