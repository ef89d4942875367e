use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use portfolio::chat::{ChatError, ChatMessage, ChatSession, GeminiClient, SendOutcome, Sender, TextGenerator};
use portfolio::comments::{
    AnonymousUserId, ApiError, Comment, CommentError, CommentStore, CommentsApi, HttpCommentsApi, LikeOutcome,
    REVEAL_STEP,
};
use portfolio::config::ConfigError;
use portfolio::{LocalStore, PortfolioConfig, Theme};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("comments backend unavailable: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Comment(#[from] CommentError),
    #[error("chat assistant unavailable: {0}")]
    Chat(#[from] ChatError),
    #[error("failed to load comments: {0}")]
    Load(String),
    #[error("comment {0} not found")]
    NotFound(String),
    #[error("another comment operation is in progress")]
    Busy,
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portfolio-cli", about = "Portfolio comments, assistant, and theme CLI")]
struct Cli {
    /// Comments backend base URL.
    #[arg(long, env = "PORTFOLIO_API_URL")]
    base_url: Option<String>,

    /// Local key/value store holding the anonymous user id and theme.
    #[arg(long, env = "PORTFOLIO_STORAGE_PATH")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Comments(CommentsCommand),
    /// Talk to the portfolio assistant (one line per message, `exit` to quit).
    Chat,
    Theme(ThemeCommand),
}

#[derive(Args, Debug)]
struct CommentsCommand {
    #[command(subcommand)]
    command: CommentsSubcommand,
}

#[derive(Subcommand, Debug)]
enum CommentsSubcommand {
    List {
        /// Print every comment instead of the first page.
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Reveal this many extra pages.
        #[arg(long, default_value_t = 0)]
        more: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Submit {
        #[arg(long)]
        author: String,
        #[arg(long)]
        text: String,
    },
    Like {
        comment_id: String,
    },
}

#[derive(Args, Debug)]
struct ThemeCommand {
    #[command(subcommand)]
    command: ThemeSubcommand,
}

#[derive(Subcommand, Debug)]
enum ThemeSubcommand {
    Show,
    Toggle,
}

struct CliContext {
    config: PortfolioConfig,
    local: LocalStore,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = PortfolioConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }
    let local = LocalStore::open(&config.storage_path);
    let mut ctx = CliContext { config, local };

    match cli.command {
        Command::Comments(comments) => run_comments(&mut ctx, comments).await,
        Command::Chat => run_chat(&ctx).await,
        Command::Theme(theme) => run_theme(&mut ctx, theme),
    }
}

// =============================================================================
// COMMENTS
// =============================================================================

fn comment_store(ctx: &mut CliContext) -> Result<CommentStore, CliError> {
    let api = HttpCommentsApi::new(&ctx.config.api_url, ctx.config.timeouts)?;
    info!(base_url = %api.base_url(), "comments backend configured");
    let user_id = AnonymousUserId::load_or_create(&mut ctx.local);
    let store = CommentStore::new(Arc::new(api) as Arc<dyn CommentsApi>, user_id);
    info!(user_id = %store.user_id(), "comment store ready");
    Ok(store)
}

async fn run_comments(ctx: &mut CliContext, comments: CommentsCommand) -> Result<(), CliError> {
    let store = comment_store(ctx)?;
    let palette = Palette::for_theme(Theme::read(&ctx.local));

    match comments.command {
        CommentsSubcommand::List { all, more, json } => {
            load(&store).await?;
            for _ in 0..more {
                store.reveal_more(REVEAL_STEP);
            }
            let view = store.snapshot();
            let shown = if all { store.comments() } else { view.comments };
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
                return Ok(());
            }
            println!("{}", palette.accent(&format!("Community Voice ({})", view.total)));
            for comment in &shown {
                println!("{}", render_comment(comment, palette));
            }
            if !all && view.has_more {
                println!("... {} more (use --more or --all)", view.total - shown.len());
            }
            Ok(())
        }
        CommentsSubcommand::Submit { author, text } => {
            let created = store.submit(&author, &text).await?;
            println!("{}", render_comment(&created, palette));
            Ok(())
        }
        CommentsSubcommand::Like { comment_id } => {
            load(&store).await?;
            match store.like(&comment_id).await {
                LikeOutcome::Confirmed | LikeOutcome::FallbackApplied => {
                    let likes = store.comment(&comment_id).map_or(0, |c| c.like_count);
                    println!("liked {comment_id} ({likes} likes)");
                    Ok(())
                }
                LikeOutcome::AlreadyLiked => {
                    println!("already liked {comment_id}");
                    Ok(())
                }
                LikeOutcome::NotFound => Err(CliError::NotFound(comment_id)),
                LikeOutcome::Busy => Err(CliError::Busy),
            }
        }
    }
}

async fn load(store: &CommentStore) -> Result<(), CliError> {
    store.load_all().await;
    match store.error() {
        Some(message) => Err(CliError::Load(message)),
        None => Ok(()),
    }
}

fn render_comment(comment: &Comment, palette: Palette) -> String {
    let heart = if comment.liked_by_current_user { "♥" } else { "♡" };
    format!(
        "{} {} · {} · {heart} {}\n    {}",
        palette.accent(&format!("[{}]", comment.id)),
        comment.author,
        comment.created_at,
        comment.like_count,
        comment.text
    )
}

// =============================================================================
// CHAT
// =============================================================================

async fn run_chat(ctx: &CliContext) -> Result<(), CliError> {
    let client = GeminiClient::from_config(ctx.config.gemini.as_ref(), ctx.config.timeouts)?;
    let mut session = ChatSession::new(Arc::new(client) as Arc<dyn TextGenerator>);
    let palette = Palette::for_theme(Theme::read(&ctx.local));

    for message in session.messages() {
        println!("{}", palette.accent(&message.text));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        let outcome = session.send(line).await;
        if let Some(reply) = reply_to_print(outcome, session.messages()) {
            println!("{}", palette.accent(&reply.text));
        }
    }
    Ok(())
}

/// The assistant line a send just appended, if it appended one.
fn reply_to_print(outcome: SendOutcome, messages: &[ChatMessage]) -> Option<&ChatMessage> {
    match outcome {
        SendOutcome::Replied | SendOutcome::Apologized => {
            messages.last().filter(|m| m.sender == Sender::Assistant)
        }
        SendOutcome::Ignored => None,
    }
}

// =============================================================================
// THEME
// =============================================================================

fn run_theme(ctx: &mut CliContext, theme: ThemeCommand) -> Result<(), CliError> {
    let current = match theme.command {
        ThemeSubcommand::Show => Theme::read(&ctx.local),
        ThemeSubcommand::Toggle => Theme::toggle(&mut ctx.local),
    };
    println!("theme: {current}");
    Ok(())
}

/// Terminal colours derived from the theme; plain text when stdout is not a TTY.
#[derive(Clone, Copy)]
struct Palette {
    accent: Option<&'static str>,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        if !std::io::stdout().is_terminal() {
            return Self { accent: None };
        }
        let accent = match theme {
            Theme::Dark => "\x1b[95m",
            Theme::Light => "\x1b[34m",
        };
        Self { accent: Some(accent) }
    }

    fn accent(self, text: &str) -> String {
        match self.accent {
            Some(code) => format!("{code}{text}\x1b[0m"),
            None => text.to_owned(),
        }
    }
}
