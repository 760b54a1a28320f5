//! scrollback - terminal chat client with paged conversation history

mod commands;
mod config;
mod utils;

use clap::Parser;
use scrollback_client::ApiClient;
use scrollback_core::{
    ChatController, ControllerConfig, ControllerEvent, HttpTransport, LoadOutcome, RetryDecision,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// scrollback - chat with a conversational backend and page through history
#[derive(Parser, Debug)]
#[command(name = "scrollback")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (e.g. https://api.dify.ai/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Conversation to open
    #[arg(short = 'C', long)]
    conversation: Option<String>,

    /// End-user identifier
    #[arg(short, long)]
    user: Option<String>,

    /// Exchanges fetched per page
    #[arg(short, long)]
    limit: Option<u32>,

    /// Send a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("scrollback=debug,scrollback_core=debug,scrollback_client=debug")
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // Merge config with CLI args (CLI takes precedence)
    let Some(base_url) = args.base_url.or(cfg.base_url.clone()) else {
        eprintln!("Error: No backend URL configured");
        eprintln!();
        eprintln!("Pass --base-url or add base_url to the config file: scrollback --init-config");
        std::process::exit(1);
    };

    let Some(api_key) = cfg.api_key() else {
        eprintln!("Error: No API key found");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  1. Set API key: export {}=your-key", config::API_KEY_ENV);
        eprintln!("  2. Add to config: scrollback --init-config");
        std::process::exit(1);
    };

    let user = args
        .user
        .or(cfg.user.clone())
        .unwrap_or_else(|| format!("scrollback-{}", uuid::Uuid::new_v4()));

    let controller_config = ControllerConfig {
        conversation_id: args
            .conversation
            .or(cfg.conversation_id.clone())
            .unwrap_or_default(),
        page_limit: args
            .limit
            .or(cfg.page_limit)
            .unwrap_or(scrollback_core::controller::DEFAULT_PAGE_LIMIT),
        opening_statement: cfg.opening_statement.clone(),
        ..ControllerConfig::default()
    };

    let client = ApiClient::new(base_url, api_key, user.clone())?;
    let transport = Arc::new(HttpTransport::new(client));
    let controller = ChatController::new(controller_config, transport);
    let session = Session {
        controller,
        user,
        chat_path: cfg.chat_path().to_string(),
    };

    let printer = spawn_printer(&session.controller);

    if !session.controller.conversation_id().is_empty() {
        session.reload().await;
    }

    let result = match args.command {
        Some(command) => session.ask(&command).await,
        None => run_interactive(&session).await,
    };

    // Let the printer flush final events
    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();
    result
}

/// An open conversation and what is needed to post to it
struct Session {
    controller: ChatController,
    user: String,
    chat_path: String,
}

impl Session {
    /// Send a question and wait for its answer to finish streaming
    async fn ask(&self, query: &str) -> anyhow::Result<()> {
        let body = utils::chat_request_body(query, &self.controller.conversation_id(), &self.user);
        if self.controller.send_and_stream(&self.chat_path, body).await {
            self.controller.wait_for_response().await;
        }
        Ok(())
    }

    /// Drop loaded history and fetch the newest page again
    async fn reload(&self) {
        self.controller.reset_history();
        match self.controller.load_initial().await {
            Ok(LoadOutcome::Applied { .. }) => {
                let snapshot = self.controller.snapshot();
                if let commands::CommandResult::Message(text) =
                    commands::HistoryCommand::execute("", &snapshot)
                {
                    println!("{}", text);
                }
            }
            Ok(_) => {}
            Err(e) => eprintln!("Error loading history: {}", e),
        }
    }

    /// Load older history, re-triggering while empty merges ask for a retry
    async fn load_more(&self) {
        let debounce = Duration::from_millis(self.controller.config().debounce_ms);
        loop {
            match self.controller.load_more().await {
                Ok(LoadOutcome::Applied {
                    retry: RetryDecision::Retry,
                    ..
                }) => {
                    tracing::debug!(
                        "Empty page, retrying ({})",
                        self.controller.retry_count()
                    );
                    tokio::time::sleep(debounce).await;
                }
                Ok(LoadOutcome::Applied {
                    retry: RetryDecision::GiveUp,
                    ..
                }) => {
                    println!("[No older messages found]");
                    break;
                }
                Ok(LoadOutcome::Applied { unique_count, .. }) => {
                    println!("[Loaded {} older messages]", unique_count);
                    break;
                }
                Ok(LoadOutcome::Throttled) => {
                    println!("[Slow down; try again in a moment]");
                    break;
                }
                Ok(LoadOutcome::Busy) => {
                    println!("[Already loading older messages]");
                    break;
                }
                Ok(LoadOutcome::EndOfHistory) => {
                    println!("[Reached the beginning of the conversation]");
                    break;
                }
                Ok(LoadOutcome::Discarded) => break,
                Err(e) => {
                    eprintln!("Error loading history: {}", e);
                    break;
                }
            }
        }
    }
}

/// Print answer text and notices as they arrive
fn spawn_printer(controller: &ChatController) -> tokio::task::JoinHandle<()> {
    let mut receiver = controller.subscribe();
    tokio::spawn(async move {
        let mut printed = String::new();
        while let Some(event) = utils::next_event(&mut receiver).await {
            match event {
                ControllerEvent::StreamStarted => printed.clear(),
                ControllerEvent::StreamUpdated { completion, .. } => {
                    match completion.strip_prefix(printed.as_str()) {
                        Some(delta) => print!("{}", delta),
                        // The answer was replaced wholesale
                        None => print!("\n{}", completion),
                    }
                    let _ = std::io::stdout().flush();
                    printed = completion;
                }
                ControllerEvent::StreamCompleted { .. } => println!(),
                ControllerEvent::StreamFailed { message } => {
                    eprintln!("\nError: {}", message);
                }
                ControllerEvent::Notice { message } => println!("[{}]", message),
                ControllerEvent::PageApplied { .. } | ControllerEvent::PageDiscarded { .. } => {}
            }
        }
    })
}

async fn run_interactive(session: &Session) -> anyhow::Result<()> {
    use std::io;

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let conversation = session.controller.conversation_id();
        if conversation.is_empty() {
            eprintln!("scrollback (new conversation)");
        } else {
            eprintln!("scrollback conversation: {}", conversation);
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let snapshot = session.controller.snapshot();
        match commands::execute_command(input, &snapshot) {
            Some(commands::CommandResult::Exit) => break,
            Some(commands::CommandResult::LoadMore) => session.load_more().await,
            Some(commands::CommandResult::Reload) => session.reload().await,
            Some(commands::CommandResult::Message(msg)) => println!("{}", msg),
            Some(commands::CommandResult::Unknown(cmd)) => {
                println!("Unknown command: /{}", cmd);
                println!("Type /help for available commands.");
            }
            None => session.ask(input).await?,
        }
    }

    Ok(())
}
