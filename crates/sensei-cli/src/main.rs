//! Sensei CLI — streaming AI tutor chat for the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use sensei_api::{ChatClient, ChatEvents, StaticSession};
use sensei_config::{CliOverrides, SenseiConfig};
use sensei_guard::{FileStore, RateLimiter};
use sensei_types::{ChatContext, ChatError, ChatRequest, RawMessage};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "sensei", version, about = "Streaming AI tutor chat")]
struct Cli {
    /// Send a single prompt and print the streamed reply (non-interactive)
    #[arg(short, long)]
    print: Option<String>,

    /// Tutoring mode: explain, practice, review, socratic
    #[arg(long)]
    mode: Option<String>,

    /// Curriculum week for context
    #[arg(long)]
    week: Option<i64>,

    /// Scope the chat to a learning resource id
    #[arg(long)]
    resource: Option<String>,

    /// Bearer token (overrides SENSEI_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// API base URL (overrides SENSEI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

/// Streams deltas straight to stdout and remembers the full reply.
#[derive(Default)]
struct StdoutEvents {
    reply: String,
    failed: bool,
}

impl ChatEvents for StdoutEvents {
    fn on_delta(&mut self, delta: &str) {
        print!("{delta}");
        let _ = io::stdout().flush();
        self.reply.push_str(delta);
    }

    fn on_done(&mut self) {
        println!();
    }

    fn on_error(&mut self, error: ChatError) {
        eprintln!("error: {error}");
        self.failed = true;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = SenseiConfig::load(CliOverrides {
        token: cli.token,
        base_url: cli.base_url,
    })
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let store =
        FileStore::new(config.state_dir.clone()).context("Failed to open rate-limit store")?;
    let limiter = RateLimiter::new(Arc::new(store));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let session = Arc::new(StaticSession::new(config.token.clone(), "local"));
    let client = ChatClient::new(&config.base_url, session)
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .with_rate_limiter(limiter, config.chat_rate_limit)
        .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
        .with_cancellation(cancel);

    let context = ChatContext {
        mode: cli.mode,
        week: cli.week,
        mission: None,
        step: None,
    };

    if let Some(prompt) = cli.print {
        // Print mode: single prompt, no history
        let request = ChatRequest {
            messages: vec![user_message(prompt)],
            resource_id: cli.resource,
            context,
        };
        if !run_turn(&client, &request).await {
            std::process::exit(1);
        }
        return Ok(());
    }

    repl(client, context, cli.resource).await
}

async fn repl(client: ChatClient, context: ChatContext, resource_id: Option<String>) -> Result<()> {
    let mut history: Vec<RawMessage> = Vec::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        history.push(user_message(line.to_string()));
        let request = ChatRequest {
            messages: history.clone(),
            resource_id: resource_id.clone(),
            context: context.clone(),
        };

        match stream_turn(&client, &request).await {
            Some(reply) => history.push(RawMessage {
                role: "assistant".to_string(),
                content: reply,
            }),
            // Keep the failed user turn out of the history so a retry
            // does not double it.
            None => {
                history.pop();
            }
        }
    }

    Ok(())
}

async fn run_turn(client: &ChatClient, request: &ChatRequest) -> bool {
    stream_turn(client, request).await.is_some()
}

/// Stream one turn; returns the assistant's reply on success.
async fn stream_turn(client: &ChatClient, request: &ChatRequest) -> Option<String> {
    let mut events = StdoutEvents::default();
    client.stream_chat(request, &mut events).await;
    (!events.failed).then_some(events.reply)
}

fn user_message(content: String) -> RawMessage {
    RawMessage {
        role: "user".to_string(),
        content,
    }
}
