use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use chat_adapter::config::DEFAULT_LOG_LEVEL;
use chat_adapter::logging::init_logging;
use chat_adapter::{AsyncChatClient, ChatClient, ChatConfig, ChatResult, Message};
use clap::{Parser, ValueEnum};
use futures_util::StreamExt;

/// Sends one prompt to the configured chat provider.
#[derive(Parser)]
#[command(name = "chat-adapter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Call path to exercise
    #[arg(long, value_enum, default_value_t = Mode::Async)]
    mode: Mode,

    /// Prompt sent as the user message
    prompt: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Sync,
    Async,
    Stream,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = ChatConfig::from_env();
    let level = config
        .as_ref()
        .map(|config| config.log_level().to_string())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    init_logging(&level).map_err(|err| anyhow!(err))?;
    let config = config.context("failed to load configuration")?;

    tracing::info!(prompt = %cli.prompt, "sending prompt");
    let ok = match cli.mode {
        Mode::Sync => report(&ChatClient::new(config)?.complete(&cli.prompt, None)),
        Mode::Async => {
            let client = AsyncChatClient::new(config)?;
            let result = runtime()?.block_on(client.complete(&cli.prompt, None));
            report(&result)
        }
        Mode::Stream => {
            let client = AsyncChatClient::new(config)?;
            runtime()?.block_on(print_stream(&client, &cli.prompt))?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

fn report(result: &ChatResult) -> bool {
    match result {
        ChatResult::Success(completion) => {
            tracing::info!("{}", completion.message.content);
            tracing::info!(
                tokens_input = completion.token_usage.tokens_input,
                tokens_output = completion.token_usage.tokens_output,
                tokens_total = completion.token_usage.tokens_total,
                "token usage"
            );
            true
        }
        ChatResult::Failure(failure) => {
            tracing::error!(kind = ?failure.kind, "{}", failure.error);
            false
        }
    }
}

async fn print_stream(client: &AsyncChatClient, prompt: &str) -> anyhow::Result<bool> {
    let mut deltas = client.stream(&[Message::user(prompt)]);
    let mut stdout = std::io::stdout();
    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(text) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Err(err) => {
                writeln!(stdout)?;
                tracing::error!(error = %err, "stream aborted");
                return Ok(false);
            }
        }
    }
    writeln!(stdout)?;
    Ok(true)
}
