#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;

use args::{Args, Command};
use clap::Parser;
use conduit_config::Config;
use conduit_llm::{CompletionOptions, DeltaStream, LanguageModel, Message, OpenAiAdapter, TextStream};
use futures_util::TryStreamExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    conduit_telemetry::init(Some(&config.telemetry), "warn")?;

    tracing::debug!(
        config_path = %args.config.display(),
        api_type = ?config.provider.api_type,
        "starting conduit"
    );

    // Ctrl-C aborts the in-flight request; the command then exits cleanly
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let model = args.model.or_else(|| config.provider.model.clone());
    let adapter = OpenAiAdapter::new(config.provider);

    run(&adapter, args.command, model, &cancel).await
}

async fn run(
    adapter: &OpenAiAdapter,
    command: Command,
    model: Option<String>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Command::Chat {
            prompt,
            system,
            no_stream,
            max_tokens,
            temperature,
            stop,
        } => {
            let options = CompletionOptions {
                max_tokens,
                temperature,
                stop: (!stop.is_empty()).then_some(stop),
                stream: !no_stream,
                ..CompletionOptions::new(require_model(model)?)
            };

            let mut messages = Vec::with_capacity(2);
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));

            if no_stream {
                if let Some(reply) = adapter.chat(&messages, cancel, &options).await? {
                    println!("{}", reply.content.as_text());
                }
                return Ok(());
            }

            print_deltas(adapter.stream_chat(&messages, cancel, &options).await?).await
        }
        Command::Complete {
            prompt,
            raw,
            max_tokens,
        } => {
            let options = CompletionOptions {
                max_tokens,
                raw,
                stream: true,
                ..CompletionOptions::new(require_model(model)?)
            };
            print_text(adapter.stream_complete(&prompt, cancel, &options).await?).await
        }
        Command::Fim {
            prefix,
            suffix,
            max_tokens,
        } => {
            let options = CompletionOptions {
                max_tokens,
                ..CompletionOptions::new(require_model(model)?)
            };
            print_text(adapter.stream_fim(&prefix, &suffix, cancel, &options).await?).await
        }
        Command::Embed { texts } => {
            let mut stdout = std::io::stdout().lock();
            for vector in adapter.embed(&texts).await? {
                writeln!(stdout, "{}", serde_json::to_string(&vector)?)?;
            }
            Ok(())
        }
        Command::Models => {
            let mut models = adapter.list_models().await?;
            models.sort_unstable();

            let mut stdout = std::io::stdout().lock();
            for model in models {
                writeln!(stdout, "{model}")?;
            }
            Ok(())
        }
    }
}

fn require_model(model: Option<String>) -> anyhow::Result<String> {
    model.ok_or_else(|| anyhow::anyhow!("no model given, pass --model or set `provider.model`"))
}

async fn print_deltas(mut deltas: DeltaStream) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    while let Some(delta) = deltas.try_next().await? {
        for call in delta.tool_calls.iter().flatten() {
            if let Some(name) = &call.name {
                eprintln!("[tool call: {name}]");
            }
        }
        write!(stdout, "{}", delta.content)?;
        stdout.flush()?;
    }

    writeln!(stdout)?;
    Ok(())
}

async fn print_text(mut text: TextStream) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    while let Some(piece) = text.try_next().await? {
        write!(stdout, "{piece}")?;
        stdout.flush()?;
    }

    writeln!(stdout)?;
    Ok(())
}

/// Wait for `SIGINT` or `SIGTERM`
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("cancelling in-flight request");
}
