use clap::Parser;
use lmchat::cli::Args;
use lmchat::ui::{
    display_cancelled, display_content, display_delta, display_error, display_models,
    display_status, display_tool_calls,
};
use lmchat::{ChatSession, ClientConfig, SessionEvent, TurnOutcome, TurnRequest};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "lmchat=debug" } else { "lmchat=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ClientConfig::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };
    init_logging(config.verbose);

    if let Err(e) = run(args, config).await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run(args: Args, config: ClientConfig) -> lmchat::Result<()> {
    let verbose = config.verbose;
    let session = ChatSession::new(config)?;

    if args.list_models {
        let models = session.models().list_models().await?;
        display_models(&models);
        return Ok(());
    }

    let Some(prompt) = args.prompt_text() else {
        eprintln!("Usage: lmchat [OPTIONS] <PROMPT>...");
        process::exit(1);
    };

    let streaming = session.config().stream;
    let mut events = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::ContentDelta(delta) => display_delta(&delta),
                SessionEvent::Status(status) if verbose => display_status(&status),
                SessionEvent::Completed(_) | SessionEvent::Cancelled | SessionEvent::Error(_) => break,
                _ => {}
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let request = TurnRequest::text(prompt).with_images(args.images);
    let outcome = session.send_turn(request, cancel).await;
    let _ = printer.await;

    match outcome? {
        TurnOutcome::Completed(reply) => {
            if streaming {
                println!();
            } else {
                display_content(&reply.text);
            }
            if reply.has_tool_calls() {
                display_tool_calls(&reply.tool_calls);
            }
        }
        TurnOutcome::Cancelled => display_cancelled(),
    }

    Ok(())
}
