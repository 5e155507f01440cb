//! Command-line parsing and the runtime entrypoint.

use std::error::Error;

use clap::Parser;

use crate::core::config::{Config, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "causette")]
#[command(about = "A terminal chat client that streams single-shot completions from OpenAI-compatible APIs")]
#[command(
    long_about = "Causette is a full-screen terminal chat client. Type a prompt, press Enter, \
and the model's reply streams into the response pane as formatted text. Each prompt is an \
independent request; there is no conversation history.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    Your API key (required)\n\
  OPENAI_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\n\
Controls:\n\
  Type              Enter your prompt in the input field\n\
  Enter             Send the prompt\n\
  Up/Down           Scroll through the response\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    /// Model to request completions from
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Upper bound on the length of a streamed reply
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env(args.model, args.max_tokens)?;
    run_chat(config).await
}
