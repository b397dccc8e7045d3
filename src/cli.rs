use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "lmchat")]
#[command(about = "Chat with a local OpenAI-compatible LLM server", long_about = None)]
pub struct Args {
    #[arg(
        long = "endpoint",
        help = "Chat completions URL or base URL (e.g., http://localhost:1234/v1)"
    )]
    pub endpoint: Option<String>,

    #[arg(short = 'm', long = "model", help = "Model identifier to request")]
    pub model: Option<String>,

    #[arg(short = 's', long = "system", help = "System prompt for the conversation")]
    pub system: Option<String>,

    #[arg(
        short = 'i',
        long = "image",
        value_name = "PATH",
        help = "Attach an image to the prompt (repeatable)"
    )]
    pub images: Vec<PathBuf>,

    #[arg(long = "no-stream", help = "Wait for the whole reply instead of streaming")]
    pub no_stream: bool,

    #[arg(long = "list-models", help = "List models known to the server and exit")]
    pub list_models: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(help = "Prompt to send to the model")]
    pub prompt: Vec<String>,
}

impl Args {
    pub fn prompt_text(&self) -> Option<String> {
        let text = self.prompt.join(" ");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
