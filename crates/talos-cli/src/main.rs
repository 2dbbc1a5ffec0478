//! talos - interactive agent shell
//!
//! Reads a line, lets the model drive the local tools, prints the answer.
//! Session commands: /clear resets the conversation, /quit exits.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod repl;

/// Default persona handed to the model.
const SYSTEM_PROMPT: &str = "You are running inside talos, a terminal agent shell that gives you \
access to tools on the user's machine.

TOOLS YOU HAVE:
• read_file, write_file, edit_file - file access and in-place edits
• list_directory, search_files - explore the working tree
• copy_path, move_path, delete_path - filesystem changes
• shell - run terminal commands; output comes back with [stdout]/[stderr] prefixes

GUIDELINES:
• Use tools proactively when they'd help answer a question
• Prefer edit_file over rewriting whole files
• Be concise and direct, avoid filler
• Tool errors come back as text starting with 'error:' - read them and adjust";

#[derive(Parser)]
#[command(name = "talos")]
#[command(version)]
#[command(about = "Interactive agent shell with local tools", long_about = None)]
struct Cli {
    /// Model identifier (overrides TALOS_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Replace the default system prompt
    #[arg(long)]
    system_prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = talos_core::Config::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    let system_prompt = cli
        .system_prompt
        .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

    repl::run(config, system_prompt).await
}
