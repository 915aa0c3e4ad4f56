use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conduit command line
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Chat, complete and embed against OpenAI-compatible backends")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Model to use instead of `provider.model`
    #[arg(short, long, global = true, env = "CONDUIT_MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one user message and print the reply
    Chat {
        prompt: String,

        /// System instruction sent before the prompt
        #[arg(long)]
        system: Option<String>,

        /// Wait for the whole reply instead of streaming it
        #[arg(long)]
        no_stream: bool,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f64>,

        /// Stop sequence; may be repeated
        #[arg(long = "stop")]
        stop: Vec<String>,
    },

    /// Complete a prompt, streaming text
    Complete {
        prompt: String,

        /// Send the prompt verbatim to the legacy completions endpoint
        #[arg(long)]
        raw: bool,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Fill the gap between a prefix and a suffix
    Fim {
        #[arg(long)]
        prefix: String,

        #[arg(long, default_value = "")]
        suffix: String,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Print one JSON embedding vector per input text
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// List the models served by the backend
    Models,
}
