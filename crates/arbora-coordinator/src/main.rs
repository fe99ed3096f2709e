//! Arbora CLI
//!
//! Wires the live Ollama adapters into a stdin turn loop against a sample
//! job context. Each turn prints the structured turn result; `:left` shows
//! what the record is still missing.

use anyhow::Context;
use arbora_coordinator::{Coordinator, CoordinatorConfig, ExtractorRegistry, TurnLog};
use arbora_domain::JobContext;
use arbora_guard::ContextGuard;
use arbora_llm::{OllamaBackstop, OllamaClient, OllamaIntentClassifier, OllamaSectionExtractor};
use arbora_router::ServiceRouter;
use std::env;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let config = if args.len() > 2 && args[1] == "--config" {
        CoordinatorConfig::from_file(&args[2])
            .with_context(|| format!("loading config from {}", args[2]))?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: no config file specified, using default test configuration");
        eprintln!("Usage: arbora --config <path-to-config.toml>");
        eprintln!();
        CoordinatorConfig::default_test_config()
    };

    let make_client = || OllamaClient::new(&config.ollama_endpoint, &config.ollama_model);
    let intent = OllamaIntentClassifier::new(make_client()?);
    let extractor = Arc::new(OllamaSectionExtractor::new(make_client()?));
    let corrections = Arc::new(OllamaSectionExtractor::corrections_tuned(make_client()?));
    let backstop = OllamaBackstop::new(make_client()?);

    let mut coordinator = Coordinator::new(
        JobContext::sample(),
        intent,
        ExtractorRegistry::uniform(extractor),
        corrections,
        ServiceRouter::new(backstop, config.backstop_min_confidence),
        ContextGuard::default_config(),
        TurnLog::new(&config.turn_log_path),
    );

    println!("arbora ready. Dictate observations or request a service.");
    println!("Commands: :left (missing fields), :record (current record), :quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            ":quit" | ":q" => break,
            ":left" => {
                for (section, paths) in coordinator.record().whats_left() {
                    println!("{}:", section);
                    for path in paths {
                        println!("  - {}", path);
                    }
                }
            }
            ":record" => {
                println!("{}", serde_json::to_string_pretty(coordinator.record())?);
            }
            _ => {
                let result = coordinator.handle_turn(line);
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Arbora - turn coordinator for structured field-report capture");
    println!();
    println!("USAGE:");
    println!("    arbora --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    backstop_min_confidence  Acceptance threshold for the backstop (default 0.60)");
    println!("    turn_log_path            JSONL turn log file (default arbora_turns.jsonl)");
    println!("    ollama_endpoint          Ollama API endpoint (default http://localhost:11434)");
    println!("    ollama_model             Ollama model name (default llama3.1)");
    println!();
    println!("ENVIRONMENT:");
    println!("    ARBORA_BACKSTOP_MIN_CONF  Override the backstop threshold");
    println!("    ARBORA_TURN_LOG           Override the turn log path");
}
