//! Interactive science tutor chat.
//!
//! This binary provides a streaming REPL interface for chatting with an OpenAI-compatible chat
//! completions API under a difficulty-level tutor prompt.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings (intermediate level)
//! sciquest-chat
//!
//! # Pick a level and a model
//! sciquest-chat --level beginner --model gpt-4o-mini
//!
//! # Free configuration with your own prompt
//! sciquest-chat --level off --system "You are a physics tutor" --temperature 0.7
//!
//! # Disable colors (useful for piping output)
//! sciquest-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start over
//! - `/level <level>` - Change the difficulty level
//! - `/like <n>` and `/dislike <n>` - Rate a message
//! - `/save [file]` - Save the conversation
//! - `/quit` - Exit the application

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use sciquest::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, Difficulty, PlainTextRenderer, Renderer,
    TurnStop, help_text, parse_command,
};
use sciquest::{KnownModel, Model, Role, Sentiment};

/// Main entry point for the sciquest-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut args, _) = ChatArgs::from_command_line_relaxed("sciquest-chat [OPTIONS]");
    init_logging(args.verbose);

    let api_key = args.api_key.take();
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let mut session = ChatSession::connect(config, api_key)?;
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color_and_interrupt(use_color, interrupted.clone());

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "SciQuest Chat (model: {}, level: {})",
        session.model(),
        describe_level(session.difficulty())
    );
    println!("Type /help for commands, /quit to exit\n");
    if !session.has_credential() {
        prompt_for_api_key(&mut rl, &mut session, &mut renderer);
    }

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    // Keep keys out of the history.
                    if !matches!(cmd, ChatCommand::Key(_)) {
                        let _ = rl.add_history_entry(line);
                    }
                    if !handle_command(cmd, &mut session, &mut renderer) {
                        break;
                    }
                    continue;
                }

                let _ = rl.add_history_entry(line);
                if !session.has_credential() {
                    renderer.print_error("No API key set. Enter /key <your-api-key> first.");
                    continue;
                }

                // Regular message - send to API
                println!("Tutor:");
                match session.send_streaming(line, &mut renderer).await {
                    Ok(outcome) => {
                        if outcome.stop == TurnStop::Interrupted && outcome.message_index.is_some()
                        {
                            renderer.print_info("Partial answer kept in the conversation.");
                        }
                    }
                    Err(e) => renderer.print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "sciquest=debug" } else { "sciquest=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn prompt_for_api_key(
    rl: &mut DefaultEditor,
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) {
    renderer.print_info("No API key found in --api-key or OPENAI_API_KEY.");
    match rl.readline("API key (empty to skip): ") {
        Ok(key) if !key.trim().is_empty() => match session.set_api_key(key.trim()) {
            Ok(()) => renderer.print_info("API key set."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        _ => {}
    }
    if !session.has_credential() {
        renderer.print_info("Chat is disabled until you enter /key <your-api-key>.");
    }
}

/// Applies one command to the session.  Returns false when the chat should end.
fn handle_command(
    cmd: ChatCommand,
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => {
            println!("Goodbye!");
            return false;
        }
        ChatCommand::New => {
            session.reset();
            renderer.print_info("Started a new conversation.");
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Model(model_name) => {
            let model = Model::from(model_name.as_str());
            if matches!(model, Model::Custom(_)) {
                renderer.print_info(&format!("Note: {model_name} is not a known model."));
            }
            session.set_model(model);
            renderer.print_info(&format!("Model changed to: {}", model_name));
        }
        ChatCommand::Models => {
            println!("    Known models:");
            for model in KnownModel::ALL {
                let marker = if session.model() == &Model::Known(model) {
                    "*"
                } else {
                    " "
                };
                println!("    {marker} {model}");
            }
        }
        ChatCommand::Level(level) => {
            session.set_difficulty(level);
            renderer.print_info(&format!("Level set to {}.", describe_level(level)));
        }
        ChatCommand::System(prompt) => match session.set_system_prompt(prompt.clone()) {
            Ok(()) => match prompt {
                Some(p) => renderer.print_info(&format!("System prompt set to: {}", p)),
                None => renderer.print_info("System prompt restored to the default."),
            },
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::MaxTokens(value) => match session.set_max_tokens(value) {
            Ok(()) => renderer.print_info(&format!("max_tokens set to {value}")),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Temperature(value) => match session.set_temperature(value) {
            Ok(()) => renderer.print_info(&format!("temperature set to {:.2}", value)),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Feedback(number, sentiment) => {
            match session.annotate(number - 1, sentiment) {
                Ok(()) => renderer.print_info(&format!(
                    "Recorded {} feedback for message {number}.",
                    describe_sentiment(sentiment)
                )),
                Err(err) => renderer.print_error(&err.to_string()),
            }
        }
        ChatCommand::History => print_history(session),
        ChatCommand::Save(_) if session.transcript().is_empty() => {
            renderer.print_info("Nothing to save yet.");
        }
        ChatCommand::Save(path) => {
            let path = path.map(PathBuf::from).unwrap_or_else(|| session.export_path());
            match session.save_export_to(&path) {
                Ok(()) => {
                    renderer.print_info(&format!("Conversation saved to {}", path.display()))
                }
                Err(err) => {
                    renderer.print_error(&format!("Failed to save conversation: {}", err))
                }
            }
        }
        ChatCommand::Key(key) => match session.set_api_key(key) {
            Ok(()) => renderer.print_info("API key set."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Stats => print_stats(session),
        ChatCommand::ShowConfig => print_config(session),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn print_history(session: &ChatSession) {
    let transcript = session.transcript();
    if transcript.is_empty() {
        println!("    (no messages yet)");
        return;
    }
    for (idx, message) in transcript.messages().iter().enumerate() {
        let speaker = match message.role {
            Role::User => "You",
            Role::Assistant => "Tutor",
            Role::System => "System",
        };
        let marker = match transcript.feedback(idx) {
            Some(Sentiment::Positive) => " [+]",
            Some(Sentiment::Negative) => " [-]",
            None => "",
        };
        println!("    {:>3}. {speaker}{marker}: {}", idx + 1, message.content);
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Level: {}", describe_level(stats.difficulty));
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Feedback: {} helpful / {} unhelpful",
        stats.feedback.positive, stats.feedback.negative
    );
    println!(
        "      API key: {}",
        if stats.has_credential { "set" } else { "missing" }
    );
}

fn print_config(session: &ChatSession) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Level: {}", describe_level(stats.difficulty));
    println!("      Max tokens: {}", stats.max_tokens);
    println!("      Temperature: {:.2}", stats.temperature);
    println!("      System prompt: {}", stats.system_prompt);
    println!("      Save file: {}", stats.export_path.display());
}

fn describe_level(level: Option<Difficulty>) -> String {
    level
        .map(|l| l.label().to_string())
        .unwrap_or_else(|| "off (free configuration)".to_string())
}

fn describe_sentiment(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "helpful",
        Sentiment::Negative => "unhelpful",
    }
}
