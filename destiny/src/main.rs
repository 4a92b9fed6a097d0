//! Text-based AI game master.
//!
//! A line-oriented interface over the destiny-core engine: each input line
//! is one turn, narrative comes back on stdout, and `#` lines are local
//! commands.
//!
//! ```bash
//! GEMINI_API_KEY=... cargo run -p destiny -- --storage my_campaign
//! ```

use destiny_core::{GameSession, QuestEvent, SessionConfig};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let storage = args
        .iter()
        .position(|a| a == "--storage")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("campaign");

    let client = match gemini::Gemini::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Set GEMINI_API_KEY in .env or with: export GEMINI_API_KEY=your_key_here");
            std::process::exit(1);
        }
    };
    info!("using model {}", client.model());

    let config = SessionConfig::new().with_storage_dir(storage);
    let mut session =
        GameSession::new(config, Arc::new(client.clone()), Arc::new(client)).await?;

    println!("=== Dungeons N Destiny ===");
    println!("State directory: {storage}");
    println!();
    println!("Commands:");
    println!("  #quests  - List active quests");
    println!("  #rewards - List collected rewards");
    println!("  #quit    - Exit");
    println!();
    println!("Enter your actions (one per line):");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.trim() {
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "quests" => print_quests(&session),
                "rewards" => print_rewards(&session),
                "help" => print_help(),
                other => println!("[ERROR] Unknown command: #{other}"),
            }
            continue;
        }

        let outcome = match session.player_action(line).await {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("[ERROR] Turn failed, nothing was recorded: {e}");
                eprintln!("[ERROR] You can retry the same input.");
                continue;
            }
        };

        println!();
        println!("{}", outcome.narrative);
        println!();

        for event in &outcome.quest_events {
            match event {
                QuestEvent::Accepted { name } => println!("[QUEST] New Quest Accepted: {name}"),
                QuestEvent::Progressed {
                    name,
                    progress_status,
                } => println!("[QUEST] Quest Progress Updated: {name} ({progress_status}/10)"),
                QuestEvent::Completed { name, reward } => {
                    println!("[QUEST] Quest Completed: {name}");
                    println!("[QUEST] Reward received: {reward}");
                }
                QuestEvent::Abandoned { count } => {
                    println!("[QUEST] Quest abandoned. No rewards received. ({count} forfeited)")
                }
            }
        }

        for proposal in &outcome.proposed_quests {
            println!();
            println!("[QUEST] New quest available: {}", proposal.quest_name);
            println!("        {}", proposal.description);
            println!("        Reward: {}", proposal.reward);
            print!("Accept this quest? (y/n) ");
            io::stdout().flush()?;

            let answer = lines.next().transpose()?.unwrap_or_default();
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                match session.accept_quest(proposal).await? {
                    Some(quest) => {
                        println!("[QUEST] New Quest Accepted: {}", quest.quest_name)
                    }
                    None => println!("[QUEST] A quest by that name is already active."),
                }
            } else {
                println!("[QUEST] Declined.");
            }
        }
    }

    Ok(())
}

fn print_quests(session: &GameSession) {
    let quests = session.quests().get_active_quests();
    if quests.is_empty() {
        println!("No active quests.");
        return;
    }
    for quest in quests {
        println!(
            "- {} (Progress: {}/10){}",
            quest.quest_name,
            quest.progress_status,
            if quest.mandatory { " [mandatory]" } else { "" }
        );
        println!("  {}", quest.progress_summary);
    }
}

fn print_rewards(session: &GameSession) {
    let context = session.quests().get_rewards_context();
    if context.is_empty() {
        println!("No rewards collected.");
    } else {
        println!("{context}");
    }
}

fn print_help() {
    println!("destiny - text-based AI game master");
    println!();
    println!("Usage: destiny [--storage <dir>]");
    println!();
    println!("Options:");
    println!("  --storage <dir>  Directory for durable state (default: campaign)");
    println!("  --help, -h       Show this help");
    println!();
    println!("Requires GEMINI_API_KEY in the environment or a .env file.");
}
