//! Interactive chat loop

use super::display;
use crate::routing::Coordinator;
use console::style;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, info};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Help,
    Agents,
    Stats,
    Cache,
    Clear,
    Empty,
    Query(String),
}

impl ReplCommand {
    /// Commands are matched case-insensitively; anything else is a query (pure function)
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "help" => ReplCommand::Help,
            "agents" => ReplCommand::Agents,
            "stats" => ReplCommand::Stats,
            "cache" => ReplCommand::Cache,
            "clear" => ReplCommand::Clear,
            _ => ReplCommand::Query(trimmed.to_string()),
        }
    }
}

fn prompt() {
    print!("{} ", style("You:").bold());
    // A failed flush only delays the prompt
    let _ = std::io::stdout().flush();
}

/// Run until quit, EOF or Ctrl-C
pub async fn run_repl(coordinator: &mut Coordinator) {
    println!("{}", display::render_header());
    println!("{}", display::render_help(&coordinator.agents().names()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();

        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                println!("{}", display::render_error(&e.to_string()));
                break;
            }
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", display::render_help(&coordinator.agents().names())),
            ReplCommand::Agents => println!("{}\n", display::render_agents(coordinator.agents())),
            ReplCommand::Stats => println!("{}\n", display::render_stats(&coordinator.stats())),
            ReplCommand::Cache => println!("{}\n", display::render_cache(&coordinator.cache().keys())),
            ReplCommand::Clear => {
                coordinator.clear_history();
                println!("{}\n", style("Conversation history cleared.").dim());
            }
            ReplCommand::Query(query) => {
                debug!(len = query.len(), "Routing user query");
                let reply = tokio::select! {
                    reply = coordinator.execute(&query) => reply,
                    _ = signal::ctrl_c() => {
                        info!("Interrupted during a turn");
                        break;
                    }
                };
                println!("{}", display::render_reply(&reply));
            }
        }
    }

    println!("\n{}", style("Thank you for using Course Advisor!").cyan());
}
