//! Terminal rendering for the interactive loop
//!
//! Rendering returns strings so it can be tested; printing is left to the
//! caller. Colors come from `console` and respect `NO_COLOR`/non-tty output.

use crate::agent::AgentRegistry;
use crate::routing::CoordinatorStats;
use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::style;

fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).set_alignment(CellAlignment::Left)),
        );
    table
}

pub fn render_header() -> String {
    let rule = "=".repeat(70);
    format!(
        "{}\n   {}\n{}\n{}\n",
        style(&rule).cyan(),
        style("Course Advisor - multi-agent course and professor assistant").cyan().bold(),
        style(&rule).cyan(),
        style("Questions are routed automatically to the right agent.").yellow()
    )
}

pub fn render_help(agent_names: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", style("What you can ask:").yellow()));
    out.push_str(&format!("{}\n", style("  Course questions:").green()));
    out.push_str("    - What is CMPUT 174 about?\n");
    out.push_str("    - What are the prerequisites for MATH 100?\n");
    out.push_str("    - Tell me about CS 229 at Stanford\n");

    if agent_names.iter().any(|n| n == crate::app::INSTRUCTOR_AGENT) {
        out.push_str(&format!(
            "{}\n",
            style("  Professor questions (live RateMyProfessors data):").green()
        ));
        out.push_str("    - Tell me about Professor Richard Sutton at University of Alberta\n");
        out.push_str("    - What are Mike Horowitz's ratings?\n");
    }

    out.push_str(&format!("\n{}\n", style("Commands:").yellow()));
    for (command, text) in [
        ("stats", "Show session statistics"),
        ("cache", "Show cached lookups"),
        ("agents", "List available agents"),
        ("clear", "Clear conversation history"),
        ("help", "Show this help message"),
        ("quit/exit/q", "Exit the program"),
    ] {
        out.push_str(&format!("  {:<14} {text}\n", style(command).green()));
    }
    out
}

pub fn render_stats(stats: &CoordinatorStats) -> String {
    let mut table = list_table(&["Metric", "Value"]);
    table.add_row(vec![Cell::new("Session"), Cell::new(stats.session_id)]);
    table.add_row(vec![Cell::new("Exchanges"), Cell::new(stats.total_exchanges)]);
    table.add_row(vec![Cell::new("Turns stored"), Cell::new(stats.turns_stored)]);
    table.add_row(vec![Cell::new("Cached lookups"), Cell::new(stats.cached_entries)]);
    for agent in &stats.agent_calls {
        table.add_row(vec![
            Cell::new(format!("{} calls", agent.name)),
            Cell::new(agent.calls),
        ]);
    }
    format!("{}\n{table}", style("Session statistics").yellow().bold())
}

pub fn render_agents(registry: &AgentRegistry) -> String {
    if registry.is_empty() {
        return "No agents registered.".to_string();
    }
    let mut table = list_table(&["Agent", "Description", "Calls"]);
    for agent in registry.iter() {
        table.add_row(vec![
            Cell::new(&agent.name),
            Cell::new(&agent.description),
            Cell::new(agent.invocation_count).set_alignment(CellAlignment::Right),
        ]);
    }
    format!("{}\n{table}", style("Available agents").yellow().bold())
}

pub fn render_cache(keys: &[String]) -> String {
    if keys.is_empty() {
        return format!("{}\n(empty)", style("Cache").yellow().bold());
    }
    let mut table = list_table(&["Cached lookup"]);
    for key in keys {
        table.add_row(vec![Cell::new(key)]);
    }
    format!("{}\n{table}", style(format!("Cache ({} entries)", keys.len())).yellow().bold())
}

pub fn render_reply(reply: &str) -> String {
    format!("{} {reply}\n", style("Advisor:").cyan().bold())
}

pub fn render_error(message: &str) -> String {
    format!("{} {message}", style("Error:").red().bold())
}
