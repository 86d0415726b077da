use std::io::Write;

use anyhow::{bail, Result};

use crate::cli::QueryArgs;
use crate::config::Config;
use crate::nl::QuerySession;
use crate::validate;

pub async fn run(config: &Config, args: QueryArgs) -> Result<()> {
    validate::check_threshold(args.temperature, "temperature")?;
    let mut session = QuerySession::new(config, args.temperature);

    // History operations never touch the translator
    if args.clear_history {
        session.clear_history()?;
        println!("✓ Query history cleared.");
        return Ok(());
    }
    if args.history {
        println!("{}", session.show_history());
        return Ok(());
    }

    if config.anthropic_api_key.is_none() {
        bail!("ANTHROPIC_API_KEY environment variable is required for natural language queries");
    }

    match (&args.query, args.interactive) {
        (Some(query), false) => run_single(&mut session, query, args.dry_run).await,
        _ => run_interactive(&mut session, args.dry_run).await,
    }
}

async fn run_single(session: &mut QuerySession, query: &str, dry_run: bool) -> Result<()> {
    println!("🔍 Processing: {}", query);

    let (command, success, output) = session.process_query(query, dry_run).await?;

    println!("\n📋 Command: {}", command);
    if success {
        println!("\n✓ Output:\n{}", output);
    } else {
        eprintln!("\n✗ Error: {}", output);
    }
    Ok(())
}

async fn run_interactive(session: &mut QuerySession, dry_run: bool) -> Result<()> {
    println!("🤖 Mnemon Natural Language Interface");
    println!("   Type 'exit' to quit, 'help' for tips\n");

    let stdin = std::io::stdin();
    loop {
        print!("❯ ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\n👋 Goodbye!");
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            println!("👋 Goodbye!");
            break;
        }
        if query.eq_ignore_ascii_case("help") {
            show_help();
            continue;
        }

        if let Err(error) = run_single(session, query, dry_run).await {
            eprintln!("✗ Error: {}", error);
        }
        println!();
    }
    Ok(())
}

fn show_help() {
    println!(
        "\n📚 Query Tips:\n\n\
         • \"show me recent changes\" - finds changes in the last 24 hours\n\
         • \"find authentication components\" - searches for specific entity types\n\
         • \"what depends on UserService?\" - explores relationships\n\
         • \"get statistics\" - shows graph statistics\n\
         • \"show high quality results for security\" - uses advanced search\n\n\
         💡 Include time words (recent, yesterday, last week) for temporal queries\n\
         💡 Mention entity types (components, patterns, workflows) for filtering\n\
         💡 Ask about relationships (depends on, implements, belongs to)\n"
    );
}
