//! Line-oriented interactive session (`tierlist browse`).
//!
//! Each input line is one event against a shared [`TierList`]: selecting an
//! analysis, editing the query, or refreshing. After every event the
//! derived view is re-rendered.
//!
//! ```text
//! open <id>                 load an analysis (resets the query)
//! close                     drop the active analysis
//! search [text]             filter by function name; no text clears
//! tier <S|A|B|C|D|F|all>    show a single tier
//! sort <key> [asc|desc]     call_count, name, file, tier
//! order <asc|desc>
//! reset                     restore default query
//! refresh                   re-fetch the active analysis
//! show | stats | help | quit
//! ```

use anyhow::{bail, Result};
use tierlist_core::source::FunctionSource;
use tierlist_core::{LoadOutcome, SortKey, SortOrder, Tier, TierList};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::render::{format_stats, format_status, format_view};

pub const HELP: &str = "\
Commands:
  open <id>                 load an analysis (resets the query)
  close                     drop the active analysis
  search [text]             filter by function name; no text clears
  tier <S|A|B|C|D|F|all>    show a single tier
  sort <key> [asc|desc]     key: call_count, name, file, tier
  order <asc|desc>          change sort direction
  reset                     restore the default query
  refresh                   re-fetch the active analysis
  show                      print the current view
  stats                     print analysis stats
  help                      print this help
  quit                      leave the session
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Close,
    Search(String),
    Tier(Option<Tier>),
    Sort(SortKey, Option<SortOrder>),
    Order(SortOrder),
    Reset,
    Refresh,
    Show,
    Stats,
    Help,
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "open" => {
            if rest.is_empty() {
                bail!("usage: open <analysis-id>");
            }
            Command::Open(rest.to_string())
        }
        "close" => Command::Close,
        "search" => Command::Search(rest.to_string()),
        "tier" => match rest.to_ascii_lowercase().as_str() {
            "" | "all" => Command::Tier(None),
            _ => Command::Tier(Some(rest.parse()?)),
        },
        "sort" => {
            let mut parts = rest.split_whitespace();
            let key = match parts.next() {
                Some(key) => key.parse()?,
                None => bail!("usage: sort <call_count|name|file|tier> [asc|desc]"),
            };
            let order = parts.next().map(str::parse).transpose()?;
            Command::Sort(key, order)
        }
        "order" => Command::Order(rest.parse()?),
        "reset" => Command::Reset,
        "refresh" => Command::Refresh,
        "show" => Command::Show,
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(Some(cmd))
}

/// Apply `cmd` and return the text to print, or `None` to end the session.
pub async fn execute<S: FunctionSource + ?Sized>(
    list: &TierList<S>,
    cmd: Command,
) -> Option<String> {
    match cmd {
        Command::Open(id) => {
            if list.set_analysis_id(Some(id)).await == LoadOutcome::Skipped {
                return Some(format!(
                    "Already open; use 'refresh' to reload.\n{}",
                    format_view(&list.state())
                ));
            }
        }
        Command::Close => {
            list.set_analysis_id(None).await;
        }
        Command::Search(text) => list.set_search_query(text),
        Command::Tier(tier) => list.set_tier_filter(tier),
        Command::Sort(key, order) => {
            list.set_sort_by(key);
            if let Some(order) = order {
                list.set_sort_order(order);
            }
        }
        Command::Order(order) => list.set_sort_order(order),
        Command::Reset => list.reset_query(),
        Command::Refresh => {
            if list.refresh().await == LoadOutcome::Skipped {
                return Some("No analysis to refresh.\n".to_string());
            }
        }
        Command::Show => {}
        Command::Stats => return Some(format_stats(&list.state())),
        Command::Help => return Some(HELP.to_string()),
        Command::Quit => return None,
    }
    Some(format_view(&list.state()))
}

/// Run the session until `quit` or end of input.
pub async fn run_session<S, R>(list: &TierList<S>, initial: Option<String>, input: R) -> Result<()>
where
    S: FunctionSource + ?Sized,
    R: AsyncBufRead + Unpin,
{
    if let Some(id) = initial {
        if let Some(text) = execute(list, Command::Open(id)).await {
            print!("{}", text);
        }
    } else {
        print!("{}", HELP);
    }

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(cmd)) => match execute(list, cmd).await {
                Some(text) => {
                    print!("{}", text);
                    println!("-- {}", format_status(&list.state()));
                }
                None => break,
            },
            Ok(None) => {}
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}
