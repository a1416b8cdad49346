//! Line-oriented console chat.
//!
//! Commands typed at the prompt:
//!
//! - `exit` - leave the chat
//! - `/stats` - message counts for the whole chat
//! - `/history` - the whole stored chat
//! - `/history mine` - only your own messages
//! - `/history <n>h` - the last `n` hours
//! - `/history <from> <to>` - whole days, `2024-05-01` or `01.05.2024`
//! - `/forget` - delete your stored messages

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::colors::ColorBook;
use super::{ChatClient, ClientError};
use crate::common::{ChatMessage, DisplayColor};
use crate::config::AppConfig;
use crate::storage::ChatStats;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Exit,
    Stats,
    History(HistoryScope),
    Forget,
    Say(String),
    Nothing,
}

#[derive(Debug, PartialEq, Eq)]
enum HistoryScope {
    All,
    Mine,
    LastHours(i64),
    Days(NaiveDate, NaiveDate),
}

fn parse_day(word: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(word, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(word, "%d.%m.%Y"))
        .ok()
}

/// First and last instant of the calendar days `from..=to` in `tz`.
fn day_bounds<Tz: TimeZone>(
    tz: &Tz,
    from: NaiveDate,
    to: NaiveDate,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tz
        .from_local_datetime(&from.and_time(NaiveTime::MIN))
        .earliest()?;
    let next_day = tz
        .from_local_datetime(&to.succ_opt()?.and_time(NaiveTime::MIN))
        .earliest()?;
    Some((
        start.with_timezone(&Utc),
        next_day.with_timezone(&Utc) - Duration::milliseconds(1),
    ))
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Nothing;
    }
    if line.eq_ignore_ascii_case("exit") {
        return Command::Exit;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [cmd] if cmd.eq_ignore_ascii_case("/stats") => Command::Stats,
        [cmd] if cmd.eq_ignore_ascii_case("/forget") => Command::Forget,
        [cmd] if cmd.eq_ignore_ascii_case("/history") => Command::History(HistoryScope::All),
        [cmd, arg] if cmd.eq_ignore_ascii_case("/history") => {
            if arg.eq_ignore_ascii_case("mine") {
                Command::History(HistoryScope::Mine)
            } else if let Some(hours) = arg.strip_suffix('h').and_then(|n| n.parse().ok()) {
                Command::History(HistoryScope::LastHours(hours))
            } else {
                Command::Say(line.to_string())
            }
        }
        [cmd, from, to] if cmd.eq_ignore_ascii_case("/history") => {
            match (parse_day(from), parse_day(to)) {
                (Some(from), Some(to)) => {
                    Command::History(HistoryScope::Days(from.min(to), from.max(to)))
                }
                _ => Command::Say(line.to_string()),
            }
        }
        _ => Command::Say(line.to_string()),
    }
}

fn print_message(message: &ChatMessage) {
    let local = message.timestamp.with_timezone(&Local);
    println!(
        "{}{}: {}{}  [{}]",
        message.sender_color.ansi(),
        message.sender,
        message.content,
        DisplayColor::RESET,
        local.format("%H:%M"),
    );
}

fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("No chat history available.");
        return;
    }
    for message in messages {
        let local = message.timestamp.with_timezone(&Local);
        println!(
            "{} {}{}{}: {}",
            local.format("%Y-%m-%d %H:%M:%S"),
            message.sender_color.ansi(),
            message.sender,
            DisplayColor::RESET,
            message.content
        );
    }
}

fn print_stats(stats: &ChatStats) {
    println!("--- Chat statistics ---");
    println!("Total messages: {}", stats.total);
    println!("Average per user: {:.2}", stats.average_per_sender);
    println!("Most active users:");
    for entry in &stats.top_senders {
        println!("- {}: {} messages", entry.sender, entry.messages);
    }
}

async fn prompt_name(lines: &mut Lines<BufReader<Stdin>>) -> Result<String, ClientError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter your name: ").await?;
    stdout.flush().await?;

    Ok(lines.next_line().await?.unwrap_or_default())
}

async fn run_command(client: &ChatClient, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Stats => print_stats(&client.stats().await?),
        Command::History(HistoryScope::All) => {
            print_history(&client.history(None, None, None).await?)
        }
        Command::History(HistoryScope::Mine) => {
            print_history(&client.history(Some(client.alias()), None, None).await?)
        }
        Command::History(HistoryScope::LastHours(hours)) => {
            let from =
                Duration::try_hours(hours).and_then(|span| Utc::now().checked_sub_signed(span));
            print_history(&client.history(None, from, None).await?)
        }
        Command::History(HistoryScope::Days(from, to)) => match day_bounds(&Local, from, to) {
            Some((from, to)) => print_history(&client.history(None, Some(from), Some(to)).await?),
            None => println!("Those dates are out of range."),
        },
        Command::Forget => {
            let deleted = client.forget_history().await?;
            println!("Deleted {deleted} message(s) from your history.");
        }
        Command::Say(content) => client.send(&content).await?,
        Command::Exit | Command::Nothing => {}
    }
    Ok(())
}

/// Run an interactive session against the relay at `server_url`.
pub async fn run(
    config: &AppConfig,
    server_url: &str,
    name: Option<String>,
    only_mine: bool,
) -> Result<(), ClientError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let name = match name {
        Some(name) => name,
        None => prompt_name(&mut lines).await?,
    };
    let alias = if name.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        name.trim().to_lowercase()
    };

    let color = ColorBook::new(&config.color_book_path).load_or_assign(&alias);
    let client = ChatClient::new(alias.clone(), color, server_url)?;

    match client.sign_in().await {
        Ok(()) => {}
        Err(ClientError::NameTaken) => {
            println!("That name or color is already in use. Please pick another name.");
            return Ok(());
        }
        Err(err) => return Err(err),
    }

    println!("--- Previous messages ---");
    let scope = if only_mine {
        HistoryScope::Mine
    } else {
        HistoryScope::All
    };
    if let Err(err) = run_command(&client, Command::History(scope)).await {
        log::warn!("Could not load chat history: {err}");
    }
    client.send("Hi, I joined the chat!").await?;

    // Network -> console
    let (event_tx, mut event_rx) = mpsc::channel::<ChatMessage>(100);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = {
        let client = client.clone();
        tokio::spawn(async move { client.listen(event_tx, shutdown_rx).await })
    };

    println!(
        "Connected as {}{alias}{}. Type a message, or 'exit' to leave.",
        client.color().ansi(),
        DisplayColor::RESET
    );

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(message) if message.sender != alias => print_message(&message),
                Some(_) => {}
                None => {
                    println!("Lost connection to the chat.");
                    break;
                }
            },
            line = lines.next_line() => {
                let command = match line? {
                    Some(line) => parse_command(&line),
                    None => Command::Exit,
                };
                if command == Command::Exit {
                    break;
                }
                if let Err(err) = run_command(&client, command).await {
                    println!("Request failed: {err}");
                }
            }
        }
    }

    if let Err(err) = client.sign_out().await {
        log::warn!("Sign-out failed: {err}");
    }
    let _ = shutdown_tx.send(true);
    let _ = listener.await;
    println!("Goodbye.");
    Ok(())
}
