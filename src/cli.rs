//! Command-line interface and REPL

use anyhow::{Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::avr::{AvrHandle, AvrStatus};
use crate::protocol::registry;

const PROMPT: &str = "anthem> ";

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Status,
    Json,
    Power(bool),
    Mute(bool),
    Volume(i32),
    Attenuation(i32),
    Percent(f64),
    Input(i32),
    InputName(String),
    Query(String),
    Raw(String),
    Refresh,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse a prompt line, `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "status" | "s" => Self::Status,
            "json" => Self::Json,
            "power" => Self::Power(parse_switch(rest)?),
            "mute" => Self::Mute(parse_switch(rest)?),
            "volume" | "vol" => Self::Volume(parse_number(rest, "volume")?),
            "att" => Self::Attenuation(parse_number(rest, "attenuation")?),
            "percent" => Self::Percent(
                rest.parse()
                    .with_context(|| format!("invalid percentage '{}'", rest))?,
            ),
            "input" => Self::Input(parse_number(rest, "input")?),
            "input-name" => Self::InputName(required(rest, "input name")?.to_string()),
            "query" | "q" => Self::Query(required(rest, "attribute key")?.to_ascii_uppercase()),
            "raw" => Self::Raw(required(rest, "command")?.to_string()),
            "refresh" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => anyhow::bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(Some(command))
    }

    /// Run the command against the handler, returns false to leave the REPL
    pub async fn execute(&self, avr: &AvrHandle) -> Result<bool> {
        match self {
            Self::Status => print_status(&avr.status().await?),
            Self::Json => {
                let snapshot = avr.snapshot().await?;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Self::Power(on) => avr.set_power(*on).await?,
            Self::Mute(muted) => avr.set_mute(*muted).await?,
            Self::Volume(level) => avr.set_volume(*level).await?,
            Self::Attenuation(db) => avr.set_attenuation(*db).await?,
            Self::Percent(fraction) => avr.set_volume_as_percentage(*fraction).await?,
            Self::Input(number) => avr.set_input_number(*number).await?,
            Self::InputName(name) => avr.set_input_name(name.as_str()).await?,
            Self::Query(key) => avr.query(key.as_str()),
            Self::Raw(raw) => avr.command(raw.as_str()),
            Self::Refresh => avr.refresh_all(),
            Self::Help => print_help(),
            Self::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn parse_switch(arg: &str) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        _ => anyhow::bail!("expected 'on' or 'off', got '{}'", arg),
    }
}

fn parse_number(arg: &str, what: &str) -> Result<i32> {
    arg.parse()
        .with_context(|| format!("invalid {} '{}'", what, arg))
}

fn required<'a>(arg: &'a str, what: &str) -> Result<&'a str> {
    if arg.is_empty() {
        anyhow::bail!("missing {}", what);
    }
    Ok(arg)
}

/// Render a change notification for the terminal
pub fn format_notification(raw: &str) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
    let text = match registry::match_prefix(raw) {
        Some((attr, value)) => registry::describe(attr.key, value),
        None => raw.to_string(),
    };
    format!("{} {} {}", timestamp.dimmed(), "◀".cyan(), text)
}

fn print_status(status: &AvrStatus) {
    let on_off = |value: bool| if value { "on".green() } else { "off".red() };

    println!(
        "{:<12} {}",
        "connected".bold(),
        if status.connected { "yes".green() } else { "no".red() }
    );
    println!("{:<12} {}", "power".bold(), on_off(status.power));
    println!("{:<12} {}", "mute".bold(), on_off(status.mute));
    println!(
        "{:<12} {} ({} dB, {:.0}%)",
        "volume".bold(),
        status.volume,
        status.attenuation,
        status.volume_as_percentage * 100.0
    );
    let input = match status.input_number {
        Some(number) => number.to_string(),
        None => "?".to_string(),
    };
    println!(
        "{:<12} {} {} [{}]",
        "input".bold(),
        input,
        status.source.unwrap_or("-"),
        status.input_name
    );
    println!("{:<12} {}", "power-on".bold(), status.reconcile_phase);
}

const HELP: &[(&str, &str)] = &[
    ("status", "show current receiver state"),
    ("json", "dump the raw state mirror as JSON"),
    ("power on|off", "switch zone 1 power"),
    ("mute on|off", "switch zone 1 mute"),
    ("volume N", "set volume level 0-100"),
    ("att N", "set attenuation -90..0 dB"),
    ("percent F", "set volume as fraction 0.0-1.0"),
    ("input N", "select input 1-99"),
    ("input-name NAME", "select a discovered input by name"),
    ("query KEY", "query one attribute, e.g. P1S"),
    ("raw CMD", "send a raw command, e.g. P1V-40"),
    ("refresh", "query every attribute"),
    ("quit", "leave"),
];

fn print_help() {
    println!("{}", "Commands:".bold());
    for (usage, text) in HELP {
        println!("  {:<18} {}", usage.cyan(), text);
    }
}

/// Interactive prompt until `quit`, EOF or Ctrl-C
pub async fn run_repl(avr: AvrHandle) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        // rustyline blocks, keep it off the runtime threads
        let (editor, readline) = tokio::task::spawn_blocking(move || {
            let line = rl.readline(PROMPT);
            (rl, line)
        })
        .await?;
        rl = editor;

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match ReplCommand::parse(&line) {
                    Ok(Some(command)) => match command.execute(&avr).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => println!("{} {}", "error:".red().bold(), e),
                    },
                    Ok(None) => {}
                    Err(e) => println!("{} {}", "error:".red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
