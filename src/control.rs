//! Operator menu.
//!
//! The menu offers four fixed items, one per size preset. Commands are read
//! as text lines on a dedicated thread and forwarded over a channel; the
//! pipeline applies them between frames.

use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use regex::Regex;

use crate::size_policy::SizePreset;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuCommand {
    Preset(SizePreset),
    ShowMenu,
    Quit,
}

/// Menu item texts, in display order.
pub fn menu_items() -> Vec<String> {
    SizePreset::ALL.iter().map(|preset| preset.label()).collect()
}

fn preset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:fruit\s+size\s+)?(\d{1,3})\s*%?$").expect("static regex is valid")
    })
}

/// Parse one menu line. Unknown input yields `None`.
pub fn parse_menu_command(line: &str) -> Option<MenuCommand> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => return Some(MenuCommand::Quit),
        "m" | "menu" | "?" => return Some(MenuCommand::ShowMenu),
        _ => {}
    }
    let captures = preset_pattern().captures(line)?;
    let percent: u32 = captures.get(1)?.as_str().parse().ok()?;
    SizePreset::from_percent(percent).map(MenuCommand::Preset)
}

/// Read menu commands from any line source until EOF or `quit`.
pub fn forward_commands<R: BufRead>(reader: R, tx: &Sender<MenuCommand>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("read menu input")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_menu_command(&line) {
            Some(command) => {
                if tx.send(command).is_err() {
                    break;
                }
                if command == MenuCommand::Quit {
                    break;
                }
            }
            None => log::warn!("menu: unrecognized command '{}'", line.trim()),
        }
    }
    Ok(())
}

/// Spawn a thread forwarding stdin lines as menu commands.
pub fn spawn_stdin_menu(tx: Sender<MenuCommand>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("menu-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            if let Err(err) = forward_commands(stdin.lock(), &tx) {
                log::warn!("menu: {:#}", err);
            }
        })
        .context("spawn menu input thread")
}
