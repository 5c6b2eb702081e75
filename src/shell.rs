//! Line-oriented interactive front end
//!
//! Checks run as background tasks; their outcomes come back over a channel
//! tagged with the request token they were dispatched under, so a slow early
//! check can never overwrite a newer one.

use crate::error::CheckError;
use crate::lookup::LookupService;
use crate::render::render_table;
use crate::session::{fetch_quality, fetch_whois, Delivery, RequestToken, Session, TableKind};
use crate::storage::{Storage, API_KEY_SETTING};
use crate::table::export::CsvStyle;
use crate::table::filter::StatusFilter;
use crate::table::models::{QualityRecord, WhoisRecord};
use crate::table::record::Record;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  whois <ip ...|@file>           look up bare IPs
  quality <proxy ...|@file>      check proxies (host:port[:user:pass])
  sort <whois|quality> <column>  sort by column, again to reverse
  search <whois|quality> [term]  filter rows by text (empty clears)
  filter <all|live|dead>         status filter on the quality table
  show [whois|quality]           print tables
  stats                          print live/dead counts
  export <whois|quality> [dir]   write the displayed rows to CSV
  key [value]                    set or show the IP-quality API key
  help                           this text
  quit                           leave";

/// Where a check's input text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInput {
    /// Entries typed on the command line, one per line
    Inline(String),
    File(PathBuf),
}

impl CheckInput {
    async fn into_text(self) -> Result<String> {
        match self {
            CheckInput::Inline(text) => Ok(text),
            CheckInput::File(path) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Whois(CheckInput),
    Quality(CheckInput),
    Sort { table: TableKind, key: String },
    Search { table: TableKind, term: String },
    Filter(StatusFilter),
    Show(Option<TableKind>),
    Stats,
    Export { table: TableKind, dir: Option<PathBuf> },
    Key(Option<String>),
    Help,
    Quit,
}

/// Parse one input line; blank lines give `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let command = match verb.to_lowercase().as_str() {
        "whois" => Command::Whois(parse_check_input(rest)?),
        "quality" => Command::Quality(parse_check_input(rest)?),
        "sort" => {
            let table = parse_table(args.next())?;
            let key = args
                .next()
                .ok_or_else(|| anyhow!("Usage: sort <whois|quality> <column>"))?
                .to_lowercase();
            Command::Sort { table, key }
        }
        "search" => {
            let table = parse_table(args.next())?;
            Command::Search {
                table,
                term: args.collect::<Vec<_>>().join(" "),
            }
        }
        "filter" => Command::Filter(
            args.next()
                .ok_or_else(|| anyhow!("Usage: filter <all|live|dead>"))?
                .parse()?,
        ),
        "show" => Command::Show(args.next().map(|t| parse_table(Some(t))).transpose()?),
        "stats" => Command::Stats,
        "export" => Command::Export {
            table: parse_table(args.next())?,
            dir: args.next().map(PathBuf::from),
        },
        "key" => Command::Key(args.next().map(str::to_string)),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("Unknown command '{}', try 'help'", other),
    };

    Ok(Some(command))
}

fn parse_check_input(rest: &str) -> Result<CheckInput> {
    if let Some(path) = rest.strip_prefix('@') {
        if path.trim().is_empty() {
            bail!("Missing file name after '@'");
        }
        return Ok(CheckInput::File(PathBuf::from(path.trim())));
    }

    let entries: Vec<&str> = rest
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|entry| !entry.is_empty())
        .collect();
    Ok(CheckInput::Inline(entries.join("\n")))
}

fn parse_table(name: Option<&str>) -> Result<TableKind> {
    match name.map(str::to_lowercase).as_deref() {
        Some("whois" | "w") => Ok(TableKind::Whois),
        Some("quality" | "q") => Ok(TableKind::Quality),
        Some(other) => bail!("Unknown table '{}', expected whois or quality", other),
        None => bail!("Missing table name, expected whois or quality"),
    }
}

/// A finished background check
enum Completion {
    Whois(RequestToken, std::result::Result<Vec<WhoisRecord>, CheckError>),
    Quality(RequestToken, std::result::Result<Vec<QualityRecord>, CheckError>),
}

pub struct Shell<S> {
    service: Arc<S>,
    storage: Storage,
    session: Session,
    export_dir: PathBuf,
    csv_style: CsvStyle,
}

impl<S: LookupService + 'static> Shell<S> {
    pub fn new(service: S, storage: Storage) -> Self {
        Self {
            service: Arc::new(service),
            storage,
            session: Session::new(),
            export_dir: PathBuf::from("."),
            csv_style: CsvStyle::default(),
        }
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    pub fn with_csv_style(mut self, style: CsvStyle) -> Self {
        self.csv_style = style;
        self
    }

    /// Read commands from stdin until `quit` or end of input.
    ///
    /// At end of input, checks still running are awaited and applied.
    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut in_flight = 0usize;

        println!("{}", HELP);
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match parse_command(&line) {
                        Ok(Some(Command::Quit)) => return Ok(()),
                        Ok(Some(command)) => {
                            if let Err(e) = self.dispatch(command, &tx, &mut in_flight).await {
                                println!("Error: {:#}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("Error: {}", e),
                    }
                }
                Some(done) = rx.recv() => {
                    in_flight -= 1;
                    self.complete(done);
                }
            }
        }

        // a task that died without reporting still releases its sender
        drop(tx);
        for done in drain_completions(&mut rx, in_flight).await {
            self.complete(done);
        }
        Ok(())
    }

    async fn dispatch(
        &mut self,
        command: Command,
        tx: &mpsc::UnboundedSender<Completion>,
        in_flight: &mut usize,
    ) -> Result<()> {
        match command {
            Command::Whois(input) => {
                let text = input.into_text().await?;
                let token = self.session.begin(TableKind::Whois);
                let service = Arc::clone(&self.service);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = fetch_whois(service.as_ref(), &text).await;
                    let _ = tx.send(Completion::Whois(token, outcome));
                });
                *in_flight += 1;
                println!("Whois check started...");
            }
            Command::Quality(input) => {
                let text = input.into_text().await?;
                let api_key = self.storage.api_key().await?;
                let token = self.session.begin(TableKind::Quality);
                let service = Arc::clone(&self.service);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = fetch_quality(service.as_ref(), &text, &api_key).await;
                    let _ = tx.send(Completion::Quality(token, outcome));
                });
                *in_flight += 1;
                println!("IP quality check started...");
            }
            Command::Key(Some(value)) => {
                self.storage.set_setting(API_KEY_SETTING, &value).await?;
                println!("API key saved.");
            }
            Command::Key(None) => {
                let key = self.storage.api_key().await?;
                if key.is_empty() {
                    println!("No API key set; quality checks use the public lookup page.");
                } else {
                    println!("API key: {}", mask_key(&key));
                }
            }
            Command::Help => println!("{}", HELP),
            other => print!("{}", self.apply(other)?),
        }
        Ok(())
    }

    /// Table commands; returns the text to print
    fn apply(&mut self, command: Command) -> Result<String> {
        apply_to_session(&mut self.session, command, &self.export_dir, self.csv_style)
    }

    fn complete(&mut self, done: Completion) {
        let (kind, delivery) = match done {
            Completion::Whois(token, outcome) => {
                (TableKind::Whois, self.session.finish_whois(token, outcome))
            }
            Completion::Quality(token, outcome) => {
                (TableKind::Quality, self.session.finish_quality(token, outcome))
            }
        };

        match delivery {
            Delivery::Applied(count) => {
                println!("\n{} check finished: {} results", kind, count);
                print!("{}", render(&self.session, kind));
            }
            Delivery::Stale => debug!("Ignoring superseded {} result", kind),
            Delivery::Failed => {}
        }
        for notice in self.session.take_notices() {
            println!("\n{}", notice);
        }
    }
}

/// Collect up to `in_flight` completions, stopping early once every sender
/// is gone
async fn drain_completions(
    rx: &mut mpsc::UnboundedReceiver<Completion>,
    mut in_flight: usize,
) -> Vec<Completion> {
    let mut finished = Vec::new();
    while in_flight > 0 {
        let Some(done) = rx.recv().await else {
            break;
        };
        in_flight -= 1;
        finished.push(done);
    }
    finished
}

/// Sort, search, filter, show, stats and export against `session`
pub fn apply_to_session(
    session: &mut Session,
    command: Command,
    export_dir: &std::path::Path,
    style: CsvStyle,
) -> Result<String> {
    let out = match command {
        Command::Sort { table, key } => {
            match table {
                TableKind::Whois => sort_table(&mut session.whois, &key)?,
                TableKind::Quality => sort_table(&mut session.quality, &key)?,
            }
            render(session, table)
        }
        Command::Search { table, term } => {
            match table {
                TableKind::Whois => session.whois.set_search(term),
                TableKind::Quality => session.quality.set_search(term),
            }
            render(session, table)
        }
        Command::Filter(filter) => {
            session.quality.set_status_filter(filter);
            render(session, TableKind::Quality)
        }
        Command::Show(Some(table)) => render(session, table),
        Command::Show(None) => format!(
            "{}\n{}",
            render(session, TableKind::Whois),
            render(session, TableKind::Quality)
        ),
        Command::Stats => format!(
            "whois:   {}\nquality: {}\n",
            session.whois.stats(),
            session.quality.stats()
        ),
        Command::Export { table, dir } => {
            let dir = dir.as_deref().unwrap_or(export_dir);
            let written = match table {
                TableKind::Whois => session.whois.export_to(dir, style)?,
                TableKind::Quality => session.quality.export_to(dir, style)?,
            };
            match written {
                Some(path) => format!("Exported to {}\n", path.display()),
                None => "Nothing to export.\n".to_string(),
            }
        }
        other => bail!("Not a table command: {:?}", other),
    };
    Ok(out)
}

fn sort_table<R: Record>(
    table: &mut crate::table::controller::TableController<R>,
    key: &str,
) -> Result<()> {
    if !table.spec().has_column(key) {
        let known: Vec<&str> = table.spec().columns.iter().map(|c| c.key).collect();
        bail!("Unknown column '{}', expected one of: {}", key, known.join(", "));
    }
    table.click_sort(key);
    Ok(())
}

fn render(session: &Session, table: TableKind) -> String {
    match table {
        TableKind::Whois => format!("== Whois ==\n{}", render_table(&session.whois)),
        TableKind::Quality => format!("== IP Quality ==\n{}", render_table(&session.quality)),
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}{}", visible, "*".repeat(key.chars().count().saturating_sub(4)))
}
