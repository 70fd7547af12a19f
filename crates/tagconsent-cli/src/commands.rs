//! CLI subcommands: parse arguments and drive the consent manager against a
//! file-backed cookie jar.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use parking_lot::Mutex;
use tracing::info;

use tagconsent_core::{ConsentCategory, ConsentConfig, ConsentMode, ConsentNotification, ConsentRecord};
use tagconsent_protocol::{ConsentManager, NotificationBus};
use tagconsent_store::{ConsentCookie, FileCookieStore};
use tagconsent_tag::{HtmlHead, MemoryPage, TagBootstrapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Set(ConsentCategory, ConsentMode),
    Toggle(ConsentCategory),
    AcceptAll,
    RejectAll,
    Render,
    Help,
}

/// Outcome of a command, printed by [`print_report`].
#[derive(Debug)]
pub struct CommandReport {
    pub state: ConsentRecord,
    pub is_new_user: Option<bool>,
    pub notifications: Vec<ConsentNotification>,
    pub html: Option<String>,
}

/// Parse `args` (without the program name).
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Status);
    };
    match first.as_str() {
        "status" => Ok(Command::Status),
        "set" => {
            let (Some(category), Some(mode)) = (args.get(1), args.get(2)) else {
                bail!("Usage: tagconsent set <category> <granted|denied>");
            };
            Ok(Command::Set(parse_category(category)?, parse_mode(mode)?))
        }
        "toggle" => {
            let Some(category) = args.get(1) else {
                bail!("Usage: tagconsent toggle <category>");
            };
            Ok(Command::Toggle(parse_category(category)?))
        }
        "accept-all" => Ok(Command::AcceptAll),
        "reject-all" => Ok(Command::RejectAll),
        "render" => Ok(Command::Render),
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => bail!("Unknown command: {}. Use 'tagconsent help' for usage.", other),
    }
}

fn parse_category(name: &str) -> anyhow::Result<ConsentCategory> {
    ConsentCategory::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = ConsentCategory::all().iter().map(|c| c.name()).collect();
        anyhow!("Unknown category: {} (expected one of {})", name, known.join(", "))
    })
}

fn parse_mode(name: &str) -> anyhow::Result<ConsentMode> {
    ConsentMode::from_name(name).ok_or_else(|| anyhow!("Unknown mode: {} (expected granted or denied)", name))
}

/// Run a command against the cookie jar in `data_dir`.
pub async fn run(command: Command, data_dir: &Path, config: ConsentConfig) -> anyhow::Result<CommandReport> {
    let store = Arc::new(FileCookieStore::open(data_dir)?);

    if command == Command::Render {
        // Read-only: render with whatever is persisted, without seeding.
        let cookie = ConsentCookie::from_config(store, &config);
        let record = cookie.load().await.unwrap_or_else(ConsentRecord::denied);
        let head = HtmlHead::new();
        TagBootstrapper::new(&config).bootstrap(&head, &record)?;
        return Ok(CommandReport {
            state: record,
            is_new_user: None,
            notifications: Vec::new(),
            html: Some(head.render()),
        });
    }

    let page = Arc::new(MemoryPage::new("/", "tagconsent"));
    let bus = Arc::new(NotificationBus::new());
    let manager = ConsentManager::new(config, store, page.clone(), page).with_bus(bus.clone());
    manager.initialize().await?;

    let notifications: Arc<Mutex<Vec<ConsentNotification>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = notifications.clone();
    bus.subscribe(move |n| sink.lock().push(n.clone()));

    match command {
        Command::Set(category, mode) => manager.update(category, mode).await?,
        Command::Toggle(category) => {
            manager.toggle(category).await?;
        }
        Command::AcceptAll => manager.accept_all().await?,
        Command::RejectAll => manager.reject_all().await?,
        Command::Status | Command::Render | Command::Help => {}
    }
    info!("Command {:?} completed", command);

    let report = CommandReport {
        state: manager.state(),
        is_new_user: manager.is_new_user(),
        notifications: std::mem::take(&mut *notifications.lock()),
        html: None,
    };
    Ok(report)
}

pub fn print_report(report: &CommandReport) {
    if let Some(html) = &report.html {
        println!("{}", html);
        return;
    }
    if let Some(new_user) = report.is_new_user {
        println!("New user:       {}", new_user);
    }
    for (category, mode) in report.state.iter() {
        println!("  {:<24} {}", category.name(), mode);
    }
    println!(
        "All granted:    {}",
        report.state.is_uniform(ConsentMode::Granted)
    );
    println!(
        "All denied:     {}",
        report.state.is_uniform(ConsentMode::Denied)
    );
    match serde_json::to_string(&report.state) {
        Ok(json) => println!("state {}", json),
        Err(e) => eprintln!("Failed to encode state: {}", e),
    }
    for n in &report.notifications {
        match serde_json::to_string(n) {
            Ok(json) => println!("consent-updated {}", json),
            Err(e) => eprintln!("Failed to encode notification: {}", e),
        }
    }
}

pub fn print_help() {
    println!("tagconsent: consent state for the gtag integration");
    println!();
    println!("Usage: tagconsent [command]");
    println!();
    println!("Commands:");
    println!("  status                       Show the persisted consent record (default)");
    println!("  set <category> <mode>        Set one category to granted or denied");
    println!("  toggle <category>            Flip one category");
    println!("  accept-all                   Grant every category");
    println!("  reject-all                   Deny every category");
    println!("  render                       Print the tag bootstrap markup");
    println!("  help                         Show this help message");
    println!();
    println!("Categories:");
    for category in ConsentCategory::all() {
        println!("  {}", category.name());
    }
}
