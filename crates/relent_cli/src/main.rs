mod cli;

use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Command, ConfigOverride, parse_config_override};
use relent_core::config::{Config, ConfigOverrides, load_config_with_fallback, merge_overrides};
use relent_core::console::{Console, WELCOME};
use relent_core::error::AppError;
use relent_core::model::{ReminderEntry, Task, TaskDraft, TaskPatch};
use relent_core::parse::{ParsedTask, TaskForm};
use relent_core::scheduler::{TickReport, next_reminder_at};
use relent_core::task_api::Tracker;
use std::io::{self, BufRead, Read, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "relent=info";

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Every")]
    interval: String,
    #[tabled(rename = "Last reminder")]
    last_reminder: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.label().to_string(),
            deadline: timestamp(task.deadline),
            interval: format!("{}m", task.reminder_interval),
            last_reminder: task
                .last_reminder_sent
                .map(timestamp)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct ReminderRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Channel")]
    channel: String,
}

impl From<&ReminderEntry> for ReminderRow {
    fn from(entry: &ReminderEntry) -> Self {
        Self {
            timestamp: timestamp(entry.timestamp),
            task: entry.task_title.clone(),
            channel: entry.channel.label().to_string(),
        }
    }
}

fn timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}

fn parse_deadline(raw: Option<&str>) -> Result<Option<OffsetDateTime>, AppError> {
    raw.map(|value| {
        OffsetDateTime::parse(value.trim(), &Rfc3339)
            .map_err(|_| AppError::validation(format!("deadline '{value}' must be RFC3339")))
    })
    .transpose()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_task_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    let mut table = Table::new(tasks.iter().map(TaskRow::from));
    table.with(Style::rounded());
    println!("{table}");
}

fn print_task_details(task: &Task) {
    println!("ID:          {}", task.id);
    println!("Title:       {}", task.title);
    println!("Status:      {}", task.status.label());
    if !task.description.is_empty() {
        println!("Description: {}", task.description);
    }
    println!("Deadline:    {}", timestamp(task.deadline));
    println!("Interval:    {} minutes", task.reminder_interval);
    if let Some(sent) = task.last_reminder_sent {
        println!("Last sent:   {}", timestamp(sent));
    }
    if task.is_pending()
        && let Some(next) = next_reminder_at(task)
    {
        println!("Next due:    {}", timestamp(next));
    }
    println!("Created:     {}", timestamp(task.created_at));
}

fn print_tick_report(report: &TickReport, json: bool) -> Result<(), AppError> {
    if json {
        let entries: Vec<&ReminderEntry> =
            report.firings.iter().map(|firing| &firing.entry).collect();
        return print_json(&entries);
    }

    if report.firings.is_empty() {
        println!("No reminders due.");
    }
    for firing in &report.firings {
        println!(
            "Reminder sent: {} ({})",
            firing.task.title, firing.task.id
        );
    }
    Ok(())
}

/// Fills a creation form from a parser reply; `-` reads the reply from stdin.
fn draft_from_parsed(source: &str) -> Result<TaskDraft, AppError> {
    let reply = if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        source.to_string()
    };

    let parser = |_: &str| ParsedTask::from_json(&reply);
    let mut form = TaskForm::default();
    form.fill_from(&parser, &reply)?;
    form.to_draft()
}

/// Accepts a full id, or an id prefix as shown by the console.
fn resolve(tracker: &Tracker, id: &str) -> Result<Task, AppError> {
    tracker
        .get(id)
        .or_else(|_| tracker.find_by_prefix(id))
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let load = load_config_with_fallback();
    if let Some(err) = &load.error {
        warn!(error = %err, "config ignored, using defaults");
    }

    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        match parse_config_override(raw).map_err(AppError::validation)? {
            ConfigOverride::TickIntervalSecs(secs) => overrides.tick_interval_secs = Some(secs),
            ConfigOverride::Notifications(enabled) => overrides.notifications = Some(enabled),
            ConfigOverride::StoreDir(dir) => overrides.store_dir = Some(dir),
        }
    }

    Ok(merge_overrides(&load.config, &overrides))
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli.config_override)?;
    let tracker = Tracker::from_config(&config)?;

    match cli.command {
        Command::Add {
            title,
            description,
            deadline,
            interval,
            parsed,
        } => {
            let draft = match parsed.as_deref() {
                Some(source) => draft_from_parsed(source)?,
                None => TaskDraft {
                    title,
                    description,
                    deadline: parse_deadline(deadline.as_deref())?,
                    reminder_interval: interval,
                },
            };
            let task = tracker.create(draft)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::List { search } => {
            let tasks = match search.as_deref() {
                Some(query) => tracker.search(query),
                None => tracker.list(),
            };
            if cli.json {
                print_json(&tasks)?;
            } else {
                print_task_table(&tasks);
            }
        }
        Command::Show { id } => {
            let task = resolve(&tracker, &id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                print_task_details(&task);
            }
        }
        Command::Edit {
            id,
            title,
            description,
            deadline,
            interval,
        } => {
            let target = resolve(&tracker, &id)?;
            let patch = TaskPatch {
                title,
                description,
                deadline: parse_deadline(deadline.as_deref())?,
                reminder_interval: interval,
            };
            let task = tracker.update(&target.id, &patch)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Updated task: {} ({})", task.title, task.id);
            }
        }
        Command::Done { id } => {
            let target = resolve(&tracker, &id)?;
            let task = tracker.toggle_status(&target.id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!(
                    "Marked {}: {} ({})",
                    task.status.label(),
                    task.title,
                    task.id
                );
            }
        }
        Command::Delete { id } => {
            let target = resolve(&tracker, &id)?;
            let task = tracker.delete(&target.id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Deleted task: {} ({})", task.title, task.id);
            }
        }
        Command::Log { limit } => {
            let mut entries = tracker.reminder_log();
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            if cli.json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No reminders sent yet.");
            } else {
                let mut table = Table::new(entries.iter().map(ReminderRow::from));
                table.with(Style::rounded());
                println!("{table}");
            }
        }
        Command::Stats => {
            let stats = tracker.stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("Total:   {}", stats.total);
                println!("Pending: {}", stats.pending);
                println!("Done:    {}", stats.done);
                println!("Pings:   {}", stats.pings);
            }
        }
        Command::Tick => {
            tracker.notifier().request_permission_once();
            let report = tracker.scheduler().tick();
            print_tick_report(&report, cli.json)?;
        }
        Command::Console => run_console(&tracker, &config)?,
    }

    Ok(())
}

fn run_console(tracker: &Tracker, config: &Config) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let permission = tracker.notifier().request_permission_once();
    info!(?permission, "notification permission");

    let handle = {
        let _entered = runtime.enter();
        tracker.scheduler().start(config.tick_interval())
    };

    let result = console_loop(Console::new(tracker.clone()));
    runtime.block_on(handle.shutdown());
    result
}

fn console_loop(mut console: Console) -> Result<(), AppError> {
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    let mut stdout = io::stdout();
    let mut input = String::new();

    println!("{WELCOME}");
    loop {
        print!("> ");
        stdout.flush()?;

        input.clear();
        if stdin_lock.read_line(&mut input)? == 0 {
            break;
        }

        let line = input.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some(reply) = console.submit(line) {
            println!("{reply}");
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
