//! Dayflow CLI - guided daily workflow.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dayflow_core::{OwnerId, Task, TaskId, TaskStatus, Workflow, WorkflowError};
use dayflow_execution::Changeset;
use dayflow_registry::{default_registry, TaskRegistry};
use dayflow_storage::JsonStorage;
use dayflow_store::{StoreConfig, WorkflowStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dayflow")]
#[command(about = "Guided daily workflow: pillars, dependencies and progress", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, default_value = ".dayflow")]
    storage: PathBuf,

    /// Owner the workflow belongs to
    #[arg(long, default_value = "default")]
    owner: String,

    /// Day to work on (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Registry JSON file (defaults to the built-in registry)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Persistence timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workflow, pillar by pillar
    Show,
    /// Show progress and navigation state
    Status,
    /// Start the workflow
    Start,
    /// Move to the next ready task
    Next,
    /// Move back to the previous task
    Back,
    /// Start working on a task
    Begin {
        /// Task ID
        task: String,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        task: String,
    },
    /// Skip a task
    Skip {
        /// Task ID
        task: String,
    },
    /// List ready and blocked tasks
    Ready,
    /// Print the task registry
    Registry {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let registry = match &cli.registry {
        Some(path) => TaskRegistry::load(path)
            .await
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => default_registry(),
    };

    if let Commands::Registry { json } = cli.command {
        return print_registry(&registry, json);
    }

    let storage = Arc::new(
        JsonStorage::new(&cli.storage, registry)
            .await
            .with_context(|| format!("Failed to open storage at {}", cli.storage.display()))?,
    );
    let store = WorkflowStore::with_config(
        storage.clone(),
        StoreConfig::default().with_persist_timeout(Duration::from_millis(cli.timeout_ms)),
    );

    let owner = OwnerId::new(cli.owner);
    let date = cli.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let workflow = store.open(&owner, date).await.map_err(with_hint)?;

    let cursor = storage.load_cursor(&workflow.id).await?;
    store.restore_cursor(cursor).await.map_err(with_hint)?;
    debug!(workflow = %workflow.id, "Session restored");

    match cli.command {
        Commands::Show => {
            print_workflow(&store.workflow().await?, store.cursor().await?.current.as_ref());
        }
        Commands::Status => {
            let wf = store.workflow().await?;
            let progress = store.progress().await?;
            let nav = store.navigation_state().await?;
            let estimate = store.estimate(chrono::Utc::now()).await?;

            println!("Workflow {} ({})", wf.id, wf.status);
            println!(
                "  Progress: {}% ({}/{} tasks)",
                progress.completion_percentage, progress.completed_tasks, progress.total_tasks
            );
            println!(
                "  Time: {} min done, {} min left, finish ~{}",
                progress.actual_time_spent,
                progress.estimated_time_remaining,
                estimate.projected_finish.with_timezone(&chrono::Local).format("%H:%M")
            );

            println!("Pillars");
            for pillar in store.pillar_progress().await? {
                let lock = if pillar.unlocked { " " } else { "*" };
                println!(
                    "  {}{:<10} {:>3}% ({}/{})",
                    lock,
                    pillar.pillar_id.as_str(),
                    pillar.percentage,
                    pillar.completed_tasks,
                    pillar.total_tasks
                );
            }

            println!("Navigation");
            println!("  Current:  {}", display_opt(nav.current_task.as_ref()));
            println!(
                "  Next:     {}{}",
                display_opt(nav.next_task.as_ref()),
                if nav.next_task.is_some() && !nav.can_go_forward { " (locked)" } else { "" }
            );
            println!("  Previous: {}", display_opt(nav.previous_task.as_ref()));
        }
        Commands::Start => match store.start_workflow().await.map_err(with_hint)? {
            Some(change) => println!("Workflow {} → {}", change.from, change.to),
            None => println!("Workflow already in progress"),
        },
        Commands::Next => {
            let id = store.move_to_next_task().await.map_err(with_hint)?;
            print_current(&store.workflow().await?, &id);
        }
        Commands::Back => {
            let id = store.move_to_previous_task().await.map_err(with_hint)?;
            print_current(&store.workflow().await?, &id);
        }
        Commands::Begin { task } => {
            let id = TaskId::new(task);
            let changes = store.start_task(&id).await.map_err(with_hint)?;
            println!("Started {}", id);
            if let Some(change) = changes.workflow_change {
                println!("Workflow {} → {}", change.from, change.to);
            }
            if let Some(action) = store.workflow().await?.task(&id).and_then(|t| t.action.as_ref()) {
                println!("  Action: {}", action);
            }
        }
        Commands::Complete { task } => {
            let id = TaskId::new(task);
            let changes = store.complete_task(&id).await.map_err(with_hint)?;
            print_changes("Completed", &id, &changes);
        }
        Commands::Skip { task } => {
            let id = TaskId::new(task);
            let changes = store.skip_task(&id).await.map_err(with_hint)?;
            print_changes("Skipped", &id, &changes);
        }
        Commands::Ready => {
            let wf = store.workflow().await?;
            let resolution = store.resolution().await?;
            let eligible = store.eligible_tasks().await?;

            println!("Ready");
            for id in &resolution.ready {
                let gated = if eligible.contains(id) { "" } else { " (pillar locked)" };
                println!("  {} - {}{}", id, title(&wf, id), gated);
            }
            println!("Blocked");
            for blocked in &resolution.blocked {
                let waiting: Vec<&str> = blocked.waiting_on.iter().map(|t| t.as_str()).collect();
                println!("  {} - waiting on {}", blocked.task_id, waiting.join(", "));
            }
        }
        Commands::Registry { .. } => {}
    }

    let wf = store.workflow().await?;
    storage.save_cursor(&wf.id, &store.cursor().await?).await?;
    info!(workflow = %wf.id, "Session saved");

    Ok(())
}

fn with_hint(err: WorkflowError) -> anyhow::Error {
    anyhow::anyhow!("{}\n  hint: {}", err, err.hint())
}

fn display_opt(id: Option<&TaskId>) -> &str {
    id.map(|t| t.as_str()).unwrap_or("-")
}

fn title<'a>(wf: &'a Workflow, id: &TaskId) -> &'a str {
    wf.task(id).map(|t| t.title.as_str()).unwrap_or("?")
}

fn marker(task: &Task) -> &'static str {
    if !task.enabled {
        return "off";
    }
    match task.status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
        TaskStatus::Skipped => "[-]",
    }
}

fn print_workflow(wf: &Workflow, current: Option<&TaskId>) {
    println!("Workflow {} ({})", wf.id, wf.status);
    for pillar in &wf.pillars {
        println!("{}", pillar.title);
        for task in wf.tasks_in_pillar(&pillar.id) {
            let pointer = if current == Some(&task.id) { ">" } else { " " };
            println!(
                "  {} {} {} - {} ({} min)",
                pointer,
                marker(task),
                task.id,
                task.title,
                task.estimated_time_minutes
            );
        }
    }
}

fn print_current(wf: &Workflow, id: &TaskId) {
    let Some(task) = wf.task(id) else {
        println!("{}", id);
        return;
    };
    println!("{} {} - {}", marker(task), task.id, task.title);
    if !task.description.is_empty() {
        println!("  {}", task.description);
    }
    if let Some(action) = &task.action {
        println!("  Action: {}", action);
    }
}

fn print_changes(verb: &str, id: &TaskId, changes: &Changeset) {
    println!("{} {} ({}%)", verb, id, changes.progress.completion_percentage);
    for unlocked in &changes.unlocked {
        println!("  Now ready: {}", unlocked);
    }
    if let Some(change) = changes.workflow_change {
        println!("Workflow {} → {}", change.from, change.to);
    }
}

fn print_registry(registry: &TaskRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.to_file())?);
        return Ok(());
    }

    for pillar in registry.pillars() {
        println!("{}. {} ({})", pillar.display_order, pillar.title, pillar.id);
        for template in registry.templates_for(&pillar.id) {
            let deps: Vec<&str> = template.depends_on.iter().map(|d| d.as_str()).collect();
            print!(
                "    {} - {} [{} min, {}]",
                template.key,
                template.title,
                template.estimated_time_minutes,
                template.priority.as_str()
            );
            if !deps.is_empty() {
                print!(" after {}", deps.join(", "));
            }
            println!();
        }
    }
    Ok(())
}
