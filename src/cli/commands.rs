use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::render;
use crate::cli::Session;
use crate::model::short_id;
use crate::planner::{find_overdue_reminders, group_by_due_date, pending_tasks};

#[derive(Args, Debug, Clone, Default)]
pub struct AgendaArgs {
    /// Days past due before a task is listed as a reminder (defaults to config)
    #[arg(long)]
    pub threshold: Option<u32>,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RemindersArgs {
    /// Days past due before a task is listed (defaults to config)
    #[arg(long)]
    pub threshold: Option<u32>,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task (content read from stdin when omitted)
    Add(TaskAddArgs),
    /// Toggle a task between open and done
    Done(TaskIdArgs),
    /// Change a task's content or due date
    Edit(TaskEditArgs),
    /// Delete a task
    Rm(TaskIdArgs),
    /// List tasks, newest first
    List(TaskListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TaskAddArgs {
    /// Task text; words are joined with spaces
    #[arg()]
    pub content: Vec<String>,
    /// Due date (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TaskIdArgs {
    /// Task id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct TaskEditArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// Replacement text
    #[arg(long)]
    pub content: Option<String>,
    /// New due date (YYYY-MM-DD, UTC)
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TaskListArgs {
    /// Only show tasks that are not done
    #[arg(long)]
    pub pending: bool,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn show_agenda(session: &Session, args: AgendaArgs) -> Result<()> {
    let output = run_agenda(session, &args)?;
    print!("{output}");
    Ok(())
}

fn run_agenda(session: &Session, args: &AgendaArgs) -> Result<String> {
    let tasks = session.storage.fetch_tasks().context("loading tasks")?;
    let groups = group_by_due_date(&tasks, session.today);
    let reminders = if args.threshold.is_some() || session.config.reminders.enabled {
        find_overdue_reminders(&tasks, session.today, threshold(session, args.threshold))
    } else {
        Vec::new()
    };
    if args.json {
        return render::agenda_json(&groups, &reminders);
    }
    Ok(render::agenda_text(
        &groups,
        &reminders,
        session.config.display.show_ids,
    ))
}

pub fn show_reminders(session: &Session, args: RemindersArgs) -> Result<()> {
    let output = run_reminders(session, &args)?;
    print!("{output}");
    Ok(())
}

fn run_reminders(session: &Session, args: &RemindersArgs) -> Result<String> {
    let tasks = session.storage.fetch_tasks().context("loading tasks")?;
    let reminders =
        find_overdue_reminders(&tasks, session.today, threshold(session, args.threshold));
    if args.json {
        return render::reminders_json(&reminders);
    }
    if reminders.is_empty() {
        return Ok("Nothing overdue.\n".to_string());
    }
    Ok(render::reminders_text(
        &reminders,
        session.config.display.show_ids,
    ))
}

pub fn handle_task_command(session: &Session, args: TaskArgs) -> Result<()> {
    let output = match args.command {
        TaskCommand::Add(args) => {
            let content = if args.content.is_empty() {
                read_content()?
            } else {
                args.content.join(" ")
            };
            task_add(session, &content, args.due.as_deref())?
        }
        TaskCommand::Done(args) => task_toggle(session, &args.id)?,
        TaskCommand::Edit(args) => task_edit(session, args)?,
        TaskCommand::Rm(args) => task_delete(session, &args.id)?,
        TaskCommand::List(args) => task_list(session, &args)?,
    };
    print!("{output}");
    Ok(())
}

fn task_add(session: &Session, content: &str, due: Option<&str>) -> Result<String> {
    let task = session
        .storage
        .create_task(content, due)
        .context("creating task")?;
    Ok(format!(
        "Added task {}{}\n",
        task.short_id(),
        render::due_suffix(&task)
    ))
}

fn task_toggle(session: &Session, id: &str) -> Result<String> {
    let task_id = session.storage.resolve_task_id(id)?;
    let task = session
        .storage
        .toggle_task(task_id)
        .with_context(|| format!("toggling task {id}"))?;
    let state = if task.is_done { "done" } else { "open" };
    Ok(format!(
        "Marked task {} ({}) as {state}\n",
        task.short_id(),
        task.content
    ))
}

fn task_edit(session: &Session, args: TaskEditArgs) -> Result<String> {
    if args.content.is_none() && args.due.is_none() && !args.clear_due {
        bail!("nothing to change: pass --content, --due or --clear-due");
    }
    let task_id = session.storage.resolve_task_id(&args.id)?;
    let current = session
        .storage
        .fetch_task(task_id)?
        .with_context(|| format!("task {} disappeared", args.id))?;

    let content = args.content.as_deref().unwrap_or(&current.content);
    let due = if args.clear_due {
        None
    } else {
        args.due.as_deref().or(current.due_date.as_deref())
    };
    let task = session
        .storage
        .edit_task(task_id, content, due)
        .with_context(|| format!("editing task {}", args.id))?;
    Ok(format!(
        "Updated task {}: {}{}\n",
        task.short_id(),
        task.content,
        render::due_suffix(&task)
    ))
}

fn task_delete(session: &Session, id: &str) -> Result<String> {
    let task_id = session.storage.resolve_task_id(id)?;
    let task = session.storage.fetch_task(task_id)?;
    session
        .storage
        .delete_task(task_id)
        .with_context(|| format!("deleting task {id}"))?;
    let content = task.map(|task| task.content).unwrap_or_default();
    Ok(format!("Deleted task {} ({content})\n", short_id(&task_id)))
}

fn task_list(session: &Session, args: &TaskListArgs) -> Result<String> {
    let tasks = session.storage.fetch_tasks().context("loading tasks")?;
    let shown = if args.pending {
        pending_tasks(&tasks)
    } else {
        tasks.iter().collect()
    };
    if args.json {
        return serde_json::to_string_pretty(&shown)
            .map(|json| json + "\n")
            .context("serialising tasks");
    }
    if shown.is_empty() {
        return Ok(if args.pending {
            "You're all caught up.\n".to_string()
        } else {
            "No tasks yet. Add one with `planner task add`.\n".to_string()
        });
    }
    let heading = if args.pending {
        format!("Pending tasks ({})", shown.len())
    } else {
        format!("All tasks ({})", shown.len())
    };
    Ok(render::task_list_text(
        &heading,
        &shown,
        session.config.display.show_ids,
    ))
}

fn threshold(session: &Session, requested: Option<u32>) -> u32 {
    requested.unwrap_or(session.config.reminders.threshold_days)
}

fn read_content() -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        return prompt("Task");
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading task content from stdin")?;
    Ok(buf)
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}
