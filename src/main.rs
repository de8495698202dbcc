use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, bail, eyre};
use std::fs;
use std::path::PathBuf;
use studytasks::attachment::{self, decode_data_url};
use studytasks::query::{self, StatusFilter, TaskFilter};
use studytasks::{
    BlobStorage, Category, Config, Direction, ExerciseSource, FileStorage, Task, TaskDraft, TaskStore,
    UnavailableStorage,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studytasks")]
#[command(about = "Study task tracker - create, reorder, complete and attach PDFs to study tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the task data (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks in their stored order
    List {
        /// Case-insensitive search over title and category
        #[arg(short, long, default_value = "")]
        search: String,

        /// Status filter: all, pending or search
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,

        /// Hide completed tasks
        #[arg(long)]
        hide_completed: bool,
    },

    /// Add a new task
    Add {
        /// Task title
        #[arg(required = true)]
        title: Vec<String>,

        /// Subject category (see `categories`)
        #[arg(short = 'C', long)]
        category: Category,

        /// Mark the task as having an exercise, even without a file yet
        #[arg(short = 'x', long)]
        exercise: bool,

        /// PDF file to attach as the exercise
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Declared content type of the file (default: from its extension)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Toggle a task between pending and completed
    Done { id: i64 },

    /// Change a task's title
    Edit {
        id: i64,
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// Delete a task
    Rm { id: i64 },

    /// Move a task one position up
    Up { id: i64 },

    /// Move a task one position down
    Down { id: i64 },

    /// Show totals and progress
    Stats,

    /// Export all tasks as JSON
    Export {
        /// Output file (default: tasks-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Replace all tasks with the contents of a JSON export
    Import { file: PathBuf },

    /// Delete all tasks
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// List the available categories
    Categories,

    /// Save a task's exercise PDF to disk
    Attachment {
        id: i64,

        /// Output file (default: the attachment's original name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_storage(config: &Config) -> Box<dyn BlobStorage> {
    let Some(dir) = &config.data_dir else {
        warn!("No data directory available, tasks will not be saved");
        return Box::new(UnavailableStorage);
    };

    match FileStorage::open(dir) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            warn!(dir = ?dir, error = %e, "Failed to open data directory, tasks will not be saved");
            Box::new(UnavailableStorage)
        }
    }
}

fn print_tasks(tasks: &[Task], all: &[Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
        return;
    }

    for task in tasks {
        let position = query::position(all, task.id).map_or(0, |i| i + 1);
        let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
        let title = if task.completed {
            task.title.strikethrough().dimmed()
        } else {
            task.title.bold()
        };
        let exercise = match (task.has_exercise, &task.exercise_file) {
            (true, Some(file)) => format!(" [PDF: {}]", file.name).cyan(),
            (true, None) => " [exercise pending]".yellow(),
            _ => "".normal(),
        };

        println!(
            "{:>3}. {} {} {}{} {}",
            position,
            check,
            title,
            format!("[{}]", task.category).color(task.category.color()),
            exercise,
            format!("#{}", task.id).dimmed()
        );
    }
}

fn join_title(words: &[String]) -> String {
    words.join(" ")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let mut store = TaskStore::with_key(open_storage(&config), config.storage_key.clone());

    match cli.command {
        Commands::List {
            search,
            status,
            hide_completed,
        } => {
            let all = store.load();
            let criteria = TaskFilter {
                search_term: search,
                status,
                hide_completed,
            };
            print_tasks(&query::filter(&all, &criteria), &all);
        }
        Commands::Add {
            title,
            category,
            exercise,
            file,
            content_type,
        } => {
            let exercise_source = file.map(|path| {
                let content_type = content_type.unwrap_or_else(|| attachment::content_type_for_path(&path).to_string());
                ExerciseSource { path, content_type }
            });

            let draft = TaskDraft {
                title: join_title(&title),
                category,
                has_exercise: exercise || exercise_source.is_some(),
                exercise: exercise_source,
            };

            let task = store.create(draft).await.context("Failed to add task")?;
            println!("Added task #{}: {}", task.id, task.title);
            if task.has_exercise && task.exercise_file.is_none() {
                println!("{}", "Exercise marked as pending, no file attached".yellow());
            }
        }
        Commands::Done { id } => {
            let tasks = store.toggle_completion(id);
            match tasks.iter().find(|t| t.id == id) {
                Some(task) if task.completed => println!("Completed: {}", task.title),
                Some(task) => println!("Reopened: {}", task.title),
                None => bail!("No task with id {}", id),
            }
        }
        Commands::Edit { id, title } => {
            let title = join_title(&title);
            if store.get(id).is_none() {
                bail!("No task with id {}", id);
            }
            if title.trim().is_empty() {
                bail!("Title cannot be empty");
            }
            store.edit_title(id, &title);
            println!("Renamed task #{}", id);
        }
        Commands::Rm { id } => {
            let task = store.get(id).ok_or_else(|| eyre!("No task with id {}", id))?;
            store.delete(id);
            println!("Deleted: {}", task.title);
        }
        Commands::Up { id } | Commands::Down { id } if store.get(id).is_none() => {
            bail!("No task with id {}", id);
        }
        Commands::Up { id } => {
            let all = store.load();
            if !query::can_move_up(&all, id) {
                println!("Task #{} is already first", id);
            } else {
                let tasks = store.move_task(id, Direction::Up);
                print_tasks(&tasks, &tasks);
            }
        }
        Commands::Down { id } => {
            let all = store.load();
            if !query::can_move_down(&all, id) {
                println!("Task #{} is already last", id);
            } else {
                let tasks = store.move_task(id, Direction::Down);
                print_tasks(&tasks, &tasks);
            }
        }
        Commands::Stats => {
            let stats = query::stats(&store.load());
            println!("Total:     {}", stats.total);
            println!("Pending:   {}", stats.pending.to_string().yellow());
            println!("Completed: {}", stats.completed.to_string().green());
            println!("Progress:  {}%", stats.progress.to_string().bold());
        }
        Commands::Export { output, stdout } => {
            let snapshot = store.export_snapshot()?;
            if stdout {
                println!("{}", snapshot);
            } else {
                let path = output
                    .unwrap_or_else(|| PathBuf::from(format!("tasks-{}.json", Local::now().format("%Y-%m-%d"))));
                fs::write(&path, snapshot).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Exported tasks to {}", path.display());
            }
        }
        Commands::Import { file } => {
            let text = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let tasks = store
                .import_snapshot(&text)
                .context("Import failed, check the file format")?;
            println!("Imported {} tasks", tasks.len());
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete all tasks without --yes");
            }
            store.clear();
            println!("All tasks deleted");
        }
        Commands::Categories => {
            for category in Category::ALL {
                println!("{}", category.name().color(category.color()));
            }
        }
        Commands::Attachment { id, output } => {
            let task = store.get(id).ok_or_else(|| eyre!("No task with id {}", id))?;
            let file = task
                .exercise_file
                .ok_or_else(|| eyre!("Task #{} has no attached exercise", id))?;
            let (_, bytes) = decode_data_url(&file.data_url)?;
            let path = output.unwrap_or_else(|| PathBuf::from(&file.name));
            fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} to {}", file.name, path.display());
        }
    }

    Ok(())
}
