// TaskLens Command Line Interface
// Task list with photo proof and on-device image analysis

mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tasklens_core::config::default_home;
use tasklens_core::{ImageRef, TaskFilter, TaskLensConfig, TaskStore};
use tasklens_eye::models::ModelManager;
use tasklens_eye::{analyze_image, shared_analyzer, VisionConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tasklens")]
#[command(about = "TaskLens - to-do list with photo proof and on-device image analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Task file (defaults to ~/.tasklens/tasks.json)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List tasks
    List {
        /// Which tasks to show (all, active, completed)
        #[arg(long, short, default_value = "all")]
        filter: String,
    },

    /// Mark a task done, or open again
    Toggle {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete every completed task
    ClearCompleted,

    /// Attach a proof photo to a task and analyze it
    Attach {
        /// Task id or unique prefix
        id: String,

        /// Image file
        image: PathBuf,

        /// Store the file path instead of embedding the photo
        #[arg(long)]
        link: bool,

        /// Skip image analysis
        #[arg(long)]
        no_analyze: bool,
    },

    /// Remove the proof photo from a task
    Detach {
        /// Task id or unique prefix
        id: String,
    },

    /// Analyze a task's proof photo, or any image file
    Analyze {
        /// Task id or unique prefix
        #[arg(required_unless_present = "file")]
        id: Option<String>,

        /// Analyze this image file instead of a task photo
        #[arg(long, conflicts_with = "id")]
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detection model management
    #[command(subcommand)]
    Models(ModelCommands),
}

#[derive(Subcommand, Debug)]
enum ModelCommands {
    /// Download the detection model if it is not present
    Fetch {
        /// Also load the model to check it runs
        #[arg(long)]
        verify: bool,
    },

    /// Show where the detection model lives
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_logging(&config.log_level, cli.verbose);
    debug!("Using task file {}", config.data_file.display());

    match cli.command {
        Commands::Models(cmd) => handle_models_command(cmd).await?,
        command => {
            let mut store = TaskStore::open(&config.data_file)
                .with_context(|| format!("Failed to open {}", config.data_file.display()))?;
            handle_task_command(&mut store, &config, command).await?;
        }
    }

    Ok(())
}

/// File config (explicit, or `~/.tasklens/config.toml` if present), then
/// environment, then command-line flags
fn load_config(cli: &Cli) -> anyhow::Result<TaskLensConfig> {
    let mut config = match &cli.config {
        Some(path) => TaskLensConfig::from_file(path)?,
        None => {
            let default_path = default_home().join("config.toml");
            if default_path.is_file() {
                TaskLensConfig::from_file(&default_path)?
            } else {
                TaskLensConfig::default()
            }
        }
    };

    config.apply_env();
    if let Some(data) = &cli.data {
        config.data_file = data.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Logs go to stderr so command output stays clean
fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn handle_task_command(
    store: &mut TaskStore,
    config: &TaskLensConfig,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Add { text } => {
            let task = store.add(&text.join(" "))?;
            println!("✅ Added {}", render::task_line(&task));
        }
        Commands::List { filter } => {
            let filter: TaskFilter = filter.parse()?;
            let tasks = store.filtered(filter);
            if tasks.is_empty() {
                println!("{}", render::empty_message(filter));
            } else {
                for task in tasks {
                    println!("{}", render::task_line(task));
                }
            }
            if !store.is_empty() {
                println!();
                println!("{}", render::remaining_line(store.active_count()));
            }
        }
        Commands::Toggle { id } => {
            let id = store.resolve(&id)?;
            let task = store.toggle(id)?;
            println!("{}", render::task_line(&task));
        }
        Commands::Delete { id } => {
            let id = store.resolve(&id)?;
            let task = store.delete(id)?;
            println!("🗑️  Deleted \"{}\"", task.text);
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed()?;
            if removed == 0 {
                println!("No completed tasks to clear");
            } else {
                println!("🗑️  Cleared {} completed task(s)", removed);
            }
        }
        Commands::Attach {
            id,
            image,
            link,
            no_analyze,
        } => {
            let id = store.resolve(&id)?;
            let image_ref = if link || !config.embed_images {
                ImageRef::link_file(&image)?
            } else {
                ImageRef::embed_file(&image)?
            };
            let task = store.update_image(id, Some(image_ref.clone()))?;
            println!("📷 Attached {} to \"{}\"", image.display(), task.text);

            if no_analyze || !config.vision_enabled {
                debug!("Image analysis skipped");
            } else {
                print_analysis(&image_ref, false).await?;
            }
        }
        Commands::Detach { id } => {
            let id = store.resolve(&id)?;
            let task = store.update_image(id, None)?;
            println!("Removed proof photo from \"{}\"", task.text);
        }
        Commands::Analyze { id, file, json } => {
            let image_ref = match (file, id) {
                (Some(path), _) => ImageRef::link_file(&path)?,
                (None, Some(id)) => {
                    let id = store.resolve(&id)?;
                    store
                        .get(id)
                        .and_then(|task| task.proof_image.clone())
                        .ok_or_else(|| anyhow::anyhow!("Task {} has no proof photo", id.short()))?
                }
                (None, None) => anyhow::bail!("Give a task id or --file"),
            };
            print_analysis(&image_ref, json).await?;
        }
        Commands::Models(cmd) => handle_models_command(cmd).await?,
    }

    Ok(())
}

async fn print_analysis(image: &ImageRef, json: bool) -> anyhow::Result<()> {
    // First use may download the model and build the session
    if let Some(notice) = render::analysis_notice(json) {
        eprintln!("{}", notice);
    }
    let result = analyze_image(image).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in render::analysis_lines(&result) {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn handle_models_command(cmd: ModelCommands) -> anyhow::Result<()> {
    let vision = Arc::new(VisionConfig::from_env());
    vision.validate().map_err(anyhow::Error::msg)?;

    match cmd {
        ModelCommands::Fetch { verify } => {
            let manager = ModelManager::new(vision.clone());
            let path = manager
                .ensure_detection_model()
                .await
                .map_err(tasklens_core::Error::from)?;
            println!("✅ Model ready at {}", path.display());

            if verify {
                let detector = shared_analyzer()
                    .ensure_detector_loaded()
                    .await
                    .map_err(tasklens_core::Error::from)?;
                info!("Verified detector '{}'", detector.name());
                println!("✅ Model loads and is ready for analysis");
            }
        }
        ModelCommands::Path => {
            let path = vision.model_file_path();
            let state = if path.is_file() { "present" } else { "not downloaded" };
            println!("{} ({})", path.display(), state);
        }
    }

    Ok(())
}
