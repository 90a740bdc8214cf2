use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use url::Url;

use timetable_client::api::{HttpTimetableApi, TimetableApi};
use timetable_client::clock::SystemClock;
use timetable_client::config::ClientConfig;
use timetable_client::controller::{GenerationController, RetentionPolicy};
use timetable_client::driver::{spawn_driver, ControllerHandle, GenerationView};
use timetable_client::render::ScheduleGrid;
use timetable_client::settings::SettingsSnapshot;
use timetable_client::storage::{JsonFileStore, StateStore};
use timetable_client::Phase;

type Controller = GenerationController<JsonFileStore, SystemClock>;

#[derive(Parser, Debug)]
#[command(name = "timetable", author, version, about = "Generate school timetables on a remote solver", long_about = None)]
struct Args {
    /// Base URL of the timetable API
    #[arg(long)]
    api_url: Option<Url>,

    /// Directory holding the persisted state
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Keep the previous timetable until a new one succeeds
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    keep_previous: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a generation job and follow it until it finishes
    Generate {
        /// Return right after the job was started
        #[arg(short, long)]
        detach: bool,
    },
    /// Continue following a job started earlier
    Resume,
    /// Show the state of the current or last job
    Status,
    /// Print the generated week of a class or teacher
    Show {
        #[arg(short, long, conflicts_with = "teacher", required_unless_present = "teacher")]
        class: Option<String>,
        #[arg(short, long)]
        teacher: Option<String>,
    },
    /// Inspect or change the school settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Forget all stored state
    Logout,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the local settings as JSON
    Show,
    /// Replace the local settings with a JSON file (unsaved until `save`)
    Load { path: PathBuf },
    /// Send the local settings to the server
    Save,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(dir) = args.state_dir {
        config.state_dir = dir;
    }
    if let Some(keep) = args.keep_previous {
        config.retention = if keep {
            RetentionPolicy::KeepUntilSuccess
        } else {
            RetentionPolicy::DiscardOnStart
        };
    }

    let store = JsonFileStore::new(&config.state_dir);
    if let Command::Logout = args.command {
        store.clear()?;
        println!("✅ Stored state removed.");
        return Ok(());
    }

    let mut controller = GenerationController::restore(store, SystemClock, config.retention)?;
    let api: Arc<dyn TimetableApi> = Arc::new(HttpTimetableApi::new(
        config.api_url.clone(),
        config.session_token.as_deref(),
        config.request_timeout,
    )?);

    match args.command {
        Command::Generate { detach } => {
            let state = controller.state();
            if state.settings_dirty {
                eprintln!("❌ Settings have unsaved changes. Run `timetable settings save` first.");
                return Ok(());
            }
            if !controller.job().is_settled() {
                eprintln!("❌ A timetable is already being generated. Use `timetable resume`.");
                return Ok(());
            }
            let class_count = state.settings.class_count();
            let handle = spawn_driver(controller, api, config.tick_interval);
            let epoch = handle.start(class_count).await?;
            println!("🚀 Generation started for {class_count} classes.");
            if detach {
                // Exiting drops the runtime, which would cancel the start request.
                let view = handle.wait_started(epoch).await?;
                match &view.job_id {
                    Some(job_id) => println!("Job {job_id} accepted. Run `timetable resume` to follow it."),
                    None => report(&view),
                }
            } else {
                follow(&handle, epoch).await?;
            }
        }
        Command::Resume => {
            if controller.job().is_settled() {
                println!("Nothing to resume.");
                print_status(&controller);
                return Ok(());
            }
            let epoch = controller.epoch();
            let handle = spawn_driver(controller, api, config.tick_interval);
            follow(&handle, epoch).await?;
        }
        Command::Status => print_status(&controller),
        Command::Show { class, teacher } => {
            let job = controller.job();
            if !job.exists {
                eprintln!("❌ No timetable has been generated yet.");
                return Ok(());
            }
            let grid = match (class, teacher) {
                (Some(class), _) => ScheduleGrid::for_class(job, &class),
                (None, Some(teacher)) => ScheduleGrid::for_teacher(job, &teacher),
                (None, None) => None,
            };
            match grid {
                Some(grid) => print!("{}", grid.render()),
                None => eprintln!("❌ Not part of the generated timetable."),
            }
        }
        Command::Settings { command } => settings(&mut controller, api.as_ref(), command).await?,
        // Cleared before restoring, so a corrupt state file can still be removed.
        Command::Logout => {}
    }

    Ok(())
}

async fn settings(
    controller: &mut Controller,
    api: &dyn TimetableApi,
    command: SettingsCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SettingsCommand::Show => {
            let state = controller.state();
            println!("{}", serde_json::to_string_pretty(&state.settings)?);
            if state.settings_dirty {
                println!("(unsaved changes)");
            }
        }
        SettingsCommand::Load { path } => {
            let snapshot: SettingsSnapshot = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
            snapshot.validate()?;
            controller.update_state(|state| {
                state.settings = snapshot;
                state.settings_dirty = true;
            })?;
            println!("✅ Settings loaded from {}. Run `timetable settings save` to upload.", path.display());
        }
        SettingsCommand::Save => {
            let snapshot = controller.state().settings.clone();
            snapshot.validate()?;
            api.save_settings(&snapshot).await?;
            controller.update_state(|state| state.settings_dirty = false)?;
            println!("✅ Settings saved.");
        }
    }
    Ok(())
}

async fn follow(handle: &ControllerHandle, epoch: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut view_rx = handle.subscribe();
    loop {
        let view = view_rx.borrow_and_update().clone();
        if view.epoch >= epoch && view.is_settled() {
            println!();
            report(&view);
            return Ok(());
        }
        draw_progress(&view);
        if view_rx.changed().await.is_err() {
            return Err("generation controller stopped".into());
        }
    }
}

fn draw_progress(view: &GenerationView) {
    match (view.phase, view.progress) {
        (Phase::Generating, Some(progress)) => {
            print!(
                "\r{} {:>3}%  {} remaining",
                progress.bar(30),
                progress.percent(),
                progress.remaining_label()
            );
        }
        (Phase::Starting, _) => print!("\rWaiting for the server to accept the job...{:20}", ""),
        (Phase::AwaitingResult, _) => print!("\rFetching result...{:40}", ""),
        _ => return,
    }
    let _ = std::io::stdout().flush();
}

fn report(view: &GenerationView) {
    match view.phase {
        Phase::Succeeded => println!("✅ Timetable generated with {} lessons.", view.lesson_count),
        _ => eprintln!(
            "❌ {}",
            view.last_error.as_deref().unwrap_or("Timetable generation stopped.")
        ),
    }
}

fn print_status(controller: &Controller) {
    let job = controller.job();
    println!("Status:     {}", job.phase());
    if let Some(job_id) = &job.job_id {
        println!("Job:        {job_id}");
    }
    if let Some(progress) = controller.progress() {
        println!(
            "Progress:   {}% ({} remaining)",
            progress.percent(),
            progress.remaining_label()
        );
    }
    if job.exists {
        println!(
            "Timetable:  {} lessons, {} classes, {} teachers, {} periods/day",
            job.lessons.len(),
            job.class_names.len(),
            job.teacher_names.len(),
            job.num_periods
        );
    }
    if let Some(error) = &job.last_error {
        println!("Last error: {error}");
    }
    if controller.state().settings_dirty {
        println!("Settings:   unsaved changes");
    }
}
