use std::io::Write as _;

use clap::Subcommand;
use kairo_core::storage::{Config, Database};
use kairo_core::timer::{RunState, SessionEngine, TickSource};
use kairo_core::tips::TipService;
use kairo_core::Event;
use tokio::sync::mpsc;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the selected mode (or a specific mode id)
    Start {
        /// Mode id to start (see `modes list`)
        #[arg(long)]
        mode: Option<u32>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Rewind to the full duration, staying on the session
    Reset,
    /// Abandon the session and return to the catalog
    Exit,
    /// Skip the current break (breaks only)
    Skip,
    /// Switch between focus and break
    Switch,
    /// Print current timer state as JSON
    Status,
    /// Drive the countdown in the foreground until it completes
    Watch,
}

fn open_engine() -> Result<SessionEngine, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = SessionEngine::new(db, config);
    // A session that finished while the app was closed completes here.
    if let Some(event) = engine.restore() {
        print_event(&event)?;
    }
    Ok(engine)
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;

    let event = match action {
        TimerAction::Start { mode } => {
            if let Some(id) = mode {
                engine.select_mode(id)?;
            }
            let event = engine.start();
            if event.is_some() && engine.config().tips.enabled {
                let minutes = engine.active_mode().exact_minutes();
                let tip = tokio::runtime::Runtime::new()?
                    .block_on(TipService::offline().tip(minutes));
                eprintln!("{tip}");
            }
            event
        }
        TimerAction::Pause => engine.pause(),
        TimerAction::Resume => engine.resume(),
        TimerAction::Reset => engine.reset(),
        TimerAction::Exit => engine.exit(),
        TimerAction::Skip => engine.skip(),
        TimerAction::Switch => engine.switch_family(),
        TimerAction::Status => {
            if let Some(completed) = engine.tick() {
                print_event(&completed)?;
            }
            print_event(&engine.snapshot())?;
            return Ok(());
        }
        TimerAction::Watch => return watch(engine),
    };

    match event {
        Some(event) => print_event(&event)?,
        // Invalid in the current state; show where we actually are.
        None => print_event(&engine.snapshot())?,
    }
    Ok(())
}

/// Run the background tick source and drive the engine from its wake-ups
/// until the countdown completes (or forever under auto-continue).
fn watch(mut engine: SessionEngine) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        match engine.run_state() {
            RunState::Idle => {
                if let Some(event) = engine.start() {
                    print_event(&event)?;
                }
            }
            RunState::Paused => {
                if let Some(event) = engine.resume() {
                    print_event(&event)?;
                }
            }
            RunState::Running => {}
        }
        if engine.run_state() != RunState::Running {
            eprintln!("no session to watch");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel(8);
        let mut source = Some(TickSource::spawn(engine.active_mode_id(), tx.clone()));

        while let Some(wakeup) = rx.recv().await {
            match engine.handle_wakeup(wakeup.mode_id) {
                Some(event) => {
                    println!();
                    print_event(&event)?;
                    if let Event::SessionCompleted {
                        duration_minutes,
                        family,
                        ..
                    } = &event
                    {
                        if engine.config().tips.enabled {
                            let insight =
                                TipService::offline().insight(*duration_minutes, *family).await;
                            eprintln!("{insight}");
                        }
                    }
                    // The old source must be dead before a new one exists.
                    if let Some(old) = source.take() {
                        old.stop();
                    }
                    if engine.run_state() == RunState::Running {
                        source = Some(TickSource::spawn(engine.active_mode_id(), tx.clone()));
                    } else {
                        break;
                    }
                }
                None => {
                    if engine.run_state() != RunState::Running {
                        break;
                    }
                    print!("\r{} remaining ", format_mmss(engine.remaining_seconds()));
                    let _ = std::io::stdout().flush();
                }
            }
        }
        Ok(())
    })
}
