use anyhow::Result;
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use bunny_note::command_processor::CommandProcessor;
use bunny_note::{MarkdownRenderer, RenderResult, Renderer, Session, SettingsStore};

/// How often the schedulers are polled.
const TICK: Duration = Duration::from_millis(25);

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("bunny_note", LevelFilter::Debug);
    }
    logger.init();

    let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer);
    let workdir = std::env::current_dir()?;
    let mut session = Session::new(SettingsStore::open(), workdir, Arc::clone(&renderer));

    if let Some(index) = session.restore_last_opened() {
        log::info!("Restored previous session at tab {}", index + 1);
    }

    if let Some(arg) = std::env::args().nth(1) {
        let path = PathBuf::from(&arg);
        match session.open_external(&path) {
            Ok(_) => log::info!("Loaded file from command line: {}", arg),
            Err(e) => eprintln!("Could not open {}: {}", arg, e),
        }
    }

    session.start(Instant::now());
    let res = run(&mut session, renderer).await;

    let report = session.shutdown();
    for (tab, error) in &report.failed {
        eprintln!("Tab {} was not written: {}", tab, error);
    }

    if let Err(err) = res {
        log::error!("Application error: {}", err);
        eprintln!("Error: {}", err);
        return Err(err);
    }

    log::info!("Application loop ended successfully");
    Ok(())
}

async fn run(session: &mut Session, renderer: Arc<dyn Renderer>) -> Result<()> {
    let processor = CommandProcessor::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderResult>();
    let mut should_quit = false;

    println!("{}", session.status().render_line());

    while !should_quit {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let now = Instant::now();
                if line.starts_with(':') {
                    match processor.execute_command(&line, session, now, &mut should_quit) {
                        Ok(output) if !output.is_empty() => println!("{}", output),
                        Ok(_) => {}
                        Err(e) => println!("{}", e),
                    }
                } else if let Some(index) = session.active_index() {
                    session.append_text(index, &format!("{}\n", line), now);
                } else {
                    println!("No tab selected (:e FILE, :new NAME or :enew)");
                }
            }
            tick = ticker.tick() => {
                let now = tick.into_std();
                if let Some(request) = session.poll_preview(now) {
                    let renderer = Arc::clone(&renderer);
                    let tx = render_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(request.run_offloaded(renderer).await);
                    });
                }
                if let Some(report) = session.poll_autosave(now) {
                    for (tab, error) in &report.failed {
                        println!("Autosave failed for tab {}: {}", tab, error);
                    }
                }
                session.status_mut().update(now);
            }
            Some(result) = render_rx.recv() => {
                let tab = result.tab;
                if session.apply_render(result) {
                    log::debug!("Preview updated for tab {}", tab);
                }
            }
        }
    }

    Ok(())
}
