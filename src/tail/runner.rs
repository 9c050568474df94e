//! Tail mode runner - drives a live log buffer from stdin commands

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use logdeck_app::{LiveLogBuffer, LiveLogDeps};
use logdeck_client::{ConsoleControl, ControlApi, StreamConnector, WsConnector};
use logdeck_core::prelude::Result;
use logdeck_core::{ConnectionState, LogTarget};

use super::{parse_command, ConsoleNotifier, OutputMode, StdoutView, TailCommand, TailEvent};
use crate::commands::Console;

/// How long to wait for the console to acknowledge deactivation on exit
const DEACTIVATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line options of `logdeck tail`
#[derive(Debug, Clone, Default)]
pub struct TailOptions {
    pub search: Option<String>,
    pub auto_scroll: bool,
    pub json: bool,
}

/// Stream `target` until the user quits
pub async fn run_tail(console: &Console, target: LogTarget, options: TailOptions) -> Result<()> {
    info!("Tailing {}", target.label());

    let mode = if options.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut settings = console.settings().live_log.clone();
    settings.auto_scroll |= options.auto_scroll;

    let deps = LiveLogDeps {
        control: Arc::new(ConsoleControl::new(console.api())),
        connector: Arc::new(WsConnector::new(console.settings().server.ws_base_url()?)),
        credentials: Arc::new(console.store().clone()),
        notifier: Arc::new(ConsoleNotifier::new(mode)),
        view: Arc::new(StdoutView::new(target.label(), mode)),
    };
    let mut buffer = LiveLogBuffer::new(target, &settings, deps);

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        read_commands_blocking(cmd_tx);
    });

    match options.search.as_deref() {
        Some(filter) => buffer.search(filter)?,
        None => buffer.start()?,
    }

    let result = tail_loop(&mut buffer, cmd_rx, mode).await;
    info!("Tail exiting");
    result
}

/// Main tail loop. Returns after `quit`, end of input, or Ctrl-C, once the session is stopped.
pub async fn tail_loop<C, S>(
    buffer: &mut LiveLogBuffer<C, S>,
    mut commands: mpsc::Receiver<TailCommand>,
    mode: OutputMode,
) -> Result<()>
where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    let mut last_state = buffer.state();
    report_state(last_state, mode);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            cmd = commands.recv() => match cmd {
                Some(TailCommand::Quit) => {
                    info!("Quit requested");
                    break;
                }
                Some(cmd) => apply_command(buffer, cmd),
                None => {
                    info!("Command input closed");
                    break;
                }
            },
            msg = buffer.next_message() => buffer.process_message(msg),
        }

        if buffer.state() != last_state {
            last_state = buffer.state();
            report_state(last_state, mode);
        }
    }

    buffer.stop();
    if buffer.state() != last_state {
        report_state(buffer.state(), mode);
    }
    if tokio::time::timeout(DEACTIVATE_TIMEOUT, buffer.wait_deactivated())
        .await
        .is_err()
    {
        warn!("Timed out waiting for the console to close the session");
    }
    Ok(())
}

fn apply_command<C, S>(buffer: &mut LiveLogBuffer<C, S>, cmd: TailCommand)
where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    debug!("Tail command: {:?}", cmd);
    let started = match cmd {
        TailCommand::Search(filter) => buffer.search(&filter),
        TailCommand::Start => buffer.start(),
        TailCommand::Stop => {
            buffer.stop();
            Ok(())
        }
        TailCommand::Page(page) => {
            buffer.set_page(page);
            Ok(())
        }
        TailCommand::Next => {
            buffer.next_page();
            Ok(())
        }
        TailCommand::Prev => {
            buffer.prev_page();
            Ok(())
        }
        TailCommand::AutoScroll(enabled) => {
            buffer.set_auto_scroll(enabled);
            Ok(())
        }
        TailCommand::Quit => Ok(()),
    };
    // Already reported through the notifier
    if let Err(e) = started {
        debug!("Command not applied: {}", e);
    }
}

fn report_state(state: ConnectionState, mode: OutputMode) {
    info!("Live log state: {}", state);
    if mode == OutputMode::Json {
        TailEvent::state(state).emit();
    }
}

/// Forward stdin lines as commands until EOF or `quit`
fn read_commands_blocking(cmd_tx: mpsc::Sender<TailCommand>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_command(trimmed) {
                    Some(cmd) => {
                        let quit = cmd == TailCommand::Quit;
                        if cmd_tx.blocking_send(cmd).is_err() || quit {
                            break;
                        }
                    }
                    None => warn!("Unknown tail command: {}", trimmed),
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
