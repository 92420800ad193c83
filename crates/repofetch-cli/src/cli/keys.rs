//! Interactive pause/resume: one command per stdin line while a transfer runs.
//! `p` (or `pause`) pauses, `r` (or `resume`) resumes. Other lines are ignored.

use repofetch_core::control::TransferControl;
use std::io::BufRead;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyCommand {
    Pause,
    Resume,
}

pub(crate) fn parse_line(line: &str) -> Option<KeyCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(KeyCommand::Pause),
        "r" | "resume" => Some(KeyCommand::Resume),
        _ => None,
    }
}

/// Reads stdin on a dedicated thread (blocking reads must not sit on the
/// runtime). The thread ends at EOF or with the process.
pub fn spawn_stdin_controls(control: Arc<TransferControl>) {
    let spawned = std::thread::Builder::new()
        .name("repofetch-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_line(&line) {
                    Some(KeyCommand::Pause) if !control.is_paused() => {
                        control.pause();
                        eprintln!("\npaused (r + Enter to resume)");
                    }
                    Some(KeyCommand::Resume) if control.is_paused() => {
                        control.resume();
                        eprintln!("\nresumed");
                    }
                    _ => {}
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("interactive controls unavailable: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pause_and_resume() {
        assert_eq!(parse_line("p"), Some(KeyCommand::Pause));
        assert_eq!(parse_line(" Pause \n"), Some(KeyCommand::Pause));
        assert_eq!(parse_line("r"), Some(KeyCommand::Resume));
        assert_eq!(parse_line("resume"), Some(KeyCommand::Resume));
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("q"), None);
    }
}
