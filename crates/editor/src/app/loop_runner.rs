use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tracing::{error, info, warn};

use super::bootstrap::EditorWiring;
use super::commands::{CommandProcessor, LineOutcome};
use super::session::EditorSession;

pub(crate) fn run(app: EditorWiring) -> ExitCode {
    let EditorWiring {
        mut session,
        level_path,
    } = app;
    info!(level_path = %level_path.display(), "editor_ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(err) = run_shell(&mut session, stdin.lock(), stdout.lock()) {
        error!(error = %err, "shell_io_failed");
        return ExitCode::FAILURE;
    }

    if session.has_unsaved_changes() {
        warn!(level_path = %level_path.display(), "quit_with_unsaved_changes");
    }
    ExitCode::SUCCESS
}

/// Reads commands until `quit` or end of input.
fn run_shell(
    session: &mut EditorSession,
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<()> {
    let processor = CommandProcessor::new();
    let mut lines = Vec::new();

    for line in input.lines() {
        let line = line?;
        let outcome = processor.process_line(session, &line, &mut lines);
        for printed in lines.drain(..) {
            writeln!(output, "{printed}")?;
        }
        output.flush()?;
        if outcome == LineOutcome::Quit {
            break;
        }
    }
    Ok(())
}
