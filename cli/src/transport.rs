use serde::Serialize;

use interpreter::{ActuatorTarget, Command, CommandChannel};

#[derive(Serialize)]
struct Line<'a> {
    target: ActuatorTarget,
    command: &'a Command,
}

/// Transport stand-in that writes one JSON object per command to stdout.
pub struct StdoutTransport {
    connected: bool,
    quiet: bool,
}

impl StdoutTransport {
    pub fn new(connected: bool, quiet: bool) -> Self {
        StdoutTransport { connected, quiet }
    }
}

impl CommandChannel for StdoutTransport {
    fn publish(&self, target: ActuatorTarget, command: Command) {
        if self.quiet {
            return;
        }
        match serde_json::to_string(&Line {
            target,
            command: &command,
        }) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!(%command, "cannot encode command: {}", e),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
