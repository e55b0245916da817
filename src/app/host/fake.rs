//! Scripted `ToolRunner` used by adapter, executor and poller tests.

use std::sync::Mutex;

use crate::app::error::AppError;
use crate::app::host::runner::{CommandOutput, ToolRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command_line: String,
    pub detached: bool,
}

#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<(String, Result<CommandOutput, AppError>)>>,
    spawn_failures: Mutex<Vec<String>>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any command line starting with `prefix` gets `result`. Later rules win.
    pub fn respond(&self, prefix: &str, result: Result<CommandOutput, AppError>) -> &Self {
        self.rules
            .lock()
            .expect("rules")
            .insert(0, (prefix.to_string(), result));
        self
    }

    pub fn respond_ok(&self, prefix: &str, stdout: &str) -> &Self {
        self.respond(
            prefix,
            Ok(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
        )
    }

    pub fn respond_exit(&self, prefix: &str, exit_code: i32, stderr: &str) -> &Self {
        self.respond(
            prefix,
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: Some(exit_code),
            }),
        )
    }

    pub fn fail_spawn(&self, prefix: &str) -> &Self {
        self.spawn_failures
            .lock()
            .expect("spawn failures")
            .push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.command_line.starts_with(prefix))
            .count()
    }

    fn record(&self, program: &str, args: &[String], detached: bool) -> String {
        let command_line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().expect("calls").push(Invocation {
            command_line: command_line.clone(),
            detached,
        });
        command_line
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String], trace_id: &str) -> Result<CommandOutput, AppError> {
        let command_line = self.record(program, args, false);
        self.rules
            .lock()
            .expect("rules")
            .iter()
            .find(|(prefix, _)| command_line.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| {
                Err(AppError::tool_invocation(
                    format!("unexpected command: {command_line}"),
                    trace_id,
                ))
            })
    }

    fn spawn_detached(&self, program: &str, args: &[String], trace_id: &str) -> Result<(), AppError> {
        let command_line = self.record(program, args, true);
        let fails = self
            .spawn_failures
            .lock()
            .expect("spawn failures")
            .iter()
            .any(|prefix| command_line.starts_with(prefix.as_str()));
        if fails {
            return Err(AppError::tool_invocation(
                format!("Failed to spawn {program}"),
                trace_id,
            ));
        }
        Ok(())
    }
}
