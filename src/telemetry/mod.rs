use std::io::IsTerminal;

use crate::channels::errors::ErrorEvent;
use crate::event_bus::Event;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const RESET_COLOR: &str = "\x1b[0m";
const NO_COLOR: &str = "";

/// Controls whether rendered output carries ANSI color codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatterMode {
    /// Colored when stderr is a TTY, plain otherwise.
    #[default]
    Auto,
    Colored,
    Plain,
}

impl FormatterMode {
    fn resolve(self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a telemetry item that can be consumed by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> EventRender;
    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlainFormatter {
    colored: bool,
}

impl PlainFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(FormatterMode::Auto)
    }

    #[must_use]
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self {
            colored: mode.resolve(),
        }
    }

    fn line_color(&self) -> &'static str {
        if self.colored { LINE_COLOR } else { NO_COLOR }
    }

    fn context_color(&self) -> &'static str {
        if self.colored {
            CONTEXT_COLOR
        } else {
            NO_COLOR
        }
    }

    fn reset(&self) -> &'static str {
        if self.colored { RESET_COLOR } else { NO_COLOR }
    }
}

fn format_error_chain(
    error: &crate::channels::errors::LadderError,
    indent: usize,
    line_color: &str,
    reset: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(cause) = &error.cause {
        let indent_str = "  ".repeat(indent);
        lines.push(format!(
            "{line_color}{indent_str}cause: {}{reset}\n",
            cause.message
        ));
        lines.extend(format_error_chain(cause, indent + 1, line_color, reset));
    }
    lines
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> EventRender {
        let (line_color, reset) = (self.line_color(), self.reset());
        let line = format!("{line_color}{event}{reset}\n");
        EventRender {
            context: event.scope_label().map(|s| s.to_string()),
            lines: vec![line],
        }
    }

    fn render_errors(&self, errors: &[ErrorEvent]) -> Vec<EventRender> {
        let (line_color, context_color, reset) =
            (self.line_color(), self.context_color(), self.reset());
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut lines = Vec::new();
                let scope_str = format!("{context_color}{:?}{reset}", e.scope);
                lines.push(format!("[{}] {} | {}\n", i, e.when, scope_str));
                lines.push(format!(
                    "{line_color}  error: {}{reset}\n",
                    e.error.message
                ));
                lines.extend(format_error_chain(&e.error, 1, line_color, reset));
                if !e.tags.is_empty() {
                    lines.push(format!("{line_color}  tags: {:?}{reset}\n", e.tags));
                }
                if !e.context.is_null() {
                    lines.push(format!("{line_color}  context: {}{reset}\n", e.context));
                }
                EventRender {
                    context: Some(format!("{:?}", e.scope)),
                    lines,
                }
            })
            .collect()
    }
}
