//! The single output path for command results.
//!
//! Handlers append values and error lines to a [`Printer`]; nothing is written
//! to standard output until [`Printer::flush`] runs at the end of dispatch.
//! Production code shares one process-wide instance through [`global`], while
//! tests build their own and inspect the buffers directly.

use clap::ValueEnum;
use minijinja::Environment;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One rendered line per value
    #[default]
    Plain,
    /// The whole buffer serialized as JSON
    Json,
    /// Unformatted dump of each value
    Raw,
}

/// A buffered value and, in plain mode, its pre-rendered text.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub value: Value,
    pub rendered: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    format: OutputFormat,
    single: bool,
    suppress_warnings: bool,
    disable_pager: bool,
    lines: Vec<Line>,
    error_lines: Vec<String>,
}

/// Text produced by a flush, split by destination stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Default)]
pub struct Printer {
    state: Mutex<State>,
}

static GLOBAL: Lazy<Printer> = Lazy::new(Printer::new);

/// The process-lifetime printer used by the binary.
pub fn global() -> &'static Printer {
    &GLOBAL
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn configure(&self, format: OutputFormat, suppress_warnings: bool, disable_pager: bool) {
        let mut st = self.state();
        st.format = format;
        st.suppress_warnings = suppress_warnings;
        st.disable_pager = disable_pager;
    }

    pub fn format(&self) -> OutputFormat {
        self.state().format
    }

    /// Mark that the handler emits exactly one value, so JSON output is a scalar.
    pub fn set_single(&self, single: bool) {
        self.state().single = single;
    }

    pub fn print<T: Serialize + ?Sized>(&self, v: &T) {
        let value = to_value(v);
        self.state().lines.push(Line {
            value,
            rendered: None,
        });
    }

    /// Append `v`, rendered through `template` unless the output is JSON.
    ///
    /// Templates use minijinja syntax against the serialized value, e.g.
    /// `{{ username }} ({{ email }})`.
    pub fn print_t<T: Serialize + ?Sized>(&self, template: &str, v: &T) {
        let value = to_value(v);
        let rendered = match self.format() {
            OutputFormat::Json => None,
            _ => Some(render_template(template, &value)),
        };
        self.state().lines.push(Line { value, rendered });
    }

    pub fn print_error(&self, msg: impl Into<String>) {
        self.state().error_lines.push(msg.into());
    }

    /// Warnings bypass the buffers and go straight to standard error.
    pub fn print_warning(&self, msg: impl AsRef<str>) {
        if self.state().suppress_warnings {
            return;
        }
        eprintln!("WARNING: {}", msg.as_ref());
    }

    pub fn clean(&self) {
        let mut st = self.state();
        st.lines.clear();
        st.error_lines.clear();
        st.single = false;
    }

    pub fn lines(&self) -> Vec<Line> {
        self.state().lines.clone()
    }

    /// The value buffer as it would appear in plain output, one entry per line.
    pub fn plain_lines(&self) -> Vec<String> {
        self.state().lines.iter().map(plain_line).collect()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.state().error_lines.clone()
    }

    /// Render both buffers in the active format without clearing them.
    pub fn render(&self) -> Rendered {
        let st = self.state();
        let mut out = Rendered::default();
        match st.format {
            OutputFormat::Plain => {
                for line in &st.lines {
                    out.stdout.push_str(&plain_line(line));
                    out.stdout.push('\n');
                }
                for err in &st.error_lines {
                    out.stderr.push_str(&format!("Error: {err}\n"));
                }
            }
            OutputFormat::Raw => {
                for line in &st.lines {
                    out.stdout.push_str(&raw_dump(&line.value));
                    out.stdout.push('\n');
                }
                for err in &st.error_lines {
                    out.stderr.push_str(&format!("Error: {err}\n"));
                }
            }
            OutputFormat::Json => {
                if !st.lines.is_empty() {
                    let doc = if st.single && st.lines.len() == 1 {
                        st.lines[0].value.clone()
                    } else {
                        Value::Array(st.lines.iter().map(|l| l.value.clone()).collect())
                    };
                    out.stdout.push_str(&pretty(&doc));
                    out.stdout.push('\n');
                }
                if !st.error_lines.is_empty() {
                    let errs = Value::Array(
                        st.error_lines.iter().cloned().map(Value::String).collect(),
                    );
                    out.stderr.push_str(&pretty(&errs));
                    out.stderr.push('\n');
                }
            }
        }
        out
    }

    /// Write both buffers to their streams and empty them.
    pub fn flush(&self) -> io::Result<()> {
        let rendered = self.render();
        let use_pager = {
            let st = self.state();
            st.format == OutputFormat::Json
                && !st.disable_pager
                && !rendered.stdout.is_empty()
                && console::Term::stdout().is_term()
        };
        if use_pager {
            if let Err(err) = page(&rendered.stdout) {
                tracing::debug!(error = %err, "pager unavailable, writing directly");
                io::stdout().write_all(rendered.stdout.as_bytes())?;
            }
        } else {
            io::stdout().write_all(rendered.stdout.as_bytes())?;
        }
        io::stdout().flush()?;
        io::stderr().write_all(rendered.stderr.as_bytes())?;
        self.clean();
        Ok(())
    }
}

fn to_value<T: Serialize + ?Sized>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or_else(|err| Value::String(format!("<unprintable: {err}>")))
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

fn plain_line(line: &Line) -> String {
    match &line.rendered {
        Some(text) => text.clone(),
        None => match &line.value {
            Value::String(s) => s.clone(),
            other => pretty(other),
        },
    }
}

fn render_template(template: &str, value: &Value) -> String {
    let mut env = Environment::new();
    // `{{ create_at | datetime }}` renders server millisecond timestamps.
    env.add_filter("datetime", crate::model::format_millis);
    match env.render_str(template, value) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, template, "template rendering failed");
            pretty(value)
        }
    }
}

/// Plain-value dump: `{key:value key:value}`, `[a b]`, bare strings.
fn raw_dump(v: &Value) -> String {
    match v {
        Value::Null => "<nil>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(raw_dump).collect();
            format!("[{}]", inner.join(" "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}:{}", raw_dump(v)))
                .collect();
            format!("{{{}}}", inner.join(" "))
        }
    }
}

fn page(text: &str) -> io::Result<()> {
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less -FRX".to_string());
    let mut parts = pager.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "empty PAGER"))?;
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    child.wait()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_renders_templates_in_append_order() {
        let p = Printer::new();
        p.print_t("{{ name }}", &json!({"name": "a"}));
        p.print_t("{{ name }} (archived)", &json!({"name": "c"}));
        p.print("bare");
        assert_eq!(p.plain_lines(), vec!["a", "c (archived)", "bare"]);
        assert_eq!(p.render().stdout, "a\nc (archived)\nbare\n");
    }

    #[test]
    fn errors_go_to_their_own_buffer() {
        let p = Printer::new();
        p.print("ok");
        p.print_error("can't find user 'bogus'");
        assert_eq!(p.error_lines(), vec!["can't find user 'bogus'"]);
        let out = p.render();
        assert_eq!(out.stdout, "ok\n");
        assert_eq!(out.stderr, "Error: can't find user 'bogus'\n");
    }

    #[test]
    fn json_emits_a_list_unless_single() {
        let p = Printer::new();
        p.configure(OutputFormat::Json, false, true);
        p.print_t("{{ id }}", &json!({"id": "x"}));
        let list: Value = serde_json::from_str(&p.render().stdout).unwrap();
        assert_eq!(list, json!([{"id": "x"}]));

        p.set_single(true);
        let single: Value = serde_json::from_str(&p.render().stdout).unwrap();
        assert_eq!(single, json!({"id": "x"}));
    }

    #[test]
    fn json_keeps_raw_value_not_rendering() {
        let p = Printer::new();
        p.configure(OutputFormat::Json, false, true);
        p.print_t("{{ id }}", &json!({"id": "x"}));
        assert_eq!(p.lines()[0].rendered, None);
    }

    #[test]
    fn raw_format_dumps_values() {
        let p = Printer::new();
        p.configure(OutputFormat::Raw, false, true);
        p.print(&json!({"id": "x", "tags": ["a", "b"], "n": 3}));
        assert_eq!(p.render().stdout, "{id:x n:3 tags:[a b]}\n");
    }

    #[test]
    fn clean_empties_both_buffers() {
        let p = Printer::new();
        p.print("v");
        p.print_error("e");
        p.set_single(true);
        p.clean();
        assert!(p.lines().is_empty());
        assert!(p.error_lines().is_empty());
        assert_eq!(p.render(), Rendered::default());
    }

    #[test]
    fn datetime_filter_formats_millis() {
        let p = Printer::new();
        p.print_t("{{ id }} {{ create_at | datetime }}", &json!({"id": "j1", "create_at": 1000}));
        assert_eq!(p.plain_lines(), vec!["j1 1970-01-01T00:00:01+00:00"]);
    }

    #[test]
    fn bad_template_falls_back_to_json() {
        let p = Printer::new();
        p.print_t("{{ name ", &json!({"name": "a"}));
        assert!(p.plain_lines()[0].contains("\"name\": \"a\""));
    }
}
