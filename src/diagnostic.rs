use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::span::Span;

/// A source diagnostic (error or warning) attached to a span of notation.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    fn report<'a>(&self, filename: &'a str, color: bool) -> Report<'static, (&'a str, std::ops::Range<usize>)> {
        let (kind, label_color) = match self.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };
        let range = self.span.range();

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_config(Config::default().with_color(color))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(&self.message)
                    .with_color(label_color),
            );
        for note in &self.notes {
            report = report.with_note(note);
        }
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }
        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        let _ = self
            .report(filename, true)
            .eprint((filename, Source::from(source)));
    }

    /// Render without colors, for logs and tests.
    pub fn render_plain(&self, filename: &str, source: &str) -> String {
        let mut buf = Vec::new();
        if self
            .report(filename, false)
            .write((filename, Source::from(source)), &mut buf)
            .is_err()
        {
            return self.message.clone();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::error("unknown variable 'y'".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unknown variable 'y'");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::warning("unused closure".to_string(), Span::new(0, 5))
            .with_note("declared here".to_string())
            .with_help("remove the declaration".to_string())
            .with_note("no member reads it".to_string());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("remove the declaration"));
    }

    #[test]
    fn test_render_plain_mentions_message_and_help() {
        let source = "(lambda ((x Int)) (add x y))\n";
        let d = Diagnostic::error("unknown variable 'y'".to_string(), Span::new(25, 26))
            .with_help("declare it with `free y: Int`".to_string());
        let text = d.render_plain("query.tx", source);
        assert!(text.contains("unknown variable 'y'"));
        assert!(text.contains("free y: Int"));
        assert!(text.contains("query.tx"));
    }

    #[test]
    fn test_render_diagnostics_multiple() {
        let source = "closure A { }\nclosure A { }\n1\n";
        let diagnostics = vec![
            Diagnostic::error("closure 'A' declared twice".to_string(), Span::new(22, 23)),
            Diagnostic::warning("unused closure 'A'".to_string(), Span::new(8, 9)),
        ];
        render_diagnostics(&diagnostics, "dup.tx", source);
    }
}
