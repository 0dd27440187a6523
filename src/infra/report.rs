use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::infra::CflatError;

/// Prints `err` to stderr, with source excerpts where the error has spans.
pub fn eprint(err: &CflatError, path: &str, src: &str) -> std::io::Result<()> {
    let diagnostics = err.diagnostics();

    if diagnostics.is_empty() {
        eprintln!("error: {err}");
        return Ok(());
    }

    for diagnostic in diagnostics {
        Report::build(ReportKind::Error, (path, diagnostic.span.clone()))
            .with_message(err.to_string())
            .with_label(
                Label::new((path, diagnostic.span))
                    .with_message(diagnostic.message)
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((path, Source::from(src)))?;
    }

    Ok(())
}
