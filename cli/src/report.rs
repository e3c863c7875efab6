use std::fmt;

use miette::{Diagnostic, GraphicalReportHandler, Result, Severity};
use splice_model::{Diagnostic as Finding, Entity, MessageTemplates};

/// One finding as seen from one of the entities it involves.
#[derive(Debug)]
struct Rendered<'a> {
    finding: &'a Finding,
    on: &'a Entity,
    message: String,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Rendered<'_> {}

impl Diagnostic for Rendered<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("splice::{}", self.finding.kind())))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "in `{}` at {}",
            self.on.identity(),
            self.on.location()
        )))
    }
}

/// Prints every finding once per involved entity and returns how many reports were written.
pub fn print_diagnostics(findings: &[Finding], templates: &MessageTemplates) -> Result<usize> {
    let handler = GraphicalReportHandler::new();
    let mut written = 0;

    for finding in findings {
        for on in finding.involved() {
            let rendered = Rendered {
                finding,
                on,
                message: finding.message_on(on, templates),
            };
            render_report(&handler, &rendered)?;
            written += 1;
        }
    }

    Ok(written)
}

fn render_report(handler: &GraphicalReportHandler, diagnostic: &dyn Diagnostic) -> Result<()> {
    let mut out = String::new();
    handler
        .render_report(&mut out, diagnostic)
        .map_err(|_| miette::miette!("failed to render diagnostics"))?;
    eprint!("{out}");
    Ok(())
}
