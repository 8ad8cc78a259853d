use std::io::{self, Write};

use serde::Serialize;

use droidinject::instrument::{InjectionOutcome, SubstitutionReport};

/// Reports printed as human readable text or as JSON
pub trait Report: Serialize {
    fn write_text(&self, w: &mut dyn Write) -> io::Result<()>;

    fn print(&self, json: bool) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if json {
            serde_json::to_writer_pretty(&mut out, self)?;
            writeln!(out)?;
        } else {
            self.write_text(&mut out)?;
        }
        Ok(())
    }
}

impl Report for InjectionOutcome {
    fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        let report = match self {
            InjectionOutcome::NothingToInject => {
                return writeln!(w, "no listeners or handlers to call");
            }
            InjectionOutcome::Skipped { reason } => return writeln!(w, "skipped: {}", reason),
            InjectionOutcome::Injected(report) => report,
        };
        writeln!(w, "injected into {}", report.method)?;
        writeln!(
            w,
            "  context: {}{}",
            report.context_local,
            if report.generated_context {
                " (generated)"
            } else {
                ""
            }
        )?;
        for field in report.fields.iter() {
            writeln!(w, "  listener field {}", field)?;
        }
        for handler in report.handlers.iter() {
            writeln!(w, "  handler {}", handler)?;
        }
        writeln!(w, "  {} statements inserted", report.inserted)
    }
}

impl Report for SubstitutionReport {
    fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        for (old, new) in self.renamed.iter() {
            writeln!(w, "renamed {} -> {}", old, new)?;
        }
        writeln!(
            w,
            "{} rewritten, {} untouched, {} skipped",
            self.rewritten,
            self.untouched,
            self.skipped.len()
        )?;
        for skip in self.skipped.iter() {
            writeln!(w, "  skipped `{}`: {:?}", skip.stmt, skip.reason)?;
        }
        for warning in self.warnings.iter() {
            writeln!(w, "warning: {}", warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use droidinject::instrument::{InjectionReport, SkipDiagnostic, SkipReason};
    use droidinject::ir::{MethodRef, MethodSig};

    fn text<R: Report>(r: &R) -> String {
        let mut buf = Vec::new();
        r.write_text(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_injection_text() {
        let outcome = InjectionOutcome::Injected(InjectionReport {
            method: MethodRef::parse("<com.example.Main: void onCreate(android.os.Bundle)>")
                .unwrap(),
            fields: vec![String::from("clicks")],
            handlers: vec![MethodSig::parse("void onGo(android.view.View)").unwrap()],
            context_local: String::from("$r0"),
            generated_context: true,
            inserted: 5,
        });
        assert_eq!(
            text(&outcome),
            "injected into <com.example.Main: void onCreate(android.os.Bundle)>\n  \
             context: $r0 (generated)\n  \
             listener field clicks\n  \
             handler void onGo(android.view.View)\n  \
             5 statements inserted\n"
        );
        assert_eq!(
            text(&InjectionOutcome::Skipped {
                reason: String::from("bad layout")
            }),
            "skipped: bad layout\n"
        );
    }

    #[test]
    fn test_substitution_text() {
        let report = SubstitutionReport {
            renamed: vec![(String::from("$r1"), String::from("replaced_$r1"))],
            rewritten: 2,
            untouched: 1,
            skipped: vec![SkipDiagnostic {
                stmt: String::from("$r3 = new a.B"),
                reason: SkipReason::MissingLocal,
            }],
            warnings: vec![],
        };
        assert_eq!(
            text(&report),
            "renamed $r1 -> replaced_$r1\n\
             2 rewritten, 1 untouched, 1 skipped\n  \
             skipped `$r3 = new a.B`: MissingLocal\n"
        );
    }
}
