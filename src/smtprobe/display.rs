//! Display method: as we can't impl the Display trait outside the module where
//! it's defined, and to not put these methods in the lib, use a wrapper
use std::fmt;

use probelib::smtp::connection::AuthOutcome;
use probelib::smtp::prober::{ProbeReport, ProbeStatus};

pub struct DisplayWrapper<'a, T>(pub &'a T);

impl fmt::Display for DisplayWrapper<'_, AuthOutcome> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the last reply line is the decisive one
        let reply = self.0.response_text.rsplit("\r\n").next().unwrap_or("");
        write!(
            f,
            "{}:{} ({} {})",
            self.0.username, self.0.password, self.0.response_code, reply
        )
    }
}

impl fmt::Display for DisplayWrapper<'_, ProbeStatus> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ProbeStatus::Completed => write!(f, "completed"),
            ProbeStatus::StoppedEarly => write!(f, "stopped early"),
            ProbeStatus::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

// The global display method
pub fn display_report(report: &ProbeReport) {
    println!(
        "{} attempts, {}",
        report.attempts,
        DisplayWrapper(&report.status)
    );

    if report.outcomes.is_empty() {
        println!("no valid credentials found");
        return;
    }

    for outcome in &report.outcomes {
        println!("valid: {}", DisplayWrapper(outcome));
    }
}
