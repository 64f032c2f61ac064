use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AnalysisResult, Factor, WorkloadInput};
use crate::scoring;

pub fn build_report(input: &WorkloadInput, analysis: &AnalysisResult, today: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# LoadCheck Workload Report");
    let _ = writeln!(output, "Generated on {today}");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "**Burnout risk:** {} ({:.1}/100)",
        analysis.risk_level.label(),
        analysis.total_score
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", analysis.summary);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Breakdown");

    for factor in Factor::ALL {
        let _ = writeln!(
            output,
            "- {}: {:.1}",
            factor.as_str(),
            analysis.breakdown.get(factor)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Main Causes");
    for cause in &analysis.causes {
        let _ = writeln!(output, "- {cause}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    if analysis.recommendations.is_empty() {
        let _ = writeln!(output, "No recommendations for this workload.");
    } else {
        for item in &analysis.recommendations {
            let _ = writeln!(
                output,
                "- [{}] **{}**: {} {}",
                item.priority.as_str(),
                item.title,
                item.description,
                item.action
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Deadlines");
    let deadlines = scoring::upcoming_deadlines(&input.exams, &input.projects, today);
    if deadlines.is_empty() {
        let _ = writeln!(output, "No upcoming exams or project deadlines.");
    } else {
        for deadline in deadlines.iter().take(10) {
            let days = scoring::days_until(deadline.date, today).unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} ({} {}, {}) in {} day(s)",
                deadline.date, deadline.level, deadline.kind, deadline.name, days
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Personal Tip");
    let _ = writeln!(output, "{}", analysis.ai_message);

    output
}
