use chrono::NaiveDate;

use crate::models::{
    Complexity, Factor, Priority, Recommendation, RiskLevel, ScoreBreakdown, Subject,
    WorkloadInput,
};
use crate::scoring::{self, ScoreDetails};

pub const MANAGEABLE_CAUSE: &str = "Workload is manageable";
pub const MAX_CAUSES: usize = 3;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const URGENT_WINDOW_DAYS: i64 = 3;
pub const HEAVY_HOMEWORK_HOURS: f64 = 25.0;
pub const CLUSTERING_WARNING_PENALTY: f64 = 15.0;

fn significance_threshold(factor: Factor) -> f64 {
    match factor {
        Factor::Homework => 15.0,
        Factor::Exams => 15.0,
        Factor::Projects => 12.0,
        Factor::SleepDeficit => 8.0,
        Factor::DeadlineClustering => 8.0,
    }
}

fn cause_phrase(factor: Factor) -> &'static str {
    match factor {
        Factor::Homework => "Heavy homework load across subjects",
        Factor::Exams => "Multiple upcoming exams creating pressure",
        Factor::Projects => "Project deadlines approaching",
        Factor::SleepDeficit => "Insufficient sleep affecting your performance",
        Factor::DeadlineClustering => "Multiple deadlines clustered together",
    }
}

fn summary_label(factor: Factor) -> &'static str {
    match factor {
        Factor::Homework => "your homework load",
        Factor::Exams => "upcoming exams",
        Factor::Projects => "project deadlines",
        Factor::SleepDeficit => "lack of sleep",
        Factor::DeadlineClustering => "clustered deadlines",
    }
}

/// Factors above their significance threshold, largest sub-score first.
pub fn significant_factors(breakdown: &ScoreBreakdown) -> Vec<Factor> {
    let mut factors: Vec<Factor> = Factor::ALL
        .into_iter()
        .filter(|factor| breakdown.get(*factor) > significance_threshold(*factor))
        .collect();

    // stable sort keeps factor order on ties
    factors.sort_by(|a, b| {
        breakdown
            .get(*b)
            .partial_cmp(&breakdown.get(*a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    factors
}

pub fn main_causes(breakdown: &ScoreBreakdown) -> Vec<String> {
    let causes: Vec<String> = significant_factors(breakdown)
        .into_iter()
        .take(MAX_CAUSES)
        .map(|factor| cause_phrase(factor).to_string())
        .collect();

    if causes.is_empty() {
        vec![MANAGEABLE_CAUSE.to_string()]
    } else {
        causes
    }
}

fn recommendation(
    priority: Priority,
    title: &str,
    description: String,
    action: String,
) -> Recommendation {
    Recommendation {
        priority,
        title: title.to_string(),
        description,
        action,
    }
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        format!("{hours:.1}")
    }
}

fn is_urgent(date: Option<NaiveDate>, today: NaiveDate) -> bool {
    date.and_then(|date| scoring::days_until(date, today))
        .is_some_and(|days| days <= URGENT_WINDOW_DAYS)
}

pub fn recommendations(
    input: &WorkloadInput,
    details: &ScoreDetails,
    today: NaiveDate,
) -> Vec<Recommendation> {
    let mut items = Vec::new();

    let sleep_hours = input.sleep_hours;
    if sleep_hours < 6.0 {
        items.push(recommendation(
            Priority::High,
            "Critical: Improve Sleep",
            format!(
                "You're only getting {} hours of sleep. Try to get at least 7 hours tonight. Sleep deprivation significantly increases burnout risk.",
                format_hours(sleep_hours)
            ),
            "Set a bedtime alarm 8 hours before you need to wake up.".to_string(),
        ));
    } else if sleep_hours < scoring::RECOMMENDED_SLEEP_HOURS {
        items.push(recommendation(
            Priority::Medium,
            "Get More Sleep",
            format!(
                "At {} hours, you're slightly sleep deprived. An extra hour of sleep can improve focus and reduce stress.",
                format_hours(sleep_hours)
            ),
            "Try going to bed 30 minutes earlier tonight.".to_string(),
        ));
    }

    let total_homework = scoring::total_homework_hours(&input.subjects);
    if total_homework > HEAVY_HOMEWORK_HOURS {
        let heaviest = input
            .subjects
            .iter()
            .fold(None, |best: Option<&Subject>, subject| match best {
                Some(current) if current.hours_per_week >= subject.hours_per_week => Some(current),
                _ => Some(subject),
            });
        let heaviest_name = heaviest
            .map(|subject| subject.name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or("your heaviest subject");

        items.push(recommendation(
            Priority::High,
            "Reduce Homework Load",
            format!(
                "{} hours/week is very high. Consider focusing on quality over quantity.",
                format_hours(total_homework)
            ),
            format!(
                "Try reducing time on {heaviest_name} by using more efficient study techniques."
            ),
        ));
    }

    let urgent_exams = input
        .exams
        .iter()
        .filter(|exam| is_urgent(exam.parsed_date(), today))
        .count();
    if urgent_exams > 1 {
        items.push(recommendation(
            Priority::High,
            "Multiple Exams Soon",
            format!(
                "You have {urgent_exams} exams in the next 3 days. This is a high-stress period."
            ),
            "Focus only on exam prep. Delay other assignments if possible and take short breaks every 45 minutes.".to_string(),
        ));
    } else if urgent_exams == 1 {
        items.push(recommendation(
            Priority::Medium,
            "Exam Coming Up",
            "You have an exam in the next few days.".to_string(),
            "Prioritize exam study over other assignments. Use active recall and practice problems.".to_string(),
        ));
    }

    let complex_project_due = input.projects.iter().any(|project| {
        project.complexity == Complexity::High && is_urgent(project.parsed_deadline(), today)
    });
    if complex_project_due {
        items.push(recommendation(
            Priority::High,
            "Complex Project Due Soon",
            "You have a high-complexity project due very soon.".to_string(),
            "Consider asking for an extension or focus on completing the most important parts first.".to_string(),
        ));
    }

    if details.clustering_penalty > CLUSTERING_WARNING_PENALTY {
        items.push(recommendation(
            Priority::Medium,
            "Deadline Clustering Detected",
            "Multiple deadlines are very close together, increasing stress.".to_string(),
            "Try to negotiate moving one deadline, or identify which task can be completed with \"good enough\" quality.".to_string(),
        ));
    }

    let breakdown = &details.breakdown;
    if breakdown.exams > significance_threshold(Factor::Exams) && urgent_exams == 0 {
        items.push(recommendation(
            Priority::Medium,
            "Plan Your Exam Prep",
            "Several exams are approaching over the next two weeks.".to_string(),
            "Create a study schedule and use active recall techniques.".to_string(),
        ));
    }

    if breakdown.projects > significance_threshold(Factor::Projects) {
        items.push(recommendation(
            Priority::Medium,
            "Break Projects Into Milestones",
            "Your project deadlines add up to a significant share of your load.".to_string(),
            "Split each project into smaller milestones and schedule the first one this week.".to_string(),
        ));
    }

    if scoring::risk_level(details.total) == RiskLevel::High {
        items.push(recommendation(
            Priority::Low,
            "Take Care of Yourself",
            "Your workload is high. Remember to take breaks and stay healthy.".to_string(),
            "Take a 15-minute walk or do some stretching. Staying healthy improves productivity.".to_string(),
        ));
    }

    if items.is_empty() {
        items.push(recommendation(
            Priority::Low,
            "Keep Up the Balance",
            "Your workload looks manageable right now.".to_string(),
            "Keep up the good work and maintain your current balance!".to_string(),
        ));
    }

    items.sort_by_key(|item| item.priority);
    items.truncate(MAX_RECOMMENDATIONS);
    items
}

pub fn summary(risk_level: RiskLevel, breakdown: &ScoreBreakdown) -> String {
    let labels: Vec<&str> = significant_factors(breakdown)
        .into_iter()
        .take(2)
        .map(summary_label)
        .collect();

    match risk_level {
        RiskLevel::Low => {
            "Great job! Your workload is manageable. Keep maintaining this balance!".to_string()
        }
        RiskLevel::Medium => {
            let causes = if labels.is_empty() {
                "your schedule".to_string()
            } else {
                labels.join(" and ")
            };
            format!(
                "Your workload is elevated, mainly due to {causes}. Consider the recommendations below to stay on track."
            )
        }
        RiskLevel::High => {
            let causes = if labels.is_empty() {
                "multiple factors".to_string()
            } else {
                labels.join(" and ")
            };
            format!(
                "Warning: Your academic load is very high due to {causes}. Taking action now can help prevent burnout."
            )
        }
    }
}
