use chrono::{Local, NaiveDate};

use crate::advice;
use crate::models::{
    round_tenth, AnalysisResult, Exam, Project, RiskLevel, ScoreBreakdown, Subject, WorkloadInput,
};

pub const HOMEWORK_WEIGHT: f64 = 1.5;
pub const EXAM_WEIGHT: f64 = 3.0;
pub const PROJECT_WEIGHT: f64 = 2.0;
pub const SLEEP_WEIGHT: f64 = 2.5;
pub const CLUSTERING_WEIGHT: f64 = 2.0;

pub const HOMEWORK_CAP: f64 = 30.0;
pub const EXAM_CAP: f64 = 30.0;
pub const PROJECT_CAP: f64 = 25.0;
pub const SLEEP_CAP: f64 = 20.0;
pub const CLUSTERING_CAP: f64 = 15.0;

pub const EXAM_LOOKAHEAD_DAYS: i64 = 14;
pub const PROJECT_LOOKAHEAD_DAYS: i64 = 21;
pub const CLUSTER_GAP_DAYS: i64 = 3;
pub const RECOMMENDED_SLEEP_HOURS: f64 = 7.0;

pub const LOW_RISK_MAX: f64 = 30.0;
pub const MEDIUM_RISK_MAX: f64 = 60.0;

/// Capped sub-scores plus the uncapped clustering penalty the advice rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDetails {
    pub breakdown: ScoreBreakdown,
    pub clustering_penalty: f64,
    pub total: f64,
}

/// Deterministic burnout scorer. Holds no state; one instance is shared across requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkloadScorer;

impl WorkloadScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score against today's local date. `ai_message` is left empty for the caller to fill.
    pub fn analyze(&self, input: &WorkloadInput) -> AnalysisResult {
        self.analyze_on(input, Local::now().date_naive())
    }

    pub fn analyze_on(&self, input: &WorkloadInput, today: NaiveDate) -> AnalysisResult {
        let details = score_details(input, today);
        let risk_level = risk_level(details.total);
        let causes = advice::main_causes(&details.breakdown);
        let recommendations = advice::recommendations(input, &details, today);
        let summary = advice::summary(risk_level, &details.breakdown);

        AnalysisResult {
            total_score: round_tenth(details.total),
            risk_level,
            breakdown: details.breakdown.rounded(),
            causes,
            recommendations,
            summary,
            ai_message: String::new(),
        }
    }
}

pub fn score_details(input: &WorkloadInput, today: NaiveDate) -> ScoreDetails {
    let clustering_penalty = clustering_penalty(&input.exams, &input.projects, today);
    let breakdown = ScoreBreakdown {
        homework: homework_score(&input.subjects),
        exams: exam_score(&input.exams, today),
        projects: project_score(&input.projects, today),
        sleep_deficit: sleep_score(input.sleep_hours),
        deadline_clustering: clustering_score(&input.exams, &input.projects, today),
    };

    ScoreDetails {
        total: breakdown.sum().clamp(0.0, 100.0),
        breakdown,
        clustering_penalty,
    }
}

pub fn total_homework_hours(subjects: &[Subject]) -> f64 {
    subjects
        .iter()
        .map(|subject| subject.hours_per_week.max(0.0))
        .sum()
}

pub fn homework_score(subjects: &[Subject]) -> f64 {
    (total_homework_hours(subjects) * HOMEWORK_WEIGHT).min(HOMEWORK_CAP)
}

pub fn exam_score(exams: &[Exam], today: NaiveDate) -> f64 {
    let score: f64 = exams
        .iter()
        .filter_map(|exam| {
            let days = days_until(exam.parsed_date()?, today)?;
            let urgency = urgency(days, EXAM_LOOKAHEAD_DAYS)?;
            Some(urgency * EXAM_WEIGHT * exam.difficulty.multiplier() * 5.0)
        })
        .sum();
    score.min(EXAM_CAP)
}

pub fn project_score(projects: &[Project], today: NaiveDate) -> f64 {
    let score: f64 = projects
        .iter()
        .filter_map(|project| {
            let days = days_until(project.parsed_deadline()?, today)?;
            let urgency = urgency(days, PROJECT_LOOKAHEAD_DAYS)?;
            Some(urgency * PROJECT_WEIGHT * project.complexity.multiplier() * 5.0)
        })
        .sum();
    score.min(PROJECT_CAP)
}

pub fn sleep_score(sleep_hours: f64) -> f64 {
    if sleep_hours >= RECOMMENDED_SLEEP_HOURS {
        return 0.0;
    }

    let deficit = RECOMMENDED_SLEEP_HOURS - sleep_hours;
    (deficit * SLEEP_WEIGHT * 3.0).min(SLEEP_CAP)
}

pub fn clustering_score(exams: &[Exam], projects: &[Project], today: NaiveDate) -> f64 {
    clustering_penalty(exams, projects, today).min(CLUSTERING_CAP)
}

/// Penalty before the cap: each adjacent pair of upcoming deadlines at most three
/// days apart adds `(4 - gap) * weight`.
pub fn clustering_penalty(exams: &[Exam], projects: &[Project], today: NaiveDate) -> f64 {
    let dates: Vec<NaiveDate> = upcoming_deadlines(exams, projects, today)
        .iter()
        .map(|deadline| deadline.date)
        .collect();

    dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .filter(|gap| *gap <= CLUSTER_GAP_DAYS)
        .map(|gap| (CLUSTER_GAP_DAYS + 1 - gap) as f64 * CLUSTERING_WEIGHT)
        .sum()
}

/// An exam or project with a valid date.
#[derive(Debug, Clone, PartialEq)]
pub struct Deadline<'a> {
    pub date: NaiveDate,
    pub kind: &'static str,
    pub name: &'a str,
    pub level: &'static str,
}

/// Valid exam dates and project deadlines on or after `today`, ascending.
pub fn upcoming_deadlines<'a>(
    exams: &'a [Exam],
    projects: &'a [Project],
    today: NaiveDate,
) -> Vec<Deadline<'a>> {
    let exams = exams.iter().filter_map(|exam| {
        Some(Deadline {
            date: exam.parsed_date()?,
            kind: "exam",
            name: &exam.name,
            level: exam.difficulty.as_str(),
        })
    });
    let projects = projects.iter().filter_map(|project| {
        Some(Deadline {
            date: project.parsed_deadline()?,
            kind: "project",
            name: &project.name,
            level: project.complexity.as_str(),
        })
    });

    let mut deadlines: Vec<Deadline<'a>> = exams
        .chain(projects)
        .filter(|deadline| deadline.date >= today)
        .collect();
    deadlines.sort_by_key(|deadline| deadline.date);
    deadlines
}

/// Whole days from `today` to `date`, or `None` for dates already past.
pub fn days_until(date: NaiveDate, today: NaiveDate) -> Option<i64> {
    let days = (date - today).num_days();
    (days >= 0).then_some(days)
}

/// Linear decay from 1.0 on the day itself to 0.0 at the end of the window.
pub fn urgency(days_until: i64, window_days: i64) -> Option<f64> {
    if !(0..=window_days).contains(&days_until) {
        return None;
    }
    Some((window_days - days_until) as f64 / window_days as f64)
}

pub fn risk_level(total_score: f64) -> RiskLevel {
    if total_score <= LOW_RISK_MAX {
        RiskLevel::Low
    } else if total_score <= MEDIUM_RISK_MAX {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
