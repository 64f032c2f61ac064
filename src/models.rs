use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_SLEEP_HOURS: f64 = 8.0;

/// Self-reported workload for a single analysis. Every field is optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadInput {
    #[serde(default, deserialize_with = "lenient_list")]
    pub subjects: Vec<Subject>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub exams: Vec<Exam>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub projects: Vec<Project>,
    #[serde(default = "default_sleep_hours", deserialize_with = "lenient_sleep")]
    pub sleep_hours: f64,
}

impl Default for WorkloadInput {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            exams: Vec::new(),
            projects: Vec::new(),
            sleep_hours: DEFAULT_SLEEP_HOURS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "SubjectFields")]
pub struct Subject {
    pub name: String,
    pub hours_per_week: f64,
}

/// Wire shape of a subject. `hours` is the older key and only counts when
/// `hours_per_week` is absent or not a number.
#[derive(Deserialize)]
struct SubjectFields {
    #[serde(default, deserialize_with = "lenient_text")]
    name: String,
    #[serde(default)]
    hours_per_week: Option<Value>,
    #[serde(default)]
    hours: Option<Value>,
}

impl From<SubjectFields> for Subject {
    fn from(fields: SubjectFields) -> Self {
        let hours = [fields.hours_per_week, fields.hours]
            .iter()
            .flatten()
            .find_map(number_from)
            .unwrap_or(0.0);

        Self {
            name: fields.name,
            hours_per_week: hours.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Exam {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_label")]
    pub difficulty: Difficulty,
}

impl Exam {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.date)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub deadline: String,
    #[serde(default, deserialize_with = "lenient_label")]
    pub complexity: Complexity,
}

impl Project {
    pub fn parsed_deadline(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.deadline)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl From<&str> for Difficulty {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn multiplier(self) -> f64 {
        match self {
            Complexity::Low => 0.5,
            Complexity::Medium => 1.0,
            Complexity::High => 1.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl From<&str> for Complexity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Complexity::Low,
            "high" => Complexity::High,
            _ => Complexity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five independent contributors to the burnout score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Homework,
    Exams,
    Projects,
    SleepDeficit,
    DeadlineClustering,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Homework,
        Factor::Exams,
        Factor::Projects,
        Factor::SleepDeficit,
        Factor::DeadlineClustering,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Factor::Homework => "homework",
            Factor::Exams => "exams",
            Factor::Projects => "projects",
            Factor::SleepDeficit => "sleep_deficit",
            Factor::DeadlineClustering => "deadline_clustering",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub homework: f64,
    pub exams: f64,
    pub projects: f64,
    pub sleep_deficit: f64,
    pub deadline_clustering: f64,
}

impl ScoreBreakdown {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Homework => self.homework,
            Factor::Exams => self.exams,
            Factor::Projects => self.projects,
            Factor::SleepDeficit => self.sleep_deficit,
            Factor::DeadlineClustering => self.deadline_clustering,
        }
    }

    pub fn sum(&self) -> f64 {
        Factor::ALL.iter().map(|factor| self.get(*factor)).sum()
    }

    pub fn rounded(&self) -> Self {
        Self {
            homework: round_tenth(self.homework),
            exams: round_tenth(self.exams),
            projects: round_tenth(self.projects),
            sleep_deficit: round_tenth(self.sleep_deficit),
            deadline_clustering: round_tenth(self.deadline_clustering),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub breakdown: ScoreBreakdown,
    pub causes: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub summary: String,
    pub ai_message: String,
}

/// Response envelope shared by the HTTP service and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisEnvelope {
    pub success: bool,
    pub analysis: AnalysisResult,
}

impl AnalysisEnvelope {
    pub fn ok(analysis: AnalysisResult) -> Self {
        Self {
            success: true,
            analysis,
        }
    }
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn default_sleep_hours() -> f64 {
    DEFAULT_SLEEP_HOURS
}

fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

fn lenient_sleep<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value).unwrap_or(DEFAULT_SLEEP_HOURS))
}

fn lenient_label<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> From<&'a str> + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => T::from(text.as_str()),
        _ => T::default(),
    })
}

/// Items that are not objects, or that do not fit `T`, are dropped instead of
/// failing the whole payload.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
