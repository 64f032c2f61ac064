use std::path::Path;

use anyhow::Context;

use crate::models::{Complexity, Difficulty, Exam, Project, Subject, WorkloadInput};

#[derive(serde::Deserialize)]
struct SubjectRow {
    name: String,
    hours_per_week: Option<f64>,
    hours: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ExamRow {
    name: String,
    date: String,
    difficulty: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProjectRow {
    name: String,
    deadline: String,
    complexity: Option<String>,
}

pub fn read_subjects(path: &Path) -> anyhow::Result<Vec<Subject>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open subjects CSV {}", path.display()))?;
    let mut subjects = Vec::new();

    for (line, result) in reader.deserialize::<SubjectRow>().enumerate() {
        let row = result.with_context(|| {
            format!("invalid subject row {} in {}", line + 1, path.display())
        })?;
        subjects.push(Subject {
            name: row.name,
            hours_per_week: row.hours_per_week.or(row.hours).unwrap_or(0.0).max(0.0),
        });
    }

    Ok(subjects)
}

/// Dates are kept verbatim; malformed ones are ignored later by the scorer.
pub fn read_exams(path: &Path) -> anyhow::Result<Vec<Exam>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open exams CSV {}", path.display()))?;
    let mut exams = Vec::new();

    for (line, result) in reader.deserialize::<ExamRow>().enumerate() {
        let row = result.with_context(|| {
            format!("invalid exam row {} in {}", line + 1, path.display())
        })?;
        exams.push(Exam {
            name: row.name,
            date: row.date,
            difficulty: row
                .difficulty
                .as_deref()
                .map(Difficulty::from)
                .unwrap_or_default(),
        });
    }

    Ok(exams)
}

pub fn read_projects(path: &Path) -> anyhow::Result<Vec<Project>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open projects CSV {}", path.display()))?;
    let mut projects = Vec::new();

    for (line, result) in reader.deserialize::<ProjectRow>().enumerate() {
        let row = result.with_context(|| {
            format!("invalid project row {} in {}", line + 1, path.display())
        })?;
        projects.push(Project {
            name: row.name,
            deadline: row.deadline,
            complexity: row
                .complexity
                .as_deref()
                .map(Complexity::from)
                .unwrap_or_default(),
        });
    }

    Ok(projects)
}

pub fn read_json(path: &Path) -> anyhow::Result<WorkloadInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if !value.is_object() {
        anyhow::bail!("{} must contain a JSON object", path.display());
    }
    serde_json::from_value(value)
        .with_context(|| format!("invalid workload data in {}", path.display()))
}

/// Assemble a workload from the optional per-kind CSV files.
pub fn from_csv(
    subjects: Option<&Path>,
    exams: Option<&Path>,
    projects: Option<&Path>,
    sleep_hours: f64,
) -> anyhow::Result<WorkloadInput> {
    Ok(WorkloadInput {
        subjects: subjects.map(read_subjects).transpose()?.unwrap_or_default(),
        exams: exams.map(read_exams).transpose()?.unwrap_or_default(),
        projects: projects.map(read_projects).transpose()?.unwrap_or_default(),
        sleep_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_subjects_with_hours() {
        let file = csv_file("name,hours_per_week\nMath, 8\nPhysics,6.5\n");
        let subjects = read_subjects(file.path()).unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name, "Math");
        assert_eq!(subjects[1].hours_per_week, 6.5);
    }

    #[test]
    fn exam_difficulty_is_optional() {
        let file = csv_file("name,date,difficulty\nBio,2026-05-01,hard\nArt,2026-05-03,\n");
        let exams = read_exams(file.path()).unwrap();
        assert_eq!(exams[0].difficulty, Difficulty::Hard);
        assert_eq!(exams[1].difficulty, Difficulty::Medium);
    }

    #[test]
    fn project_rows_keep_bad_dates() {
        let file = csv_file("name,deadline,complexity\nThesis,someday,high\n");
        let projects = read_projects(file.path()).unwrap();
        assert_eq!(projects[0].deadline, "someday");
        assert_eq!(projects[0].complexity, Complexity::High);
        assert_eq!(projects[0].parsed_deadline(), None);
    }

    #[test]
    fn subjects_prefer_hours_per_week_column() {
        let file = csv_file("name,hours_per_week,hours\nMath,8,2\nArt,,3\n");
        let subjects = read_subjects(file.path()).unwrap();
        assert_eq!(subjects[0].hours_per_week, 8.0);
        assert_eq!(subjects[1].hours_per_week, 3.0);
    }

    #[test]
    fn bad_hours_report_the_row() {
        let file = csv_file("name,hours_per_week\nMath,lots\n");
        let err = read_subjects(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid subject row 1"));
    }

    #[test]
    fn from_csv_fills_missing_kinds() {
        let subjects = csv_file("name,hours\nChem,4\n");
        let input = from_csv(Some(subjects.path()), None, None, 6.0).unwrap();
        assert_eq!(input.subjects.len(), 1);
        assert!(input.exams.is_empty());
        assert!(input.projects.is_empty());
        assert_eq!(input.sleep_hours, 6.0);
    }

    #[test]
    fn json_input_must_be_an_object() {
        let file = csv_file("[1, 2, 3]");
        assert!(read_json(file.path()).is_err());

        let file = csv_file(r#"{"sleep_hours": 6.5, "subjects": [{"name": "Math", "hours": 3}]}"#);
        let input = read_json(file.path()).unwrap();
        assert_eq!(input.sleep_hours, 6.5);
        assert_eq!(input.subjects[0].hours_per_week, 3.0);
    }
}
