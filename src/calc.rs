use crate::grades::grade_points;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaTotals {
    pub gpa: f64,
    pub total_credits: f64,
}

/// Credit-weighted mean of grade points.
///
/// Unknown grade symbols count as 0 points but their credits still count, so a
/// row that slipped past validation lowers the GPA instead of failing it.
pub fn compute_gpa<'a, I>(courses: I) -> GpaTotals
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut total_points = 0.0;
    let mut total_credits = 0.0;
    for (grade, credits) in courses {
        total_points += grade_points(grade).unwrap_or(0.0) * credits;
        total_credits += credits;
    }
    let gpa = if total_credits > 0.0 {
        total_points / total_credits
    } else {
        0.0
    };
    GpaTotals { gpa, total_credits }
}

/// Half-away-from-zero rounding to 3 decimals, used for reported GPA values.
pub fn round_3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub name: String,
    pub index_number: String,
    pub year: String,
    pub semester: String,
    pub gpa: f64,
    pub credits: f64,
}

/// One flat course row as read for the summary report.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub student_id: String,
    pub name: String,
    pub index_number: String,
    pub year: String,
    pub semester: String,
    pub grade: String,
    pub credits: f64,
}

/// Groups rows by (student, year, semester), keeping first-seen order, and
/// computes one rounded term GPA per group.
pub fn term_summaries(rows: &[SummaryRow]) -> Vec<TermSummary> {
    let mut groups: Vec<(&SummaryRow, Vec<&SummaryRow>)> = Vec::new();
    for row in rows {
        let existing = groups.iter().position(|(head, _)| {
            head.student_id == row.student_id
                && head.year == row.year
                && head.semester == row.semester
        });
        match existing {
            Some(i) => groups[i].1.push(row),
            None => groups.push((row, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(head, members)| {
            let r = compute_gpa(members.iter().map(|m| (m.grade.as_str(), m.credits)));
            TermSummary {
                name: head.name.clone(),
                index_number: head.index_number.clone(),
                year: head.year.clone(),
                semester: head.semester.clone(),
                gpa: round_3(r.gpa),
                credits: r.total_credits,
            }
        })
        .collect()
}
