//! Grade scale and the validation rules shared by every write path
//! (manual save, single append, spreadsheet import).

use crate::error::{GpaError, GpaResult};

/// Letter grade to grade-point value. Order is the order offered to the UI.
pub const GRADE_SCALE: [(&str, f64); 13] = [
    ("A+", 4.0),
    ("A", 4.0),
    ("A-", 3.7),
    ("B+", 3.3),
    ("B", 3.0),
    ("B-", 2.7),
    ("C+", 2.3),
    ("C", 2.0),
    ("C-", 1.7),
    ("D+", 1.3),
    ("D", 1.0),
    ("D-", 0.7),
    ("F", 0.0),
];

pub const YEARS: [&str; 5] = ["Year 1", "Year 2", "Year 3", "Year 4", "Year 5"];
pub const SEMESTERS: [&str; 3] = ["Semester 1", "Semester 2", "Summer"];

pub fn grade_points(grade: &str) -> Option<f64> {
    GRADE_SCALE
        .iter()
        .find(|(g, _)| *g == grade)
        .map(|(_, p)| *p)
}

pub fn is_valid_grade(symbol: &str) -> bool {
    grade_points(symbol).is_some()
}

fn credits_in_range(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Parses a credits value; `None` unless it is a finite number strictly above zero.
pub fn parse_credits(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| credits_in_range(*v))
}

/// Predicate form of [`parse_credits`].
#[cfg(test)]
pub fn is_valid_credits(value: &str) -> bool {
    parse_credits(value).is_some()
}

pub fn is_valid_year(year: &str) -> bool {
    YEARS.contains(&year)
}

pub fn is_valid_semester(semester: &str) -> bool {
    SEMESTERS.contains(&semester)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDraft {
    pub course_name: String,
    pub grade: String,
    pub credits: f64,
}

pub fn validate_term(year: &str, semester: &str) -> GpaResult<()> {
    if !is_valid_year(year) {
        return Err(GpaError::Validation(format!("invalid year '{year}'")));
    }
    if !is_valid_semester(semester) {
        return Err(GpaError::Validation(format!(
            "invalid semester '{semester}'"
        )));
    }
    Ok(())
}

fn check_name_and_grade(course_name: &str, grade: &str) -> GpaResult<()> {
    if course_name.trim().is_empty() {
        return Err(GpaError::Validation("course name is required".to_string()));
    }
    if !is_valid_grade(grade) {
        return Err(GpaError::Validation(format!(
            "invalid grade '{grade}' for course '{course_name}'"
        )));
    }
    Ok(())
}

fn invalid_credits(raw: &str, course_name: &str) -> GpaError {
    GpaError::Validation(format!(
        "invalid credits value '{raw}' for course '{course_name}'"
    ))
}

/// Validates raw course input into a draft. Credits arrive as text so that the
/// editor, the IPC layer and spreadsheet cells all go through one parser.
pub fn validate_course(course_name: &str, grade: &str, credits: &str) -> GpaResult<CourseDraft> {
    let course_name = course_name.trim();
    let grade = grade.trim();
    check_name_and_grade(course_name, grade)?;
    let credits =
        parse_credits(credits).ok_or_else(|| invalid_credits(credits.trim(), course_name))?;
    Ok(CourseDraft {
        course_name: course_name.to_string(),
        grade: grade.to_string(),
        credits,
    })
}

/// Re-checks an already built draft against the same rules as [`validate_course`].
pub fn validate_draft(draft: &CourseDraft) -> GpaResult<()> {
    check_name_and_grade(&draft.course_name, &draft.grade)?;
    if !credits_in_range(draft.credits) {
        return Err(invalid_credits(&draft.credits.to_string(), &draft.course_name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_has_thirteen_grades_within_bounds() {
        assert_eq!(GRADE_SCALE.len(), 13);
        assert!(GRADE_SCALE.iter().all(|(_, p)| (0.0..=4.0).contains(p)));
        assert_eq!(grade_points("A+"), Some(4.0));
        assert_eq!(grade_points("A"), Some(4.0));
        assert_eq!(grade_points("D-"), Some(0.7));
    }

    #[test]
    fn grade_symbols_are_case_sensitive() {
        assert!(is_valid_grade("B+"));
        assert!(!is_valid_grade("b+"));
        assert!(!is_valid_grade("Z"));
        assert!(!is_valid_grade(""));
    }

    #[test]
    fn credits_must_be_positive_numbers() {
        assert!(!is_valid_credits("-1"));
        assert!(!is_valid_credits("abc"));
        assert!(!is_valid_credits("0"));
        assert!(!is_valid_credits("NaN"));
        assert!(!is_valid_credits("inf"));
        assert!(is_valid_credits("3.5"));
        assert!(is_valid_credits(" 2 "));
    }

    #[test]
    fn validate_course_reports_first_problem() {
        let d = validate_course(" Algebra ", "A-", "3").expect("valid");
        assert_eq!(d.course_name, "Algebra");
        assert_eq!(d.credits, 3.0);

        let e = validate_course("Algebra", "Z", "3").expect_err("bad grade");
        assert_eq!(e.code(), "validation_error");
        assert!(e.to_string().contains("'Z'"));

        let e = validate_course("Algebra", "A", "-2").expect_err("bad credits");
        assert!(e.to_string().contains("credits"));

        assert!(validate_course("  ", "A", "3").is_err());
    }

    #[test]
    fn built_drafts_follow_the_same_rules() {
        let ok = validate_course("Algebra", "B", "2.5").expect("valid");
        assert!(validate_draft(&ok).is_ok());

        let nameless = CourseDraft {
            course_name: " ".to_string(),
            ..ok.clone()
        };
        assert!(validate_draft(&nameless).unwrap_err().to_string().contains("name"));

        let bad_grade = CourseDraft {
            grade: "Z".to_string(),
            ..ok.clone()
        };
        assert_eq!(validate_draft(&bad_grade).unwrap_err().code(), "validation_error");

        for credits in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let d = CourseDraft { credits, ..ok.clone() };
            assert!(validate_draft(&d).is_err(), "credits {credits} accepted");
        }
    }

    #[test]
    fn term_labels_are_fixed() {
        assert!(validate_term("Year 5", "Summer").is_ok());
        assert!(validate_term("Year 6", "Summer").is_err());
        assert!(validate_term("Year 1", "Semester 3").is_err());
    }
}
