use crate::domain::model::CourseRow;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Dedupes, drops blank rows and sorts by course name then code.
///
/// Merged cross-table rows arrive in fetch order, so the output order depends
/// only on row content. Never returns an empty list: a placeholder row stands
/// in for "no courses".
pub fn reconcile(rows: Vec<CourseRow>) -> Vec<CourseRow> {
    let mut seen = HashSet::new();
    let mut kept: Vec<CourseRow> = rows
        .into_iter()
        .filter(|row| !row.is_blank())
        .filter(|row| seen.insert(row.clone()))
        .collect();

    kept.sort_by(compare_rows);

    if kept.is_empty() {
        kept.push(CourseRow::placeholder());
    }
    kept
}

/// Case-insensitive `(name, code)`, then the remaining fields as tie-breakers.
pub fn compare_rows(a: &CourseRow, b: &CourseRow) -> Ordering {
    a.course_name
        .to_lowercase()
        .cmp(&b.course_name.to_lowercase())
        .then_with(|| a.course_code.to_lowercase().cmp(&b.course_code.to_lowercase()))
        .then_with(|| a.semester.cmp(&b.semester))
        .then_with(|| a.course_name.cmp(&b.course_name))
        .then_with(|| a.course_code.cmp(&b.course_code))
        .then_with(|| a.teacher.cmp(&b.teacher))
        .then_with(|| a.letter_grade.cmp(&b.letter_grade))
        .then_with(|| a.percent.cmp(&b.percent))
        .then_with(|| a.quality_points.cmp(&b.quality_points))
}
