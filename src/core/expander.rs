use crate::config::SourceFields;
use crate::core::classify::CourseClassifier;
use crate::core::normalize::{format_percent, list_of, scalar_of};
use crate::domain::model::{CourseRow, SourceRecord};

/// Turns source rows into one [`CourseRow`] per course.
pub struct CourseRowExpander<'a> {
    fields: &'a SourceFields,
    classifier: &'a dyn CourseClassifier,
}

impl<'a> CourseRowExpander<'a> {
    pub fn new(fields: &'a SourceFields, classifier: &'a dyn CourseClassifier) -> Self {
        Self { fields, classifier }
    }

    pub fn expand_all(&self, records: &[SourceRecord]) -> Vec<CourseRow> {
        records.iter().flat_map(|r| self.expand(r)).collect()
    }

    pub fn expand(&self, record: &SourceRecord) -> Vec<CourseRow> {
        let f = &record.fields;
        let names = primary_or_rollup(
            list_of(f, &self.fields.course_name),
            || list_of(f, &self.fields.course_name_rollup),
        );
        let codes = primary_or_rollup(
            list_of(f, &self.fields.course_code),
            || list_of(f, &self.fields.course_code_rollup),
        );
        let teachers = list_of(f, &self.fields.teacher);

        // 成績與百分比每列只讀一次，套用到該列所有課程
        let letter_grade = scalar_of(f, &self.fields.letter_grade, "");
        let percent = format_percent(f.get(&self.fields.percent));

        pair_courses(names, codes)
            .into_iter()
            .enumerate()
            .filter(|(_, (name, code))| !(name.is_empty() && code.is_empty()))
            .map(|(i, (course_name, course_code))| {
                let teacher = teacher_for(&teachers, i);
                let semester = self.classifier.semester(&course_name, &course_code);
                let quality_points = self.classifier.quality_points(&letter_grade, &course_name);
                CourseRow {
                    course_name,
                    course_code,
                    teacher,
                    letter_grade: letter_grade.clone(),
                    percent: percent.clone(),
                    semester,
                    quality_points,
                }
            })
            .collect()
    }
}

/// Rollup values are only consulted when the primary list is completely empty.
fn primary_or_rollup(primary: Vec<String>, rollup: impl FnOnce() -> Vec<String>) -> Vec<String> {
    if primary.is_empty() {
        rollup()
    } else {
        primary
    }
}

/// Zips names with codes.
///
/// A single-element side is broadcast to the other's length; otherwise both
/// are truncated to the shorter length, so trailing entries of the longer list
/// are dropped. An empty side therefore yields no courses.
pub fn pair_courses(names: Vec<String>, codes: Vec<String>) -> Vec<(String, String)> {
    let (names, codes) = match (names.len(), codes.len()) {
        (n, c) if n == c => (names, codes),
        (1, c) => (vec![names[0].clone(); c], codes),
        (n, 1) => (names, vec![codes[0].clone(); n]),
        _ => (names, codes),
    };
    names.into_iter().zip(codes).collect()
}

fn teacher_for(teachers: &[String], index: usize) -> String {
    teachers
        .get(index)
        .filter(|t| !t.is_empty())
        .or_else(|| teachers.iter().find(|t| !t.is_empty()))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::HeuristicClassifier;
    use crate::domain::model::SemesterFlag;
    use serde_json::{json, Value};

    fn record(fields: Value) -> SourceRecord {
        SourceRecord {
            id: "rec1".to_string(),
            table: "Grades".to_string(),
            fields: match fields {
                Value::Object(map) => map.into_iter().collect(),
                _ => Default::default(),
            },
        }
    }

    fn s(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_pair_courses_broadcast_and_truncate() {
        assert_eq!(
            pair_courses(s(&["Art"]), s(&["ART1", "ART2"])),
            vec![
                ("Art".to_string(), "ART1".to_string()),
                ("Art".to_string(), "ART2".to_string())
            ]
        );
        assert_eq!(pair_courses(s(&["A", "B", "C"]), s(&["1", "2"])).len(), 2);
        assert!(pair_courses(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_pair_courses_with_an_empty_side_yields_nothing() {
        assert!(pair_courses(s(&["Choir", "Band"]), Vec::new()).is_empty());
        assert!(pair_courses(Vec::new(), s(&["MUS1", "MUS2"])).is_empty());
        assert!(pair_courses(s(&["Choir"]), Vec::new()).is_empty());
    }

    #[test]
    fn test_expand_shares_grade_and_indexes_teachers() {
        let fields = SourceFields::default();
        let classifier = HeuristicClassifier;
        let expander = CourseRowExpander::new(&fields, &classifier);

        let rows = expander.expand(&record(json!({
            "Course Name": ["Art-A", "Art-B", "AP Biology"],
            "Course Code": "ART1, ART1, BIO9",
            "Teacher": ["Ms. Lee"],
            "Letter Grade": "B",
            "Percent": 0.86
        })));

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.letter_grade == "B" && r.percent == "86"));
        assert!(rows.iter().all(|r| r.teacher == "Ms. Lee"));
        assert_eq!(rows[0].semester, SemesterFlag::S1);
        assert_eq!(rows[1].semester, SemesterFlag::S2);
        assert_eq!(rows[2].semester, SemesterFlag::Unknown);
        assert_eq!(rows[0].quality_points, "3");
        assert_eq!(rows[2].quality_points, "4");
    }

    #[test]
    fn test_rollup_used_only_when_primary_empty() {
        let fields = SourceFields::default();
        let classifier = HeuristicClassifier;
        let expander = CourseRowExpander::new(&fields, &classifier);

        let rows = expander.expand(&record(json!({
            "Course Name": [],
            "Course Name (from Courses)": ["Geometry-A"],
            "Course Code": ["GEO1"],
            "Course Code (from Courses)": ["IGNORED1", "IGNORED2"],
            "Teacher": ["", "Mr. Ortiz"]
        })));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_name, "Geometry-A");
        assert_eq!(rows[0].course_code, "GEO1");
        assert_eq!(rows[0].teacher, "Mr. Ortiz");
        assert_eq!(rows[0].quality_points, "");
    }

    #[test]
    fn test_row_without_courses_yields_nothing() {
        let fields = SourceFields::default();
        let classifier = HeuristicClassifier;
        let expander = CourseRowExpander::new(&fields, &classifier);

        assert!(expander
            .expand(&record(json!({"Letter Grade": "A"})))
            .is_empty());
    }
}
