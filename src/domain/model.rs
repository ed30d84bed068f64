use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// One row fetched from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub table: String,
    pub fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentHeader {
    pub name: String,
    pub external_id: String,
    pub grade_level: String,
    pub school_year: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SemesterFlag {
    S1,
    S2,
    Unknown,
}

impl SemesterFlag {
    /// Unknown courses are printed with the first half-year.
    pub fn is_first_half(self) -> bool {
        !matches!(self, SemesterFlag::S2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SemesterFlag::S1 => "S1",
            SemesterFlag::S2 => "S2",
            SemesterFlag::Unknown => "",
        }
    }
}

impl fmt::Display for SemesterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseRow {
    pub course_name: String,
    pub course_code: String,
    pub teacher: String,
    pub letter_grade: String,
    pub percent: String,
    pub semester: SemesterFlag,
    pub quality_points: String,
}

impl CourseRow {
    pub const PLACEHOLDER_NAME: &'static str = "No courses on record";

    pub fn placeholder() -> Self {
        Self {
            course_name: Self::PLACEHOLDER_NAME.to_string(),
            course_code: String::new(),
            teacher: String::new(),
            letter_grade: String::new(),
            percent: String::new(),
            semester: SemesterFlag::Unknown,
            quality_points: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }

    /// Semester flag is derived, so it does not count as displayed content.
    pub fn is_blank(&self) -> bool {
        [
            &self.course_name,
            &self.course_code,
            &self.teacher,
            &self.letter_grade,
            &self.percent,
            &self.quality_points,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
    }

    /// Name used in the audit summary; falls back to the code.
    pub fn display_name(&self) -> &str {
        if self.course_name.trim().is_empty() {
            &self.course_code
        } else {
            &self.course_name
        }
    }
}

/// Everything the extract stage gathered for one student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSources {
    pub header: StudentHeader,
    pub records: Vec<SourceRecord>,
    pub source_record_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptBundle {
    pub header: StudentHeader,
    pub rows: Vec<CourseRow>,
    pub source_record_ids: BTreeSet<String>,
}

impl TranscriptBundle {
    pub fn first_half(&self) -> impl Iterator<Item = &CourseRow> {
        self.rows.iter().filter(|r| r.semester.is_first_half())
    }

    pub fn second_half(&self) -> impl Iterator<Item = &CourseRow> {
        self.rows.iter().filter(|r| !r.semester.is_first_half())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub student: String,
    pub artifact_path: String,
    pub log_record_id: Option<String>,
    pub attached: bool,
}

/// Output of the extract stage: per-student sources plus the identifiers that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub students: Vec<StudentSources>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub requested: usize,
    pub skipped: Vec<String>,
    pub outcomes: Vec<RunOutcome>,
}
