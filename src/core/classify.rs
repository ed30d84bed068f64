//! Semester placement and quality points for a course.
//!
//! Both are naming heuristics. They sit behind [`CourseClassifier`] so a base
//! with different naming conventions can plug in its own rules.

use crate::core::normalize::format_decimal;
use crate::domain::model::SemesterFlag;
use regex::Regex;
use std::sync::OnceLock;

/// Weighted-scale ceiling. An honors/AP bonus never pushes a grade above this,
/// so an A in an honors course earns 4.5, not 5.
pub const MAX_QUALITY_POINTS: f64 = 4.5;

pub const HONORS_BONUS: f64 = 1.0;

pub trait CourseClassifier: Send + Sync {
    fn semester(&self, course_name: &str, course_code: &str) -> SemesterFlag;
    fn is_honors(&self, course_name: &str) -> bool;

    fn quality_points(&self, letter_grade: &str, course_name: &str) -> String {
        quality_points(letter_grade, self.is_honors(course_name))
    }
}

/// First half wins when a course carries both tokens.
fn placement((first_half, second_half): (bool, bool)) -> SemesterFlag {
    match (first_half, second_half) {
        (true, _) => SemesterFlag::S1,
        (false, true) => SemesterFlag::S2,
        (false, false) => SemesterFlag::Unknown,
    }
}

/// Default rules: `-a`/` a` tokens in `name + code` for the first half-year,
/// `-b`/` b` for the second, and a substring match on `honors` or `ap ` for
/// the weighted bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl CourseClassifier for HeuristicClassifier {
    fn semester(&self, course_name: &str, course_code: &str) -> SemesterFlag {
        placement(detect_semester(course_name, course_code))
    }

    fn is_honors(&self, course_name: &str) -> bool {
        is_honors(course_name)
    }
}

/// Stricter variant: name and code are tested as separate words, and
/// `honors`/`AP` must stand alone, so "Map Skills" is not weighted while
/// "Calculus AP" is.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeWordClassifier;

impl CourseClassifier for WholeWordClassifier {
    fn semester(&self, course_name: &str, course_code: &str) -> SemesterFlag {
        let text = format!("{} {}", course_name, course_code).to_lowercase();
        let text = text.trim();
        placement((has_half_token(text, 'a'), has_half_token(text, 'b')))
    }

    fn is_honors(&self, course_name: &str) -> bool {
        static HONORS: OnceLock<Option<Regex>> = OnceLock::new();
        HONORS
            .get_or_init(|| Regex::new(r"(?i)\b(honors|ap)\b").ok())
            .as_ref()
            .map(|re| re.is_match(course_name))
            .unwrap_or(false)
    }
}

fn has_half_token(text: &str, letter: char) -> bool {
    text.contains(&format!("-{}", letter))
        || text.contains(&format!(" {} ", letter))
        || text.ends_with(&format!(" {}", letter))
}

/// `(first_half, second_half)` over the lower-cased `name + code`.
pub fn detect_semester(course_name: &str, course_code: &str) -> (bool, bool) {
    let text = format!("{}{}", course_name, course_code).to_lowercase();
    (has_half_token(&text, 'a'), has_half_token(&text, 'b'))
}

pub fn is_honors(course_name: &str) -> bool {
    let name = course_name.to_lowercase();
    name.contains("honors") || name.contains("ap ")
}

fn base_points(letter: &str) -> Option<f64> {
    let points = match letter {
        "A+" | "A" => 4.0,
        "A-" => 3.7,
        "B+" => 3.3,
        "B" => 3.0,
        "B-" => 2.7,
        "C+" => 2.3,
        "C" => 2.0,
        "C-" => 1.7,
        "D+" => 1.3,
        "D" => 1.0,
        "D-" => 0.7,
        "F" => 0.0,
        _ => return None,
    };
    Some(points)
}

/// Quality points for a letter grade, `""` when the letter is not on the scale.
pub fn quality_points(letter_grade: &str, honors: bool) -> String {
    let letter = letter_grade.trim().to_uppercase();
    match base_points(&letter) {
        Some(base) => {
            let bonus = if honors && letter != "F" { HONORS_BONUS } else { 0.0 };
            format_decimal((base + bonus).min(MAX_QUALITY_POINTS))
        }
        None => String::new(),
    }
}
