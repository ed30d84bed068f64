pub mod cli;
pub mod toml_config;

use crate::utils::error::{Result, TranscriptError};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "transcript-etl")]
#[command(about = "Build transcript PDFs from record store rows and log them back")]
pub struct CliArgs {
    /// Record identifier, or a comma-separated list of identifiers
    #[arg(env = "RECORD_ID")]
    pub record_id: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "TRANSCRIPT_CONFIG")]
    pub config: Option<String>,

    #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "AIRTABLE_BASE_ID")]
    pub base_id: Option<String>,

    /// Candidate source tables, comma-separated, tried in order
    #[arg(long, env = "TRANSCRIPT_TABLES")]
    pub tables: Option<String>,

    /// Search every candidate table for rows of the same student
    #[arg(long, env = "CROSS_TABLE_MATCH", value_parser = clap::builder::BoolishValueParser::new())]
    pub cross_table_match: Option<bool>,

    #[arg(long, env = "LOG_TABLE")]
    pub log_table: Option<String>,

    #[arg(long, env = "OUTPUT_DIR")]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

/// Field names read from source records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFields {
    pub student_name: String,
    pub student_id: String,
    pub grade_level: String,
    pub school_year: String,
    pub course_name: String,
    pub course_name_rollup: String,
    pub course_code: String,
    pub course_code_rollup: String,
    pub teacher: String,
    pub letter_grade: String,
    pub percent: String,
}

impl Default for SourceFields {
    fn default() -> Self {
        Self {
            student_name: "Student Name".to_string(),
            student_id: "Student ID".to_string(),
            grade_level: "Grade Level".to_string(),
            school_year: "School Year".to_string(),
            course_name: "Course Name".to_string(),
            course_name_rollup: "Course Name (from Courses)".to_string(),
            course_code: "Course Code".to_string(),
            course_code_rollup: "Course Code (from Courses)".to_string(),
            teacher: "Teacher".to_string(),
            letter_grade: "Letter Grade".to_string(),
            percent: "Percent".to_string(),
        }
    }
}

/// Field names written to the audit log table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFields {
    pub student_name: String,
    pub student_id: String,
    pub school_year: String,
    pub grade_level: String,
    pub run_at: String,
    pub courses: String,
    pub source_records: String,
}

impl Default for LogFields {
    fn default() -> Self {
        Self {
            student_name: "Student Name".to_string(),
            student_id: "Student ID".to_string(),
            school_year: "School Year".to_string(),
            grade_level: "Grade Level".to_string(),
            run_at: "Generated At".to_string(),
            courses: "Courses".to_string(),
            source_records: "Source Records".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub school_name: String,
    pub address_lines: Vec<String>,
    pub logo_path: Option<String>,
    pub signature_path: Option<String>,
    pub api_url: String,
    pub content_url: String,
    pub upload_url: Option<String>,
    pub api_key: String,
    pub base_id: String,
    pub table_candidates: Vec<String>,
    pub default_table: String,
    pub cross_table_match: bool,
    /// Use whole-word semester and honors matching instead of plain substrings.
    pub whole_word_matching: bool,
    pub log_table: String,
    pub attachment_field: String,
    pub output_path: String,
    pub timeout_seconds: u64,
    pub record_ids: Vec<String>,
    pub fields: SourceFields,
    pub log_fields: LogFields,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            school_name: "Academic Records Office".to_string(),
            address_lines: Vec::new(),
            logo_path: None,
            signature_path: None,
            api_url: "https://api.airtable.com/v0".to_string(),
            content_url: "https://content.airtable.com/v0".to_string(),
            upload_url: None,
            api_key: String::new(),
            base_id: String::new(),
            table_candidates: Vec::new(),
            default_table: "Grades".to_string(),
            cross_table_match: false,
            whole_word_matching: false,
            log_table: "Transcript Log".to_string(),
            attachment_field: "Transcript PDF".to_string(),
            output_path: "./output".to_string(),
            timeout_seconds: 30,
            record_ids: Vec::new(),
            fields: SourceFields::default(),
            log_fields: LogFields::default(),
        }
    }
}

impl TranscriptConfig {
    /// Config file first (if any), then command-line and environment overrides.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => toml_config::from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(ids) = &args.record_id {
            let ids = split_list(ids);
            if !ids.is_empty() {
                self.record_ids = ids;
            }
        }
        if let Some(key) = &args.api_key {
            self.api_key = key.clone();
        }
        if let Some(base) = &args.base_id {
            self.base_id = base.clone();
        }
        if let Some(tables) = &args.tables {
            self.table_candidates = split_list(tables);
        }
        if let Some(cross) = args.cross_table_match {
            self.cross_table_match = cross;
        }
        if let Some(table) = &args.log_table {
            self.log_table = table.clone();
        }
        if let Some(path) = &args.output_path {
            self.output_path = path.clone();
        }
    }

    /// Candidate tables in lookup order, never empty.
    pub fn candidate_tables(&self) -> Vec<String> {
        let tables: Vec<String> = self
            .table_candidates
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tables.is_empty() {
            vec![self.default_table.clone()]
        } else {
            tables
        }
    }

    pub fn upload_url(&self) -> String {
        match &self.upload_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "{}/{}/attachments",
                self.content_url.trim_end_matches('/'),
                self.base_id
            ),
        }
    }
}

impl Validate for TranscriptConfig {
    fn validate(&self) -> Result<()> {
        if self.record_ids.is_empty() {
            return Err(TranscriptError::MissingConfigError {
                field: "record_id".to_string(),
            });
        }
        validation::validate_required("api_key", &self.api_key)?;
        validation::validate_required("base_id", &self.base_id)?;
        let upload_url = self.upload_url();
        for (label, value) in [
            ("api_key", self.api_key.as_str()),
            ("base_id", self.base_id.as_str()),
            ("api_url", self.api_url.as_str()),
            ("content_url", self.content_url.as_str()),
            ("upload_url", upload_url.as_str()),
            ("log_table", self.log_table.as_str()),
            ("output_path", self.output_path.as_str()),
        ] {
            validation::validate_substituted(label, value)?;
        }
        validation::validate_url("api_url", &self.api_url)?;
        validation::validate_url("content_url", &self.content_url)?;
        validation::validate_url("upload_url", &upload_url)?;
        validation::validate_non_empty_string("log_table", &self.log_table)?;
        validation::validate_non_empty_string("attachment_field", &self.attachment_field)?;
        validation::validate_non_empty_string("fields.student_name", &self.fields.student_name)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;

        // 圖檔缺少不影響執行，只提示
        for (label, path) in [("logo_path", &self.logo_path), ("signature_path", &self.signature_path)] {
            if let Some(path) = path {
                if !Path::new(path).exists() {
                    tracing::warn!("⚠️ {} '{}' does not exist; it will be left out", label, path);
                }
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
