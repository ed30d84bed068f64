use crate::config::TranscriptConfig;
use crate::utils::error::{Result, TranscriptError};
use regex::Regex;
use std::path::Path;

/// 從 TOML 檔案載入配置
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TranscriptConfig> {
    let content = std::fs::read_to_string(&path).map_err(TranscriptError::IoError)?;
    from_toml_str(&content)
}

/// 從 TOML 字串解析配置；未列出的欄位使用預設值
pub fn from_toml_str(content: &str) -> Result<TranscriptConfig> {
    let processed_content = substitute_env_vars(content)?;

    toml::from_str(&processed_content).map_err(|e| TranscriptError::ConfigError {
        message: format!("TOML parsing error: {}", e),
    })
}

/// 替換環境變數 (例如 ${AIRTABLE_API_KEY})；未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TranscriptError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let toml_content = r#"
school_name = "Northfield High School"
address_lines = ["12 Elm Street", "Northfield, MN 55057"]
table_candidates = ["Grades 2024-25", "Grades Archive"]
cross_table_match = true

[fields]
letter_grade = "Final Letter"
"#;

        let config = from_toml_str(toml_content).unwrap();

        assert_eq!(config.school_name, "Northfield High School");
        assert_eq!(config.address_lines.len(), 2);
        assert!(config.cross_table_match);
        assert_eq!(config.fields.letter_grade, "Final Letter");
        assert_eq!(config.fields.student_name, "Student Name");
        assert_eq!(config.log_table, "Transcript Log");
        assert_eq!(config.api_url, "https://api.airtable.com/v0");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TRANSCRIPT_TEST_BASE", "appSubstituted");

        let config = from_toml_str(
            r#"
base_id = "${TRANSCRIPT_TEST_BASE}"
api_key = "${TRANSCRIPT_TEST_UNSET_VARIABLE}"
"#,
        )
        .unwrap();

        assert_eq!(config.base_id, "appSubstituted");
        assert_eq!(config.api_key, "${TRANSCRIPT_TEST_UNSET_VARIABLE}");

        std::env::remove_var("TRANSCRIPT_TEST_BASE");
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = from_toml_str("school_name = [").unwrap_err();
        assert!(matches!(err, TranscriptError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"log_table = \"Run Log\"\nrecord_ids = [\"rec1\"]\n")
            .unwrap();

        let config = from_file(temp_file.path()).unwrap();
        assert_eq!(config.log_table, "Run Log");
        assert_eq!(config.record_ids, vec!["rec1".to_string()]);
    }
}
