use anyhow::Result;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use tempfile::TempDir;
use transcript_etl::core::merger::equality_formula;
use transcript_etl::{TranscriptConfig, TranscriptEngine, TranscriptPipeline};

fn config(server: &MockServer, output_path: &str, cross_table_match: bool) -> TranscriptConfig {
    TranscriptConfig {
        school_name: "Northfield High School".to_string(),
        api_url: server.url("/v0"),
        content_url: server.url("/content"),
        upload_url: Some(server.url("/upload")),
        api_key: "key123".to_string(),
        base_id: "appTest".to_string(),
        table_candidates: vec!["Fall".to_string(), "Spring".to_string()],
        cross_table_match,
        log_table: "TranscriptLog".to_string(),
        attachment_field: "TranscriptPDF".to_string(),
        output_path: output_path.to_string(),
        record_ids: vec!["rec1".to_string(), "recMissing".to_string()],
        ..TranscriptConfig::default()
    }
}

fn jane_fall() -> serde_json::Value {
    serde_json::json!({
        "id": "rec1",
        "fields": {
            "Student Name": "Jane Doe",
            "Student ID": "S-1001",
            "Grade Level": "10",
            "School Year": "2024-2025",
            "Course Name": ["Art-A"],
            "Course Code": ["ART1"],
            "Teacher": ["Ms. Lee"],
            "Letter Grade": "B",
            "Percent": 0.85
        }
    })
}

fn jane_spring() -> serde_json::Value {
    serde_json::json!({
        "id": "rec2",
        "fields": {
            "Student Name": "Jane Doe",
            "Course Name": "Art-B",
            "Course Code": "ART1",
            "Letter Grade": "B",
            "Percent": 87
        }
    })
}

/// Source-table mocks shared by the end-to-end tests.
fn mock_sources(server: &MockServer) {
    let formula = equality_formula("Student Name", "Jane Doe");

    server.mock(|when, then| {
        when.method(GET).path("/v0/appTest/Fall/rec1");
        then.status(200).json_body(jane_fall());
    });
    for table in ["Fall", "Spring"] {
        server.mock(move |when, then| {
            when.method(GET)
                .path(format!("/v0/appTest/{}/recMissing", table));
            then.status(404)
                .json_body(serde_json::json!({"error": "NOT_FOUND"}));
        });
    }
    let fall_formula = formula.clone();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/v0/appTest/Fall")
            .query_param("filterByFormula", fall_formula.as_str());
        then.status(200)
            .json_body(serde_json::json!({ "records": [jane_fall()] }));
    });
    server.mock(move |when, then| {
        when.method(GET)
            .path("/v0/appTest/Spring")
            .query_param("filterByFormula", formula.as_str());
        then.status(200)
            .json_body(serde_json::json!({ "records": [jane_spring()] }));
    });
}

#[tokio::test]
async fn test_cross_table_run_falls_back_to_multipart_upload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_sources(&server);

    let log_create = server.mock(|when, then| {
        when.method(POST)
            .path("/v0/appTest/TranscriptLog")
            .body_contains("\"Courses\":\"Art-A\\nArt-B\"")
            .body_contains("\"Source Records\":\"rec1,rec2\"")
            .body_contains("\"Student ID\":\"S-1001\"");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog1", "fields": {}}));
    });
    let primary = server.mock(|when, then| {
        when.method(POST)
            .path("/content/appTest/recLog1/TranscriptPDF/uploadAttachment");
        then.status(500).body("upstream failure");
    });
    let fallback = server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(200).json_body(serde_json::json!({"id": "attPdf1"}));
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v0/appTest/TranscriptLog/recLog1")
            .body_contains("attPdf1");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog1", "fields": {}}));
    });

    let config = config(&server, &output_path, true);
    let engine = TranscriptEngine::new(TranscriptPipeline::from_config(&config)?);
    let summary = engine.run(&config.record_ids).await?;

    assert_eq!(summary.requested, 2);
    assert_eq!(summary.skipped, vec!["recMissing".to_string()]);
    assert_eq!(summary.outcomes.len(), 1);

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.student, "Jane Doe");
    assert_eq!(outcome.log_record_id.as_deref(), Some("recLog1"));
    assert!(outcome.attached);

    let pdf_path = temp_dir.path().join("Transcript_Jane_Doe_2024-2025.pdf");
    let pdf = std::fs::read(&pdf_path)?;
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert!(String::from_utf8_lossy(&pdf).contains("(Art-B"));

    log_create.assert_hits(1);
    primary.assert_hits(1);
    fallback.assert_hits(1);
    patch.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_audit_record_kept_when_both_transports_fail() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_sources(&server);

    let log_create = server.mock(|when, then| {
        when.method(POST).path("/v0/appTest/TranscriptLog");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog7", "fields": {}}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/content/appTest/recLog7/TranscriptPDF/uploadAttachment");
        then.status(503);
    });
    let fallback = server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(413).body("too large");
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH).path("/v0/appTest/TranscriptLog/recLog7");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog7", "fields": {}}));
    });

    let config = config(&server, &output_path, true);
    let engine = TranscriptEngine::new(TranscriptPipeline::from_config(&config)?);
    let summary = engine.run(&config.record_ids).await?;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.log_record_id.as_deref(), Some("recLog7"));
    assert!(!outcome.attached);
    log_create.assert_hits(1);
    fallback.assert_hits(1);
    patch.assert_hits(0);
    assert!(temp_dir
        .path()
        .join("Transcript_Jane_Doe_2024-2025.pdf")
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_scoped_mode_does_not_search_other_tables() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_sources(&server);

    let spring_search = server.mock(|when, then| {
        when.method(GET).path("/v0/appTest/Spring");
        then.status(200).json_body(serde_json::json!({"records": []}));
    });
    let log_create = server.mock(|when, then| {
        when.method(POST)
            .path("/v0/appTest/TranscriptLog")
            .body_contains("\"Courses\":\"Art-A\"")
            .body_contains("\"Source Records\":\"rec1\"");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog2", "fields": {}}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/content/appTest/recLog2/TranscriptPDF/uploadAttachment");
        then.status(200)
            .json_body(serde_json::json!({"id": "recLog2", "fields": {}}));
    });

    let mut config = config(&server, &output_path, false);
    config.record_ids = vec!["rec1".to_string()];
    let engine = TranscriptEngine::new(TranscriptPipeline::from_config(&config)?);
    let summary = engine.run(&config.record_ids).await?;

    assert!(summary.skipped.is_empty());
    assert!(summary.outcomes[0].attached);
    log_create.assert_hits(1);
    spring_search.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_unresolvable_identifiers_produce_no_artifacts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    let server = MockServer::start();
    mock_sources(&server);

    let mut config = config(&server, &output_path, false);
    config.record_ids = vec!["recMissing".to_string()];
    let engine = TranscriptEngine::new(TranscriptPipeline::from_config(&config)?);
    let summary = engine.run(&config.record_ids).await?;

    assert!(summary.outcomes.is_empty());
    assert_eq!(summary.skipped, vec!["recMissing".to_string()]);
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 0);
    Ok(())
}
