use crate::adapters::airtable::AirtableClient;
use crate::adapters::attachment::{MultipartUploadTransport, UploadAttachmentTransport};
use crate::adapters::pdf::PdfRenderer;
use crate::config::cli::LocalStorage;
use crate::config::{SourceFields, TranscriptConfig};
use crate::core::classify::{CourseClassifier, HeuristicClassifier, WholeWordClassifier};
use crate::core::expander::CourseRowExpander;
use crate::core::merger::EnrollmentMerger;
use crate::core::normalize::scalar_of;
use crate::core::reconcile::reconcile;
use crate::core::resolver::TableResolver;
use crate::core::run_log::RunLogger;
use crate::domain::model::{
    Extraction, RunOutcome, SourceRecord, StudentHeader, StudentSources, TranscriptBundle,
};
use crate::domain::ports::{DocumentRenderer, Pipeline, RecordStore, Storage};
use crate::utils::error::{Result, TranscriptError};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

pub fn header_of(record: &SourceRecord, fields: &SourceFields) -> StudentHeader {
    StudentHeader {
        name: scalar_of(&record.fields, &fields.student_name, ""),
        external_id: scalar_of(&record.fields, &fields.student_id, ""),
        grade_level: scalar_of(&record.fields, &fields.grade_level, ""),
        school_year: scalar_of(&record.fields, &fields.school_year, ""),
    }
}

/// Keeps ASCII letters, digits, `.`, `_` and `-`; everything else becomes `_`.
pub fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn artifact_name(header: &StudentHeader) -> String {
    let name = header.name.trim();
    let year = header.school_year.trim();
    let stem = if year.is_empty() {
        format!("Transcript_{}", name)
    } else {
        format!("Transcript_{}_{}", name, year)
    };
    format!("{}.pdf", sanitize_filename(&stem))
}

pub struct TranscriptPipeline<R, D, S>
where
    R: RecordStore + ?Sized,
    D: DocumentRenderer,
    S: Storage,
{
    store: Arc<R>,
    renderer: D,
    storage: S,
    logger: RunLogger<R>,
    classifier: Box<dyn CourseClassifier>,
    candidates: Vec<String>,
    fields: SourceFields,
    cross_table: bool,
    output_path: String,
}

impl<R, D, S> TranscriptPipeline<R, D, S>
where
    R: RecordStore + ?Sized,
    D: DocumentRenderer,
    S: Storage,
{
    pub fn new(
        store: Arc<R>,
        renderer: D,
        storage: S,
        logger: RunLogger<R>,
        config: &TranscriptConfig,
    ) -> Self {
        let classifier: Box<dyn CourseClassifier> = if config.whole_word_matching {
            Box::new(WholeWordClassifier)
        } else {
            Box::new(HeuristicClassifier)
        };
        Self {
            store,
            renderer,
            storage,
            logger,
            classifier,
            candidates: config.candidate_tables(),
            fields: config.fields.clone(),
            cross_table: config.cross_table_match,
            output_path: config.output_path.clone(),
        }
    }

    /// Replaces the default naming heuristics for semester and honors detection.
    pub fn with_classifier(mut self, classifier: Box<dyn CourseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Resolves one identifier to its student header and merged rows.
    async fn collect(&self, record_id: &str) -> Result<(StudentHeader, Vec<SourceRecord>)> {
        let resolved = TableResolver::new(self.store.as_ref(), &self.candidates)
            .resolve(record_id)
            .await?;

        let header = header_of(&resolved, &self.fields);
        if header.name.is_empty() {
            return Err(TranscriptError::MissingStudentName {
                record_id: record_id.to_string(),
            });
        }

        let rows = EnrollmentMerger::new(
            self.store.as_ref(),
            &self.candidates,
            &self.fields.student_name,
            self.cross_table,
        )
        .merge(&header.name, &resolved)
        .await;

        tracing::info!(
            "🔎 {} → '{}' (table '{}', {} source row(s))",
            record_id,
            header.name,
            resolved.table,
            rows.len()
        );
        Ok((header, rows))
    }
}

impl TranscriptPipeline<AirtableClient, PdfRenderer, LocalStorage> {
    /// Production wiring: Airtable store, PDF renderer, local output directory,
    /// and the upload-attachment → multipart fallback chain.
    pub fn from_config(config: &TranscriptConfig) -> Result<Self> {
        let store = Arc::new(AirtableClient::from_config(config)?);
        let http = store.http_client().clone();

        let logger = RunLogger::new(
            store.clone(),
            config.log_table.clone(),
            config.attachment_field.clone(),
            config.log_fields.clone(),
        )
        .with_transport(Box::new(UploadAttachmentTransport::new(
            http.clone(),
            &config.content_url,
            &config.base_id,
            &config.api_key,
        )))
        .with_transport(Box::new(MultipartUploadTransport::new(
            http,
            &config.upload_url(),
            &config.api_key,
            store.clone(),
        )));

        Ok(Self::new(
            store,
            PdfRenderer::from_config(config),
            LocalStorage::new(config.output_path.clone()),
            logger,
            config,
        ))
    }
}

#[async_trait::async_trait]
impl<R, D, S> Pipeline for TranscriptPipeline<R, D, S>
where
    R: RecordStore + ?Sized,
    D: DocumentRenderer,
    S: Storage,
{
    async fn extract(&self, record_ids: &[String]) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record_id in record_ids {
            let (header, rows) = match self.collect(record_id).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping {}: {}", record_id, e);
                    extraction.skipped.push(record_id.clone());
                    continue;
                }
            };

            // 同一學生的多個識別碼合併到同一份成績單，表頭取第一筆
            let slot = match index.get(&header.name).copied() {
                Some(slot) => slot,
                None => {
                    index.insert(header.name.clone(), extraction.students.len());
                    extraction.students.push(StudentSources {
                        header,
                        records: Vec::new(),
                        source_record_ids: BTreeSet::new(),
                    });
                    extraction.students.len() - 1
                }
            };

            let student = &mut extraction.students[slot];
            for row in rows {
                if student.source_record_ids.insert(row.id.clone()) {
                    student.records.push(row);
                }
            }
        }

        Ok(extraction)
    }

    async fn transform(&self, students: Vec<StudentSources>) -> Result<Vec<TranscriptBundle>> {
        let expander = CourseRowExpander::new(&self.fields, self.classifier.as_ref());

        let bundles = students
            .into_iter()
            .map(|student| {
                let rows = reconcile(expander.expand_all(&student.records));
                tracing::debug!(
                    "'{}': {} course row(s) after reconciliation",
                    student.header.name,
                    rows.len()
                );
                TranscriptBundle {
                    header: student.header,
                    rows,
                    source_record_ids: student.source_record_ids,
                }
            })
            .collect();

        Ok(bundles)
    }

    async fn load(&self, bundles: Vec<TranscriptBundle>) -> Result<Vec<RunOutcome>> {
        let run_at = Utc::now();
        let mut outcomes = Vec::with_capacity(bundles.len());

        for bundle in bundles {
            let filename = artifact_name(&bundle.header);
            let document = self.renderer.render(&bundle)?;
            self.storage.write_file(&filename, &document).await?;
            let artifact_path = Path::new(&self.output_path)
                .join(&filename)
                .display()
                .to_string();
            tracing::info!("📄 Wrote {}", artifact_path);

            let content = self.storage.read_file(&filename).await?;
            let (log_record_id, attached) =
                match self.logger.log_run(&bundle, run_at, &filename, content).await {
                    Ok(result) => (Some(result.record_id), result.attached_via.is_some()),
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Could not write audit record for '{}': {}",
                            bundle.header.name,
                            e
                        );
                        (None, false)
                    }
                };

            outcomes.push(RunOutcome {
                student: bundle.header.name,
                artifact_path,
                log_record_id,
                attached,
            });
        }

        Ok(outcomes)
    }
}
