use clap::Parser;
use transcript_etl::utils::error::ErrorSeverity;
use transcript_etl::utils::{logger, validation::Validate};
use transcript_etl::{CliArgs, TranscriptConfig, TranscriptEngine, TranscriptPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting transcript-etl");

    // 載入並驗證配置；配置錯誤時不做任何處理直接結束
    let config = match TranscriptConfig::load(&args).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    if args.verbose {
        tracing::debug!(
            "Candidate tables: {:?}, cross-table match: {}",
            config.candidate_tables(),
            config.cross_table_match
        );
    }

    let pipeline = match TranscriptPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    let engine = TranscriptEngine::new(pipeline);

    match engine.run(&config.record_ids).await {
        Ok(summary) => {
            for outcome in &summary.outcomes {
                let log_state = match (&outcome.log_record_id, outcome.attached) {
                    (Some(id), true) => format!("logged as {} with PDF attached", id),
                    (Some(id), false) => format!("logged as {} without attachment", id),
                    (None, _) => "not logged".to_string(),
                };
                println!("✅ {} → {} ({})", outcome.student, outcome.artifact_path, log_state);
            }
            for skipped in &summary.skipped {
                println!("⚠️ Skipped {}", skipped);
            }
            tracing::info!(
                "✅ Run finished: {} requested, {} transcript(s), {} skipped",
                summary.requested,
                summary.outcomes.len(),
                summary.skipped.len()
            );
        }
        Err(e) => {
            tracing::error!(
                "❌ Transcript run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
