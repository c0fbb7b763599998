//! CLI probe for a decision model.
//!
//! # Responsibility
//! - Verify `adg_core` wiring against one model directory.
//! - Print version, decision count and both validation results.
//!
//! Usage: `adg [MODEL_DIR]`; falls back to the configured default model.

use adg_core::{
    core_version, default_log_level, init_logging, DocumentConfig, FileDecisionRepository,
    FileModelRepository, ModelService, ModelServiceError,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = init_logging(default_log_level(), None) {
        eprintln!("adg: {err}");
    }

    let config = match DocumentConfig::load_active() {
        Ok(config) => config,
        Err(err) => {
            error!("event=config_load module=cli status=error reason={err}");
            DocumentConfig::default()
        }
    };

    let model = match std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.default_model_path())
    {
        Some(model) => model,
        None => {
            eprintln!("usage: adg <MODEL_DIR> (or set default_model in the config file)");
            return ExitCode::from(2);
        }
    };

    let service = ModelService::new(
        FileModelRepository::new(),
        FileDecisionRepository::new(config),
    );

    println!("adg_core version={}", core_version());
    match service.decisions().get_all(&model) {
        Ok(decisions) => println!("model={} decisions={}", model.display(), decisions.len()),
        Err(err) => {
            eprintln!("adg: {err}");
            return ExitCode::FAILURE;
        }
    }

    let mut healthy = true;
    match service.validate_consistency(&model) {
        Ok(report) => println!("metadata: ok ({} checked)", report.checked.len()),
        Err(err) => {
            healthy = false;
            println!("metadata: {err}");
            if let ModelServiceError::MetadataMismatch { issues } = &err {
                for issue in issues {
                    println!("  {issue}");
                }
            }
        }
    }
    match service.validate_content(&model) {
        Ok(report) => println!("content: ok ({} checked)", report.checked.len()),
        Err(err) => {
            healthy = false;
            println!("content: {err}");
            if let ModelServiceError::ContentInvalid { issues } = &err {
                for issue in issues {
                    println!("  {issue}");
                }
            }
        }
    }

    if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
