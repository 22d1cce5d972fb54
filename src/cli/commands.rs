//! Command handlers for the CLI
//!
//! Each handler applies its flags on top of the loaded configuration, builds
//! the store and orchestrator, and runs. Fatal errors are returned to `main`,
//! which maps them to an exit code.

use tracing::{info, warn};

use super::args::{DownloadArgs, ListArgs, SourceArgs};
use super::progress::{ProgressConfig, ProgressDisplay};
use crate::app::enumerator::read_explicit_list;
use crate::app::orchestrator::{orchestrator_for, run_sync, ObjectSource, RunRequest};
use crate::app::CancelToken;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Resolve the object source from flags and configuration
async fn object_source(source: &SourceArgs, config: &AppConfig) -> Result<ObjectSource> {
    match &source.explicit_list {
        Some(path) => {
            let identifiers = read_explicit_list(path).await?;
            info!(
                "Using {} identifiers from {}",
                identifiers.len(),
                path.display()
            );
            Ok(ObjectSource::Explicit(identifiers))
        }
        None => Ok(ObjectSource::Discover {
            root: config.discovery.remote_root.clone(),
        }),
    }
}

/// Handle the download command
pub async fn handle_download(args: DownloadArgs, mut config: AppConfig) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    args.apply_to(&mut config);
    config.validate()?;

    let request = RunRequest {
        credential: args.source.credential_input()?,
        source: object_source(&args.source, &config).await?,
    };

    let cancel = CancelToken::new();
    let signal_listener = cancel.cancel_on_signal();

    let mut progress = ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !args.no_progress,
        ..Default::default()
    });

    info!(
        "Syncing into {} with {} workers",
        config.discovery.local_dir.display(),
        config.fetch.worker_count
    );

    let result = run_sync(&request, &config, cancel.clone(), &mut progress).await;
    signal_listener.abort();
    let summary = result?;

    println!("{}", summary.render());

    if let Some(path) = &args.report {
        summary.write_json(path).await?;
    }

    if cancel.is_cancelled() {
        warn!("Run was cancelled; re-run the same command to fetch the remaining files");
    }

    if args.fail_on_error && summary.has_failures() {
        return Err(AppError::FailedDownloads {
            failed: summary.failure_count(),
            total: summary.total,
        });
    }

    Ok(())
}

/// Handle the list command
pub async fn handle_list(args: ListArgs, mut config: AppConfig) -> Result<()> {
    args.source.validate().map_err(AppError::generic)?;
    args.source.apply_to(&mut config);
    config.validate()?;

    let credential = args.source.credential_input()?;
    let source = object_source(&args.source, &config).await?;

    let orchestrator = orchestrator_for(&credential, &config, CancelToken::new())?;
    let objects = orchestrator.enumerate(&source).await?;

    for object in &objects {
        println!("{}", object);
    }

    info!("{} objects would be fetched", objects.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_object_source_defaults_to_discovery() {
        let config = AppConfig::default();
        let source = object_source(&SourceArgs::default(), &config).await.unwrap();
        assert_eq!(
            source,
            ObjectSource::Discover {
                root: "az://.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_object_source_reads_explicit_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ids.txt");
        std::fs::write(&path, "a.tif\nb.tif\n").unwrap();

        let args = SourceArgs {
            explicit_list: Some(path),
            ..Default::default()
        };
        let source = object_source(&args, &AppConfig::default()).await.unwrap();
        assert_eq!(
            source,
            ObjectSource::Explicit(vec!["a.tif".to_string(), "b.tif".to_string()])
        );
    }

    #[tokio::test]
    async fn test_download_rejects_invalid_flags_before_connecting() {
        let args = DownloadArgs {
            workers: Some(0),
            ..Default::default()
        };
        let result = handle_download(args, AppConfig::default()).await;
        assert!(matches!(result, Err(AppError::Generic { .. })));
    }

    #[tokio::test]
    async fn test_list_with_missing_explicit_list_fails() {
        let args = ListArgs {
            source: SourceArgs {
                credential: Some("https://account.blob.core.windows.net/data?sig=x".to_string()),
                explicit_list: Some(PathBuf::from("/nonexistent/ids.txt")),
                ..Default::default()
            },
        };
        let result = handle_list(args, AppConfig::default()).await;
        assert!(matches!(result, Err(AppError::Enumeration(_))));
    }
}
