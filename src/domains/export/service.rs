use async_trait::async_trait;
use futures::future::join_all;
use log::{error, info};
use std::sync::Arc;
use tokio::task;

use crate::config::{AppConfig, CopyPolicy, ExportOptions};
use crate::domains::binding::{BindingRecord, BindingRepository};
use crate::errors::{DbError, DomainError, ServiceError, ServiceResult};
use crate::storage::ObjectStore;

use super::archive::build_archive;
use super::category::{category_key, index_categories};
use super::copier::copy_all;
use super::layout::plan_layout;
use super::preview::{preview_tree, TreeNode};
use super::repository::ExportJobRepository;
use super::transcript::{accumulate, write_blocks};
use super::types::{ExportJob, ExportReport, ExportStatus, FULL_EXPORT_JOB_ID};

#[async_trait]
pub trait ExportService: Send + Sync {
    /// Dry-run: compute the directory tree a run would materialize, without
    /// touching storage.
    async fn preview(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<TreeNode>;

    /// Run the full pipeline synchronously, tracked as a job so a concurrent
    /// background run of the same scope conflicts instead of racing.
    async fn run(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<ExportReport>;

    /// Schedule a background export. Returns immediately with the `Pending`
    /// job; a duplicate live job makes this fail with `AlreadyScheduled`.
    async fn schedule(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<ExportJob>;

    async fn job_status(&self, id: &str) -> ServiceResult<ExportJob>;

    /// Remove one terminal job record. Live jobs cannot be removed.
    async fn remove_job(&self, id: &str) -> ServiceResult<()>;

    /// Current archive content, for the download endpoint.
    async fn archive_bytes(&self) -> ServiceResult<Vec<u8>>;
}

pub struct ExportServiceImpl {
    bindings: Arc<dyn BindingRepository>,
    jobs: Arc<dyn ExportJobRepository>,
    store: Arc<dyn ObjectStore>,
    output_prefix: String,
    archive_key: String,
    copy_concurrency: usize,
    copy_policy: CopyPolicy,
}

impl ExportServiceImpl {
    pub fn new(
        bindings: Arc<dyn BindingRepository>,
        jobs: Arc<dyn ExportJobRepository>,
        store: Arc<dyn ObjectStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            bindings,
            jobs,
            store,
            output_prefix: config.output_prefix.clone(),
            archive_key: config.archive_key.clone(),
            copy_concurrency: config.effective_copy_concurrency(),
            copy_policy: config.copy_policy,
        }
    }

    /// Job id for one export scope: the normalized category key, or "all".
    fn job_id(options: &ExportOptions, category: Option<&str>) -> String {
        match category {
            Some(name) => category_key(name, options),
            None => FULL_EXPORT_JOB_ID.to_string(),
        }
    }

    fn map_schedule_err(err: DomainError, id: &str) -> ServiceError {
        match err {
            DomainError::Database(DbError::Conflict(_)) => {
                ServiceError::AlreadyScheduled(id.to_string())
            }
            other => ServiceError::Domain(other),
        }
    }
}

#[async_trait]
impl ExportService for ExportServiceImpl {
    async fn preview(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<TreeNode> {
        options.validate()?;
        let bindings = self
            .bindings
            .list_for_export(options.omit_empty, category)
            .await?;
        let plan = plan_layout(&bindings, options, &self.output_prefix);
        Ok(preview_tree(&plan, &self.output_prefix))
    }

    async fn run(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<ExportReport> {
        options.validate()?;
        let id = Self::job_id(options, category);
        self.jobs
            .schedule(&id)
            .await
            .map_err(|e| Self::map_schedule_err(e, &id))?;
        self.jobs
            .set_status(&id, ExportStatus::InProgress, None)
            .await?;

        let result = run_pipeline(
            &self.bindings,
            &self.store,
            options,
            category,
            &self.output_prefix,
            &self.archive_key,
            self.copy_concurrency,
            self.copy_policy,
        )
        .await;

        match &result {
            Ok(_) => {
                self.jobs
                    .set_status(&id, ExportStatus::Completed, None)
                    .await?
            }
            // The pipeline error is the one the caller needs; a failed
            // bookkeeping write must not mask it.
            Err(e) => {
                if let Err(status_err) = self
                    .jobs
                    .set_status(&id, ExportStatus::Failed, Some(e.to_string()))
                    .await
                {
                    error!("export job {}: failed to record failure: {}", id, status_err);
                }
            }
        }
        result
    }

    async fn schedule(
        &self,
        options: &ExportOptions,
        category: Option<&str>,
    ) -> ServiceResult<ExportJob> {
        options.validate()?;
        let id = Self::job_id(options, category);
        let job = self
            .jobs
            .schedule(&id)
            .await
            .map_err(|e| Self::map_schedule_err(e, &id))?;

        // The background task owns its own Arc handles; nothing
        // request-scoped crosses into it.
        let bindings = self.bindings.clone();
        let jobs = self.jobs.clone();
        let store = self.store.clone();
        let options = options.clone();
        let category = category.map(str::to_string);
        let output_prefix = self.output_prefix.clone();
        let archive_key = self.archive_key.clone();
        let concurrency = self.copy_concurrency;
        let policy = self.copy_policy;
        let job_id = id.clone();

        task::spawn(async move {
            if let Err(e) = jobs
                .set_status(&job_id, ExportStatus::InProgress, None)
                .await
            {
                error!("export job {}: failed to mark in progress: {}", job_id, e);
                return;
            }

            let result = run_pipeline(
                &bindings,
                &store,
                &options,
                category.as_deref(),
                &output_prefix,
                &archive_key,
                concurrency,
                policy,
            )
            .await;

            let update = match result {
                Ok(report) => {
                    info!(
                        "export job {} completed: {} binding(s), {} byte archive",
                        job_id, report.bindings_exported, report.archive_bytes
                    );
                    jobs.set_status(&job_id, ExportStatus::Completed, None).await
                }
                Err(e) => {
                    error!("export job {} failed: {}", job_id, e);
                    jobs.set_status(&job_id, ExportStatus::Failed, Some(e.to_string()))
                        .await
                }
            };
            if let Err(e) = update {
                error!("export job {}: failed to record final status: {}", job_id, e);
            }
        });

        Ok(job)
    }

    async fn job_status(&self, id: &str) -> ServiceResult<ExportJob> {
        Ok(self.jobs.find_by_id(id).await?)
    }

    async fn remove_job(&self, id: &str) -> ServiceResult<()> {
        Ok(self.jobs.remove(id).await?)
    }

    async fn archive_bytes(&self) -> ServiceResult<Vec<u8>> {
        Ok(self.store.get_object(&self.archive_key).await?)
    }
}

/// One finalize-and-package run: project bindings, normalize categories,
/// plan the layout, clear the output prefix, copy audio and write transcripts
/// concurrently, then rebuild the archive.
#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    bindings: &Arc<dyn BindingRepository>,
    store: &Arc<dyn ObjectStore>,
    options: &ExportOptions,
    category: Option<&str>,
    output_prefix: &str,
    archive_key: &str,
    copy_concurrency: usize,
    copy_policy: CopyPolicy,
) -> ServiceResult<ExportReport> {
    let records: Vec<BindingRecord> = bindings
        .list_for_export(options.omit_empty, category)
        .await?;
    info!(
        "starting export of {} binding(s) under '{}'",
        records.len(),
        output_prefix
    );

    let indexed = index_categories(&records, options);
    let plan = plan_layout(&records, options, output_prefix);

    // Previous run's output is fully replaced.
    clear_prefix(store, output_prefix).await?;

    let copies = copy_all(store, &plan, copy_concurrency, copy_policy);
    if options.export_transcript {
        let blocks = accumulate(&records, &plan, options, &indexed);
        let transcripts = write_blocks(store, &blocks);
        let (copied, written) = tokio::join!(copies, transcripts);
        copied?;
        written?;
    } else {
        copies.await?;
    }

    let archive_bytes = build_archive(store, output_prefix, archive_key).await?;

    Ok(ExportReport {
        bindings_exported: records.len(),
        categories: indexed.len(),
        archive_key: archive_key.to_string(),
        archive_bytes,
    })
}

async fn clear_prefix(store: &Arc<dyn ObjectStore>, prefix: &str) -> ServiceResult<()> {
    let keys = store.list_objects(prefix).await?;
    let deletions = keys.iter().map(|key| store.delete_object(key));
    for result in join_all(deletions).await {
        result?;
    }
    Ok(())
}
