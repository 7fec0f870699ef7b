/// Background cron scheduler service
///
/// Runs active workflows that carry a `schedule` using tokio-cron-scheduler.
/// Jobs are hot-reloaded whenever a workflow is created, updated or deleted.

use crate::{
    runtime::engine::{ExecutionEngine, Trigger},
    workflow::{storage::WorkflowStorage, types::Workflow},
};
use anyhow::Result;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Hot-reload cron scheduler: one job per scheduled workflow
pub struct CronSchedulerService {
    scheduler: Arc<RwLock<JobScheduler>>,
    /// workflow id -> (job uuid, cron expression)
    jobs: Arc<RwLock<HashMap<String, (Uuid, String)>>>,
    workflows: WorkflowStorage,
    engine: Arc<ExecutionEngine>,
}

impl CronSchedulerService {
    pub async fn new(workflows: WorkflowStorage, engine: Arc<ExecutionEngine>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            workflows,
            engine,
        })
    }

    /// Register every scheduled workflow and start ticking
    pub async fn start(&self) -> Result<()> {
        tracing::info!("⏰ Starting cron scheduler service");

        let scheduled = self.workflows.list_scheduled().await?;
        let mut registered = 0;
        for workflow in &scheduled {
            // A bad expression disables that workflow's schedule, not the service
            match self.sync_workflow(workflow).await {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!(workflow_id = %workflow.id, "⚠️ Skipping schedule: {}", e),
            }
        }

        {
            let scheduler = self.scheduler.read().await;
            scheduler.start().await?;
        }

        tracing::info!("✅ Cron scheduler started with {} scheduled workflows", registered);
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        tracing::info!("⏹️ Stopping cron scheduler service");
        self.jobs.write().await.clear();
        let mut scheduler = self.scheduler.write().await;
        scheduler.shutdown().await?;
        Ok(())
    }

    /// Workflow ids that currently own a job
    pub async fn scheduled_workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bring the job for this workflow in line with its current definition.
    ///
    /// Inactive or unscheduled workflows lose their job; an unchanged schedule
    /// keeps the existing one.
    pub async fn sync_workflow(&self, workflow: &Workflow) -> Result<()> {
        let schedule = match (&workflow.schedule, workflow.is_active) {
            (Some(schedule), true) => schedule.clone(),
            _ => {
                self.remove_workflow(&workflow.id).await;
                return Ok(());
            }
        };

        // Held across check, swap and insert so concurrent syncs cannot leak a job
        let mut jobs = self.jobs.write().await;
        if let Some((_, current)) = jobs.get(&workflow.id) {
            if *current == schedule {
                return Ok(());
            }
        }

        let job = self.build_job(&workflow.id, &schedule)?;
        let scheduler = self.scheduler.read().await;
        if let Some((previous, _)) = jobs.remove(&workflow.id) {
            if let Err(e) = scheduler.remove(&previous).await {
                tracing::warn!(workflow_id = %workflow.id, "⚠️ Failed to remove cron job: {}", e);
            }
        }
        let job_uuid = scheduler.add(job).await?;
        jobs.insert(workflow.id.clone(), (job_uuid, schedule.clone()));

        tracing::info!(workflow_id = %workflow.id, schedule = %schedule, "🔥 Scheduled workflow");
        Ok(())
    }

    /// Drop the job of a workflow, if any
    pub async fn remove_workflow(&self, workflow_id: &str) {
        let Some((job_uuid, _)) = self.jobs.write().await.remove(workflow_id) else {
            return;
        };

        let scheduler = self.scheduler.read().await;
        if let Err(e) = scheduler.remove(&job_uuid).await {
            tracing::warn!(workflow_id = %workflow_id, "⚠️ Failed to remove cron job: {}", e);
        } else {
            tracing::debug!(workflow_id = %workflow_id, "🛑 Removed cron job");
        }
    }

    fn build_job(&self, workflow_id: &str, schedule: &str) -> Result<Job> {
        let workflow_id = workflow_id.to_string();
        let engine = Arc::clone(&self.engine);

        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let workflow_id = workflow_id.clone();
            let engine = Arc::clone(&engine);

            Box::pin(async move {
                tracing::debug!(workflow_id = %workflow_id, "🔔 Cron trigger fired");
                match engine.execute(&workflow_id, Trigger::scheduled()).await {
                    Ok(log) => {
                        tracing::info!(
                            workflow_id = %workflow_id,
                            execution_id = %log.id,
                            status = %log.status,
                            "✅ Scheduled execution finished"
                        );
                    }
                    Err(e) => {
                        tracing::error!(workflow_id = %workflow_id, "❌ Scheduled execution failed: {}", e);
                    }
                }
            })
        })
        .map_err(|e| anyhow::anyhow!("invalid cron schedule '{}': {}", schedule, e))?;

        Ok(job)
    }
}

/// Check a cron expression without scheduling anything
pub fn validate_schedule(schedule: &str) -> Result<()> {
    Job::new_async(schedule, |_uuid, _lock| Box::pin(async {}))
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("invalid cron schedule '{}': {}", schedule, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorRegistry;
    use crate::database;
    use crate::execution::store::SqliteExecutionLogStore;
    use crate::integration::storage::IntegrationStorage;
    use crate::runtime::executor::NodeExecutor;
    use crate::workflow::types::{WorkflowDraft, WorkflowPatch};
    use std::time::Duration;

    async fn service() -> (CronSchedulerService, WorkflowStorage) {
        let pool = database::in_memory().await.unwrap();
        let workflows = WorkflowStorage::new(pool.clone());
        let engine = ExecutionEngine::new(
            workflows.clone(),
            IntegrationStorage::new(pool.clone()),
            Arc::new(SqliteExecutionLogStore::new(pool)),
            NodeExecutor::new(Arc::new(ConnectorRegistry::new()), Duration::from_secs(1)),
        );
        let service = CronSchedulerService::new(workflows.clone(), Arc::new(engine))
            .await
            .unwrap();
        (service, workflows)
    }

    fn scheduled(schedule: &str) -> Workflow {
        Workflow::from_draft(WorkflowDraft {
            name: "hourly".to_string(),
            description: String::new(),
            graph: Default::default(),
            is_active: true,
            schedule: Some(schedule.to_string()),
        })
    }

    #[tokio::test]
    async fn test_validate_schedule() {
        assert!(validate_schedule("0 */5 * * * *").is_ok());
        assert!(validate_schedule("every tuesday").is_err());
    }

    #[tokio::test]
    async fn test_sync_follows_activity_and_schedule() {
        let (service, _) = service().await;
        let mut workflow = scheduled("0 0 * * * *");

        service.sync_workflow(&workflow).await.unwrap();
        assert_eq!(service.scheduled_workflow_ids().await, vec![workflow.id.clone()]);

        workflow.apply(WorkflowPatch {
            is_active: Some(false),
            ..Default::default()
        });
        service.sync_workflow(&workflow).await.unwrap();
        assert!(service.scheduled_workflow_ids().await.is_empty());

        workflow.apply(WorkflowPatch {
            is_active: Some(true),
            schedule: Some(None),
            ..Default::default()
        });
        service.sync_workflow(&workflow).await.unwrap();
        assert!(service.scheduled_workflow_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_registers_stored_schedules_and_skips_bad_ones() {
        let (service, workflows) = service().await;
        let good = scheduled("0 0 * * * *");
        let bad = scheduled("not a cron");
        workflows.save_workflow(&good).await.unwrap();
        workflows.save_workflow(&bad).await.unwrap();

        service.start().await.unwrap();

        assert_eq!(service.scheduled_workflow_ids().await, vec![good.id.clone()]);
        service.remove_workflow(&good.id).await;
        assert!(service.scheduled_workflow_ids().await.is_empty());
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_syncs_leave_one_tracked_job() {
        let (service, _) = service().await;
        let hourly = scheduled("0 0 * * * *");
        let mut nightly = hourly.clone();
        nightly.schedule = Some("0 0 3 * * *".to_string());

        let (a, b, c) = tokio::join!(
            service.sync_workflow(&hourly),
            service.sync_workflow(&nightly),
            service.sync_workflow(&hourly)
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let jobs = service.jobs.read().await;
        assert_eq!(jobs.len(), 1);
        let (_, schedule) = &jobs[&hourly.id];
        assert!(schedule == "0 0 * * * *" || schedule == "0 0 3 * * *");
    }
}
