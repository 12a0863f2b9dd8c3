//! Job processing service for background tasks.
//!
//! A bounded in-process queue for the fire-and-forget side effects of a
//! mutation: per-device push delivery and the proximity-alert fan-out.
//! Mutations enqueue and return; workers drain the queue with bounded
//! concurrency so failures are observable in logs without ever failing the
//! originating write.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::services::notification::NotificationService;
use crate::services::push::PushMessage;
use crate::services::threshold::ThresholdMonitor;

/// Maximum number of concurrent job workers.
const MAX_WORKERS: usize = 4;

/// Channel buffer size for jobs.
const JOB_BUFFER_SIZE: usize = 1000;

/// Job types that can be processed.
#[derive(Debug, Clone)]
pub enum Job {
    /// Deliver a push message to all of a user's devices.
    PushNotification {
        user_id: String,
        message: PushMessage,
    },
    /// Fan a proximity alert out for an event that crossed the attendance
    /// threshold.
    ProximityAlert { event_id: String },
}

/// Job sender for enqueueing jobs.
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueue a job for processing.
    pub async fn enqueue(&self, job: Job) -> Result<(), &'static str> {
        self.sender.send(job).await.map_err(|_| "Job queue is full")
    }

    /// Enqueue a push notification job.
    pub async fn push_notification(
        &self,
        user_id: String,
        message: PushMessage,
    ) -> Result<(), &'static str> {
        self.enqueue(Job::PushNotification { user_id, message }).await
    }

    /// Enqueue a proximity alert job.
    pub async fn proximity_alert(&self, event_id: String) -> Result<(), &'static str> {
        self.enqueue(Job::ProximityAlert { event_id }).await
    }
}

/// Job worker context containing services needed for job processing.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub notifications: Option<NotificationService>,
    pub threshold: Option<ThresholdMonitor>,
}

/// Job processing service.
pub struct JobService {
    sender: mpsc::Sender<Job>,
    receiver: Option<mpsc::Receiver<Job>>,
}

impl JobService {
    /// Create a new job service.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(JOB_BUFFER_SIZE);
        Self {
            sender,
            receiver: Some(receiver),
        }
    }

    /// Get a job sender for enqueueing jobs.
    #[must_use]
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
        }
    }

    /// Start the job processor with the given context.
    /// This consumes the receiver and spawns worker tasks.
    pub fn start(mut self, context: JobWorkerContext) {
        let Some(receiver) = self.receiver.take() else {
            error!("Job service already started");
            return;
        };
        let context = Arc::new(context);

        tokio::spawn(async move {
            info!("Job worker starting with {} workers", MAX_WORKERS);
            run_job_processor(receiver, context).await;
            info!("Job worker stopped");
        });
    }
}

impl Default for JobService {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the job processor.
async fn run_job_processor(mut receiver: mpsc::Receiver<Job>, context: Arc<JobWorkerContext>) {
    // Use a semaphore to limit concurrent workers
    let semaphore = Arc::new(tokio::sync::Semaphore::new(MAX_WORKERS));

    while let Some(job) = receiver.recv().await {
        let permit = semaphore.clone().acquire_owned().await;
        let ctx = context.clone();

        tokio::spawn(async move {
            let _permit = permit;
            process_job(job, &ctx).await;
        });
    }
}

/// Process a single job.
async fn process_job(job: Job, context: &JobWorkerContext) {
    match job {
        Job::PushNotification { user_id, message } => {
            process_push_notification(context, &user_id, &message).await;
        }
        Job::ProximityAlert { event_id } => {
            process_proximity_alert(context, &event_id).await;
        }
    }
}

/// Process a push notification job.
async fn process_push_notification(
    context: &JobWorkerContext,
    user_id: &str,
    message: &PushMessage,
) {
    let Some(ref notifications) = context.notifications else {
        debug!("Notification service not available, skipping push delivery");
        return;
    };

    let count = notifications.push_to_devices(user_id, message).await;
    debug!(
        user_id = %user_id,
        success_count = %count,
        "Push notifications sent"
    );
}

/// Process a proximity alert job.
async fn process_proximity_alert(context: &JobWorkerContext, event_id: &str) {
    let Some(ref threshold) = context.threshold else {
        debug!("Threshold monitor not available, skipping proximity alert");
        return;
    };

    match threshold.fan_out(event_id).await {
        Ok(()) => {
            debug!(event_id = %event_id, "Proximity alert fan-out completed");
        }
        Err(e) => {
            error!(
                event_id = %event_id,
                error = %e,
                "Proximity alert fan-out failed"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_without_services_is_safe() {
        let service = JobService::new();
        let sender = service.sender();

        service.start(JobWorkerContext {
            notifications: None,
            threshold: None,
        });

        let result = sender.proximity_alert("e1".to_string()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn push_job_round_trips_through_sender() {
        let service = JobService::new();
        let sender = service.sender();

        service.start(JobWorkerContext {
            notifications: None,
            threshold: None,
        });

        let message = PushMessage {
            category: "community".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            data: None,
        };
        let result = sender.push_notification("u1".to_string(), message).await;
        assert!(result.is_ok());
    }
}
