//! Per-session worker for remote advisor calls.
//!
//! Jobs are processed strictly one at a time in submission order, so replies
//! come back in the order the learner asked. The session loop never awaits a
//! model call itself; it only receives finished replies. Jobs whose attempt
//! was superseded before they started are dropped without a model call.

use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use t2dm_sim_core::{GatewayError, advisor::RemoteAdvisor};
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
};
use tracing::{Instrument, debug, info};

/// A remote question tagged with the attempt it was asked under.
#[derive(Debug, Clone)]
pub struct AdvisorJob {
    pub generation: u64,
    pub question: String,
    pub context: Value,
}

#[derive(Debug)]
pub struct AdvisorReply {
    pub generation: u64,
    pub result: Result<String, GatewayError>,
}

/// Handle to a running worker. Dropping it stops the worker.
pub struct AdvisorQueue {
    jobs: mpsc::UnboundedSender<AdvisorJob>,
    generation: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl AdvisorQueue {
    /// Spawns a worker for a session currently at `generation` and returns
    /// its queue and the stream of replies.
    pub fn spawn(
        advisor: Arc<RemoteAdvisor>,
        generation: u64,
    ) -> (Self, mpsc::UnboundedReceiver<AdvisorReply>) {
        let (jobs, mut job_rx) = mpsc::unbounded_channel::<AdvisorJob>();
        let (reply_tx, replies) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(generation));
        let current = generation.clone();

        let task = tokio::spawn(
            async move {
                while let Some(job) = job_rx.recv().await {
                    let current = current.load(Ordering::Acquire);
                    if job.generation != current {
                        info!(
                            job_generation = job.generation,
                            current_generation = current,
                            "Skipping superseded advisor job"
                        );
                        continue;
                    }
                    debug!(generation = job.generation, "Running remote advisor job");
                    let result = advisor.ask(&job.question, &job.context).await;
                    let reply = AdvisorReply {
                        generation: job.generation,
                        result,
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        (
            Self {
                jobs,
                generation,
                task,
            },
            replies,
        )
    }

    /// Records the session's current attempt; queued jobs from older
    /// attempts are skipped.
    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    /// Queues a job behind any still running. Fails only if the worker is gone.
    pub fn submit(&self, job: AdvisorJob) -> Result<(), SendError<AdvisorJob>> {
        self.jobs.send(job)
    }
}

impl Drop for AdvisorQueue {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use t2dm_sim_core::{
        TransportError,
        advisor::{GenerativeClient, gemini::GenerateContentRequest},
    };

    /// Echoes the question back, taking longer for questions containing "slow".
    struct EchoClient;

    #[async_trait]
    impl GenerativeClient for EchoClient {
        async fn generate_content(
            &self,
            _api_key: &str,
            _model: &str,
            request: &GenerateContentRequest,
        ) -> Result<Value, TransportError> {
            let prompt = request.contents[0].parts[0].text.clone();
            let question = prompt
                .lines()
                .nth(1)
                .unwrap_or_default()
                .to_string();
            if question.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(json!({"candidates": [{"content": {"parts": [{"text": question}]}}]}))
        }
    }

    fn job(generation: u64, question: &str) -> AdvisorJob {
        AdvisorJob {
            generation,
            question: question.to_string(),
            context: json!({}),
        }
    }

    #[tokio::test]
    async fn test_replies_arrive_in_request_order() {
        let advisor = Arc::new(RemoteAdvisor::new(Arc::new(EchoClient), Some("key".into()), None));
        let (queue, mut replies) = AdvisorQueue::spawn(advisor, 1);

        queue.submit(job(1, "slow question")).unwrap();
        queue.submit(job(1, "quick question")).unwrap();
        queue.submit(job(2, "another slow one")).unwrap();

        let mut answers = Vec::new();
        for _ in 0..3 {
            let reply = replies.recv().await.unwrap();
            answers.push((reply.generation, reply.result.unwrap()));
        }
        assert_eq!(
            answers,
            vec![
                (1, "slow question".to_string()),
                (1, "quick question".to_string()),
                (2, "another slow one".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_superseded_jobs_are_skipped() {
        let advisor = Arc::new(RemoteAdvisor::new(Arc::new(EchoClient), Some("key".into()), None));
        let (queue, mut replies) = AdvisorQueue::spawn(advisor, 1);

        // The worker has not been polled yet, so both jobs are still queued.
        queue.submit(job(1, "stale question")).unwrap();
        queue.set_generation(2);
        queue.submit(job(2, "fresh question")).unwrap();

        let reply = replies.recv().await.unwrap();
        assert_eq!(reply.generation, 2);
        assert_eq!(reply.result.unwrap(), "fresh question");

        drop(queue);
        assert!(replies.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_gateway_errors_are_replies() {
        let advisor = Arc::new(RemoteAdvisor::new(Arc::new(EchoClient), None, None));
        let (queue, mut replies) = AdvisorQueue::spawn(advisor, 1);

        queue.submit(job(7, "anything")).unwrap();
        let reply = replies.recv().await.unwrap();
        assert_eq!(reply.generation, 7);
        assert_eq!(reply.result, Err(GatewayError::Configuration));
    }

    #[tokio::test]
    async fn test_dropping_queue_stops_worker() {
        let advisor = Arc::new(RemoteAdvisor::new(Arc::new(EchoClient), Some("key".into()), None));
        let (queue, mut replies) = AdvisorQueue::spawn(advisor, 1);
        drop(queue);
        assert!(replies.recv().await.is_none());
    }
}
