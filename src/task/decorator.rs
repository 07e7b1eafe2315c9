use async_trait::async_trait;

use crate::job::Job;

/// A `Job -> Job` transform run before or after the handler (§3, §4.4).
///
/// Decorators are best-effort: a decorator that returns `Err` is logged at
/// warning and the chain continues with the pre-decorator job (§4.4 step 2/6).
#[async_trait]
pub trait TaskDecorator: Send + Sync {
    async fn apply(&self, job: Job) -> anyhow::Result<Job>;
}

/// Run a decorator chain best-effort, in order, logging and swallowing any
/// decorator error (§7.3).
pub(crate) async fn run_chain(chain: &[std::sync::Arc<dyn TaskDecorator>], mut job: Job) -> Job {
    for decorator in chain {
        match decorator.apply(job.clone()).await {
            Ok(next) => job = next,
            Err(error) => {
                tracing::warn!(job_key = job.key, %error, "decorator failed, continuing with prior job state");
            }
        }
    }
    job
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct AddHeader(&'static str, &'static str);

    #[async_trait]
    impl TaskDecorator for AddHeader {
        async fn apply(&self, mut job: Job) -> anyhow::Result<Job> {
            job.custom_headers
                .insert(self.0.to_string(), self.1.to_string());
            Ok(job)
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl TaskDecorator for AlwaysFails {
        async fn apply(&self, _job: Job) -> anyhow::Result<Job> {
            anyhow::bail!("decorator exploded")
        }
    }

    fn sample_job() -> Job {
        Job {
            key: 1,
            job_type: "t".into(),
            process_instance_key: 1,
            bpmn_process_id: "p".into(),
            process_definition_version: 1,
            process_definition_key: 1,
            element_id: "e".into(),
            element_instance_key: 1,
            worker: "w".into(),
            retries: 1,
            deadline: 0,
            variables: serde_json::json!({}),
            custom_headers: Default::default(),
        }
    }

    #[tokio::test]
    async fn chain_runs_in_order() {
        let chain: Vec<Arc<dyn TaskDecorator>> =
            vec![Arc::new(AddHeader("a", "1")), Arc::new(AddHeader("b", "2"))];
        let job = run_chain(&chain, sample_job()).await;
        assert_eq!(job.custom_headers.get("a").unwrap(), "1");
        assert_eq!(job.custom_headers.get("b").unwrap(), "2");
    }

    #[tokio::test]
    async fn failing_decorator_does_not_abort_chain() {
        let chain: Vec<Arc<dyn TaskDecorator>> =
            vec![Arc::new(AlwaysFails), Arc::new(AddHeader("b", "2"))];
        let job = run_chain(&chain, sample_job()).await;
        assert_eq!(job.custom_headers.get("b").unwrap(), "2");
        assert!(!job.custom_headers.contains_key("a"));
    }
}
