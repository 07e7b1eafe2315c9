use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-activation record produced by the gateway (§3).
///
/// Immutable after creation. Its lifetime runs from stream delivery to the
/// job's terminal status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique 64-bit id assigned by the gateway.
    pub key: i64,
    /// Matches the task type this job was activated for.
    #[serde(rename = "type")]
    pub job_type: String,
    pub process_instance_key: i64,
    pub bpmn_process_id: String,
    pub process_definition_version: i32,
    pub process_definition_key: i64,
    pub element_id: String,
    pub element_instance_key: i64,
    /// The worker's declared name, as sent in `ActivateJobsRequest.worker`.
    pub worker: String,
    /// Decreasing counter set by the gateway; not decremented by this crate.
    pub retries: i32,
    /// Epoch ms when the activation lease expires.
    pub deadline: i64,
    pub variables: serde_json::Value,
    pub custom_headers: HashMap<String, String>,
}

impl Job {
    /// Milliseconds remaining until the activation lease expires, relative to
    /// `now_ms` (epoch ms). Negative once the lease has already expired.
    pub fn remaining_lease_ms(&self, now_ms: i64) -> i64 {
        self.deadline - now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            key: 1,
            job_type: "add".to_string(),
            process_instance_key: 10,
            bpmn_process_id: "add-process".to_string(),
            process_definition_version: 1,
            process_definition_key: 100,
            element_id: "Task_1".to_string(),
            element_instance_key: 1000,
            worker: "test-worker".to_string(),
            retries: 3,
            deadline: 5_000,
            variables: serde_json::json!({"x": 2, "y": 3}),
            custom_headers: HashMap::new(),
        }
    }

    #[test]
    fn remaining_lease_is_deadline_minus_now() {
        let job = sample_job();
        assert_eq!(job.remaining_lease_ms(1_000), 4_000);
        assert_eq!(job.remaining_lease_ms(6_000), -1_000);
    }

    #[test]
    fn job_is_cloneable_and_immutable_in_shape() {
        let job = sample_job();
        let cloned = job.clone();
        assert_eq!(cloned.key, job.key);
        assert_eq!(cloned.variables, job.variables);
    }
}
