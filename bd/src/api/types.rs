//! Request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BatchId, IngestionId, IngestionSnapshot, Priority, Status};
use crate::config::DEFAULT_MAX_ID;
use crate::error::{Error, Result};

/// Body of `POST /ingest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl IngestRequest {
    /// Check the ids and priority and convert them for the store
    ///
    /// A missing priority means `MEDIUM`; a present one must be spelled exactly.
    pub fn validate(&self, max_id: u64) -> Result<(Vec<u64>, Priority)> {
        if self.ids.is_empty() {
            return Err(Error::InvalidInput("ids must be a non-empty array of integers".to_string()));
        }

        let ids = self
            .ids
            .iter()
            .map(|&id| {
                u64::try_from(id)
                    .ok()
                    .filter(|id| (1..=max_id).contains(id))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("All ids must be integers between 1 and {}", describe_max(max_id)))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let priority = match self.priority.as_deref() {
            None => Priority::default(),
            Some("HIGH") => Priority::High,
            Some("MEDIUM") => Priority::Medium,
            Some("LOW") => Priority::Low,
            Some(_) => return Err(Error::InvalidInput("priority must be HIGH, MEDIUM, or LOW".to_string())),
        };

        Ok((ids, priority))
    }
}

fn describe_max(max_id: u64) -> String {
    match max_id {
        DEFAULT_MAX_ID => "10^9+7".to_string(),
        other => other.to_string(),
    }
}

/// Body returned by `POST /ingest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingestion_id: IngestionId,
}

/// One batch within a status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    pub batch_id: BatchId,
    pub ids: Vec<u64>,
    pub status: Status,
}

/// Body returned by `GET /status/{ingestion_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ingestion_id: IngestionId,
    pub status: Status,
    pub batches: Vec<BatchStatusResponse>,
}

impl From<IngestionSnapshot> for StatusResponse {
    fn from(snapshot: IngestionSnapshot) -> Self {
        Self {
            ingestion_id: snapshot.ingestion_id,
            status: snapshot.status,
            batches: snapshot
                .batches
                .into_iter()
                .map(|b| BatchStatusResponse {
                    batch_id: b.batch_id,
                    ids: b.ids,
                    status: b.status,
                })
                .collect(),
        }
    }
}

/// Body returned by `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "queueSize")]
    pub queue_size: usize,
    pub processor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ids: Vec<i64>) -> IngestRequest {
        IngestRequest {
            ids,
            priority: Some("HIGH".to_string()),
        }
    }

    fn rejection(result: Result<(Vec<u64>, Priority)>) -> String {
        match result {
            Err(Error::InvalidInput(msg)) => msg,
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_range() {
        let (ids, priority) = request(vec![1, 1_000_000_007]).validate(DEFAULT_MAX_ID).unwrap();
        assert_eq!(ids, vec![1, 1_000_000_007]);
        assert_eq!(priority, Priority::High);
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert_eq!(
            rejection(request(vec![]).validate(10)),
            "ids must be a non-empty array of integers"
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(request(vec![0]).validate(10).is_err());
        assert!(request(vec![-5]).validate(10).is_err());
        assert_eq!(
            rejection(request(vec![11]).validate(10)),
            "All ids must be integers between 1 and 10"
        );
        assert_eq!(
            rejection(request(vec![1_000_000_008]).validate(DEFAULT_MAX_ID)),
            "All ids must be integers between 1 and 10^9+7"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_priority() {
        for bad in ["URGENT", "high", ""] {
            let req = IngestRequest {
                ids: vec![1],
                priority: Some(bad.to_string()),
            };
            assert_eq!(rejection(req.validate(10)), "priority must be HIGH, MEDIUM, or LOW");
        }
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let req: IngestRequest = serde_json::from_str(r#"{"ids": [1, 2]}"#).unwrap();
        let (_, priority) = req.validate(DEFAULT_MAX_ID).unwrap();
        assert_eq!(priority, Priority::Medium);
    }

    #[test]
    fn test_health_uses_queue_size_key() {
        let health = HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            queue_size: 4,
            processor: "running".to_string(),
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["queueSize"], 4);
    }
}
