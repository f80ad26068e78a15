//! Read-request lifecycle.

use serde::{Deserialize, Serialize};

use crate::disk::DiskId;
use crate::object::ObjectId;

pub type RequestId = u32;

/// Sentinel priority for a request currently being served: higher than any
/// computed value, so it never loses a claimed disk's attention.
pub const READING_PRIORITY: f64 = 1e7;
/// Sentinel priority for a completed request: lowest possible, so ghost
/// entries left in the heap never outrank live work.
pub const COMPLETED_PRIORITY: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Reading,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub object_id: ObjectId,
    pub start_timestamp: u64,
    pub status: RequestStatus,
    pub priority: f64,
    pub responsible_disk_id: Option<DiskId>,
}

impl Request {
    pub fn new(id: RequestId, object_id: ObjectId, start_timestamp: u64) -> Self {
        Request {
            id,
            object_id,
            start_timestamp,
            status: RequestStatus::Pending,
            priority: 0.0,
            responsible_disk_id: None,
        }
    }

    pub fn claim(&mut self, disk_id: DiskId) {
        self.status = RequestStatus::Reading;
        self.responsible_disk_id = Some(disk_id);
        self.priority = READING_PRIORITY;
    }

    pub fn complete(&mut self) {
        self.status = RequestStatus::Completed;
        self.priority = COMPLETED_PRIORITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_set_sentinel_priorities() {
        let mut r = Request::new(1, 10, 5);
        assert_eq!(r.status, RequestStatus::Pending);
        r.claim(3);
        assert_eq!(r.status, RequestStatus::Reading);
        assert_eq!(r.priority, READING_PRIORITY);
        assert_eq!(r.responsible_disk_id, Some(3));
        r.complete();
        assert_eq!(r.status, RequestStatus::Completed);
        assert_eq!(r.priority, COMPLETED_PRIORITY);
    }
}
