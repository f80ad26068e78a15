//! Head scheduler: per-slice, per-disk action planner.
//!
//! Two phases run every slice: task assignment (claim idle disks for the
//! highest-priority pending reads) then execution (advance each disk's head
//! under its token budget, emitting the action grammar of the protocol).

use std::collections::{HashMap, VecDeque};

use crate::disk::{Disk, DiskId};
use crate::object::{Object, ObjectId};
use crate::priority::PriorityQueue;
use crate::request::{Request, RequestId, RequestStatus};

/// A disk's single in-flight read: the cells still owed to `request_id`, in
/// the order they must be read.
#[derive(Debug, Clone)]
struct Task {
    request_id: RequestId,
    #[allow(dead_code)]
    object_id: ObjectId,
    queue: VecDeque<u32>,
}

/// Owns the single-slot task assignment for every disk and the execution
/// state machine that drives head motion.
#[derive(Debug)]
pub struct HeadScheduler {
    tasks: Vec<Option<Task>>,
}

impl HeadScheduler {
    pub fn new(num_disks: usize) -> Self {
        HeadScheduler { tasks: vec![None; num_disks] }
    }

    pub fn is_idle(&self, disk_id: DiskId) -> bool {
        self.tasks[disk_id as usize].is_none()
    }

    /// Claim idle disks for pending requests, highest priority first.
    /// A request whose disks are all busy is stashed and requeued
    /// unchanged once the pass completes, per the no-rebalancing design.
    pub fn assign_tasks(
        &mut self,
        heap: &mut PriorityQueue,
        requests: &mut HashMap<RequestId, Request>,
        objects: &HashMap<ObjectId, Object>,
    ) {
        let mut holdover: Vec<(RequestId, f64)> = Vec::new();

        while !heap.is_empty() && self.tasks.iter().any(|t| t.is_none()) {
            let Some(req_id) = heap.pop() else { break };

            let Some(request) = requests.get(&req_id) else {
                continue; // ghost entry: object/request no longer live
            };
            if request.status != RequestStatus::Pending {
                continue;
            }
            let priority = request.priority;
            let object_id = request.object_id;

            let Some(object) = objects.get(&object_id) else {
                continue;
            };

            let mut claimed_disk = None;
            for replica in &object.replicas {
                if self.tasks[replica.disk_id as usize].is_none() {
                    self.tasks[replica.disk_id as usize] = Some(Task {
                        request_id: req_id,
                        object_id,
                        queue: replica.units.iter().copied().collect(),
                    });
                    claimed_disk = Some(replica.disk_id);
                    break;
                }
            }

            match claimed_disk {
                Some(disk_id) => {
                    requests.get_mut(&req_id).unwrap().claim(disk_id);
                }
                None => holdover.push((req_id, priority)),
            }
        }

        for (req_id, priority) in holdover {
            heap.push(req_id, priority);
        }
    }

    /// Drop a disk's in-flight task without completing it (the object was
    /// deleted mid-read). No-op if the disk was idle.
    pub fn abort_task_on(&mut self, disk_id: DiskId) {
        self.tasks[disk_id as usize] = None;
    }

    /// Advance every disk one slice. Returns the action line for each disk
    /// (in ascending disk-ID order, matching protocol output order) and the
    /// IDs of requests that completed this slice.
    pub fn run_slice(
        &mut self,
        disks: &mut [Disk],
        requests: &mut HashMap<RequestId, Request>,
        token_budget: u32,
    ) -> (Vec<String>, Vec<RequestId>) {
        let mut actions = Vec::with_capacity(disks.len());
        let mut completed = Vec::new();

        for disk in disks.iter_mut() {
            let idx = disk.id as usize;
            if self.tasks[idx].is_none() {
                actions.push("#".to_string());
                continue;
            }
            let (line, done) = Self::execute_one(&mut self.tasks[idx], disk, token_budget, requests);
            if let Some(req_id) = done {
                completed.push(req_id);
                self.tasks[idx] = None;
            }
            actions.push(line);
        }

        (actions, completed)
    }

    /// Drive a single disk's head for one slice: jump/pass to the front of
    /// its read queue, then read cells while tokens remain.
    fn execute_one(
        slot: &mut Option<Task>,
        disk: &mut Disk,
        token_budget: u32,
        requests: &mut HashMap<RequestId, Request>,
    ) -> (String, Option<RequestId>) {
        let size = disk.size;
        let mut tokens = token_budget;
        let mut head0 = disk.head_point - 1; // 0-based for clean modular arithmetic
        let mut buf = String::new();
        let mut jumped = false;
        let mut completed_req = None;

        loop {
            let task = slot.as_mut().expect("execute_one only called on an occupied slot");
            let Some(&target) = task.queue.front() else { break };
            let target0 = target - 1;
            let dist = (target0 + size - head0) % size;

            if tokens == token_budget && dist >= tokens {
                // Jump rule: first action this slice, too far to pass within budget.
                buf = format!("j {}", target);
                head0 = target0;
                disk.last_action_was_read = false;
                disk.last_read_cost = token_budget;
                tokens = 0;
                jumped = true;
                break;
            } else if dist > 0 {
                let spend = dist.min(tokens);
                buf.push_str(&"p".repeat(spend as usize));
                head0 = (head0 + spend) % size;
                tokens -= spend;
                disk.last_action_was_read = false;
                disk.last_read_cost = spend;
                if spend < dist {
                    break; // ran out mid-pass
                }
            } else {
                let cost = if !disk.last_action_was_read {
                    64
                } else {
                    ((disk.last_read_cost as f64 * 0.8).ceil() as u32).max(16)
                };
                if tokens < cost {
                    break;
                }
                tokens -= cost;
                buf.push('r');
                head0 = (head0 + 1) % size;
                disk.last_action_was_read = true;
                disk.last_read_cost = cost;
                task.queue.pop_front();
                if task.queue.is_empty() {
                    if let Some(req) = requests.get_mut(&task.request_id) {
                        req.complete();
                    }
                    completed_req = Some(task.request_id);
                    break;
                }
            }

            if tokens == 0 {
                break;
            }
        }

        disk.head_point = head0 + 1;
        if !jumped {
            buf.push('#');
        }
        (buf, completed_req)
    }
}
