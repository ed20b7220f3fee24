#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tasker_planning::constants::TaskStatus;
use tasker_planning::models::{ExternalUser, PlanningTask, Task, TaskData, User};

/// Whole-second instant on a fixed test day
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, hour, minute, second)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn task_data(task_id: i64, status: TaskStatus) -> TaskData {
    TaskData {
        task_id,
        name: format!("Task {task_id}"),
        status,
        priority: 0,
        container_id: "container-1".to_string(),
        process_id: "approvals".to_string(),
        process_instance_id: task_id * 100,
        actual_owner: None,
        potential_owners: BTreeSet::new(),
        last_modification_date: at(8, 0, 0),
        planning_task: None,
    }
}

pub fn ready_task_data(task_id: i64) -> TaskData {
    task_data(task_id, TaskStatus::Ready)
}

/// Reserved task previously published by the planner at `index`
pub fn planned_task_data(task_id: i64, owner: &str, index: i32) -> TaskData {
    TaskData {
        actual_owner: Some(owner.to_string()),
        planning_task: Some(PlanningTask {
            task_id,
            assigned_user: owner.to_string(),
            index,
            published: true,
        }),
        ..task_data(task_id, TaskStatus::Reserved)
    }
}

pub fn task(task_id: i64) -> Task {
    Task::from_task_data(&ready_task_data(task_id))
}

pub fn pinned_task(task_id: i64) -> Task {
    Task {
        pinned: true,
        ..task(task_id)
    }
}

/// User holding `pinned` pinned tasks followed by `non_pinned` free ones; ids are
/// allocated from `next_id`
pub fn user_with_tasks(id: &str, pinned: usize, non_pinned: usize, next_id: &mut i64) -> User {
    let mut user = User::new(id);
    for _ in 0..pinned {
        *next_id += 1;
        user.insert_task(pinned_task(*next_id));
    }
    for _ in 0..non_pinned {
        *next_id += 1;
        user.insert_task(task(*next_id));
    }
    user
}

pub fn directory(ids: &[&str]) -> Vec<ExternalUser> {
    ids.iter().map(|id| ExternalUser::new(*id)).collect()
}

/// Poll `condition` every few milliseconds until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Collects every value a listener receives
pub fn recorder<T: Send + 'static>() -> (Arc<parking_lot::Mutex<Vec<T>>>, Arc<dyn Fn(T) + Send + Sync>) {
    let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = received.clone();
    (received, Arc::new(move |value: T| sink.lock().push(value)))
}
