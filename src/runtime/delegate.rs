//! # Runtime Delegate
//!
//! Paging adapter over [`RuntimeClient`]. Task queries are read page by page until a
//! short page comes back.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::client::{PlanningExecutionResult, RuntimeClient, TaskQuery};
use crate::constants::{TaskInputVariablesReadMode, TaskStatus};
use crate::error::{PlanningError, PlanningResult};
use crate::models::{PlanningItem, TaskData};

pub const DEFAULT_PAGE_SIZE: usize = 3000;

/// Result of a synchronization query
#[derive(Debug, Clone, PartialEq)]
pub struct FindTasksResult {
    /// Runtime clock when the query started; the next cursor
    pub query_time: DateTime<Utc>,
    pub tasks: Vec<TaskData>,
}

#[derive(Debug, Clone)]
pub struct RuntimeDelegate {
    client: Arc<dyn RuntimeClient>,
    page_size: usize,
}

impl RuntimeDelegate {
    pub fn new(client: Arc<dyn RuntimeClient>, page_size: usize) -> PlanningResult<Self> {
        if page_size == 0 {
            return Err(PlanningError::ConfigurationError(
                "runtime page size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { client, page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[instrument(skip(self, status_filter), fields(page_size = self.page_size))]
    pub async fn find_tasks(
        &self,
        status_filter: &[TaskStatus],
        from_last_modification_date: Option<DateTime<Utc>>,
        read_mode: TaskInputVariablesReadMode,
    ) -> PlanningResult<FindTasksResult> {
        let query = TaskQuery {
            status_filter: status_filter.to_vec(),
            from_last_modification_date,
            read_mode,
        };

        let mut query_time = None;
        let mut tasks = Vec::new();
        let mut page = 0;
        loop {
            let result = self
                .client
                .find_tasks_page(&query, page, self.page_size)
                .await?;
            query_time.get_or_insert(result.query_time);
            let fetched = result.tasks.len();
            tasks.extend(result.tasks);
            if fetched < self.page_size {
                break;
            }
            page += 1;
        }

        let query_time = query_time.ok_or_else(|| {
            PlanningError::RuntimeError("Task query returned no page".to_string())
        })?;
        debug!(
            tasks = tasks.len(),
            pages = page + 1,
            query_time = %query_time,
            "Task query finished"
        );
        Ok(FindTasksResult { query_time, tasks })
    }

    pub async fn execute_planning(
        &self,
        items: Vec<PlanningItem>,
        user_id: &str,
    ) -> PlanningResult<PlanningExecutionResult> {
        self.client.execute_planning(items, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::client::TaskQueryPage;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;

    #[derive(Debug)]
    struct PagedClient {
        total: usize,
        pages_read: Mutex<Vec<usize>>,
    }

    fn task_data(id: i64) -> TaskData {
        TaskData {
            task_id: id,
            name: format!("task-{id}"),
            status: TaskStatus::Ready,
            priority: 0,
            container_id: "container".to_string(),
            process_id: "process".to_string(),
            process_instance_id: id,
            actual_owner: None,
            potential_owners: BTreeSet::new(),
            last_modification_date: Utc::now(),
            planning_task: None,
        }
    }

    #[async_trait]
    impl RuntimeClient for PagedClient {
        async fn find_tasks_page(
            &self,
            _query: &TaskQuery,
            page: usize,
            page_size: usize,
        ) -> PlanningResult<TaskQueryPage> {
            self.pages_read.lock().push(page);
            let start = page * page_size;
            let end = (start + page_size).min(self.total);
            Ok(TaskQueryPage {
                // Each page reports a later clock; only the first one counts
                query_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, page as u32).unwrap(),
                tasks: (start..end).map(|id| task_data(id as i64)).collect(),
            })
        }

        async fn execute_planning(
            &self,
            _items: Vec<PlanningItem>,
            _user_id: &str,
        ) -> PlanningResult<PlanningExecutionResult> {
            Ok(PlanningExecutionResult::success())
        }
    }

    #[tokio::test]
    async fn test_find_tasks_reads_until_short_page() {
        let client = Arc::new(PagedClient {
            total: 7,
            pages_read: Mutex::new(Vec::new()),
        });
        let delegate = RuntimeDelegate::new(client.clone(), 3).unwrap();

        let result = delegate
            .find_tasks(&[TaskStatus::Ready], None, TaskInputVariablesReadMode::DontRead)
            .await
            .unwrap();

        assert_eq!(result.tasks.len(), 7);
        assert_eq!(*client.pages_read.lock(), vec![0, 1, 2]);
        assert_eq!(
            result.query_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_exact_multiple_reads_a_trailing_empty_page() {
        let client = Arc::new(PagedClient {
            total: 6,
            pages_read: Mutex::new(Vec::new()),
        });
        let delegate = RuntimeDelegate::new(client.clone(), 3).unwrap();
        let result = delegate
            .find_tasks(&[], None, TaskInputVariablesReadMode::ReadForAll)
            .await
            .unwrap();
        assert_eq!(result.tasks.len(), 6);
        assert_eq!(client.pages_read.lock().len(), 3);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let client = Arc::new(PagedClient {
            total: 0,
            pages_read: Mutex::new(Vec::new()),
        });
        assert!(matches!(
            RuntimeDelegate::new(client, 0),
            Err(PlanningError::ConfigurationError(_))
        ));
    }
}
