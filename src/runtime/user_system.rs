//! User directory seam.

use async_trait::async_trait;
use std::fmt;

use crate::error::PlanningResult;
use crate::models::ExternalUser;

#[async_trait]
pub trait UserSystemService: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn find_all_users(&self) -> PlanningResult<Vec<ExternalUser>>;

    async fn find_user(&self, id: &str) -> PlanningResult<Option<ExternalUser>>;
}

/// Directory backed by a fixed list of users
#[derive(Debug, Clone, Default)]
pub struct StaticUserSystemService {
    users: Vec<ExternalUser>,
}

impl StaticUserSystemService {
    pub fn new(users: Vec<ExternalUser>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserSystemService for StaticUserSystemService {
    fn name(&self) -> &str {
        "static"
    }

    async fn find_all_users(&self) -> PlanningResult<Vec<ExternalUser>> {
        Ok(self.users.clone())
    }

    async fn find_user(&self, id: &str) -> PlanningResult<Option<ExternalUser>> {
        Ok(self.users.iter().find(|user| user.id == id).cloned())
    }
}
