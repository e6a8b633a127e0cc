//! 用户业务服务

use std::sync::Arc;

use tracing::info;

use super::model::{CreateUserRequest, UpdateUserRequest, User};
use crate::core::{
    error::CoreError,
    store::{MemoryStore, ResourceStore},
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn ResourceStore<User>>,
}

impl UserService {
    pub fn new(store: Arc<dyn ResourceStore<User>>) -> Self {
        Self { store }
    }

    /// 进程内存储，`seed` 为真时写入示例用户
    pub fn in_memory(seed: bool) -> Self {
        let store = if seed {
            MemoryStore::with_records(vec![User::sample()])
        } else {
            MemoryStore::new()
        };
        Self::new(Arc::new(store))
    }

    pub fn create_user(&self, request: CreateUserRequest) -> User {
        let user = self.store.create(request);
        info!(?user, "新用户已创建");
        user
    }

    pub fn list_users(&self) -> Result<Vec<User>, CoreError> {
        info!("获取所有用户");
        let users = self.store.list().inspect_err(|_| info!("没有任何用户"))?;
        Ok(users)
    }

    pub fn get_user(&self, id: u64) -> Result<User, CoreError> {
        info!(user_id = id, "获取用户");
        Ok(self.store.get(id)?)
    }

    pub fn update_user(&self, id: u64, request: UpdateUserRequest) -> Result<User, CoreError> {
        let user = self.store.update(id, request)?;
        info!(?user, "用户已更新");
        Ok(user)
    }
}
