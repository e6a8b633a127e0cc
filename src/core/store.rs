//! 资源存储层
//!
//! [`ResourceStore`] 是处理器看到的存储抽象，[`MemoryStore`] 是进程内实现：
//! 按插入顺序保存记录，标识符由存储单调递增分配，从不复用。

use std::sync::{PoisonError, RwLock};

/// 可存储的资源类型
pub trait Resource: Clone + Send + Sync + 'static {
    /// 创建时客户端提供的字段
    type Draft: Send;
    /// 部分更新时客户端提供的字段
    type Patch: Send;

    /// 单数名称，用于 "User not found"
    const NAME: &'static str;
    /// 集合名称，用于 "No users found"
    const COLLECTION: &'static str;

    fn id(&self) -> u64;

    fn from_draft(id: u64, draft: Self::Draft) -> Self;

    /// 浅合并：补丁中出现的字段整体覆盖，未出现的字段保留，`id` 不变
    fn merge(&mut self, patch: Self::Patch);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("No {collection} found")]
    Empty { collection: &'static str },
}

impl StoreError {
    pub fn not_found<R: Resource>() -> Self {
        StoreError::NotFound { resource: R::NAME }
    }

    pub fn empty<R: Resource>() -> Self {
        StoreError::Empty {
            collection: R::COLLECTION,
        }
    }
}

/// 存储抽象
pub trait ResourceStore<R: Resource>: Send + Sync {
    fn create(&self, draft: R::Draft) -> R;

    /// 集合为空时返回 [`StoreError::Empty`]，而不是空列表
    fn list(&self) -> Result<Vec<R>, StoreError>;

    fn get(&self, id: u64) -> Result<R, StoreError>;

    fn update(&self, id: u64, patch: R::Patch) -> Result<R, StoreError>;
}

struct Inner<R> {
    records: Vec<R>,
    next_id: u64,
}

/// 进程内存储
pub struct MemoryStore<R> {
    inner: RwLock<Inner<R>>,
}

impl<R: Resource> MemoryStore<R> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// 以已有记录初始化，计数器从最大标识符之后开始
    pub fn with_records(records: Vec<R>) -> Self {
        let next_id = records.iter().map(Resource::id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(Inner { records, next_id }),
        }
    }
}

impl<R: Resource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    fn create(&self, draft: R::Draft) -> R {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        let record = R::from_draft(id, draft);
        inner.records.push(record.clone());
        record
    }

    fn list(&self) -> Result<Vec<R>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.records.is_empty() {
            return Err(StoreError::empty::<R>());
        }
        Ok(inner.records.clone())
    }

    fn get(&self, id: u64) -> Result<R, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(StoreError::not_found::<R>)
    }

    fn update(&self, id: u64, patch: R::Patch) -> Result<R, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(StoreError::not_found::<R>)?;
        record.merge(patch);
        Ok(record.clone())
    }
}
