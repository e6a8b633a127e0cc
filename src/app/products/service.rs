//! 产品业务服务

use std::sync::Arc;

use tracing::info;

use super::model::{CreateProductRequest, Product, UpdateProductRequest};
use crate::core::{
    error::CoreError,
    store::{MemoryStore, ResourceStore},
};

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ResourceStore<Product>>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ResourceStore<Product>>) -> Self {
        Self { store }
    }

    /// 进程内存储，`seed` 为真时写入示例产品
    pub fn in_memory(seed: bool) -> Self {
        let store = if seed {
            MemoryStore::with_records(vec![Product::sample()])
        } else {
            MemoryStore::new()
        };
        Self::new(Arc::new(store))
    }

    pub fn create_product(&self, request: CreateProductRequest) -> Product {
        let product = self.store.create(request);
        info!(?product, "新产品已创建");
        product
    }

    pub fn get_product(&self, id: u64) -> Result<Product, CoreError> {
        info!(product_id = id, "获取产品");
        Ok(self.store.get(id)?)
    }

    pub fn update_product(
        &self,
        id: u64,
        request: UpdateProductRequest,
    ) -> Result<Product, CoreError> {
        let product = self.store.update(id, request)?;
        info!(?product, "产品已更新");
        Ok(product)
    }
}
