//! 产品数据模型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::core::store::Resource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub score: Number,
    pub review: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: Number,
    pub category: String,
    pub description: String,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub specifications: BTreeMap<String, String>,
    pub ratings: Vec<Rating>,
}

/// 创建产品请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Number,
    pub category: String,
    pub description: String,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub specifications: BTreeMap<String, String>,
    pub ratings: Vec<Rating>,
}

/// 更新产品请求；嵌套字段整体替换，不做深合并
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Number>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub in_stock: Option<bool>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub ratings: Option<Vec<Rating>>,
}

impl Product {
    /// 示例数据
    pub fn sample() -> Self {
        Self {
            id: 1,
            name: "Sample Product".to_string(),
            price: Number::from(20),
            category: "electronics".to_string(),
            description: "This is a sample product.".to_string(),
            tags: vec!["sample".to_string(), "product".to_string()],
            in_stock: true,
            specifications: BTreeMap::from([
                ("weight".to_string(), "1kg".to_string()),
                ("dimensions".to_string(), "10x10x10cm".to_string()),
            ]),
            ratings: vec![Rating {
                score: Number::from(5),
                review: "Great product!".to_string(),
            }],
        }
    }
}

impl Resource for Product {
    type Draft = CreateProductRequest;
    type Patch = UpdateProductRequest;

    const NAME: &'static str = "Product";
    const COLLECTION: &'static str = "products";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: CreateProductRequest) -> Self {
        Self {
            id,
            name: draft.name,
            price: draft.price,
            category: draft.category,
            description: draft.description,
            tags: draft.tags,
            in_stock: draft.in_stock,
            specifications: draft.specifications,
            ratings: draft.ratings,
        }
    }

    fn merge(&mut self, patch: UpdateProductRequest) {
        let UpdateProductRequest {
            name,
            price,
            category,
            description,
            tags,
            in_stock,
            specifications,
            ratings,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
        if let Some(in_stock) = in_stock {
            self.in_stock = in_stock;
        }
        if let Some(specifications) = specifications {
            self.specifications = specifications;
        }
        if let Some(ratings) = ratings {
            self.ratings = ratings;
        }
    }
}
