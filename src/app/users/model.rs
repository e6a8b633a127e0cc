//! 用户数据模型

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::core::store::Resource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    /// 保留客户端提交的数字表示（25 不会变成 25.0）
    pub age: Number,
    pub email: String,
}

/// 创建用户请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub age: Number,
    pub email: String,
}

/// 更新用户请求；请求中的 `id` 被忽略
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub age: Option<Number>,
    pub email: Option<String>,
}

impl User {
    /// 示例数据
    pub fn sample() -> Self {
        Self {
            id: 1,
            name: "John Doe".to_string(),
            age: Number::from(30),
            email: "john.doe@example.com".to_string(),
        }
    }
}

impl Resource for User {
    type Draft = CreateUserRequest;
    type Patch = UpdateUserRequest;

    const NAME: &'static str = "User";
    const COLLECTION: &'static str = "users";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: CreateUserRequest) -> Self {
        Self {
            id,
            name: draft.name,
            age: draft.age,
            email: draft.email,
        }
    }

    fn merge(&mut self, patch: UpdateUserRequest) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
    }
}
