//! OpenAPI schema 文档
//!
//! 启动时加载一次 YAML/JSON 文档，内联本地 `$ref`，为每个操作预编译
//! 路径参数、请求体和各响应状态码的 JSON Schema 校验器。

use std::{borrow::Cow, collections::BTreeMap, fs, path::Path};

use axum::http::{Method, StatusCode};
use jsonschema::{Draft, Validator};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::error::Violation;

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// 引用最大解析深度，超过视为循环引用
const MAX_REF_DEPTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("无法读取 schema 文档 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML 解析失败: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("文档缺少 paths 对象")]
    MissingPaths,
    #[error("无法解析引用: {0}")]
    UnresolvedRef(String),
    #[error("引用嵌套过深（可能存在循环引用）: {0}")]
    RefTooDeep(String),
    #[error("{location} 的 schema 无法编译: {message}")]
    InvalidSchema { location: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// 参数声明的标量类型，决定路径片段如何转换成 JSON 值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Integer,
    Number,
    Boolean,
    String,
}

impl ScalarKind {
    fn from_schema(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("integer") => ScalarKind::Integer,
            Some("number") => ScalarKind::Number,
            Some("boolean") => ScalarKind::Boolean,
            _ => ScalarKind::String,
        }
    }

    /// 无法转换时保留原字符串，由校验器报告类型错误
    fn coerce(self, raw: &str) -> Value {
        let converted = match self {
            ScalarKind::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.parse::<u64>().map(Value::from))
                .ok(),
            ScalarKind::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ScalarKind::Boolean => raw.parse::<bool>().ok().map(Value::Bool),
            ScalarKind::String => None,
        };
        converted.unwrap_or_else(|| Value::String(raw.to_string()))
    }
}

struct PathParameter {
    name: String,
    kind: ScalarKind,
    validator: Validator,
}

/// 请求体声明
pub struct RequestBody {
    pub required: bool,
    validator: Option<Validator>,
}

impl RequestBody {
    /// 是否声明了 `application/json` schema
    pub fn expects_json(&self) -> bool {
        self.validator.is_some()
    }

    pub fn validate(&self, body: &Value) -> Vec<Violation> {
        match &self.validator {
            Some(validator) => collect_violations(validator, body, "/body"),
            None => Vec::new(),
        }
    }
}

/// 文档中的一个操作（路径模板 + 方法）
pub struct Operation {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    segments: Vec<Segment>,
    path_params: Vec<PathParameter>,
    request_body: Option<RequestBody>,
    /// 状态码（"200"、"4XX"、"default"）到响应体校验器；`None` 表示未声明 JSON 内容
    responses: BTreeMap<String, Option<Validator>>,
}

impl Operation {
    pub fn request_body(&self) -> Option<&RequestBody> {
        self.request_body.as_ref()
    }

    /// 校验已提取的路径参数
    pub fn validate_params(&self, params: &[(String, String)]) -> Vec<Violation> {
        let mut violations = Vec::new();
        for param in &self.path_params {
            let location = format!("/params/{}", param.name);
            match params.iter().find(|(name, _)| name == &param.name) {
                Some((_, raw)) => {
                    let value = param.kind.coerce(raw);
                    violations.extend(collect_violations(&param.validator, &value, &location));
                }
                None => violations.push(Violation::new(
                    location,
                    "required path parameter is missing",
                )),
            }
        }
        violations
    }

    /// 依次查找精确状态码、范围（"4XX"）和 "default"
    fn response_schema(&self, status: StatusCode) -> Option<&Option<Validator>> {
        let code = status.as_str();
        let range = format!("{}XX", &code[..1]);
        self.responses
            .get(code)
            .or_else(|| self.responses.get(&range))
            .or_else(|| self.responses.get("default"))
    }

    /// 文档是否为该状态码声明了响应
    pub fn declares(&self, status: StatusCode) -> bool {
        self.response_schema(status).is_some()
    }

    /// 按状态码选择响应 schema 并校验响应体
    pub fn validate_response(&self, status: StatusCode, body: Option<&Value>) -> Vec<Violation> {
        match self.response_schema(status) {
            None => vec![Violation::new(
                "/response",
                format!("no schema defined for status code '{}'", status.as_str()),
            )],
            Some(None) => Vec::new(),
            Some(Some(validator)) => match body {
                Some(value) => collect_violations(validator, value, "/response"),
                None => vec![Violation::new("/response", "response body is not valid JSON")],
            },
        }
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn match_path(&self, parts: &[&str]) -> Option<Vec<(String, String)>> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.push((name.clone(), (*part).to_string())),
            }
        }
        Some(params)
    }
}

/// 路由匹配结果
pub enum RouteMatch<'a> {
    Found {
        operation: &'a Operation,
        params: Vec<(String, String)>,
    },
    MethodNotAllowed,
    NotFound,
}

/// 已加载的 schema 文档
pub struct SchemaDocument {
    raw: Value,
    title: String,
    operations: Vec<Operation>,
}

impl SchemaDocument {
    /// 按扩展名加载 YAML 或 JSON 文档
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        let document = Self::from_value(raw)?;
        debug!("已解析 schema 文档 {}", path.display());
        Ok(document)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, DocumentError> {
        Self::from_value(serde_yaml::from_str(content)?)
    }

    pub fn from_value(raw: Value) -> Result<Self, DocumentError> {
        let paths = raw
            .get("paths")
            .and_then(Value::as_object)
            .ok_or(DocumentError::MissingPaths)?;

        let mut operations = Vec::new();
        for (template, item) in paths {
            let item = resolve_refs(item, &raw, 0)?;
            let shared_params = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for method in METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                operations.push(build_operation(template, method, op, &shared_params)?);
            }
        }

        let title = raw
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or("API")
            .to_string();

        Ok(Self {
            raw,
            title,
            operations,
        })
    }

    /// 原始文档（未内联引用），用于文档页面
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// 查找请求对应的操作；字面片段优先于参数片段
    ///
    /// 每个片段先做百分号解码，与路由器提取路径参数时看到的值一致。
    pub fn find(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let decoded: Vec<Cow<'_, str>> = split_path(path)
            .into_iter()
            .map(|part| percent_decode_str(part).decode_utf8_lossy())
            .collect();
        let parts: Vec<&str> = decoded.iter().map(AsRef::as_ref).collect();
        let mut path_matched = false;
        let mut best: Option<(&Operation, Vec<(String, String)>)> = None;

        for operation in &self.operations {
            let Some(params) = operation.match_path(&parts) else {
                continue;
            };
            path_matched = true;
            if &operation.method != method {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| operation.literal_count() > current.literal_count());
            if better {
                best = Some((operation, params));
            }
        }

        match best {
            Some((operation, params)) => RouteMatch::Found { operation, params },
            None if path_matched => RouteMatch::MethodNotAllowed,
            None => RouteMatch::NotFound,
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn parse_template(template: &str) -> Vec<Segment> {
    split_path(template)
        .into_iter()
        .map(|part| {
            match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            }
        })
        .collect()
}

fn build_operation(
    template: &str,
    method: &str,
    op: &Value,
    shared_params: &[Value],
) -> Result<Operation, DocumentError> {
    let location = format!("{} {}", method.to_ascii_uppercase(), template);
    let http_method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| DocumentError::InvalidSchema {
            location: location.clone(),
            message: e.to_string(),
        })?;

    // 操作级参数覆盖同名路径级参数
    let mut declared: Vec<&Value> = shared_params.iter().collect();
    if let Some(own) = op.get("parameters").and_then(Value::as_array) {
        for param in own {
            declared.retain(|p| p.get("name") != param.get("name") || p.get("in") != param.get("in"));
            declared.push(param);
        }
    }

    let mut path_params = Vec::new();
    for param in declared {
        if param.get("in").and_then(Value::as_str) != Some("path") {
            continue;
        }
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let schema = param.get("schema").cloned().unwrap_or(Value::Object(Map::new()));
        let validator = compile(&schema, &format!("{} parameter {}", location, name))?;
        path_params.push(PathParameter {
            name,
            kind: ScalarKind::from_schema(&schema),
            validator,
        });
    }

    let request_body = match op.get("requestBody") {
        Some(body) => {
            let validator = match body.pointer("/content/application~1json/schema") {
                Some(schema) => Some(compile(schema, &format!("{} request body", location))?),
                None => None,
            };
            Some(RequestBody {
                required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
                validator,
            })
        }
        None => None,
    };

    let mut responses = BTreeMap::new();
    if let Some(declared) = op.get("responses").and_then(Value::as_object) {
        for (status, response) in declared {
            let validator = match response.pointer("/content/application~1json/schema") {
                Some(schema) => Some(compile(
                    schema,
                    &format!("{} response {}", location, status),
                )?),
                None => None,
            };
            let key = if status.eq_ignore_ascii_case("default") {
                "default".to_string()
            } else {
                status.to_ascii_uppercase()
            };
            responses.insert(key, validator);
        }
    }

    debug!("注册操作 {}", location);
    Ok(Operation {
        method: http_method,
        path: template.to_string(),
        operation_id: op
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_string),
        segments: parse_template(template),
        path_params,
        request_body,
        responses,
    })
}

/// OpenAPI 3.0 的 schema 方言基于 Draft 4
fn compile(schema: &Value, location: &str) -> Result<Validator, DocumentError> {
    jsonschema::options()
        .with_draft(Draft::Draft4)
        .build(schema)
        .map_err(|e| DocumentError::InvalidSchema {
            location: location.to_string(),
            message: e.to_string(),
        })
}

fn collect_violations(validator: &Validator, instance: &Value, location: &str) -> Vec<Violation> {
    validator
        .iter_errors(instance)
        .map(|e| Violation::new(location, e.to_string()))
        .collect()
}

/// 递归内联本地 `#/...` 引用
///
/// 不支持递归 schema（例如引用自身的树节点）：内联会无限展开，
/// 超过 [`MAX_REF_DEPTH`] 后报告 [`DocumentError::RefTooDeep`]。
fn resolve_refs(value: &Value, root: &Value, depth: usize) -> Result<Value, DocumentError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if depth >= MAX_REF_DEPTH {
                    return Err(DocumentError::RefTooDeep(reference.clone()));
                }
                let target = reference
                    .strip_prefix('#')
                    .and_then(|pointer| root.pointer(pointer))
                    .ok_or_else(|| DocumentError::UnresolvedRef(reference.clone()))?;
                return resolve_refs(target, root, depth + 1);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(key.clone(), resolve_refs(inner, root, depth)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_refs(item, root, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOC: &str = r##"
openapi: 3.0.3
info:
  title: Test API
  version: 1.0.0
paths:
  /items/all:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
  /items/{itemId}:
    parameters:
      - name: itemId
        in: path
        required: true
        schema:
          type: integer
          minimum: 1
    get:
      operationId: getItem
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Item"
    put:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Item"
      responses:
        "2XX":
          description: ok
components:
  schemas:
    Item:
      type: object
      required: [name]
      properties:
        name:
          type: string
"##;

    fn document() -> SchemaDocument {
        SchemaDocument::from_yaml_str(DOC).unwrap()
    }

    #[test]
    fn test_loads_operations() {
        let doc = document();
        assert_eq!(doc.title(), "Test API");
        assert_eq!(doc.operations().len(), 3);
    }

    #[test]
    fn test_literal_segment_wins() {
        let doc = document();
        match doc.find(&Method::GET, "/items/all") {
            RouteMatch::Found { operation, params } => {
                assert_eq!(operation.path, "/items/all");
                assert!(params.is_empty());
            }
            _ => panic!("expected /items/all"),
        }
        match doc.find(&Method::GET, "/items/7") {
            RouteMatch::Found { operation, params } => {
                assert_eq!(operation.operation_id.as_deref(), Some("getItem"));
                assert_eq!(params, vec![("itemId".to_string(), "7".to_string())]);
            }
            _ => panic!("expected /items/{{itemId}}"),
        }
    }

    #[test]
    fn test_method_not_allowed_and_not_found() {
        let doc = document();
        assert!(matches!(
            doc.find(&Method::DELETE, "/items/7"),
            RouteMatch::MethodNotAllowed
        ));
        assert!(matches!(doc.find(&Method::GET, "/nothing"), RouteMatch::NotFound));
    }

    #[test]
    fn test_path_param_coercion() {
        let doc = document();
        let RouteMatch::Found { operation, .. } = doc.find(&Method::GET, "/items/1") else {
            panic!("expected match");
        };
        assert!(operation
            .validate_params(&[("itemId".to_string(), "3".to_string())])
            .is_empty());
        let violations = operation.validate_params(&[("itemId".to_string(), "abc".to_string())]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/params/itemId");
        assert!(!operation
            .validate_params(&[("itemId".to_string(), "0".to_string())])
            .is_empty());
    }

    #[test]
    fn test_percent_encoded_segments_decoded() {
        let doc = document();
        let RouteMatch::Found { operation, params } = doc.find(&Method::GET, "/items/%31%32")
        else {
            panic!("expected match");
        };
        assert_eq!(params, vec![("itemId".to_string(), "12".to_string())]);
        assert!(operation.validate_params(&params).is_empty());

        match doc.find(&Method::GET, "/items/%61ll") {
            RouteMatch::Found { operation, .. } => assert_eq!(operation.path, "/items/all"),
            _ => panic!("expected /items/all"),
        }
    }

    #[test]
    fn test_request_body_refs_inlined() {
        let doc = document();
        let RouteMatch::Found { operation, .. } = doc.find(&Method::PUT, "/items/1") else {
            panic!("expected match");
        };
        let body = operation.request_body().unwrap();
        assert!(body.required);
        assert!(body.expects_json());
        assert!(body.validate(&json!({ "name": "x" })).is_empty());
        assert!(!body.validate(&json!({ "title": "x" })).is_empty());
    }

    #[test]
    fn test_response_status_lookup() {
        let doc = document();
        let RouteMatch::Found { operation, .. } = doc.find(&Method::GET, "/items/1") else {
            panic!("expected match");
        };
        assert!(operation
            .validate_response(StatusCode::OK, Some(&json!({ "name": "x" })))
            .is_empty());
        assert!(!operation
            .validate_response(StatusCode::OK, Some(&json!({ "name": 1 })))
            .is_empty());
        assert!(operation.declares(StatusCode::OK));
        assert!(!operation.declares(StatusCode::NOT_FOUND));
        let undeclared = operation.validate_response(StatusCode::NOT_FOUND, None);
        assert!(undeclared[0].message.contains("404"));

        let RouteMatch::Found { operation, .. } = doc.find(&Method::PUT, "/items/1") else {
            panic!("expected match");
        };
        // 2XX 范围匹配，且未声明 JSON 内容
        assert!(operation.declares(StatusCode::NO_CONTENT));
        assert!(operation.validate_response(StatusCode::OK, None).is_empty());
    }

    #[test]
    fn test_dangling_ref_is_error() {
        let doc = json!({
            "paths": {
                "/a": { "get": { "responses": { "200": { "$ref": "#/components/responses/Missing" } } } }
            }
        });
        assert!(matches!(
            SchemaDocument::from_value(doc),
            Err(DocumentError::UnresolvedRef(_))
        ));
    }

    #[test]
    fn test_cyclic_ref_is_error() {
        let doc = json!({
            "paths": {
                "/a": { "get": { "responses": { "200": { "$ref": "#/components/responses/Loop" } } } }
            },
            "components": { "responses": { "Loop": { "$ref": "#/components/responses/Loop" } } }
        });
        assert!(matches!(
            SchemaDocument::from_value(doc),
            Err(DocumentError::RefTooDeep(_))
        ));
    }

    #[test]
    fn test_missing_paths() {
        assert!(matches!(
            SchemaDocument::from_value(json!({ "openapi": "3.0.3" })),
            Err(DocumentError::MissingPaths)
        ));
    }
}
