//! 交互式 API 文档
//!
//! 页面从 CDN 加载 Swagger UI，文档内容取自启动时加载的 schema 文档。

use axum::{
    extract::State,
    response::{Html, Json},
};
use serde_json::Value;

use super::AppState;

pub async fn openapi_json(State(state): State<AppState>) -> Json<Value> {
    Json(state.document.raw().clone())
}

pub async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    Html(render_page(state.document.title(), &spec_url(&state.docs_path)))
}

pub fn spec_url(docs_path: &str) -> String {
    format!("{}/openapi.json", docs_path.trim_end_matches('/'))
}

fn render_page(title: &str, spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_url() {
        assert_eq!(spec_url("/api-docs"), "/api-docs/openapi.json");
        assert_eq!(spec_url("/api-docs/"), "/api-docs/openapi.json");
    }

    #[test]
    fn test_page_points_at_spec() {
        let page = render_page("Users and Products API", "/api-docs/openapi.json");
        assert!(page.contains("<title>Users and Products API</title>"));
        assert!(page.contains(r#"url: "/api-docs/openapi.json""#));
    }
}
