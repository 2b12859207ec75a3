// ==========================================
// 仓库出入库单据系统 - 请求路由
// ==========================================
// 职责: 把外部请求 (方法 + 路径 + 查询参数 + JSON 体) 分派到 RecordApi,
//       并把结果/错误映射为状态码与响应体
// 路由:
//   GET    /{family}                  列表 (filter / expand=details / page / size)
//   POST   /{family}                  新建 → 201
//   GET    /{family}/{id}             查询 (始终含明细)
//   PUT    /{family}/{id}             编辑
//   DELETE /{family}/{id}             删除 → 204
//   GET    /{family}/{id}/details     明细列表
//   POST   /{family}/{id}/details     追加明细 → 201
//   GET    /{family}/{id}/actions     操作日志
// 身份: 每个请求都需要有效令牌,否则 401
// ==========================================

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::RecordApi;
use crate::app::state::AppState;
use crate::config::engine_config_trait::EngineConfigReader;
use crate::domain::record::{DetailDraft, HeaderDraft, RecordHeader};
use crate::domain::types::RecordFamily;
use crate::i18n;

// ==========================================
// 请求 / 响应
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("不支持的请求方法: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    pub token: Option<String>,
}

impl Request {
    /// 由 "路径?查询串" 形式的目标构造请求
    ///
    /// 查询串按 `&` / `=` 切分,`+` 视为空格
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, raw)) => (path, parse_query(raw)),
            None => (target, HashMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            body: None,
            token: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn expand_details(&self) -> bool {
        self.query_value("expand")
            .map(|v| v.split(',').any(|part| part.trim().eq_ignore_ascii_case("details")))
            .unwrap_or(false)
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.replace('+', " "), v.replace('+', " "))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body: Some(body) }
    }

    fn created(body: Value) -> Self {
        Self { status: 201, body: Some(body) }
    }

    fn no_content() -> Self {
        Self { status: 204, body: None }
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息（按当前语言本地化）
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<Value>,
}

// ==========================================
// 身份校验
// ==========================================

/// 身份令牌校验
pub trait IdentityVerifier: Send + Sync {
    /// 返回令牌对应的操作人,令牌无效时返回 None
    fn verify(&self, token: &str) -> Option<String>;
}

/// 固定令牌表（本地命令行与测试使用）
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, actor: &str) -> Self {
        self.tokens.insert(token.to_string(), actor.to_string());
        self
    }
}

impl IdentityVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<String> {
        self.tokens.get(token.trim()).cloned()
    }
}

// ==========================================
// RequestRouter - 请求路由
// ==========================================

pub struct RequestRouter {
    record_api: Arc<RecordApi>,
    config: Arc<dyn EngineConfigReader>,
    verifier: Arc<dyn IdentityVerifier>,
}

/// 解析后的路由目标
enum Route {
    Collection(RecordFamily),
    Item(RecordFamily, i64),
    Details(RecordFamily, i64),
    Actions(RecordFamily, i64),
}

impl RequestRouter {
    pub fn new(
        record_api: Arc<RecordApi>,
        config: Arc<dyn EngineConfigReader>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            record_api,
            config,
            verifier,
        }
    }

    pub fn from_state(state: &AppState, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self::new(state.record_api.clone(), state.config_manager.clone(), verifier)
    }

    /// 处理一个请求
    pub async fn dispatch(&self, request: Request) -> Response {
        let actor = match request.token.as_deref().and_then(|t| self.verifier.verify(t)) {
            Some(actor) => actor,
            None => {
                warn!(path = %request.path, "身份令牌缺失或无效");
                return error_response(
                    401,
                    ErrorResponse {
                        code: "UNAUTHORIZED".to_string(),
                        message: i18n::t("record.error.unauthorized"),
                        details: None,
                    },
                );
            }
        };

        debug!(method = ?request.method, path = %request.path, actor = %actor, "处理请求");
        match self.handle(&request, actor).await {
            Ok(response) => response,
            Err(err) => map_api_error(err),
        }
    }

    async fn handle(&self, request: &Request, actor: String) -> ApiResult<Response> {
        let route = parse_route(&request.path)?;
        let expand = request.expand_details();

        match (request.method, route) {
            (Method::Get, Route::Collection(family)) => {
                let filter = request.query_value("filter").map(str::to_string);
                let page = request
                    .query_value("page")
                    .map(|v| parse_number(v, "page"))
                    .transpose()?;
                let size = request
                    .query_value("size")
                    .map(|v| parse_number(v, "size"))
                    .transpose()?;

                if page.is_none() && size.is_none() {
                    let headers = self
                        .run_blocking(move |api| api.list(family, filter.as_deref()))
                        .await?;
                    return Ok(Response::ok(headers_json(&headers, expand)?));
                }

                let size = match size {
                    Some(size) => Some(size),
                    None => self.default_page_size().await,
                };
                let page = page.unwrap_or(0);
                let mut listing = self
                    .run_blocking(move |api| api.list_page(family, filter.as_deref(), page, size))
                    .await?;
                if !expand {
                    listing.items =
                        listing.items.iter().map(RecordHeader::without_details).collect();
                }
                Ok(Response::ok(to_value(&listing)?))
            }
            (Method::Post, Route::Collection(family)) => {
                let draft: HeaderDraft = parse_body(request)?;
                let header = self
                    .run_blocking(move |api| api.create(family, &draft, &actor))
                    .await?;
                Ok(Response::created(to_value(&header)?))
            }
            (Method::Get, Route::Item(family, id)) => {
                let header = self.run_blocking(move |api| api.get(family, id)).await?;
                Ok(Response::ok(to_value(&header)?))
            }
            (Method::Put, Route::Item(family, id)) => {
                let draft: HeaderDraft = parse_body(request)?;
                let header = self
                    .run_blocking(move |api| api.update(family, id, &draft, &actor))
                    .await?;
                Ok(Response::ok(to_value(&header)?))
            }
            (Method::Delete, Route::Item(family, id)) => {
                self.run_blocking(move |api| api.delete(family, id, &actor))
                    .await?;
                Ok(Response::no_content())
            }
            (Method::Get, Route::Details(family, id)) => {
                let header = self.run_blocking(move |api| api.get(family, id)).await?;
                Ok(Response::ok(to_value(&header.details)?))
            }
            (Method::Post, Route::Details(family, id)) => {
                let draft: DetailDraft = parse_body(request)?;
                let header = self
                    .run_blocking(move |api| api.append_detail(family, id, &draft, &actor))
                    .await?;
                Ok(Response::created(to_value(&header)?))
            }
            (Method::Get, Route::Actions(family, id)) => {
                let logs = self
                    .run_blocking(move |api| {
                        api.get(family, id)?;
                        api.audit_trail(family, id)
                    })
                    .await?;
                Ok(Response::ok(to_value(&logs)?))
            }
            (method, _) => Err(ApiError::NotFound(format!(
                "不支持的操作: {:?} {}",
                method, request.path
            ))),
        }
    }

    /// API 调用走阻塞线程池（SQLite 同步 IO）
    async fn run_blocking<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&RecordApi) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let api = self.record_api.clone();
        tokio::task::spawn_blocking(move || f(api.as_ref()))
            .await
            .map_err(|e| ApiError::InternalError(format!("任务执行失败: {}", e)))?
    }

    async fn default_page_size(&self) -> Option<usize> {
        match self.config.get_default_page_size().await {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(error = %e, "默认分页大小读取失败，使用启动时配置");
                None
            }
        }
    }
}

// ==========================================
// 路由解析与序列化
// ==========================================

fn parse_route(path: &str) -> ApiResult<Route> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let family = match segments.first() {
        Some(raw) => RecordFamily::from_str(raw).map_err(|e| ApiError::NotFound(e.to_string()))?,
        None => return Err(ApiError::NotFound("缺少单据族路径".to_string())),
    };

    let id = match segments.get(1) {
        None => return Ok(Route::Collection(family)),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ApiError::NotFound(format!("无效的单据 id: {}", raw)))?,
    };

    match segments.get(2..) {
        Some([]) | None => Ok(Route::Item(family, id)),
        Some(["details"]) => Ok(Route::Details(family, id)),
        Some(["actions"]) => Ok(Route::Actions(family, id)),
        Some(_) => Err(ApiError::NotFound(format!("未知路径: {}", path))),
    }
}

fn parse_number(raw: &str, field: &str) -> ApiResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ApiError::invalid(field, format!("必须为非负整数: {}", raw)))
}

fn parse_body<T: serde::de::DeserializeOwned>(request: &Request) -> ApiResult<T> {
    let body = request
        .body
        .clone()
        .ok_or_else(|| ApiError::invalid("body", "请求体不能为空"))?;
    serde_json::from_value(body)
        .map_err(|e| ApiError::invalid("body", format!("请求体格式错误: {}", e)))
}

fn to_value<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::InternalError(format!("响应序列化失败: {}", e)))
}

/// 列表默认不带明细,expand=details 时保留
fn headers_json(headers: &[RecordHeader], expand: bool) -> ApiResult<Value> {
    if expand {
        to_value(&headers)
    } else {
        let stripped: Vec<RecordHeader> =
            headers.iter().map(RecordHeader::without_details).collect();
        to_value(&stripped)
    }
}

fn error_response(status: u16, body: ErrorResponse) -> Response {
    Response {
        status,
        body: serde_json::to_value(&body).ok(),
    }
}

/// 将 ApiError 映射为状态码与错误响应体
pub fn map_api_error(err: ApiError) -> Response {
    let status = match &err {
        ApiError::ValidationError { .. } => 400,
        ApiError::NotFound(_) => 404,
        ApiError::DuplicateRecord(_) | ApiError::OptimisticLockFailure(_) => 409,
        ApiError::StoreUnavailable(_) => 503,
        ApiError::InternalError(_) | ApiError::Other(_) => 500,
    };

    let message = match &err {
        ApiError::ValidationError { violations, .. } => {
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            i18n::t_with_args("record.error.validation", &[("fields", &fields.join(", "))])
        }
        ApiError::DuplicateRecord(_) => i18n::t("record.error.duplicate"),
        ApiError::NotFound(_) => i18n::t("record.error.not_found"),
        ApiError::OptimisticLockFailure(_) => i18n::t("record.error.optimistic_lock"),
        ApiError::StoreUnavailable(_) => i18n::t("record.error.store_unavailable"),
        ApiError::InternalError(_) | ApiError::Other(_) => i18n::t("record.error.internal"),
    };

    let details = match &err {
        ApiError::ValidationError { reason, violations } => Some(json!({
            "reason": reason,
            "violations": violations,
        })),
        other => Some(json!({ "reason": other.to_string() })),
    };

    if status >= 500 {
        warn!(code = err.code(), error = %err, "请求处理失败");
    } else {
        debug!(code = err.code(), error = %err, "请求被拒绝");
    }

    error_response(
        status,
        ErrorResponse {
            code: err.code().to_string(),
            message,
            details,
        },
    )
}
