// ==========================================
// 仓库出入库单据系统 - 命令行入口
// ==========================================
// 用法:
//   warehouse-records [--db PATH] [--lang LOCALE] METHOD TARGET [BODY_JSON]
//   warehouse-records [--db PATH] export FAMILY [FILTER]
//   warehouse-records [--db PATH] config KEY [VALUE]
//   warehouse-records [--db PATH] actions [ACTOR]
// 示例:
//   warehouse-records POST /borrow '{"borrower":"Nana","item":"Camera"}'
//   warehouse-records GET '/borrow?filter=nana&expand=details'
// ==========================================

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use warehouse_records::app::{
    get_default_db_path, AppState, Method, Request, RequestRouter, StaticTokenVerifier,
};
use warehouse_records::domain::RecordFamily;
use warehouse_records::{i18n, logging};

/// 本地命令行使用的固定令牌
const LOCAL_TOKEN: &str = "local-cli";

/// actions 命令一次最多列出的日志条数
const ACTIONS_LIMIT: i32 = 50;

const USAGE: &str = "用法:
  warehouse-records [--db PATH] [--lang LOCALE] METHOD TARGET [BODY_JSON]
  warehouse-records [--db PATH] export FAMILY [FILTER]
  warehouse-records [--db PATH] config KEY [VALUE]
  warehouse-records [--db PATH] actions [ACTOR]";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut db_path = None;
    let mut positional = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = Some(args.next().context("--db 缺少路径参数")?),
            "--lang" => i18n::set_locale(&args.next().context("--lang 缺少语言参数")?),
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => positional.push(arg),
        }
    }

    let Some(command) = positional.first().cloned() else {
        bail!("缺少命令\n{}", USAGE);
    };

    let db_path = db_path.unwrap_or_else(get_default_db_path);
    tracing::info!(version = warehouse_records::VERSION, db_path = %db_path, "启动");
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command.to_lowercase().as_str() {
        "export" => run_export(&state, &positional[1..]),
        "config" => run_config(&state, &positional[1..]),
        "actions" => run_actions(&state, &positional[1..]),
        _ => run_request(&state, &positional).await,
    }
}

async fn run_request(state: &AppState, args: &[String]) -> Result<()> {
    let method: Method = args[0].parse().map_err(|e: String| anyhow!(e))?;
    let target = args.get(1).context("缺少请求路径")?;

    let actor = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    let verifier = StaticTokenVerifier::new().with_token(LOCAL_TOKEN, &actor);
    let router = RequestRouter::from_state(state, Arc::new(verifier));

    let mut request = Request::new(method, target).with_token(LOCAL_TOKEN);
    if let Some(raw) = args.get(2) {
        let body = serde_json::from_str(raw).context("请求体不是合法 JSON")?;
        request = request.with_body(body);
    }

    let response = router.dispatch(request).await;
    println!("{}", response.status);
    if let Some(body) = response.body {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    if response.status >= 400 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_export(state: &AppState, args: &[String]) -> Result<()> {
    let family: RecordFamily = args.first().context("缺少单据族")?.parse()?;
    let filter = args.get(1).map(String::as_str);

    let stdout = std::io::stdout();
    let rows = state
        .record_api
        .export_csv(family, filter, stdout.lock())?;
    eprintln!(
        "{}",
        i18n::t_with_args("record.export.done", &[("count", &rows.to_string())])
    );
    Ok(())
}

fn run_config(state: &AppState, args: &[String]) -> Result<()> {
    let key = args.first().context("缺少配置键")?;
    match args.get(1) {
        Some(value) => {
            state
                .config_manager
                .set_global_config_value(key, value)
                .map_err(|e| anyhow!("配置写入失败: {}", e))?;
        }
        None => {
            let value = state
                .config_manager
                .get_global_config_value(key)
                .map_err(|e| anyhow!("配置读取失败: {}", e))?;
            println!("{}", value.unwrap_or_default());
        }
    }
    Ok(())
}

/// 列出最近的操作日志,给出操作人时只列该操作人的
fn run_actions(state: &AppState, args: &[String]) -> Result<()> {
    let repo = &state.action_log_repo;
    let logs = match args.first() {
        Some(actor) => repo.find_by_actor(actor, ACTIONS_LIMIT)?,
        None => repo.find_recent(ACTIONS_LIMIT)?,
    };

    for log in &logs {
        println!(
            "{}\t{}\t{}#{}\t{}\t{}",
            log.action_ts.format("%Y-%m-%d %H:%M:%S"),
            log.actor,
            log.family,
            log.record_id,
            log.action_type,
            log.detail.as_deref().unwrap_or("-")
        );
    }
    eprintln!(
        "{}",
        i18n::t_with_args(
            "record.actions.listed",
            &[
                ("shown", &logs.len().to_string()),
                ("total", &repo.count()?.to_string()),
            ],
        )
    );
    Ok(())
}
