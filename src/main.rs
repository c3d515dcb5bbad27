//! Eris - 命令行入口
//!
//! 初始化日志、加载配置、装配会话，然后逐行读取标准输入交给 make_request，
//! 直到工具结束会话、输入结束或 Ctrl-C。

use std::sync::Arc;

use anyhow::Context;
use eris::agent::create_session;
use eris::config::load_config;
use eris::llm::OpenAiTransport;
use eris::session::StdoutSink;
use eris::TurnOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eris::observability::init();

    let cfg = load_config(std::env::args().nth(1).map(Into::into)).context("Failed to load config")?;
    let api_key = cfg
        .llm
        .resolved_api_key()
        .context("No API key: set llm.api_key, ERIS__LLM__API_KEY or OPENAI_API_KEY")?;
    let transport = OpenAiTransport::new(Some(cfg.llm.base_url.as_str()), &api_key, cfg.llm.request_timeout())
        .context("Failed to build completion transport")?;

    let mut session = create_session(&cfg, Arc::new(transport))
        .context("Tool registration failed")?
        .with_sink(StdoutSink);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = tokio::select! {
            outcome = session.make_request(&line) => outcome,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        };
        match outcome {
            Ok(TurnOutcome::Finished(_)) => {}
            Ok(TurnOutcome::Ended) => break,
            Err(e) => tracing::error!(error = %e, "conversation turn failed"),
        }
    }

    let usage = session.usage();
    tracing::info!(
        prompt = usage.prompt_tokens,
        completion = usage.completion_tokens,
        total = usage.total_tokens,
        "token usage"
    );
    Ok(())
}
