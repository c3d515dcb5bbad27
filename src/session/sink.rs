//! 回复输出端
//!
//! 每段模型文本调用一次 deliver(text, model)，按产生顺序；实现方不得失败。
//! 文本在投递前做规范化（NFD + 排版引号/破折号折叠为 ASCII），历史记录保留原文。

use std::io::Write;
use std::sync::{Arc, Mutex};

use unicode_normalization::UnicodeNormalization;

/// 回复输出端 trait；任意 `FnMut(&str, &str)` 闭包即可作为输出端
pub trait ResponseSink: Send {
    fn deliver(&mut self, text: &str, model: &str);
}

impl<F> ResponseSink for F
where
    F: FnMut(&str, &str) + Send,
{
    fn deliver(&mut self, text: &str, model: &str) {
        self(text, model)
    }
}

/// 丢弃所有输出
#[derive(Debug, Default)]
pub struct NullSink;

impl ResponseSink for NullSink {
    fn deliver(&mut self, _text: &str, _model: &str) {}
}

/// 命令行输出：`[model] text`
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ResponseSink for StdoutSink {
    fn deliver(&mut self, text: &str, model: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{model}] {text}");
        let _ = out.flush();
    }
}

/// 收集输出（测试用），可克隆后在会话外读取
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    delivered: Arc<Mutex<Vec<(String, String)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// (text, model) 列表
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.delivered().into_iter().map(|(t, _)| t).collect()
    }
}

impl ResponseSink for CollectingSink {
    fn deliver(&mut self, text: &str, model: &str) {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((text.to_string(), model.to_string()));
    }
}

/// 规范分解（NFD）后折叠常见排版字符
pub fn normalize_text(text: &str) -> String {
    text.nfd()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00A0}' | '\u{202F}' => ' ',
            c => c,
        })
        .collect()
}
