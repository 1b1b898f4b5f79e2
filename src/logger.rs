//! 安全日志模块
//!
//! 所有守卫模块共享的日志汇：一个有界的环形缓冲区，记录带时间戳和级别的文本条目。
//! 超出容量时淘汰最旧的条目。每条记录同时转发给 `tracing`（target 为 `shieldrs`），
//! 宿主程序可以自行挂载 subscriber。
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::logger::{LogLevel, SecurityLogger};
//!
//! let logger = SecurityLogger::with_capacity(2);
//! logger.info("shield mounted");
//! logger.warn("devtools detected");
//! logger.error("lockdown triggered");
//!
//! // 容量为 2，最旧的条目被淘汰
//! assert_eq!(logger.len(), 2);
//! assert_eq!(logger.entries_by_level(LogLevel::Info).len(), 0);
//! assert!(logger.export_logs().contains("[WARN] devtools detected"));
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::clock::{SharedClock, SystemClock};
use crate::error::Result;

/// 默认缓冲区容量
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 一般信息
    #[default]
    Info,
    /// 警告（策略违规）
    Warn,
    /// 错误（锁定、初始化失败）
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// 日志条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 记录时间
    pub timestamp: DateTime<Utc>,
    /// 级别
    pub level: LogLevel,
    /// 消息
    pub message: String,
}

impl fmt::Display for LogEntry {
    /// 导出格式：`[<ISO-8601 时间>] [<LEVEL>] <message>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// 日志统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogStats {
    pub total: usize,
    pub info_count: usize,
    pub warn_count: usize,
    pub error_count: usize,
}

/// 安全日志记录器
///
/// 克隆出的句柄共享同一个缓冲区。
#[derive(Clone)]
pub struct SecurityLogger {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    clock: SharedClock,
}

impl fmt::Debug for SecurityLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityLogger")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityLogger {
    /// 使用默认容量创建
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// 指定容量创建
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// 指定容量和时钟创建
    pub fn with_clock(capacity: usize, clock: SharedClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
            clock,
        }
    }

    /// 缓冲区容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 记录 info 级别
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// 记录 warn 级别
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    /// 记录 error 级别
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// 记录一条日志
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(target: "shieldrs", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "shieldrs", "{}", message),
            LogLevel::Error => tracing::error!(target: "shieldrs", "{}", message),
        }

        let entry = LogEntry {
            timestamp: self.clock.now(),
            level,
            message,
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// 获取全部条目（从旧到新）
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.read().iter().cloned().collect()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 按级别过滤
    pub fn entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.read()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// 最近 N 条（从新到旧）
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        self.read().iter().rev().take(count).cloned().collect()
    }

    /// 消息中包含指定文本的条目数
    pub fn count_matching(&self, needle: &str) -> usize {
        self.read()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    /// 导出为文本，每行一条
    pub fn export_logs(&self) -> String {
        self.read()
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 导出为 JSON 数组
    pub fn export_json(&self) -> Result<String> {
        let entries = self.get_logs();
        Ok(serde_json::to_string(&entries)?)
    }

    /// 清空缓冲区
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// 统计信息
    pub fn stats(&self) -> LogStats {
        let entries = self.read();
        let mut stats = LogStats {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries.iter() {
            match entry.level {
                LogLevel::Info => stats.info_count += 1,
                LogLevel::Warn => stats.warn_count += 1,
                LogLevel::Error => stats.error_count += 1,
            }
        }
        stats
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<LogEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }
}
