//! 错误类型定义
//!
//! 提供块缓存各层操作的错误类型。所有错误都通过 `Result` 直接返回给调用者，
//! 缓存内部不做任何重试。

use core::fmt;

/// 块缓存操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 未知或已关闭的会话句柄
    InvalidHandle,
    /// 无效参数（不支持的定位模式、负偏移、非法配置等）
    InvalidArgument,
    /// 会话的访问模式不允许该操作
    AccessDenied,
    /// 后端打开失败（包括标识获取失败）
    BackingOpen,
    /// 后端读、写或持久化刷新失败
    BackingIo,
    /// 无法分配对齐的块缓冲区
    AllocationFailure,
    /// 内部状态不一致
    InvalidState,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 创建带原因的错误
    ///
    /// 原因只写入日志，不随错误携带（`no_std` 下无法保存动态消息）
    pub fn with_cause(kind: ErrorKind, message: &'static str, cause: impl fmt::Debug) -> Self {
        log::error!("{}: {:?}", message, cause);
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 保留消息，改写错误类别
    ///
    /// 用于把后端返回的任意错误归一到 `BackingOpen` / `BackingIo`
    pub(crate) fn recast(self, kind: ErrorKind) -> Self {
        Self {
            kind,
            message: self.message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
