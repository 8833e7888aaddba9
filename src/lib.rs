//! dio_cache: 直接 I/O 后端之上的用户态块缓存
//!
//! 后端对象以绕过主机页缓存的方式打开，所有物理 I/O 都是整块、块对齐的。
//! 这个库在其上提供：
//! - **按字节**的 open / read / write / seek / sync / close
//! - **CLOCK 置换**的有界块缓存，脏块在驱逐或同步时写回
//! - 同一对象的**多个会话共享**缓存块
//! - 可替换的后端（内存后端、`O_DIRECT` 文件后端）
//!
//! # 示例
//!
//! ```rust,ignore
//! use dio_cache::{AccessMode, CacheConfig, CreationMode, DirectCache, MemStore, Result};
//!
//! fn main() -> Result<()> {
//!     let config = CacheConfig::default().with_capacity(64);
//!     let mut cache = DirectCache::new(MemStore::new(), config)?;
//!
//!     let h = cache.open("table.db", AccessMode::READ_WRITE, CreationMode::OpenAlways)?;
//!     cache.write(h, b"hello, block cache")?;
//!     cache.sync(h)?;
//!     cache.close(h)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 句柄、标识、模式参数
//! - [`config`] - 缓存配置
//! - [`cache`] - 块缓冲区、缓存目录和 CLOCK 置换
//! - [`store`] - 后端存储抽象及实现
//! - [`session`] - 打开文件表和读写路径

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 缓存配置
pub mod config;

/// 块缓存
pub mod cache;

/// 后端存储
pub mod store;

/// 会话与读写
pub mod session;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 类型
pub use types::{AccessMode, BackingId, CacheKey, CreationMode, Handle, SeekMode};

// 配置
pub use config::CacheConfig;

// Cache
pub use cache::{AlignedBuf, BlockFlags, CacheBlock, CacheStats, Directory};

// 后端
pub use store::{BackingObject, BackingStore, MemFaults, MemObject, MemStore};

#[cfg(all(feature = "std", unix))]
pub use store::{FileObject, FileStore};

// 会话
pub use session::DirectCache;
