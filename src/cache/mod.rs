//! 块缓存模块
//!
//! 缓存目录、CLOCK 置换和块缓冲区。这一层只管理内存中的块，
//! 不直接访问后端；写回和装入由 [`session`](crate::session) 层驱动。
//!
//! # 主要组件
//!
//! - [`AlignedBuf`] - 按块大小对齐的定长缓冲区
//! - [`CacheBlock`] - 单个缓存块：数据 + 脏标志 + 最近访问标志
//! - [`Directory`] - (后端标识, 块号) → 缓存块 的有界目录，内含 CLOCK 环
//! - [`CacheStats`] - 命中/未命中/驱逐/写回计数
//!
//! # CLOCK 与 LRU
//!
//! CLOCK 用每块一个引用位近似 LRU：命中只设置引用位，不调整任何顺序；
//! 驱逐时时钟指针给引用位为 1 的块"第二次机会"（清零后跳过），
//! 选中第一个引用位为 0 的块。
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use dio_cache::cache::{AlignedBuf, CacheBlock, Directory};
//!
//! let mut dir = Directory::new(4);
//! let key = CacheKey::new(backing, 0);
//!
//! if dir.lookup(&key).is_none() {
//!     if dir.is_full() {
//!         let victim = dir.select_victim().unwrap();
//!         // 脏块先写回，再移除
//!         dir.remove(&victim);
//!     }
//!     let mut buf = AlignedBuf::zeroed(4096)?;
//!     object.read_block(key.block, &mut buf)?;
//!     dir.insert(key, CacheBlock::new(buf))?;
//! }
//! ```

mod buffer;
mod clock;
mod directory;
mod stats;

pub use buffer::{AlignedBuf, BlockFlags, CacheBlock};
pub use directory::Directory;
pub use stats::CacheStats;
