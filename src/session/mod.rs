//! 会话层
//!
//! 打开文件表和按字节的读写路径。
//!
//! direct.rs 定义 [`DirectCache`]：open / close / seek / sync，以及块的装入、驱逐和写回；
//! io.rs 提供 read / write，把字节区间分解成块后逐块查询缓存目录；
//! table.rs 是打开文件表：会话 → 后端标识，后端标识 → 存活的后端对象。

mod direct;
mod io;
mod span;
mod table;

pub use direct::DirectCache;
pub use span::{spans, BlockSpan, Spans};
