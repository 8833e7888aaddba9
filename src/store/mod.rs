//! 后端存储抽象
//!
//! 缓存通过两个 trait 使用后端：[`BackingStore`] 负责按路径打开对象，
//! [`BackingObject`] 提供按块定位的读写、持久化刷新和稳定标识。
//!
//! 提供两个实现：
//! - [`MemStore`] - 内存后端，带物理 I/O 计数和故障注入，用于测试和基准
//! - [`FileStore`] - 文件后端（`std` 特性，Unix），可选 `O_DIRECT`

use crate::error::Result;
use crate::types::{AccessMode, BackingId, CreationMode};

mod mem;

#[cfg(all(feature = "std", unix))]
mod file;

pub use mem::{MemFaults, MemObject, MemStore};

#[cfg(all(feature = "std", unix))]
pub use file::{FileObject, FileStore};

/// 后端存储
///
/// # 示例
///
/// ```rust,ignore
/// use dio_cache::{BackingStore, BackingObject, AccessMode, CreationMode, Result};
///
/// struct MyStore;
///
/// impl BackingStore for MyStore {
///     type Object = MyObject;
///
///     fn open(&mut self, path: &str, access: AccessMode, creation: CreationMode) -> Result<MyObject> {
///         // 以绕过主机缓存的方式打开对象
///         MyObject::open(path, access, creation)
///     }
/// }
/// ```
pub trait BackingStore {
    /// 打开后的对象类型
    type Object: BackingObject;

    /// 打开对象
    ///
    /// # 参数
    ///
    /// * `path` - 对象路径
    /// * `access` - 访问模式
    /// * `creation` - 对象存在/不存在时的处理方式
    fn open(
        &mut self,
        path: &str,
        access: AccessMode,
        creation: CreationMode,
    ) -> Result<Self::Object>;
}

/// 已打开的后端对象
///
/// 所有块 I/O 都以整块为单位，块号 × 缓冲区长度 即字节偏移。
pub trait BackingObject {
    /// 对象的稳定标识
    ///
    /// 同一底层对象的两次打开必须返回相同标识
    fn identity(&self) -> Result<BackingId>;

    /// 对象当前长度（字节）
    fn size(&self) -> Result<u64>;

    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `index` - 块号
    /// * `buf` - 目标缓冲区，长度为块大小且按块大小对齐
    ///
    /// # 返回
    ///
    /// 实际读取的字节数。到达对象末尾时可能小于块大小（短读），不视为错误
    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<usize>;

    /// 写入一个完整块
    ///
    /// # 参数
    ///
    /// * `index` - 块号
    /// * `buf` - 源缓冲区，长度为块大小且按块大小对齐
    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()>;

    /// 把已写入的数据刷新到持久存储
    fn flush(&mut self) -> Result<()>;

    /// 关闭对象
    ///
    /// 默认实现直接丢弃对象
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
