//! 核心数据类型定义
//!
//! 会话句柄、后端标识、缓存键，以及打开/定位时使用的模式参数。

use bitflags::bitflags;
use core::fmt;

//=============================================================================
// 标识与键
//=============================================================================

/// 会话句柄
///
/// 由 [`DirectCache::open`](crate::DirectCache::open) 分配的不透明值。
/// 句柄单调递增分配，关闭后的句柄不会立即被复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// 获取句柄的原始数值
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 后端对象标识
///
/// 稳定且唯一地标识底层存储对象（例如文件的设备号 + inode 号），
/// 与会话句柄无关。对同一对象打开的多个会话共享同一组缓存块。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackingId {
    /// 设备号
    pub device: u64,
    /// 设备内的对象号
    pub object: u64,
}

impl BackingId {
    /// 创建新的后端标识
    pub const fn new(device: u64, object: u64) -> Self {
        Self { device, object }
    }
}

impl fmt::Display for BackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.device, self.object)
    }
}

/// 缓存键：(后端标识, 块号)
///
/// 排序先按后端标识再按块号，因此同一后端的所有键在有序表中连续。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// 所属后端对象
    pub backing: BackingId,
    /// 块号（字节偏移 / 块大小）
    pub block: u64,
}

impl CacheKey {
    /// 创建新的缓存键
    pub const fn new(backing: BackingId, block: u64) -> Self {
        Self { backing, block }
    }

    /// 该后端的第一个键
    pub(crate) const fn first_of(backing: BackingId) -> Self {
        Self { backing, block: 0 }
    }

    /// 该后端的最后一个键
    pub(crate) const fn last_of(backing: BackingId) -> Self {
        Self {
            backing,
            block: u64::MAX,
        }
    }
}

//=============================================================================
// 打开与定位模式
//=============================================================================

bitflags! {
    /// 会话访问模式
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMode: u8 {
        /// 允许读
        const READ  = 0x01;
        /// 允许写
        const WRITE = 0x02;
        /// 读写
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// 创建方式
///
/// 决定目标对象存在或不存在时 `open` 的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    /// 对象必须已存在
    OpenExisting,
    /// 对象必须不存在，创建新对象
    CreateNew,
    /// 总是创建；已存在则截断为空
    CreateAlways,
    /// 存在则打开，不存在则创建
    OpenAlways,
    /// 对象必须已存在，打开后截断为空
    TruncateExisting,
}

impl CreationMode {
    /// 打开后对象内容是否被清空
    pub const fn truncates(self) -> bool {
        matches!(self, Self::CreateAlways | Self::TruncateExisting)
    }

    /// 对象不存在时是否创建
    pub const fn creates(self) -> bool {
        matches!(self, Self::CreateNew | Self::CreateAlways | Self::OpenAlways)
    }
}

/// 定位模式
///
/// 只支持 [`SeekMode::Start`]，其余模式返回 `InvalidArgument`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// 相对对象开头（绝对定位）
    Start,
    /// 相对当前游标
    Current,
    /// 相对对象末尾
    End,
}
