//! 缓存块结构
//!
//! [`AlignedBuf`] 是按块大小对齐的定长缓冲区（O_DIRECT 要求缓冲区地址对齐），
//! [`CacheBlock`] 在其上附加脏标志和最近访问标志。

use crate::error::{Error, ErrorKind, Result};
use alloc::alloc::{alloc_zeroed, dealloc, Layout};
use bitflags::bitflags;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

bitflags! {
    /// 缓存块标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        /// 内容已修改，尚未写回后端
        const DIRTY      = 0x01;
        /// 最近被访问过（CLOCK 的引用位）
        const REFERENCED = 0x02;
    }
}

/// 对齐的块缓冲区
///
/// 长度等于块大小，起始地址按块大小对齐。分配时清零。
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

// AlignedBuf 独占其内存，与 Box<[u8]> 一样可以跨线程移动和共享只读引用
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// 分配一个清零的缓冲区，长度与对齐均为 `size`
    ///
    /// # 错误
    ///
    /// - `size` 为 0 或不是 2 的幂：`AllocationFailure`
    /// - 分配器返回空指针：`AllocationFailure`
    pub fn zeroed(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::new(
                ErrorKind::AllocationFailure,
                "zero-sized block buffer",
            ));
        }
        let layout = Layout::from_size_align(size, size).map_err(|_| {
            Error::new(ErrorKind::AllocationFailure, "invalid block buffer layout")
        })?;

        // SAFETY: layout 的大小非零
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            log::error!("[CACHE] aligned allocation of {} bytes failed", size);
            Error::new(ErrorKind::AllocationFailure, "aligned block allocation failed")
        })?;

        Ok(Self { ptr, layout })
    }

    /// 缓冲区长度
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// 缓冲区是否为空（总是 false）
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// 对齐要求
    pub fn align(&self) -> usize {
        self.layout.align()
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr 指向 layout.size() 字节的已初始化（清零）内存，由 self 独占
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: 同上，且 &mut self 保证独占访问
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // SAFETY: ptr 由 alloc_zeroed(self.layout) 分配，且只释放一次
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl core::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

/// 缓存块
///
/// 新建的块带有 REFERENCED 标志：刚装入的块至少能躲过时钟指针的一轮扫描。
#[derive(Debug)]
pub struct CacheBlock {
    data: AlignedBuf,
    flags: BlockFlags,
}

impl CacheBlock {
    /// 用已填充的缓冲区创建缓存块（干净、已引用）
    pub fn new(data: AlignedBuf) -> Self {
        Self {
            data,
            flags: BlockFlags::REFERENCED,
        }
    }

    /// 块数据
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 可变块数据（不改变任何标志）
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 当前标志
    pub fn flags(&self) -> BlockFlags {
        self.flags
    }

    /// 标记为脏
    pub fn mark_dirty(&mut self) {
        self.flags.insert(BlockFlags::DIRTY);
    }

    /// 标记为干净（已写回）
    pub fn mark_clean(&mut self) {
        self.flags.remove(BlockFlags::DIRTY);
    }

    /// 是否为脏块
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(BlockFlags::DIRTY)
    }

    /// 设置最近访问标志
    pub fn touch(&mut self) {
        self.flags.insert(BlockFlags::REFERENCED);
    }

    /// 是否最近被访问
    pub fn is_referenced(&self) -> bool {
        self.flags.contains(BlockFlags::REFERENCED)
    }

    /// 清除最近访问标志，返回清除前的值
    pub fn clear_referenced(&mut self) -> bool {
        let was = self.is_referenced();
        self.flags.remove(BlockFlags::REFERENCED);
        was
    }

    /// 把 `src` 覆盖到块内 `offset` 处，仅在内容不同时写入并置脏
    ///
    /// 返回块内容是否发生了变化。
    pub fn apply(&mut self, offset: usize, src: &[u8]) -> bool {
        let span = &mut self.data[offset..offset + src.len()];
        if span == src {
            return false;
        }
        span.copy_from_slice(src);
        self.mark_dirty();
        true
    }

    /// 把块内 `offset` 开始的数据复制到 `dst`
    pub fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
    }
}
