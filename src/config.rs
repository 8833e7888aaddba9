//! 缓存配置

use crate::consts::{DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{Error, ErrorKind, Result};

/// 缓存配置
///
/// 块大小和容量在缓存实例的整个生命周期内固定不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 块大小（字节），也是块缓冲区的对齐要求
    pub block_size: usize,
    /// 缓存容量（块数）
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// 创建配置
    pub const fn new(block_size: usize, capacity: usize) -> Self {
        Self {
            block_size,
            capacity,
        }
    }

    /// 设置块大小
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// 设置缓存容量
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// 校验配置
    ///
    /// 块大小必须是 2 的幂且位于 [`MIN_BLOCK_SIZE`, `MAX_BLOCK_SIZE`] 之间，
    /// 容量至少为 1 块。
    pub fn validate(&self) -> Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "block size must be a power of two",
            ));
        }
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "block size out of supported range",
            ));
        }
        if self.capacity == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "cache capacity must be at least one block",
            ));
        }
        Ok(())
    }

    /// 缓存占用的总字节数
    pub const fn footprint(&self) -> usize {
        self.block_size * self.capacity
    }
}
