//! 块缓存常量定义
//!
//! 块大小与缓存容量的默认值和取值范围。

//=============================================================================
// 块大小
//=============================================================================

/// 默认块大小（4096 字节，与常见文件系统的 O_DIRECT 对齐要求一致）
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// 最小块大小（512 字节，一个扇区）
pub const MIN_BLOCK_SIZE: usize = 512;

/// 最大块大小（65536 字节）
pub const MAX_BLOCK_SIZE: usize = 65536;

//=============================================================================
// 缓存容量
//=============================================================================

/// 默认缓存容量（块数），512 × 4096 = 2 MiB
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

//=============================================================================
// 内存后端
//=============================================================================

/// 内存后端对象标识使用的设备号
pub const MEM_STORE_DEVICE: u64 = 0;
