//! 缓存统计信息

/// 缓存统计信息
///
/// 命中与未命中按块计数：一次跨越 N 个块的读写请求计 N 次。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 驱逐次数
    pub evictions: u64,
    /// 脏块写回次数（驱逐和同步两条路径合计）
    pub writebacks: u64,
    /// 从后端装入块的次数
    pub fetches: u64,
}

impl CacheStats {
    /// 总访问次数
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// 清零所有计数
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
