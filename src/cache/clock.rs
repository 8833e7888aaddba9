//! CLOCK 置换策略
//!
//! 时钟指针沿目录的环扫描：遇到最近访问标志为 1 的块，清零后前进；
//! 遇到标志为 0 的块，即选为牺牲块。
//!
//! 选择和回收分两步：[`Directory::select_victim`] 只移动指针、清除标志，
//! 牺牲块仍留在目录中；调用者在写回成功后才调用 [`Directory::remove`]。
//! 写回失败时牺牲块原样保留，指针停在它上面，下一次选择会直接再次选中它。

use super::directory::Directory;
use crate::types::CacheKey;

impl Directory {
    /// 选出一个牺牲块
    ///
    /// 从时钟指针处开始扫描，最多 `2 × len` 步：第一圈把所有标志清零，
    /// 第二圈必然遇到标志为 0 的块。返回时指针指向牺牲块。
    ///
    /// 目录为空时返回 `None`。
    pub fn select_victim(&mut self) -> Option<CacheKey> {
        let mut hand = self.hand?;
        let steps = 2 * self.len();

        for _ in 0..steps {
            let slot = self.slots[hand].as_mut()?;
            if slot.block.clear_referenced() {
                log::trace!("[CLOCK] second chance for block {}", slot.key.block);
                hand = slot.next;
                continue;
            }
            let victim = slot.key;
            self.hand = Some(hand);
            return Some(victim);
        }

        // 不可达：第一圈之后所有标志均已清零
        self.hand = Some(hand);
        None
    }
}
