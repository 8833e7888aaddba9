//! 缓存目录
//!
//! 以 (后端标识, 块号) 为键的有界块表。
//!
//! # 结构
//!
//! ```text
//! index: BTreeMap<CacheKey, slot>      键 → 槽位
//! slots: Vec<Option<Slot>>             槽位 → {键, 块, prev, next}
//!
//!          head                  hand
//!           v                     v
//!   ... <-> [k0] <-> [k1] <-> [k2] <-> [k3] <-> (回到 k0)
//! ```
//!
//! 所有存活槽位通过 `prev`/`next` 组成一个环，`head` 是最早插入的槽位，
//! 新槽位链接在 `head` 之前（即环尾）。时钟指针 `hand` 也指向环中的一个槽位。
//! 删除和指针推进都是 O(1)，不需要移动其他元素，也不需要特殊处理回绕。
//!
//! # 不变量
//!
//! - `index` 中的每个条目指向一个键相同的 `Some` 槽位，反之亦然
//! - 环上的槽位集合与 `index` 的值集合相同
//! - `index.len() <= capacity`
//! - 目录非空时 `head` 和 `hand` 均为 `Some`

use super::buffer::CacheBlock;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{BackingId, CacheKey};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// 槽位
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) key: CacheKey,
    pub(super) block: CacheBlock,
    pub(super) prev: usize,
    pub(super) next: usize,
}

/// 缓存目录
///
/// 只负责成员关系和 CLOCK 顺序，不做任何后端 I/O。
/// 容量满时由调用者先选出牺牲块（见 [`Directory::select_victim`]）、
/// 必要时写回，再调用 [`Directory::remove`] 腾出空间。
#[derive(Debug)]
pub struct Directory {
    /// 键 → 槽位
    index: BTreeMap<CacheKey, usize>,
    /// 槽位存储
    pub(super) slots: Vec<Option<Slot>>,
    /// 空闲槽位
    free: Vec<usize>,
    /// 环中最早插入的槽位
    head: Option<usize>,
    /// 时钟指针
    pub(super) hand: Option<usize>,
    /// 容量（块数）
    capacity: usize,
}

impl Directory {
    /// 创建容量为 `capacity` 块的空目录
    pub fn new(capacity: usize) -> Self {
        Self {
            index: BTreeMap::new(),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            hand: None,
            capacity,
        }
    }

    /// 容量（块数）
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前驻留块数
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 是否已满
    pub fn is_full(&self) -> bool {
        self.index.len() >= self.capacity
    }

    /// 是否包含键
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.index.contains_key(key)
    }

    /// 查找块并设置最近访问标志
    ///
    /// 命中时返回块的可变引用；未命中返回 `None`，由调用者装入内容后 [`insert`](Self::insert)
    pub fn lookup(&mut self, key: &CacheKey) -> Option<&mut CacheBlock> {
        let block = self.peek_mut(key)?;
        block.touch();
        Some(block)
    }

    /// 只读查看块，不影响最近访问标志
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheBlock> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|s| &s.block)
    }

    /// 可变查看块，不影响最近访问标志
    pub fn peek_mut(&mut self, key: &CacheKey) -> Option<&mut CacheBlock> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_mut().map(|s| &mut s.block)
    }

    /// 插入新块，链接到环尾
    ///
    /// # 错误
    ///
    /// - 目录已满：`InvalidState`（调用者应先驱逐）
    /// - 键已存在：`InvalidState`
    pub fn insert(&mut self, key: CacheKey, block: CacheBlock) -> Result<()> {
        if self.is_full() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "cache directory full, evict before insert",
            ));
        }
        if self.index.contains_key(&key) {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "cache key already resident",
            ));
        }

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        let (prev, next) = match self.head {
            None => {
                self.head = Some(slot);
                self.hand = Some(slot);
                (slot, slot)
            }
            Some(head) => {
                let tail = self.link(head).0;
                if let Some(s) = self.slots[tail].as_mut() {
                    s.next = slot;
                }
                if let Some(s) = self.slots[head].as_mut() {
                    s.prev = slot;
                }
                (tail, head)
            }
        };

        self.slots[slot] = Some(Slot {
            key,
            block,
            prev,
            next,
        });
        self.index.insert(key, slot);
        Ok(())
    }

    /// 从目录和环中移除块，不做写回
    ///
    /// 若时钟指针指向被移除的槽位，指针移到其后继（移除的是环尾时即回到环首）。
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheBlock> {
        let slot = self.index.remove(key)?;
        let removed = self.slots[slot].take()?;

        if removed.next == slot {
            // 环中唯一的槽位
            self.head = None;
            self.hand = None;
        } else {
            if let Some(s) = self.slots[removed.prev].as_mut() {
                s.next = removed.next;
            }
            if let Some(s) = self.slots[removed.next].as_mut() {
                s.prev = removed.prev;
            }
            if self.head == Some(slot) {
                self.head = Some(removed.next);
            }
            if self.hand == Some(slot) {
                self.hand = Some(removed.next);
            }
        }

        self.free.push(slot);
        Some(removed.block)
    }

    /// 某个后端的所有驻留键（按块号升序）
    pub fn keys_of(&self, backing: BackingId) -> Vec<CacheKey> {
        self.index
            .range(CacheKey::first_of(backing)..=CacheKey::last_of(backing))
            .map(|(key, _)| *key)
            .collect()
    }

    /// 某个后端的脏块数量
    pub fn dirty_count_of(&self, backing: BackingId) -> usize {
        self.keys_of(backing)
            .iter()
            .filter(|key| self.peek(key).is_some_and(CacheBlock::is_dirty))
            .count()
    }

    /// 脏块总数
    pub fn dirty_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.block.is_dirty())
            .count()
    }

    /// 按 CLOCK 顺序（从环首开始）列出所有键
    pub fn order(&self) -> Vec<CacheKey> {
        let mut keys = Vec::with_capacity(self.len());
        let Some(head) = self.head else {
            return keys;
        };
        let mut slot = head;
        loop {
            let Some(s) = self.slots[slot].as_ref() else {
                break;
            };
            keys.push(s.key);
            slot = s.next;
            if slot == head {
                break;
            }
        }
        keys
    }

    /// 时钟指针当前指向的键
    pub fn hand_key(&self) -> Option<CacheKey> {
        let slot = self.hand?;
        self.slots[slot].as_ref().map(|s| s.key)
    }

    /// 槽位的 (prev, next)
    fn link(&self, slot: usize) -> (usize, usize) {
        match self.slots[slot].as_ref() {
            Some(s) => (s.prev, s.next),
            None => (slot, slot),
        }
    }

    /// 校验结构不变量（测试用）
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(self.len() <= self.capacity, "directory over capacity");

        for (key, &slot) in &self.index {
            let s = self.slots[slot].as_ref().expect("index points at empty slot");
            assert_eq!(&s.key, key, "slot key mismatch");
        }
        let live = self.slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(live, self.index.len(), "orphan slots");

        let order = self.order();
        assert_eq!(order.len(), self.index.len(), "ring membership mismatch");
        for key in &order {
            assert!(self.index.contains_key(key));
        }

        if self.is_empty() {
            assert!(self.head.is_none() && self.hand.is_none());
        } else {
            let hand = self.hand.expect("hand missing");
            assert!(self.slots[hand].is_some(), "hand on empty slot");
            for (_, &slot) in &self.index {
                let (prev, next) = self.link(slot);
                assert_eq!(self.link(prev).1, slot);
                assert_eq!(self.link(next).0, slot);
            }
        }
    }
}
