//! 打开文件表
//!
//! 两张表：
//! - 会话表：句柄 → {后端标识, 游标, 访问模式}
//! - 后端表：后端标识 → {已打开对象, 会话数, 访问模式, 逻辑长度}
//!
//! 每个后端标识只保留一个存活对象，驱逐和同步时直接按标识找到它，
//! 不需要反查会话。

use crate::error::{Error, ErrorKind, Result};
use crate::types::{AccessMode, BackingId, Handle};
use alloc::collections::BTreeMap;

/// 打开的会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) backing: BackingId,
    pub(crate) cursor: u64,
    pub(crate) access: AccessMode,
}

/// 某个后端标识的存活对象
#[derive(Debug)]
pub(crate) struct Backing<O> {
    pub(crate) object: O,
    /// 对象打开时的访问模式
    pub(crate) access: AccessMode,
    /// 引用该对象的会话数
    pub(crate) sessions: usize,
    /// 经由缓存看到的逻辑长度（字节）
    pub(crate) extent: u64,
}

#[derive(Debug)]
pub(crate) struct OpenFileTable<O> {
    sessions: BTreeMap<Handle, Session>,
    backings: BTreeMap<BackingId, Backing<O>>,
    next_handle: u32,
}

impl<O> OpenFileTable<O> {
    pub(crate) fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            backings: BTreeMap::new(),
            next_handle: 1,
        }
    }

    pub(crate) fn session(&self, handle: Handle) -> Result<&Session> {
        self.sessions
            .get(&handle)
            .ok_or(Error::new(ErrorKind::InvalidHandle, "unknown session handle"))
    }

    pub(crate) fn session_mut(&mut self, handle: Handle) -> Result<&mut Session> {
        self.sessions
            .get_mut(&handle)
            .ok_or(Error::new(ErrorKind::InvalidHandle, "unknown session handle"))
    }

    pub(crate) fn backing(&self, id: &BackingId) -> Result<&Backing<O>> {
        self.backings
            .get(id)
            .ok_or(Error::new(ErrorKind::InvalidState, "backing object not open"))
    }

    pub(crate) fn backing_mut(&mut self, id: &BackingId) -> Result<&mut Backing<O>> {
        self.backings
            .get_mut(id)
            .ok_or(Error::new(ErrorKind::InvalidState, "backing object not open"))
    }

    pub(crate) fn is_open(&self, id: &BackingId) -> bool {
        self.backings.contains_key(id)
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub(crate) fn backing_ids(&self) -> impl Iterator<Item = BackingId> + '_ {
        self.backings.keys().copied()
    }

    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.sessions.contains_key(&handle)
    }

    /// 把新打开的对象挂到后端表上
    ///
    /// 标识尚未打开时直接登记。已打开时会话数加一，并返回多余的对象交给调用者关闭：
    /// 新对象带有现存对象缺少的写权限时替换现存对象（返回旧对象），否则返回新对象。
    pub(crate) fn attach(
        &mut self,
        id: BackingId,
        object: O,
        access: AccessMode,
        extent: u64,
        truncated: bool,
    ) -> Option<O> {
        let Some(entry) = self.backings.get_mut(&id) else {
            self.backings.insert(
                id,
                Backing {
                    object,
                    access,
                    sessions: 1,
                    extent,
                },
            );
            return None;
        };

        entry.sessions += 1;
        entry.extent = if truncated {
            0
        } else {
            entry.extent.max(extent)
        };

        if access.contains(AccessMode::WRITE) && !entry.access.contains(AccessMode::WRITE) {
            log::debug!("[SESSION] backing {} upgraded to writable object", id);
            entry.access |= access;
            Some(core::mem::replace(&mut entry.object, object))
        } else {
            Some(object)
        }
    }

    /// 登记会话并分配句柄
    pub(crate) fn insert_session(&mut self, session: Session) -> Handle {
        // 跳过仍在使用的句柄（仅在 u32 回绕后可能发生）
        loop {
            let handle = Handle::new(self.next_handle);
            self.next_handle = self.next_handle.wrapping_add(1).max(1);
            if !self.sessions.contains_key(&handle) {
                self.sessions.insert(handle, session);
                return handle;
            }
        }
    }

    pub(crate) fn remove_session(&mut self, handle: Handle) -> Result<Session> {
        self.sessions
            .remove(&handle)
            .ok_or(Error::new(ErrorKind::InvalidHandle, "unknown session handle"))
    }

    /// 释放一个会话对后端的引用
    ///
    /// 会话数降为零时移除并返回后端条目
    pub(crate) fn release(&mut self, id: &BackingId) -> Option<Backing<O>> {
        let entry = self.backings.get_mut(id)?;
        entry.sessions = entry.sessions.saturating_sub(1);
        if entry.sessions == 0 {
            self.backings.remove(id)
        } else {
            None
        }
    }
}
