//! 会话读写
//!
//! 读写请求按块分解（见 [`spans`]），每个块独立查询目录：
//! 命中直接在缓存块上操作，未命中先装入整块。命中/未命中按块计数。

use super::span::spans;
use super::DirectCache;
use crate::error::{Error, ErrorKind, Result};
use crate::store::BackingStore;
use crate::types::{AccessMode, CacheKey, Handle};

impl<S: BackingStore> DirectCache<S> {
    /// 从会话游标处读取
    ///
    /// 读取范围被截断到对象的逻辑长度，游标位于末尾或之后时返回 0。
    ///
    /// # 参数
    ///
    /// * `handle` - 会话句柄
    /// * `buf` - 目标缓冲区
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数，游标前进相同字节数
    ///
    /// # 错误
    ///
    /// - `InvalidHandle` / `AccessDenied`（会话没有 READ 权限）
    /// - `BackingIo`：装入块失败。该块不会留在目录中，游标不变
    pub fn read(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        let session = *self.table.session(handle)?;
        if !session.access.contains(AccessMode::READ) {
            return Err(Error::new(
                ErrorKind::AccessDenied,
                "session not opened for reading",
            ));
        }

        let extent = self.table.backing(&session.backing)?.extent;
        if session.cursor >= extent || buf.is_empty() {
            return Ok(0);
        }
        let len = usize::try_from(extent - session.cursor)
            .map_or(buf.len(), |avail| avail.min(buf.len()));

        for span in spans(session.cursor, len, self.config.block_size) {
            let key = CacheKey::new(session.backing, span.block);
            let dst = &mut buf[span.pos..span.pos + span.len];

            if let Some(block) = self.directory.lookup(&key) {
                block.copy_out(span.offset, dst);
                self.stats.hits += 1;
                log::trace!("[CACHE] read hit block {} of {}", key.block, key.backing);
                continue;
            }

            self.stats.misses += 1;
            log::debug!("[CACHE] read miss block {} of {}", key.block, key.backing);
            let block = self.install(key)?;
            block.copy_out(span.offset, dst);
        }

        self.table.session_mut(handle)?.cursor = session.cursor + len as u64;
        Ok(len)
    }

    /// 在会话游标处写入
    ///
    /// 命中块只在内容变化时置脏；未命中块先读出整块再覆盖（读-改-写），总是置脏。
    /// 写入越过逻辑长度时扩展逻辑长度。
    ///
    /// # 错误
    ///
    /// - `InvalidHandle` / `AccessDenied`（会话没有 WRITE 权限）
    /// - `InvalidArgument`：写入范围超出 u64 偏移
    /// - `BackingIo`：装入或驱逐写回失败。此前已写入的块保留，游标不变
    pub fn write(&mut self, handle: Handle, data: &[u8]) -> Result<usize> {
        let session = *self.table.session(handle)?;
        if !session.access.contains(AccessMode::WRITE) {
            return Err(Error::new(
                ErrorKind::AccessDenied,
                "session not opened for writing",
            ));
        }
        if data.is_empty() {
            return Ok(0);
        }
        let end = session
            .cursor
            .checked_add(data.len() as u64)
            .ok_or(Error::new(ErrorKind::InvalidArgument, "write beyond maximum offset"))?;

        for span in spans(session.cursor, data.len(), self.config.block_size) {
            let key = CacheKey::new(session.backing, span.block);
            let src = &data[span.pos..span.pos + span.len];

            if let Some(block) = self.directory.lookup(&key) {
                if block.apply(span.offset, src) {
                    log::trace!("[CACHE] write hit block {} of {}", key.block, key.backing);
                } else {
                    log::trace!(
                        "[CACHE] write hit block {} of {} unchanged",
                        key.block,
                        key.backing
                    );
                }
                self.stats.hits += 1;
            } else {
                self.stats.misses += 1;
                log::debug!("[CACHE] write miss block {} of {}", key.block, key.backing);
                let block = self.install(key)?;
                block.data_mut()[span.offset..span.offset + span.len].copy_from_slice(src);
                block.mark_dirty();
            }

            let written_to = session.cursor + (span.pos + span.len) as u64;
            let entry = self.table.backing_mut(&session.backing)?;
            entry.extent = entry.extent.max(written_to);
        }

        self.table.session_mut(handle)?.cursor = end;
        Ok(data.len())
    }
}
