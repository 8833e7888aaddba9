//! 直接 I/O 块缓存核心类型
//!
//! [`DirectCache`] 拥有后端存储、打开文件表、缓存目录和统计信息，
//! 所有状态都在这一个值里，没有全局变量。

use super::table::{OpenFileTable, Session};
use crate::cache::{AlignedBuf, CacheBlock, CacheStats, Directory};
use crate::config::CacheConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::store::{BackingObject, BackingStore};
use crate::types::{AccessMode, BackingId, CacheKey, CreationMode, Handle, SeekMode};
use alloc::vec::Vec;
use core::fmt;

/// 直接 I/O 块缓存
///
/// 在绕过主机缓存打开的后端对象之上提供按字节的 open / read / write /
/// seek / sync / close，内部以整块、块对齐的方式访问后端。
///
/// 单线程同步使用。多线程场景下每个所有者各持有一个实例，
/// 或整体包在一把互斥锁里。
///
/// # 示例
///
/// ```rust,ignore
/// use dio_cache::{AccessMode, CacheConfig, CreationMode, DirectCache, FileStore, SeekMode};
///
/// let mut cache = DirectCache::new(FileStore::new(), CacheConfig::default())?;
/// let h = cache.open("/data/table.db", AccessMode::READ_WRITE, CreationMode::OpenAlways)?;
///
/// cache.write(h, b"hello")?;
/// cache.seek(h, 0, SeekMode::Start)?;
///
/// let mut buf = [0u8; 5];
/// cache.read(h, &mut buf)?;
/// cache.close(h)?;
/// ```
pub struct DirectCache<S: BackingStore> {
    store: S,
    pub(super) config: CacheConfig,
    pub(super) table: OpenFileTable<S::Object>,
    pub(super) directory: Directory,
    pub(super) stats: CacheStats,
}

impl<S: BackingStore> DirectCache<S> {
    /// 创建缓存
    ///
    /// # 错误
    ///
    /// 配置无效时返回 `InvalidArgument`
    pub fn new(store: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "[CACHE] created: block_size={} capacity={}",
            config.block_size,
            config.capacity
        );
        Ok(Self::assemble(store, config))
    }

    /// 使用默认配置（4096 字节块，512 块）创建缓存
    pub fn with_default_config(store: S) -> Self {
        Self::assemble(store, CacheConfig::default())
    }

    /// 用已校验的配置组装空缓存
    fn assemble(store: S, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            table: OpenFileTable::new(),
            directory: Directory::new(config.capacity),
            stats: CacheStats::default(),
        }
    }

    //=========================================================================
    // 会话管理
    //=========================================================================

    /// 打开后端对象，返回新会话的句柄
    ///
    /// 同一对象（按后端标识判断）的多个会话共享缓存块和逻辑长度。
    /// 以截断方式（`CreateAlways` / `TruncateExisting`）打开时，
    /// 该对象的驻留块直接丢弃，不写回。后端已截断但无法获取标识时，
    /// 无从得知对应哪个对象，驻留块保持不变；此时其他会话应关闭后重新打开。
    ///
    /// # 错误
    ///
    /// - `access` 为空：`InvalidArgument`
    /// - 后端打开或获取标识失败：`BackingOpen`
    pub fn open(
        &mut self,
        path: &str,
        access: AccessMode,
        creation: CreationMode,
    ) -> Result<Handle> {
        if access.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "access mode must include READ or WRITE",
            ));
        }

        let object = self
            .store
            .open(path, access, creation)
            .map_err(|e| e.recast(ErrorKind::BackingOpen))?;

        // 后端在 open 时已完成截断：拿到标识即丢弃旧块，与获取长度是否成功无关
        let truncated = creation.truncates();
        let identity = object.identity();
        if let (true, Ok(id)) = (truncated, &identity) {
            self.discard_backing(*id);
        }
        let probed = identity.and_then(|id| object.size().map(|size| (id, size)));
        let (id, size) = match probed {
            Ok(probed) => probed,
            Err(e) => {
                if let Err(close_err) = object.close() {
                    log::warn!("[SESSION] close after failed probe of {}: {}", path, close_err);
                }
                return Err(e.recast(ErrorKind::BackingOpen));
            }
        };

        if let Some(spare) = self.table.attach(id, object, access, size, truncated) {
            if let Err(e) = spare.close() {
                log::warn!("[SESSION] failed to close spare object of {}: {}", id, e);
            }
        }

        let handle = self.table.insert_session(Session {
            backing: id,
            cursor: 0,
            access,
        });
        log::debug!(
            "[SESSION] open {} -> {} backing={} ({:?}, {:?})",
            path,
            handle,
            id,
            access,
            creation
        );
        Ok(handle)
    }

    /// 关闭会话
    ///
    /// 先隐式同步该对象的所有脏块；同步失败时返回错误，会话保持打开。
    /// 对象的最后一个会话关闭后，清除其驻留块并关闭后端对象。
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let id = self.table.session(handle)?.backing;
        self.sync_backing(id)?;
        self.table.remove_session(handle)?;

        if let Some(entry) = self.table.release(&id) {
            for key in self.directory.keys_of(id) {
                self.directory.remove(&key);
            }
            entry
                .object
                .close()
                .map_err(|e| e.recast(ErrorKind::BackingIo))?;
            log::debug!("[SESSION] close {}: last session, backing {} released", handle, id);
        } else {
            log::debug!("[SESSION] close {}", handle);
        }
        Ok(())
    }

    /// 设置会话游标，返回新位置
    ///
    /// 只支持绝对定位（[`SeekMode::Start`]）。允许定位到逻辑长度之后。
    ///
    /// # 错误
    ///
    /// - 其他定位模式或负偏移：`InvalidArgument`，游标不变
    pub fn seek(&mut self, handle: Handle, offset: i64, mode: SeekMode) -> Result<u64> {
        let session = self.table.session_mut(handle)?;
        if mode != SeekMode::Start {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "only absolute seek is supported",
            ));
        }
        let position = u64::try_from(offset)
            .map_err(|_| Error::new(ErrorKind::InvalidArgument, "negative seek offset"))?;
        session.cursor = position;
        Ok(position)
    }

    /// 会话当前游标
    pub fn position(&self, handle: Handle) -> Result<u64> {
        Ok(self.table.session(handle)?.cursor)
    }

    /// 会话所在对象经由缓存看到的逻辑长度
    pub fn len(&self, handle: Handle) -> Result<u64> {
        let id = self.table.session(handle)?.backing;
        Ok(self.table.backing(&id)?.extent)
    }

    /// 会话所在对象的后端标识
    pub fn identity(&self, handle: Handle) -> Result<BackingId> {
        Ok(self.table.session(handle)?.backing)
    }

    /// 句柄是否对应一个打开的会话
    pub fn is_open(&self, handle: Handle) -> bool {
        self.table.contains(handle)
    }

    /// 打开的会话数
    pub fn open_sessions(&self) -> usize {
        self.table.session_count()
    }

    //=========================================================================
    // 同步
    //=========================================================================

    /// 把会话所在对象的所有脏块写回后端并持久化
    ///
    /// 逐块写回并清除脏标志，遇到第一个失败即返回 `BackingIo`（已写回的块保持干净）。
    pub fn sync(&mut self, handle: Handle) -> Result<()> {
        let id = self.table.session(handle)?.backing;
        self.sync_backing(id)
    }

    /// 同步所有打开的对象
    pub fn sync_all(&mut self) -> Result<()> {
        let ids: Vec<BackingId> = self.table.backing_ids().collect();
        for id in ids {
            self.sync_backing(id)?;
        }
        Ok(())
    }

    fn sync_backing(&mut self, id: BackingId) -> Result<()> {
        let keys = self.directory.keys_of(id);
        let entry = self.table.backing_mut(&id)?;
        let mut written = 0usize;

        for key in keys {
            let Some(block) = self.directory.peek_mut(&key) else {
                continue;
            };
            if !block.is_dirty() {
                continue;
            }
            entry
                .object
                .write_block(key.block, block.data())
                .map_err(|e| e.recast(ErrorKind::BackingIo))?;
            block.mark_clean();
            self.stats.writebacks += 1;
            written += 1;
        }

        entry
            .object
            .flush()
            .map_err(|e| e.recast(ErrorKind::BackingIo))?;
        log::debug!("[CACHE] sync {}: {} blocks written back", id, written);
        Ok(())
    }

    //=========================================================================
    // 块装入与驱逐
    //=========================================================================

    /// 装入一个未命中的块并返回其引用
    ///
    /// 目录已满时先驱逐一个块，再从后端读出整块（短读部分补零）插入目录。
    /// 装入失败时目录中不会留下该键。
    pub(super) fn install(&mut self, key: CacheKey) -> Result<&mut CacheBlock> {
        if self.directory.is_full() {
            self.evict_one()?;
        }
        let block = self.fetch(key)?;
        self.directory.insert(key, block)?;
        self.directory
            .peek_mut(&key)
            .ok_or(Error::new(ErrorKind::InvalidState, "installed block missing"))
    }

    fn fetch(&mut self, key: CacheKey) -> Result<CacheBlock> {
        let mut buf = AlignedBuf::zeroed(self.config.block_size)?;
        let entry = self.table.backing_mut(&key.backing)?;
        let n = entry
            .object
            .read_block(key.block, &mut buf)
            .map_err(|e| e.recast(ErrorKind::BackingIo))?;

        let n = n.min(buf.len());
        if n < buf.len() {
            buf[n..].fill(0);
        }
        self.stats.fetches += 1;
        log::debug!(
            "[CACHE] fetch block {} of {} ({} bytes)",
            key.block,
            key.backing,
            n
        );
        Ok(CacheBlock::new(buf))
    }

    /// 驱逐一个块
    ///
    /// 脏的牺牲块先写回；写回失败时返回 `BackingIo`，块留在目录中。
    fn evict_one(&mut self) -> Result<()> {
        let victim = self
            .directory
            .select_victim()
            .ok_or(Error::new(ErrorKind::InvalidState, "no eviction victim"))?;

        if let Some(block) = self.directory.peek_mut(&victim) {
            if block.is_dirty() {
                let entry = self.table.backing_mut(&victim.backing)?;
                if let Err(e) = entry.object.write_block(victim.block, block.data()) {
                    log::warn!(
                        "[CLOCK] write-back of block {} of {} failed, victim kept: {}",
                        victim.block,
                        victim.backing,
                        e
                    );
                    return Err(e.recast(ErrorKind::BackingIo));
                }
                block.mark_clean();
                self.stats.writebacks += 1;
            }
        }

        self.directory.remove(&victim);
        self.stats.evictions += 1;
        log::debug!("[CLOCK] evicted block {} of {}", victim.block, victim.backing);
        Ok(())
    }

    /// 丢弃对象的所有驻留块，不写回，并把已打开对象的逻辑长度清零
    fn discard_backing(&mut self, id: BackingId) {
        if let Ok(entry) = self.table.backing_mut(&id) {
            entry.extent = 0;
        }
        let mut dropped_dirty = 0usize;
        for key in self.directory.keys_of(id) {
            if self.directory.remove(&key).is_some_and(|b| b.is_dirty()) {
                dropped_dirty += 1;
            }
        }
        if dropped_dirty > 0 {
            log::warn!(
                "[SESSION] truncating open of {} discarded {} dirty blocks",
                id,
                dropped_dirty
            );
        }
    }

    //=========================================================================
    // 统计与检查
    //=========================================================================

    /// 统计信息
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 清零统计信息
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// 命中次数
    pub fn hits(&self) -> u64 {
        self.stats.hits
    }

    /// 未命中次数
    pub fn misses(&self) -> u64 {
        self.stats.misses
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 后端存储
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 缓存目录（只读）
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// 对象的驻留块数
    pub fn resident_blocks(&self, id: BackingId) -> usize {
        self.directory.keys_of(id).len()
    }

    /// 对象的脏块数
    pub fn dirty_blocks(&self, id: BackingId) -> usize {
        self.directory.dirty_count_of(id)
    }

    /// 脏块总数
    pub fn dirty_count(&self) -> usize {
        self.directory.dirty_count()
    }
}

impl<S: BackingStore> Drop for DirectCache<S> {
    fn drop(&mut self) {
        if let Err(e) = self.sync_all() {
            log::warn!("[CACHE] sync on drop failed, dirty blocks lost: {}", e);
        }
    }
}

impl<S: BackingStore> fmt::Debug for DirectCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectCache")
            .field("config", &self.config)
            .field("sessions", &self.table.session_count())
            .field("resident", &self.directory.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemFaults, MemStore};

    fn setup(block_size: usize, capacity: usize) -> (MemStore, DirectCache<MemStore>) {
        let store = MemStore::new();
        let cache =
            DirectCache::new(store.clone(), CacheConfig::new(block_size, capacity)).unwrap();
        (store, cache)
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let err = DirectCache::new(MemStore::new(), CacheConfig::new(1000, 4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let cache = DirectCache::with_default_config(MemStore::new());
        assert_eq!(cache.config(), &CacheConfig::default());
        assert_eq!(cache.directory().capacity(), 512);
    }

    #[test]
    fn test_open_and_close() {
        let (store, mut cache) = setup(512, 4);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateNew)
            .unwrap();
        assert!(cache.is_open(h));
        assert_eq!(cache.open_sessions(), 1);
        assert_eq!(cache.position(h).unwrap(), 0);
        assert_eq!(cache.len(h).unwrap(), 0);

        cache.close(h).unwrap();
        assert!(!cache.is_open(h));
        assert_eq!(cache.open_sessions(), 0);
        assert_eq!(store.closes(), 1);
    }

    #[test]
    fn test_open_errors() {
        let (store, mut cache) = setup(512, 4);

        let err = cache
            .open("f", AccessMode::empty(), CreationMode::OpenAlways)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = cache
            .open("missing", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);

        store.inject(MemFaults::OPEN);
        let err = cache
            .open("f", AccessMode::READ, CreationMode::OpenAlways)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);
        store.clear_faults();

        // 标识获取失败时，已打开的对象被关闭
        store.inject(MemFaults::IDENTITY);
        let err = cache
            .open("f", AccessMode::READ, CreationMode::OpenAlways)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);
        assert_eq!(store.closes(), 1);
        assert_eq!(cache.open_sessions(), 0);
    }

    #[test]
    fn test_unknown_handle() {
        let (_store, mut cache) = setup(512, 4);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        cache.close(h).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(cache.read(h, &mut buf).unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(cache.write(h, &buf).unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(
            cache.seek(h, 0, SeekMode::Start).unwrap_err().kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(cache.sync(h).unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(cache.close(h).unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(cache.position(h).unwrap_err().kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn test_seek_absolute_only() {
        let (_store, mut cache) = setup(512, 4);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();

        assert_eq!(cache.seek(h, 100, SeekMode::Start).unwrap(), 100);

        let err = cache.seek(h, -1, SeekMode::Start).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(cache.position(h).unwrap(), 100);

        let err = cache.seek(h, 10, SeekMode::Current).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = cache.seek(h, 0, SeekMode::End).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(cache.position(h).unwrap(), 100);

        // 允许定位到逻辑长度之后
        assert_eq!(cache.seek(h, 1 << 40, SeekMode::Start).unwrap(), 1 << 40);
    }

    #[test]
    fn test_sync_cleans_identity() {
        let (store, mut cache) = setup(512, 8);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let id = cache.identity(h).unwrap();

        cache.write(h, &[3u8; 1500]).unwrap();
        assert_eq!(cache.dirty_blocks(id), 3);
        assert!(store.write_log().is_empty());

        cache.sync(h).unwrap();
        assert_eq!(cache.dirty_blocks(id), 0);
        assert_eq!(cache.resident_blocks(id), 3);
        assert_eq!(store.write_log(), alloc::vec![(id, 0), (id, 1), (id, 2)]);
        assert_eq!(store.flushes(), 1);
        assert_eq!(cache.stats().writebacks, 3);

        // 同步后后端内容与写入一致（最后一块整块写回，长度按块对齐）
        let data = store.contents("f").unwrap();
        assert_eq!(data.len(), 1536);
        assert!(data[..1500].iter().all(|&b| b == 3));

        // 没有脏块时同步只做持久化刷新
        cache.sync(h).unwrap();
        assert_eq!(store.write_log().len(), 3);
        assert_eq!(store.flushes(), 2);
    }

    #[test]
    fn test_sync_write_failure_keeps_progress() {
        let (store, mut cache) = setup(512, 8);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let id = cache.identity(h).unwrap();
        cache.write(h, &[1u8; 1024]).unwrap();

        store.inject(MemFaults::WRITE);
        let err = cache.sync(h).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingIo);
        assert_eq!(cache.dirty_blocks(id), 2);
        assert_eq!(store.flushes(), 0);

        store.clear_faults();
        cache.sync(h).unwrap();
        assert_eq!(cache.dirty_blocks(id), 0);
    }

    #[test]
    fn test_flush_failure_keeps_session_open() {
        let (store, mut cache) = setup(512, 8);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        cache.write(h, &[7u8; 512]).unwrap();

        store.inject(MemFaults::FLUSH);
        assert_eq!(cache.sync(h).unwrap_err().kind(), ErrorKind::BackingIo);
        // 块已写回，只是持久化失败
        assert_eq!(cache.dirty_count(), 0);

        assert_eq!(cache.close(h).unwrap_err().kind(), ErrorKind::BackingIo);
        assert!(cache.is_open(h));
        assert_eq!(store.closes(), 0);

        store.clear_faults();
        cache.close(h).unwrap();
        assert!(!cache.is_open(h));
        assert_eq!(store.closes(), 1);
    }

    #[test]
    fn test_sync_all() {
        let (store, mut cache) = setup(512, 8);
        let a = cache
            .open("a", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let b = cache
            .open("b", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        cache.write(a, &[1u8; 600]).unwrap();
        cache.write(b, &[2u8; 100]).unwrap();
        assert_eq!(cache.dirty_count(), 3);

        cache.sync_all().unwrap();
        assert_eq!(cache.dirty_count(), 0);
        assert_eq!(store.flushes(), 2);
        assert_eq!(store.physical_writes(), 3);
    }

    #[test]
    fn test_shared_identity_across_sessions() {
        let (store, mut cache) = setup(512, 8);
        store.insert_file("f", &[0u8; 1024]);

        let reader = cache
            .open("f", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();
        let writer = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::OpenExisting)
            .unwrap();
        assert_ne!(reader, writer);
        let id = cache.identity(reader).unwrap();
        assert_eq!(cache.identity(writer).unwrap(), id);
        // 只读对象被可写对象替换并关闭
        assert_eq!(store.closes(), 1);

        cache.write(writer, b"shared").unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(cache.read(reader, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"shared");
        assert_eq!(cache.hits(), 1);

        // 游标各自独立
        assert_eq!(cache.position(writer).unwrap(), 6);
        assert_eq!(cache.position(reader).unwrap(), 6);
        cache.seek(reader, 0, SeekMode::Start).unwrap();
        assert_eq!(cache.position(writer).unwrap(), 6);

        // 第一个会话关闭后块仍然驻留
        cache.close(reader).unwrap();
        assert_eq!(cache.resident_blocks(id), 1);
        assert_eq!(&store.contents("f").unwrap()[..6], b"shared");

        // 最后一个会话关闭后块被清除，对象被关闭
        cache.close(writer).unwrap();
        assert_eq!(cache.resident_blocks(id), 0);
        assert_eq!(store.closes(), 2);
    }

    #[test]
    fn test_second_open_without_new_access_closes_spare() {
        let (store, mut cache) = setup(512, 8);
        let a = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let b = cache
            .open("f", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();
        assert_eq!(store.opens(), 2);
        assert_eq!(store.closes(), 1);

        // 只读会话不能写，即使驻留对象可写
        let err = cache.write(b, &[5u8; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        cache.write(a, &[5u8; 10]).unwrap();
        cache.close(a).unwrap();
        cache.close(b).unwrap();
        assert_eq!(store.closes(), 2);
    }

    #[test]
    fn test_truncating_open_discards_blocks() {
        let (store, mut cache) = setup(512, 8);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let id = cache.identity(h).unwrap();
        cache.write(h, &[9u8; 1024]).unwrap();
        assert_eq!(cache.dirty_blocks(id), 2);

        let t = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::TruncateExisting)
            .unwrap();
        assert_eq!(cache.resident_blocks(id), 0);
        assert_eq!(cache.len(h).unwrap(), 0);
        assert_eq!(cache.len(t).unwrap(), 0);

        let mut buf = [0u8; 16];
        cache.seek(h, 0, SeekMode::Start).unwrap();
        assert_eq!(cache.read(h, &mut buf).unwrap(), 0);

        cache.close(h).unwrap();
        cache.close(t).unwrap();
        assert!(store.write_log().is_empty());
        assert_eq!(store.contents("f").unwrap().len(), 0);
    }

    #[test]
    fn test_truncating_open_with_failed_size_still_discards() {
        let (store, mut cache) = setup(512, 8);
        let h = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let id = cache.identity(h).unwrap();
        cache.write(h, &[4u8; 1024]).unwrap();
        cache.sync(h).unwrap();
        assert_eq!(cache.resident_blocks(id), 2);

        store.inject(MemFaults::SIZE);
        let err = cache
            .open("f", AccessMode::READ_WRITE, CreationMode::TruncateExisting)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);
        store.clear_faults();

        // 后端已截断，其他会话不再看到截断前的块
        assert_eq!(store.contents("f").unwrap().len(), 0);
        assert_eq!(cache.resident_blocks(id), 0);
        assert_eq!(cache.len(h).unwrap(), 0);
        let mut buf = [0xFFu8; 16];
        cache.seek(h, 0, SeekMode::Start).unwrap();
        assert_eq!(cache.read(h, &mut buf).unwrap(), 0);
        assert_eq!(cache.open_sessions(), 1);
    }

    #[test]
    fn test_default_config_matches_validated_new() {
        let a = DirectCache::with_default_config(MemStore::new());
        let b = DirectCache::new(MemStore::new(), CacheConfig::default()).unwrap();
        assert_eq!(a.config(), b.config());
        assert_eq!(a.directory().capacity(), b.directory().capacity());
        assert!(a.directory().is_empty());
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.open_sessions(), 0);
    }

    #[test]
    fn test_drop_syncs_dirty_blocks() {
        let store = MemStore::new();
        {
            let mut cache = DirectCache::new(store.clone(), CacheConfig::new(512, 4)).unwrap();
            let h = cache
                .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
                .unwrap();
            cache.write(h, b"persist").unwrap();
        }
        assert_eq!(&store.contents("f").unwrap()[..7], b"persist");
    }
}
