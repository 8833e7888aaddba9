//! 内存后端
//!
//! 对象按路径保存在共享表中，同一路径的多次打开看到同一份数据，
//! 关闭后重新打开能读到此前写回的内容。
//!
//! [`MemStore`] 可以廉价克隆：缓存持有一份，测试保留一份用于检查物理 I/O
//! 计数、写回日志，以及注入故障。

use super::{BackingObject, BackingStore};
use crate::consts::MEM_STORE_DEVICE;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{AccessMode, BackingId, CreationMode};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::cell::RefCell;

bitflags! {
    /// 注入的故障
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemFaults: u8 {
        /// 打开失败
        const OPEN     = 0x01;
        /// 获取标识失败
        const IDENTITY = 0x02;
        /// 块读取失败
        const READ     = 0x04;
        /// 块写入失败
        const WRITE    = 0x08;
        /// 持久化刷新失败
        const FLUSH    = 0x10;
        /// 获取长度失败
        const SIZE     = 0x20;
    }
}

#[derive(Debug, Default)]
struct MemFile {
    id: u64,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Shared {
    files: BTreeMap<String, MemFile>,
    next_id: u64,
    faults: MemFaults,
    opens: u64,
    closes: u64,
    reads: u64,
    writes: u64,
    flushes: u64,
    /// 按发生顺序记录的块写入 (对象, 块号)
    write_log: Vec<(BackingId, u64)>,
}

impl Shared {
    fn create(&mut self, path: &str) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.files.insert(
            String::from(path),
            MemFile {
                id,
                data: Vec::new(),
            },
        );
        id
    }

    fn file_mut(&mut self, path: &str) -> Result<&mut MemFile> {
        self.files
            .get_mut(path)
            .ok_or(Error::new(ErrorKind::BackingIo, "memory object vanished"))
    }
}

/// 内存后端存储
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    shared: Rc<RefCell<Shared>>,
}

impl MemStore {
    /// 创建空的内存后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入（或替换）一个对象的全部内容，返回其标识
    pub fn insert_file(&self, path: &str, data: &[u8]) -> BackingId {
        let mut shared = self.shared.borrow_mut();
        let existing = shared.files.get(path).map(|f| f.id);
        let id = match existing {
            Some(id) => id,
            None => shared.create(path),
        };
        if let Some(file) = shared.files.get_mut(path) {
            file.data = data.to_vec();
        }
        BackingId::new(MEM_STORE_DEVICE, id)
    }

    /// 对象当前内容（即已写回后端的数据）
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.shared.borrow().files.get(path).map(|f| f.data.clone())
    }

    /// 对象标识
    pub fn identity_of(&self, path: &str) -> Option<BackingId> {
        self.shared
            .borrow()
            .files
            .get(path)
            .map(|f| BackingId::new(MEM_STORE_DEVICE, f.id))
    }

    /// 注入故障（与已有故障合并）
    pub fn inject(&self, faults: MemFaults) {
        self.shared.borrow_mut().faults.insert(faults);
    }

    /// 清除所有故障
    pub fn clear_faults(&self) {
        self.shared.borrow_mut().faults = MemFaults::empty();
    }

    /// 打开次数
    pub fn opens(&self) -> u64 {
        self.shared.borrow().opens
    }

    /// 关闭次数
    pub fn closes(&self) -> u64 {
        self.shared.borrow().closes
    }

    /// 物理块读取次数
    pub fn physical_reads(&self) -> u64 {
        self.shared.borrow().reads
    }

    /// 物理块写入次数
    pub fn physical_writes(&self) -> u64 {
        self.shared.borrow().writes
    }

    /// 持久化刷新次数
    pub fn flushes(&self) -> u64 {
        self.shared.borrow().flushes
    }

    /// 块写入日志
    pub fn write_log(&self) -> Vec<(BackingId, u64)> {
        self.shared.borrow().write_log.clone()
    }

    /// 清零计数并清空写入日志
    pub fn reset_counters(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.opens = 0;
        shared.closes = 0;
        shared.reads = 0;
        shared.writes = 0;
        shared.flushes = 0;
        shared.write_log.clear();
    }
}

impl BackingStore for MemStore {
    type Object = MemObject;

    fn open(
        &mut self,
        path: &str,
        access: AccessMode,
        creation: CreationMode,
    ) -> Result<MemObject> {
        let mut shared = self.shared.borrow_mut();
        if shared.faults.contains(MemFaults::OPEN) {
            return Err(Error::new(ErrorKind::BackingOpen, "injected open failure"));
        }

        let exists = shared.files.contains_key(path);
        match (creation, exists) {
            (CreationMode::CreateNew, true) => {
                return Err(Error::new(ErrorKind::BackingOpen, "object already exists"));
            }
            (CreationMode::OpenExisting | CreationMode::TruncateExisting, false) => {
                return Err(Error::new(ErrorKind::BackingOpen, "object not found"));
            }
            _ => {}
        }

        let id = if exists {
            let file = shared.file_mut(path)?;
            if creation.truncates() {
                file.data.clear();
            }
            file.id
        } else {
            shared.create(path)
        };
        shared.opens += 1;

        log::debug!("[STORE] mem open {} id={} ({:?})", path, id, creation);
        Ok(MemObject {
            shared: Rc::clone(&self.shared),
            path: String::from(path),
            id: BackingId::new(MEM_STORE_DEVICE, id),
            access,
        })
    }
}

/// 内存后端对象
#[derive(Debug)]
pub struct MemObject {
    shared: Rc<RefCell<Shared>>,
    path: String,
    id: BackingId,
    access: AccessMode,
}

fn block_range(index: u64, len: usize) -> Result<(usize, usize)> {
    let start = usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_mul(len))
        .ok_or(Error::new(ErrorKind::BackingIo, "block offset overflow"))?;
    let end = start
        .checked_add(len)
        .ok_or(Error::new(ErrorKind::BackingIo, "block offset overflow"))?;
    Ok((start, end))
}

impl BackingObject for MemObject {
    fn identity(&self) -> Result<BackingId> {
        if self.shared.borrow().faults.contains(MemFaults::IDENTITY) {
            return Err(Error::new(ErrorKind::BackingOpen, "injected identity failure"));
        }
        Ok(self.id)
    }

    fn size(&self) -> Result<u64> {
        let shared = self.shared.borrow();
        if shared.faults.contains(MemFaults::SIZE) {
            return Err(Error::new(ErrorKind::BackingIo, "injected size failure"));
        }
        let len = shared.files.get(&self.path).map(|f| f.data.len() as u64);
        len.ok_or(Error::new(ErrorKind::BackingIo, "memory object vanished"))
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<usize> {
        let mut shared = self.shared.borrow_mut();
        if shared.faults.contains(MemFaults::READ) {
            return Err(Error::new(ErrorKind::BackingIo, "injected read failure"));
        }
        shared.reads += 1;

        let (start, end) = block_range(index, buf.len())?;
        let file = shared.file_mut(&self.path)?;
        if start >= file.data.len() {
            return Ok(0);
        }
        let end = end.min(file.data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&file.data[start..end]);
        Ok(n)
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.faults.contains(MemFaults::WRITE) {
            return Err(Error::new(ErrorKind::BackingIo, "injected write failure"));
        }
        if !self.access.contains(AccessMode::WRITE) {
            return Err(Error::new(
                ErrorKind::BackingIo,
                "object not opened for writing",
            ));
        }
        shared.writes += 1;
        shared.write_log.push((self.id, index));

        let (start, end) = block_range(index, buf.len())?;
        let file = shared.file_mut(&self.path)?;
        if file.data.len() < end {
            file.data.resize(end, 0);
        }
        file.data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.faults.contains(MemFaults::FLUSH) {
            return Err(Error::new(ErrorKind::BackingIo, "injected flush failure"));
        }
        shared.flushes += 1;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.shared.borrow_mut().closes += 1;
        log::debug!("[STORE] mem close {}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creation_modes() {
        let mut store = MemStore::new();

        let err = store
            .open("a", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);

        store
            .open("a", AccessMode::READ_WRITE, CreationMode::CreateNew)
            .unwrap();
        let err = store
            .open("a", AccessMode::READ_WRITE, CreationMode::CreateNew)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingOpen);

        store
            .open("a", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();
        store
            .open("b", AccessMode::READ_WRITE, CreationMode::OpenAlways)
            .unwrap();
        assert_eq!(store.opens(), 3);
    }

    #[test]
    fn test_same_path_same_identity() {
        let mut store = MemStore::new();
        let a = store
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let b = store
            .open("f", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();
        let c = store
            .open("g", AccessMode::READ, CreationMode::OpenAlways)
            .unwrap();

        assert_eq!(a.identity().unwrap(), b.identity().unwrap());
        assert_ne!(a.identity().unwrap(), c.identity().unwrap());
        assert_eq!(store.identity_of("f"), Some(a.identity().unwrap()));
    }

    #[test]
    fn test_short_read_at_end() {
        let mut store = MemStore::new();
        store.insert_file("f", &[1u8; 700]);
        let mut obj = store
            .open("f", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();

        let mut buf = [0u8; 512];
        assert_eq!(obj.read_block(0, &mut buf).unwrap(), 512);
        assert_eq!(obj.read_block(1, &mut buf).unwrap(), 188);
        assert_eq!(obj.read_block(2, &mut buf).unwrap(), 0);
        assert_eq!(store.physical_reads(), 3);
    }

    #[test]
    fn test_write_extends_and_logs() {
        let mut store = MemStore::new();
        let mut obj = store
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let id = obj.identity().unwrap();

        obj.write_block(2, &[9u8; 512]).unwrap();
        let data = store.contents("f").unwrap();
        assert_eq!(data.len(), 1536);
        assert!(data[..1024].iter().all(|&b| b == 0));
        assert!(data[1024..].iter().all(|&b| b == 9));
        assert_eq!(store.write_log(), alloc::vec![(id, 2)]);
        assert_eq!(obj.size().unwrap(), 1536);
    }

    #[test]
    fn test_read_only_object_rejects_write() {
        let mut store = MemStore::new();
        store.insert_file("f", &[]);
        let mut obj = store
            .open("f", AccessMode::READ, CreationMode::OpenExisting)
            .unwrap();
        let err = obj.write_block(0, &[0u8; 512]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackingIo);
    }

    #[test]
    fn test_truncating_open_clears_data() {
        let mut store = MemStore::new();
        let id = store.insert_file("f", &[5u8; 100]);
        let obj = store
            .open("f", AccessMode::READ_WRITE, CreationMode::TruncateExisting)
            .unwrap();
        assert_eq!(obj.identity().unwrap(), id);
        assert_eq!(store.contents("f").unwrap().len(), 0);
    }

    #[test]
    fn test_fault_injection() {
        let mut store = MemStore::new();
        let mut obj = store
            .open("f", AccessMode::READ_WRITE, CreationMode::CreateAlways)
            .unwrap();
        let mut buf = [0u8; 512];

        store.inject(MemFaults::READ | MemFaults::FLUSH);
        assert_eq!(
            obj.read_block(0, &mut buf).unwrap_err().kind(),
            ErrorKind::BackingIo
        );
        assert_eq!(obj.flush().unwrap_err().kind(), ErrorKind::BackingIo);
        assert!(obj.write_block(0, &buf).is_ok());

        store.inject(MemFaults::IDENTITY | MemFaults::SIZE);
        assert_eq!(obj.identity().unwrap_err().kind(), ErrorKind::BackingOpen);
        assert_eq!(obj.size().unwrap_err().kind(), ErrorKind::BackingIo);

        store.clear_faults();
        assert!(obj.flush().is_ok());
        assert_eq!(store.flushes(), 1);

        obj.close().unwrap();
        assert_eq!(store.closes(), 1);
    }
}
