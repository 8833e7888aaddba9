//! 文件后端
//!
//! 基于 `std::fs` 和按偏移的 I/O（`FileExt::read_at` / `write_at`）。
//! 在 Linux 上默认以 `O_DIRECT` 打开，绕过内核页缓存；此时块缓冲区地址、
//! 长度和偏移都必须按块对齐，由缓存层的 [`AlignedBuf`](crate::cache::AlignedBuf) 保证。
//!
//! 对象标识取自 (st_dev, st_ino)，同一文件经不同路径打开也能得到相同标识。

use super::{BackingObject, BackingStore};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{AccessMode, BackingId, CreationMode};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileExt, MetadataExt};

/// 文件后端存储
#[derive(Debug, Clone, Copy)]
pub struct FileStore {
    direct_io: bool,
}

impl Default for FileStore {
    fn default() -> Self {
        Self { direct_io: true }
    }
}

impl FileStore {
    /// 创建使用直接 I/O 的文件后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建不使用直接 I/O 的文件后端
    ///
    /// 用于不支持 `O_DIRECT` 的文件系统（如 tmpfs）
    pub fn buffered() -> Self {
        Self { direct_io: false }
    }

    /// 是否使用直接 I/O
    pub fn direct_io(&self) -> bool {
        self.direct_io
    }
}

#[cfg(target_os = "linux")]
fn request_direct_io(options: &mut OpenOptions) {
    use std::os::unix::fs::OpenOptionsExt;
    options.custom_flags(libc::O_DIRECT);
}

#[cfg(not(target_os = "linux"))]
fn request_direct_io(_options: &mut OpenOptions) {
    log::warn!("[STORE] O_DIRECT unsupported on this platform, using buffered I/O");
}

impl BackingStore for FileStore {
    type Object = FileObject;

    fn open(
        &mut self,
        path: &str,
        access: AccessMode,
        creation: CreationMode,
    ) -> Result<FileObject> {
        let mut options = OpenOptions::new();
        // 写缺失需要先读出整块，因此总是以可读方式打开
        options.read(true).write(access.contains(AccessMode::WRITE));
        match creation {
            CreationMode::OpenExisting => {}
            CreationMode::CreateNew => {
                options.create_new(true);
            }
            CreationMode::CreateAlways => {
                options.create(true).truncate(true);
            }
            CreationMode::OpenAlways => {
                options.create(true);
            }
            CreationMode::TruncateExisting => {
                options.truncate(true);
            }
        }
        if self.direct_io {
            request_direct_io(&mut options);
        }

        let file = options.open(path).map_err(|e| {
            Error::with_cause(ErrorKind::BackingOpen, "failed to open backing file", e)
        })?;

        log::debug!(
            "[STORE] file open {} ({:?}, direct_io={})",
            path,
            creation,
            self.direct_io
        );
        Ok(FileObject {
            file,
            direct_io: self.direct_io,
        })
    }
}

/// 文件后端对象
#[derive(Debug)]
pub struct FileObject {
    file: File,
    direct_io: bool,
}

fn block_offset(index: u64, len: usize) -> Result<u64> {
    index
        .checked_mul(len as u64)
        .ok_or(Error::new(ErrorKind::BackingIo, "block offset overflow"))
}

impl BackingObject for FileObject {
    fn identity(&self) -> Result<BackingId> {
        let meta = self.file.metadata().map_err(|e| {
            Error::with_cause(ErrorKind::BackingOpen, "failed to stat backing file", e)
        })?;
        Ok(BackingId::new(meta.dev(), meta.ino()))
    }

    fn size(&self) -> Result<u64> {
        let meta = self.file.metadata().map_err(|e| {
            Error::with_cause(ErrorKind::BackingIo, "failed to stat backing file", e)
        })?;
        Ok(meta.len())
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<usize> {
        let offset = block_offset(index, buf.len())?;
        let mut filled = 0;

        while filled < buf.len() {
            match self.file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    // 直接 I/O 的短读只会出现在文件末尾，且后续偏移不再对齐
                    if self.direct_io {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::with_cause(
                        ErrorKind::BackingIo,
                        "backing block read failed",
                        e,
                    ))
                }
            }
        }
        Ok(filled)
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let offset = block_offset(index, buf.len())?;
        self.file
            .write_all_at(buf, offset)
            .map_err(|e| Error::with_cause(ErrorKind::BackingIo, "backing block write failed", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| Error::with_cause(ErrorKind::BackingIo, "backing flush failed", e))
    }
}
