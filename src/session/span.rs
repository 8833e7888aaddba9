//! 字节区间的块分解
//!
//! 把 [start, start + len) 切成若干 (块号, 块内偏移, 长度) 片段，
//! 每个片段落在单个块内。

/// 单块内的片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// 块号
    pub block: u64,
    /// 块内起始偏移
    pub offset: usize,
    /// 片段长度
    pub len: usize,
    /// 片段在调用者缓冲区中的起始位置
    pub pos: usize,
}

/// 片段迭代器
#[derive(Debug, Clone)]
pub struct Spans {
    cursor: u64,
    pos: usize,
    len: usize,
    block_size: usize,
}

/// 分解字节区间
///
/// # 参数
///
/// * `start` - 起始字节偏移
/// * `len` - 区间长度
/// * `block_size` - 块大小（非零）
pub fn spans(start: u64, len: usize, block_size: usize) -> Spans {
    Spans {
        cursor: start,
        pos: 0,
        len,
        block_size,
    }
}

impl Iterator for Spans {
    type Item = BlockSpan;

    fn next(&mut self) -> Option<BlockSpan> {
        if self.pos >= self.len {
            return None;
        }
        let bs = self.block_size as u64;
        let block = self.cursor / bs;
        let offset = (self.cursor % bs) as usize;
        let len = (self.block_size - offset).min(self.len - self.pos);

        let span = BlockSpan {
            block,
            offset,
            len,
            pos: self.pos,
        };
        self.cursor += len as u64;
        self.pos += len;
        Some(span)
    }
}
