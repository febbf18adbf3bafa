//! 波长资源掩码
//!
//! 每条单向链路一个固定宽度的可用性位向量（bit 为 1 表示波长空闲）。
//! 同一类型也用作信令消息里的候选波长集合：从满集合出发，逐跳与链路掩码求交，
//! 只会缩小不会增大。

use crate::error::MaskError;
use serde::{Deserialize, Serialize};

const WORD_BITS: u32 = 64;

/// 波长可用性位向量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMask {
    len: u32,
    words: Vec<u64>,
}

impl ResourceMask {
    /// 全部空闲
    pub fn full(len: u32) -> Self {
        let n_words = len.div_ceil(WORD_BITS) as usize;
        let mut words = vec![u64::MAX; n_words];
        // 最后一个字里超出 len 的位保持为 0，count/first 才不会越界。
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
        Self { len, words }
    }

    /// 全部占用
    pub fn empty(len: u32) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS) as usize],
        }
    }

    /// 波长数
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.count_available() == 0
    }

    fn locate(&self, index: u32) -> Result<(usize, u64), MaskError> {
        if index >= self.len {
            return Err(MaskError::OutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(((index / WORD_BITS) as usize, 1u64 << (index % WORD_BITS)))
    }

    pub fn is_available(&self, index: u32) -> bool {
        match self.locate(index) {
            Ok((w, bit)) => self.words[w] & bit != 0,
            Err(_) => false,
        }
    }

    /// 按位与。宽度必须一致。
    pub fn intersect(&mut self, other: &ResourceMask) -> Result<(), MaskError> {
        if self.len != other.len {
            return Err(MaskError::WidthMismatch {
                left: self.len,
                right: other.len,
            });
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
        Ok(())
    }

    /// 下标最小的空闲波长（first-fit）
    pub fn first_available(&self) -> Option<u32> {
        self.words.iter().enumerate().find_map(|(i, &w)| {
            (w != 0).then(|| i as u32 * WORD_BITS + w.trailing_zeros())
        })
    }

    pub fn count_available(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// 所有空闲波长（升序）
    pub fn available(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).filter(|&i| self.is_available(i))
    }

    /// 预留波长；已被占用时返回 `AlreadyUsed`（竞争）。
    pub fn set_used(&mut self, index: u32) -> Result<(), MaskError> {
        let (w, bit) = self.locate(index)?;
        if self.words[w] & bit == 0 {
            return Err(MaskError::AlreadyUsed(index));
        }
        self.words[w] &= !bit;
        Ok(())
    }

    /// 释放波长；未被预留时返回 `NotReserved`（不变量被破坏）。
    pub fn clear(&mut self, index: u32) -> Result<(), MaskError> {
        let (w, bit) = self.locate(index)?;
        if self.words[w] & bit != 0 {
            return Err(MaskError::NotReserved(index));
        }
        self.words[w] |= bit;
        Ok(())
    }
}
