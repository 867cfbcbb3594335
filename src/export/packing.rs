//! 调色板索引的位打包
//!
//! 两种相反的约定不可混用：
//! - 跨字打包（Litematica）：索引连续排列，可以横跨两个 64 位字
//! - 对齐打包（1.16+ 区块格式，蓝图使用）：每个字只放整数个索引，剩余位留空

/// `ceil(log2(n))`，n <= 1 时为 0
pub fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// 跨字打包的位宽，最少 2 位
pub fn spanning_bits(palette_len: usize) -> u32 {
    ceil_log2(palette_len).max(2)
}

/// 对齐打包的位宽，最少 4 位
pub fn aligned_bits(palette_len: usize) -> u32 {
    ceil_log2(palette_len).max(4)
}

/// 跨字打包：第 i 个索引占用第 `i*bits` 位起的 `bits` 位
pub fn pack_spanning(indices: &[usize], bits: u32) -> Vec<i64> {
    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;
    let mut words = vec![0u64; (indices.len() * bits).div_ceil(64)];
    for (i, &value) in indices.iter().enumerate() {
        let v = value as u64 & mask;
        let bit = i * bits;
        let (word, offset) = (bit / 64, bit % 64);
        words[word] |= v << offset;
        if offset + bits > 64 {
            words[word + 1] |= v >> (64 - offset);
        }
    }
    words.into_iter().map(|w| w as i64).collect()
}

/// 对齐打包：每个字容纳 `64 / bits` 个索引
pub fn pack_aligned(indices: &[usize], bits: u32) -> Vec<i64> {
    let bits = bits as usize;
    let per_word = 64 / bits;
    let mask = (1u64 << bits) - 1;
    let mut words = vec![0u64; indices.len().div_ceil(per_word)];
    for (i, &value) in indices.iter().enumerate() {
        words[i / per_word] |= (value as u64 & mask) << ((i % per_word) * bits);
    }
    words.into_iter().map(|w| w as i64).collect()
}

pub fn unpack_spanning(words: &[i64], bits: u32, count: usize) -> Vec<usize> {
    let bits = bits as usize;
    let mask = (1u64 << bits) - 1;
    (0..count)
        .map(|i| {
            let bit = i * bits;
            let (word, offset) = (bit / 64, bit % 64);
            let mut v = (words[word] as u64) >> offset;
            if offset + bits > 64 {
                v |= (words[word + 1] as u64) << (64 - offset);
            }
            (v & mask) as usize
        })
        .collect()
}

pub fn unpack_aligned(words: &[i64], bits: u32, count: usize) -> Vec<usize> {
    let bits = bits as usize;
    let per_word = 64 / bits;
    let mask = (1u64 << bits) - 1;
    (0..count)
        .map(|i| (((words[i / per_word] as u64) >> ((i % per_word) * bits)) & mask) as usize)
        .collect()
}

/// 写入 VarInt（每字节 7 位，低位在前，最高位为续位标志）
pub fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        if value & !0x7F == 0 {
            out.push(value as u8);
            return;
        }
        out.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

/// 读取 VarInt，返回 (值, 消耗字节数)
pub fn read_varint(data: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for (i, &byte) in data.iter().enumerate().take(5) {
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_widths() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(5), 3);
        assert_eq!(ceil_log2(16), 4);
        assert_eq!(ceil_log2(17), 5);
        assert_eq!(spanning_bits(2), 2);
        assert_eq!(spanning_bits(5), 3);
        assert_eq!(aligned_bits(5), 4);
        assert_eq!(aligned_bits(33), 6);
    }

    #[test]
    fn test_spanning_crosses_words() {
        // 3 位宽：第 21 个索引占用第 63..66 位，跨越两个字
        let indices: Vec<usize> = (0..30).map(|i| i % 5).collect();
        let words = pack_spanning(&indices, 3);
        assert_eq!(words.len(), 2);
        assert_eq!(unpack_spanning(&words, 3, 30), indices);
        let v21 = ((words[0] as u64) >> 63) | (((words[1] as u64) & 0b11) << 1);
        assert_eq!(v21 as usize, indices[21]);
    }

    #[test]
    fn test_aligned_pads_words() {
        // 5 位宽：每字 12 个索引，最高 4 位留空
        let indices: Vec<usize> = (0..30).map(|i| i % 20).collect();
        let words = pack_aligned(&indices, 5);
        assert_eq!(words.len(), 3);
        assert_eq!((words[0] as u64) >> 60, 0);
        assert_eq!(unpack_aligned(&words, 5, 30), indices);
        // 两种约定结果不同
        assert_ne!(pack_spanning(&indices, 5), words);
    }

    #[test]
    fn test_varint() {
        let mut out = Vec::new();
        write_varint(&mut out, 0);
        write_varint(&mut out, 127);
        write_varint(&mut out, 128);
        write_varint(&mut out, 300);
        assert_eq!(out, vec![0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);
        assert_eq!(read_varint(&out[2..]), Some((128, 2)));
        assert_eq!(read_varint(&out[4..]), Some((300, 2)));
    }
}
