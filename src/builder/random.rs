//! 按坐标确定的伪随机数
//!
//! 脚本可能被重复执行（如编辑后重跑），必须得到完全相同的几何体，
//! 因此所有随机性都以坐标和种子为键，不依赖全局随机状态。

use std::f64::consts::TAU;

/// `[0, 1)` 内的确定性伪随机数
///
/// `hash = (x*374761393 + y*668265263 + z*1274126177 + seed*1103515245) mod 2^32`，
/// 结果为 `frac(sin(hash) * 43758.5453123)`
pub fn random_at(x: i32, y: i32, z: i32, seed: i64) -> f64 {
    let hash = (x as i64)
        .wrapping_mul(374_761_393)
        .wrapping_add((y as i64).wrapping_mul(668_265_263))
        .wrapping_add((z as i64).wrapping_mul(1_274_126_177))
        .wrapping_add(seed.wrapping_mul(1_103_515_245))
        .rem_euclid(1 << 32);
    let v = (hash as f64).sin() * 43_758.545_312_3;
    let frac = v - v.floor();
    // 浮点舍入可能得到 1.0
    if frac >= 1.0 {
        0.0
    } else {
        frac
    }
}

/// 按坐标确定地从列表中选取一项
pub fn pick_at<T>(items: &[T], x: i32, y: i32, z: i32, seed: i64) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let i = (random_at(x, y, z, seed) * items.len() as f64) as usize;
    items.get(i.min(items.len() - 1))
}

/// 三个八度的正弦噪声场，值域约为 `[-1, 1]`
pub fn noise3(x: f64, y: f64, z: f64, scale: f64, seed: i64) -> f64 {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let mut total = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0 / scale;
    for octave in 0..3 {
        let phase = random_at(octave, 0, 0, seed) * TAU;
        let v = ((x * frequency + phase).sin()
            + (y * frequency * 1.17 + phase * 1.3).sin()
            + (z * frequency * 1.31 + phase * 0.7).sin())
            / 3.0;
        total += v * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    total / norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(random_at(0, 0, 0, 0), 0.0);
        // hash(1,2,3,0) = 5533670450 mod 2^32 = 1238703154
        let expected = {
            let v = (1_238_703_154f64).sin() * 43_758.545_312_3;
            v - v.floor()
        };
        assert_eq!(random_at(1, 2, 3, 0), expected);
    }

    #[test]
    fn test_repeatable_and_in_range() {
        for x in -20..20 {
            for z in -20..20 {
                let a = random_at(x, 7, z, 42);
                let b = random_at(x, 7, z, 42);
                assert_eq!(a, b);
                assert!((0.0..1.0).contains(&a));
            }
        }
    }

    #[test]
    fn test_seed_changes_output() {
        let same = (0..50)
            .filter(|&i| random_at(i, 0, 0, 1) == random_at(i, 0, 0, 2))
            .count();
        assert!(same < 5);
    }

    #[test]
    fn test_negative_coordinates_wrap() {
        let v = random_at(-1, -1, -1, -1);
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn test_pick_at() {
        let items = ["a", "b", "c"];
        assert_eq!(pick_at(&items, 3, 4, 5, 0), pick_at(&items, 3, 4, 5, 0));
        assert!(pick_at::<&str>(&[], 0, 0, 0, 0).is_none());
    }

    #[test]
    fn test_noise_bounded() {
        for i in 0..100 {
            let n = noise3(i as f64 * 0.7, 3.0, i as f64 * -1.3, 4.0, 9);
            assert!((-1.0..=1.0).contains(&n));
        }
    }
}
