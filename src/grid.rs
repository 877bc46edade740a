/// 单个磁场图允许的最大格点数
pub const MAX_GRID_CELLS: usize = 1 << 26;

/// nx * ny * nz，乘法溢出或超过 [`MAX_GRID_CELLS`] 时返回 `None`
pub fn checked_cell_count(shape: [usize; 3]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&cells| cells <= MAX_GRID_CELLS)
}

/// 三维规则网格上的稠密数组
///
/// 数据按 z 变化最快、y 其次、x 最慢的顺序连续存储，
/// 索引计算: index = (ix * ny + iy) * nz + iz
#[derive(Debug, Clone)]
pub struct Grid3D<T> {
    /// 网格维度 [nx, ny, nz]
    shape: [usize; 3],
    data: Vec<T>,
}

impl<T: Clone + Default> Grid3D<T> {
    /// 创建所有元素为默认值的网格
    pub fn new(shape: [usize; 3]) -> Self {
        let total = shape[0] * shape[1] * shape[2];
        Grid3D {
            shape,
            data: vec![T::default(); total],
        }
    }
}

impl<T> Grid3D<T> {
    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        debug_assert!(ix < self.shape[0] && iy < self.shape[1] && iz < self.shape[2]);
        (ix * self.shape[1] + iy) * self.shape[2] + iz
    }

    #[inline]
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> &T {
        &self.data[self.index(ix, iy, iz)]
    }

    #[inline]
    pub fn set(&mut self, ix: usize, iy: usize, iz: usize, value: T) {
        let idx = self.index(ix, iy, iz);
        self.data[idx] = value;
    }

    /// 按存储顺序访问整个数据数组
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// 标记网格中哪些格点真正从文件中读到了数据
///
/// 与 `Grid3D` 使用同一套索引，每个格点一位。
#[derive(Debug, Clone)]
pub struct DefinedMask {
    words: Vec<u64>,
    len: usize,
}

impl DefinedMask {
    pub fn new(len: usize) -> Self {
        DefinedMask {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// 把所有格点标记为已定义（完整盒子格式使用）
    pub fn set_all(&mut self) {
        for word in &mut self.words {
            *word = u64::MAX;
        }
        let tail = self.len % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_z_fastest() {
        let grid: Grid3D<u8> = Grid3D::new([2, 3, 4]);
        assert_eq!(grid.index(0, 0, 1), 1);
        assert_eq!(grid.index(0, 1, 0), 4);
        assert_eq!(grid.index(1, 0, 0), 12);
        assert_eq!(grid.index(1, 2, 3), 23);
    }

    #[test]
    fn cell_count_rejects_overflow_and_oversized_grids() {
        assert_eq!(checked_cell_count([2, 3, 4]), Some(24));
        assert_eq!(checked_cell_count([1, 1, MAX_GRID_CELLS]), Some(MAX_GRID_CELLS));
        assert_eq!(checked_cell_count([1, 2, MAX_GRID_CELLS]), None);
        assert_eq!(checked_cell_count([10_000_000; 3]), None);
        assert_eq!(checked_cell_count([usize::MAX, 2, 1]), None);
    }

    #[test]
    fn set_then_get() {
        let mut grid: Grid3D<[f64; 3]> = Grid3D::new([2, 2, 2]);
        grid.set(1, 0, 1, [1.0, 2.0, 3.0]);
        assert_eq!(*grid.get(1, 0, 1), [1.0, 2.0, 3.0]);
        assert_eq!(*grid.get(0, 0, 0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn mask_set_all_respects_length() {
        let mut mask = DefinedMask::new(70);
        assert_eq!(mask.count(), 0);
        mask.set(3);
        mask.set(69);
        assert!(mask.get(3));
        assert!(!mask.get(4));
        assert_eq!(mask.count(), 2);
        mask.set_all();
        assert_eq!(mask.count(), 70);
    }
}
