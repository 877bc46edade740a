use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FieldMapError, Result};
use crate::grid::{DefinedMask, Grid3D};
use crate::vec3::{self, Vec3};

/// 磁场图的来源格式
///
/// 同一个磁场管理器里只允许一种格式，两种格式要求的环形半径不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapType {
    /// 旧的二进制记录格式（cm / kG）
    #[serde(rename = "GMC")]
    Gmc,
    /// G4BL 文本网格格式及其二进制缓存（mm / T）
    #[serde(rename = "G4BL")]
    G4bl,
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapType::Gmc => f.write_str("GMC"),
            MapType::G4bl => f.write_str("G4BL"),
        }
    }
}

/// 可查询区域（闭区间，单位 mm）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Limits {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl Limits {
    pub fn contains(&self, p: Vec3) -> bool {
        // NaN 坐标在这里被拒绝
        p[0] >= self.xmin
            && p[0] <= self.xmax
            && p[1] >= self.ymin
            && p[1] <= self.ymax
            && p[2] >= self.zmin
            && p[2] <= self.zmax
    }

    fn min(&self) -> Vec3 {
        [self.xmin, self.ymin, self.zmin]
    }

    fn max(&self) -> Vec3 {
        [self.xmax, self.ymax, self.zmax]
    }
}

/// 一个区域的磁场图
///
/// 由解析器创建并填充一次，加入磁场管理器之后不再修改。
#[derive(Debug, Clone)]
pub struct FieldMap {
    key: String,
    shape: [usize; 3],
    map_type: MapType,
    scale_factor: f64,
    limits: Option<Limits>,
    spacing: Vec3,
    grid: Grid3D<Vec3>,
    field: Grid3D<Vec3>,
    defined: DefinedMask,
}

impl FieldMap {
    /// 创建声明维度的空磁场图，所有格点都未定义
    pub fn new(key: impl Into<String>, shape: [usize; 3], map_type: MapType, scale_factor: f64) -> Self {
        let grid = Grid3D::new(shape);
        let defined = DefinedMask::new(grid.as_slice().len());
        FieldMap {
            key: key.into(),
            shape,
            map_type,
            scale_factor,
            limits: None,
            spacing: vec3::ZERO,
            field: Grid3D::new(shape),
            grid,
            defined,
        }
    }

    /// 设置可查询区域，只能调用一次
    pub fn set_limits(
        &mut self,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
        zmin: f64,
        zmax: f64,
    ) -> Result<()> {
        if self.limits.is_some() {
            return Err(FieldMapError::LimitsAlreadySet {
                key: self.key.clone(),
            });
        }
        let limits = Limits {
            xmin,
            xmax,
            ymin,
            ymax,
            zmin,
            zmax,
        };
        let (lo, hi) = (limits.min(), limits.max());
        for axis in 0..3 {
            let n = self.shape[axis];
            self.spacing[axis] = if n > 1 {
                (hi[axis] - lo[axis]) / (n - 1) as f64
            } else {
                0.0
            };
        }
        self.limits = Some(limits);
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn limits(&self) -> Option<Limits> {
        self.limits
    }

    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    pub fn contains(&self, p: Vec3) -> bool {
        self.limits.is_some_and(|l| l.contains(p))
    }

    /// 已定义格点的数量
    pub fn defined_count(&self) -> usize {
        self.defined.count()
    }

    /// 越界的编号视为未定义
    pub fn is_defined(&self, ix: usize, iy: usize, iz: usize) -> bool {
        let [nx, ny, nz] = self.shape;
        ix < nx && iy < ny && iz < nz && self.defined.get(self.grid.index(ix, iy, iz))
    }

    /// 某个已定义格点存储的位置和磁场
    pub fn node(&self, ix: usize, iy: usize, iz: usize) -> Option<(Vec3, Vec3)> {
        if !self.is_defined(ix, iy, iz) {
            return None;
        }
        Some((*self.grid.get(ix, iy, iz), *self.field.get(ix, iy, iz)))
    }

    /// 坐标值在某个轴上最近的格点编号，调用前必须已经设置边界
    pub(crate) fn nearest_index(&self, axis: usize, value: f64) -> usize {
        let Some(limits) = self.limits else {
            return 0;
        };
        let d = self.spacing[axis];
        if d == 0.0 {
            return 0;
        }
        let t = ((value - limits.min()[axis]) / d).round();
        (t.max(0.0) as usize).min(self.shape[axis] - 1)
    }

    pub(crate) fn store(&mut self, ix: usize, iy: usize, iz: usize, position: Vec3, field: Vec3) {
        let idx = self.grid.index(ix, iy, iz);
        self.grid.set(ix, iy, iz, position);
        self.field.set(ix, iy, iz, field);
        self.defined.set(idx);
    }

    pub(crate) fn mark_all_defined(&mut self) {
        self.defined.set_all();
    }

    pub(crate) fn grid_points(&self) -> &[Vec3] {
        self.grid.as_slice()
    }

    pub(crate) fn field_values(&self) -> &[Vec3] {
        self.field.as_slice()
    }

    pub(crate) fn grid_points_mut(&mut self) -> &mut [Vec3] {
        self.grid.as_mut_slice()
    }

    pub(crate) fn field_values_mut(&mut self) -> &mut [Vec3] {
        self.field.as_mut_slice()
    }

    /// 把缩放因子乘进存储的磁场值，由管理器构建时调用一次
    pub(crate) fn apply_scale_factor(&mut self) {
        if self.scale_factor == 1.0 {
            return;
        }
        let s = self.scale_factor;
        for b in self.field.as_mut_slice() {
            *b = vec3::scale(*b, s);
        }
    }

    /// 三线性插值得到 `p` 处的磁场
    ///
    /// 点在边界之外，或者所在网格单元 8 个角点中任何一个未定义时返回 `None`，
    /// 不做外推。
    pub fn interpolated_field(&self, p: Vec3) -> Option<Vec3> {
        let limits = self.limits?;
        if !limits.contains(p) {
            return None;
        }

        let lo = limits.min();
        let mut i0 = [0usize; 3];
        let mut i1 = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let n = self.shape[axis];
            let d = self.spacing[axis];
            if n < 2 || d == 0.0 {
                continue;
            }
            let t = (p[axis] - lo[axis]) / d;
            let i = (t.floor() as usize).min(n - 2);
            i0[axis] = i;
            i1[axis] = i + 1;
            frac[axis] = t - i as f64;
        }

        let corners = [i0, i1];
        let mut b = [[[vec3::ZERO; 2]; 2]; 2];
        for (cx, bx) in b.iter_mut().enumerate() {
            for (cy, by) in bx.iter_mut().enumerate() {
                for (cz, bz) in by.iter_mut().enumerate() {
                    let (ix, iy, iz) = (corners[cx][0], corners[cy][1], corners[cz][2]);
                    let idx = self.field.index(ix, iy, iz);
                    if !self.defined.get(idx) {
                        return None;
                    }
                    *bz = self.field.as_slice()[idx];
                }
            }
        }

        // 先沿 z，再沿 y，最后沿 x
        let [fx, fy, fz] = frac;
        let c00 = vec3::lerp(b[0][0][0], b[0][0][1], fz);
        let c01 = vec3::lerp(b[0][1][0], b[0][1][1], fz);
        let c10 = vec3::lerp(b[1][0][0], b[1][0][1], fz);
        let c11 = vec3::lerp(b[1][1][0], b[1][1][1], fz);
        let c0 = vec3::lerp(c00, c01, fy);
        let c1 = vec3::lerp(c10, c11, fy);
        Some(vec3::lerp(c0, c1, fx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 2x3x2 的完整网格，磁场随位置线性变化，便于检查插值结果
    fn linear_map() -> FieldMap {
        let mut map = FieldMap::new("DS", [2, 3, 2], MapType::G4bl, 1.0);
        map.set_limits(0.0, 10.0, 0.0, 20.0, 0.0, 10.0).unwrap();
        for ix in 0..2 {
            for iy in 0..3 {
                for iz in 0..2 {
                    let p = [ix as f64 * 10.0, iy as f64 * 10.0, iz as f64 * 10.0];
                    map.store(ix, iy, iz, p, [p[0] * 0.01, p[1] * 0.02, 1.0 + p[2] * 0.03]);
                }
            }
        }
        map
    }

    #[test]
    fn interpolation_is_exact_for_linear_field() {
        let map = linear_map();
        let b = map.interpolated_field([2.5, 13.0, 7.0]).unwrap();
        assert_abs_diff_eq!(b[0], 0.025, epsilon = 1e-12);
        assert_abs_diff_eq!(b[1], 0.26, epsilon = 1e-12);
        assert_abs_diff_eq!(b[2], 1.21, epsilon = 1e-12);
    }

    #[test]
    fn grid_points_return_stored_values() {
        let map = linear_map();
        for ix in 0..2 {
            for iy in 0..3 {
                for iz in 0..2 {
                    let (pos, stored) = map.node(ix, iy, iz).unwrap();
                    let b = map.interpolated_field(pos).unwrap();
                    for k in 0..3 {
                        assert_abs_diff_eq!(b[k], stored[k], epsilon = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn repeated_queries_are_identical() {
        let map = linear_map();
        let p = [3.3, 17.1, 0.4];
        assert_eq!(map.interpolated_field(p), map.interpolated_field(p));
    }

    #[test]
    fn outside_limits_is_undefined() {
        let map = linear_map();
        assert!(map.interpolated_field([-0.001, 5.0, 5.0]).is_none());
        assert!(map.interpolated_field([5.0, 20.001, 5.0]).is_none());
        assert!(map.interpolated_field([5.0, 5.0, f64::NAN]).is_none());
    }

    #[test]
    fn undefined_corner_makes_cell_undefined() {
        let mut map = FieldMap::new("TS", [2, 2, 3], MapType::Gmc, 1.0);
        map.set_limits(0.0, 1.0, 0.0, 1.0, 0.0, 2.0).unwrap();
        for ix in 0..2 {
            for iy in 0..2 {
                for iz in 0..3 {
                    if (ix, iy, iz) != (1, 1, 2) {
                        map.store(ix, iy, iz, [ix as f64, iy as f64, iz as f64], [0.0, 0.0, 1.0]);
                    }
                }
            }
        }
        assert_eq!(map.interpolated_field([0.5, 0.5, 0.5]), Some([0.0, 0.0, 1.0]));
        assert!(map.interpolated_field([0.5, 0.5, 1.5]).is_none());
        assert!(map.node(1, 1, 2).is_none());
    }

    #[test]
    fn out_of_range_indices_are_undefined() {
        let mut map = FieldMap::new("TS", [2, 2, 3], MapType::Gmc, 1.0);
        // (0, 1, 0) 与越界的 (0, 0, 3) 在存储中是同一个位置
        map.store(0, 1, 0, [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
        assert!(map.is_defined(0, 1, 0));
        assert!(!map.is_defined(0, 0, 3));
        assert!(!map.is_defined(2, 0, 0));
        assert!(!map.is_defined(0, 2, 0));
        assert!(map.node(0, 0, 3).is_none());
    }

    #[test]
    fn query_before_limits_is_undefined() {
        let map = FieldMap::new("PS", [2, 2, 2], MapType::Gmc, 1.0);
        assert!(map.interpolated_field([0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn limits_can_only_be_set_once() {
        let mut map = FieldMap::new("PS", [2, 2, 2], MapType::Gmc, 1.0);
        map.set_limits(0.0, 1.0, 0.0, 1.0, 0.0, 1.0).unwrap();
        let err = map.set_limits(0.0, 2.0, 0.0, 2.0, 0.0, 2.0).unwrap_err();
        assert!(matches!(err, FieldMapError::LimitsAlreadySet { .. }));
    }

    #[test]
    fn degenerate_axis_uses_single_plane() {
        let mut map = FieldMap::new("flat", [2, 1, 2], MapType::G4bl, 1.0);
        map.set_limits(0.0, 1.0, 5.0, 5.0, 0.0, 1.0).unwrap();
        for ix in 0..2 {
            for iz in 0..2 {
                map.store(ix, 0, iz, [ix as f64, 5.0, iz as f64], [ix as f64, 0.0, iz as f64]);
            }
        }
        let b = map.interpolated_field([0.25, 5.0, 0.75]).unwrap();
        assert_abs_diff_eq!(b[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(b[2], 0.75, epsilon = 1e-12);
        assert!(map.interpolated_field([0.25, 5.1, 0.75]).is_none());
    }

    #[test]
    fn scale_factor_multiplies_stored_field() {
        let mut map = FieldMap::new("DS", [2, 2, 2], MapType::G4bl, 2.0);
        map.set_limits(0.0, 1.0, 0.0, 1.0, 0.0, 1.0).unwrap();
        for i in 0..8 {
            map.store(i / 4, (i / 2) % 2, i % 2, [0.0; 3], [0.0, 0.0, 0.5]);
        }
        map.apply_scale_factor();
        assert_eq!(map.interpolated_field([0.5, 0.5, 0.5]), Some([0.0, 0.0, 1.0]));
    }
}
