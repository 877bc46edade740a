use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{FieldMapError, Result};
use crate::field_map::FieldMap;
use crate::grid::{MAX_GRID_CELLS, checked_cell_count};
use crate::utils::decompress;
use crate::vec3::{self, Vec3};

/// 没有 "Origin shift" 注释的旧 G4BL 文件所用的坐标原点偏移 (mm)
pub const DEFAULT_ORIGIN_SHIFT: Vec3 = [-3904.0, 0.0, 7929.0];

/// 头部最多扫描的行数
pub const HEADER_SCAN_LINES: usize = 99;

const NUMBER: &str = r"([eE\d\-\+\.]+)";

static GRID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*grid\s+X0={n}\s+Y0={n}\s+Z0={n}\s+nX={n}\s+nY={n}\s+nZ={n}\s+dX={n}\s+dY={n}\s+dZ={n}.*$",
        n = NUMBER
    ))
    .expect("grid directive pattern is valid")
});

static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*#\s+Origin\s+shift\s+for\s+Mu2e:\s+{n}\s+{n}\s+{n}.*$",
        n = NUMBER
    ))
    .expect("origin shift pattern is valid")
});

/// G4BL 文件头中的网格描述
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    /// 文件中写的网格起点 (X0, Y0, Z0)
    pub origin: Vec3,
    /// (nX, nY, nZ)
    pub shape: [usize; 3],
    /// (dX, dY, dZ)
    pub spacing: Vec3,
    /// 坐标原点偏移，文件没有给出时为默认值
    pub offset: Vec3,
    pub offset_found: bool,
}

impl GridHeader {
    /// 打开（必要时解压）文件并解析头部
    pub fn read(path: &Path) -> Result<Self> {
        let reader = decompress::open_buffered(path).map_err(|e| FieldMapError::io(path, e))?;
        Self::parse(reader, path)
    }

    /// 在前 `HEADER_SCAN_LINES` 行中查找网格描述和可选的偏移注释
    pub fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut grid: Option<(Vec3, [usize; 3], Vec3)> = None;
        let mut offset: Option<Vec3> = None;

        for line in reader.lines().take(HEADER_SCAN_LINES) {
            let line = line.map_err(|e| FieldMapError::io(path, e))?;
            if let Some(caps) = GRID_RE.captures(&line) {
                let origin = floats(&caps, 1, path)?;
                let counts = floats(&caps, 4, path)?;
                let spacing = floats(&caps, 7, path)?;
                grid = Some((origin, counts_to_shape(counts, path)?, spacing));
            }
            if let Some(caps) = OFFSET_RE.captures(&line) {
                offset = Some(floats(&caps, 1, path)?);
            }
        }

        let Some((origin, shape, spacing)) = grid else {
            return Err(FieldMapError::HeaderNotFound {
                path: path.to_path_buf(),
                directive: "grid".to_string(),
            });
        };

        Ok(GridHeader {
            origin,
            shape,
            spacing,
            offset: offset.unwrap_or(DEFAULT_ORIGIN_SHIFT),
            offset_found: offset.is_some(),
        })
    }

    /// 扣除偏移之后的网格下界
    pub fn lower_bounds(&self) -> Vec3 {
        vec3::sub(self.origin, self.offset)
    }

    pub fn upper_bounds(&self) -> Vec3 {
        let lo = self.lower_bounds();
        let mut hi = lo;
        for axis in 0..3 {
            hi[axis] += (self.shape[axis] - 1) as f64 * self.spacing[axis];
        }
        hi
    }

    /// 按头部描述设置磁场图的可查询区域
    pub fn apply_limits(&self, map: &mut FieldMap) -> Result<()> {
        let lo = self.lower_bounds();
        let hi = self.upper_bounds();
        map.set_limits(lo[0], hi[0], lo[1], hi[1], lo[2], hi[2])
    }

    pub fn cell_count(&self) -> usize {
        self.shape.iter().product()
    }
}

fn floats(caps: &Captures<'_>, first: usize, path: &Path) -> Result<Vec3> {
    let mut out = vec3::ZERO;
    for (k, slot) in out.iter_mut().enumerate() {
        let text = &caps[first + k];
        *slot = text.parse::<f64>().map_err(|_| {
            FieldMapError::Config(format!("{:?} 头部中的数值无法解析: {text:?}", path))
        })?;
    }
    Ok(out)
}

fn counts_to_shape(counts: Vec3, path: &Path) -> Result<[usize; 3]> {
    let mut shape = [0usize; 3];
    for (axis, n) in counts.iter().enumerate() {
        if *n < 1.0 || n.fract() != 0.0 {
            return Err(FieldMapError::Config(format!(
                "{:?} 头部中的网格点数无效: {:?}",
                path, counts
            )));
        }
        shape[axis] = *n as usize;
    }
    if checked_cell_count(shape).is_none() {
        return Err(FieldMapError::Config(format!(
            "{:?} 头部声明的网格过大: {:?}，最多允许 {} 个格点",
            path, shape, MAX_GRID_CELLS
        )));
    }
    Ok(shape)
}
