use std::collections::HashSet;
use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FieldMapError, Result};
use crate::field_map::{FieldMap, MapType};
use crate::grid::{MAX_GRID_CELLS, checked_cell_count};
use crate::utils::decompress;
use crate::utils::parser::{FieldMapParser, MapFileFormat, MapSource};
use crate::vec3::Vec3;

/// 每条磁盘记录的字节数: head(i32) + 6 x f32 + tail(i32)
pub const RECORD_SIZE: usize = 32;

/// cm -> mm
const CM_TO_MM: f64 = 10.0;
/// kG -> T
const KILOGAUSS_TO_TESLA: f64 = 0.1;

/// 旧格式文件中的一条记录
///
/// head 和 tail 是 Fortran 无格式记录的字节计数，二者必须相等。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRecord {
    pub head: i32,
    /// 位置 (cm)
    pub position: [f32; 3],
    /// 磁场 (kG)
    pub field: [f32; 3],
    pub tail: i32,
}

impl GridRecord {
    pub fn decode(mut bytes: &[u8]) -> io::Result<Self> {
        let head = bytes.read_i32::<LittleEndian>()?;
        let mut values = [0f32; 6];
        bytes.read_f32_into::<LittleEndian>(&mut values)?;
        let tail = bytes.read_i32::<LittleEndian>()?;
        Ok(GridRecord {
            head,
            position: [values[0], values[1], values[2]],
            field: [values[3], values[4], values[5]],
            tail,
        })
    }

    pub fn encode<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_i32::<LittleEndian>(self.head)?;
        for v in self.position.iter().chain(self.field.iter()) {
            out.write_f32::<LittleEndian>(*v)?;
        }
        out.write_i32::<LittleEndian>(self.tail)
    }

    pub fn is_valid(&self) -> bool {
        self.head == self.tail
    }

    /// 换算成内部单位的 (位置 mm, 磁场 T)
    pub fn converted(&self) -> (Vec3, Vec3) {
        let p = self.position.map(|v| f64::from(v) * CM_TO_MM);
        let b = self.field.map(|v| f64::from(v) * KILOGAUSS_TO_TESLA);
        (p, b)
    }
}

/// 每个轴上的最小值、最大值以及出现过的不同坐标值
struct AxisSurvey {
    min: f64,
    max: f64,
    distinct: HashSet<u64>,
}

impl AxisSurvey {
    fn new() -> Self {
        AxisSurvey {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            distinct: HashSet::new(),
        }
    }

    fn accumulate(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        // 用 +0.0 统一 -0.0
        self.distinct.insert((v + 0.0).to_bits());
    }
}

/// 旧的二进制记录格式解析器
///
/// 两遍处理: 第一遍校验记录、换算单位并统计网格坐标；
/// 第二遍按已知的边界和间距把每条记录放到对应格点。
pub struct LegacyBinaryParser;

impl LegacyBinaryParser {
    pub fn new() -> Self {
        LegacyBinaryParser
    }
}

impl Default for LegacyBinaryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapParser for LegacyBinaryParser {
    fn format(&self) -> MapFileFormat {
        MapFileFormat::LegacyBinary
    }

    fn name(&self) -> &'static str {
        "GMC Binary Parser"
    }

    fn parse(&self, source: &MapSource<'_>) -> Result<FieldMap> {
        let path = source.path;
        let [nx, ny, nz] = source.dimensions.ok_or_else(|| {
            FieldMapError::Config(format!("磁场图 `{}` 缺少网格维度配置", source.key))
        })?;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(FieldMapError::Config(format!(
                "磁场图 `{}` 的网格维度必须为正: {:?}",
                source.key,
                [nx, ny, nz]
            )));
        }
        let capacity = checked_cell_count([nx, ny, nz]).ok_or_else(|| {
            FieldMapError::Config(format!(
                "磁场图 `{}` 的网格维度过大: {:?}，最多允许 {} 个格点",
                source.key,
                [nx, ny, nz],
                MAX_GRID_CELLS
            ))
        })?;

        let bytes = decompress::read_all(path).map_err(|e| FieldMapError::io(path, e))?;
        let remainder = bytes.len() % RECORD_SIZE;
        if remainder != 0 {
            return Err(FieldMapError::Format {
                path: path.to_path_buf(),
                size: bytes.len() as u64,
                record_size: RECORD_SIZE,
                remainder: remainder as u64,
            });
        }

        let mut records = Vec::with_capacity(bytes.len() / RECORD_SIZE);
        for chunk in bytes.chunks_exact(RECORD_SIZE) {
            records.push(GridRecord::decode(chunk).map_err(|e| FieldMapError::io(path, e))?);
        }

        // 第一遍: 校验、换算、统计
        let mut axes = [AxisSurvey::new(), AxisSurvey::new(), AxisSurvey::new()];
        let mut converted = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if !record.is_valid() {
                return Err(FieldMapError::CorruptRecord {
                    key: source.key.to_string(),
                    path: path.to_path_buf(),
                    record: index,
                    head: record.head,
                    tail: record.tail,
                });
            }
            let (p, b) = record.converted();
            for (axis, survey) in axes.iter_mut().enumerate() {
                survey.accumulate(p[axis]);
            }
            converted.push((p, b));
        }

        let observed = [
            axes[0].distinct.len(),
            axes[1].distinct.len(),
            axes[2].distinct.len(),
        ];
        if observed != [nx, ny, nz] {
            return Err(FieldMapError::GridMismatch {
                key: source.key.to_string(),
                path: path.to_path_buf(),
                expected: [nx, ny, nz],
                observed,
            });
        }

        // 历史文件允许比完整盒子少一条记录，阈值保持 nx*ny*nz - 1 不变
        if converted.len() > capacity - 1 {
            return Err(FieldMapError::GridOverflow {
                key: source.key.to_string(),
                path: path.to_path_buf(),
                capacity,
                records: converted.len(),
            });
        }

        let mut map = FieldMap::new(source.key, [nx, ny, nz], MapType::Gmc, source.scale_factor);
        map.set_limits(
            axes[0].min,
            axes[0].max,
            axes[1].min,
            axes[1].max,
            axes[2].min,
            axes[2].max,
        )?;

        // 第二遍: 边界和数量都已校验，索引一定在范围内
        for (p, b) in converted {
            let ix = map.nearest_index(0, p[0]);
            let iy = map.nearest_index(1, p[1]);
            let iz = map.nearest_index(2, p[2]);
            map.store(ix, iy, iz, p, b);
        }

        tracing::debug!(
            target: "bfield::load",
            key = source.key,
            path = %path.display(),
            records = records.len(),
            defined = map.defined_count(),
            "legacy_map.parsed"
        );
        Ok(map)
    }
}
