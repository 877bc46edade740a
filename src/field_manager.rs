use crate::error::{FieldMapError, Result};
use crate::field_map::{FieldMap, MapType};
use crate::vec3::{self, Vec3};

/// GMC 格式磁场文件要求的环形半径 (mm)
pub const GMC_TORUS_RADIUS: f64 = 2926.0;
/// G4BL 格式磁场文件要求的环形半径 (mm)
pub const G4BL_TORUS_RADIUS: f64 = 2929.0;
/// 环形半径比对的容差 (mm)
pub const TORUS_RADIUS_TOLERANCE: f64 = 0.1;

impl MapType {
    /// 这一套磁场文件对应的环形半径
    pub fn required_torus_radius(self) -> f64 {
        match self {
            MapType::Gmc => GMC_TORUS_RADIUS,
            MapType::G4bl => G4BL_TORUS_RADIUS,
        }
    }
}

/// 没有详细磁场图覆盖时使用的均匀 DS 场
///
/// B = value + gradient * z，z 为扣除偏移后的局部坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    /// T
    pub value: Vec3,
    /// T/mm
    pub gradient: Vec3,
}

impl UniformField {
    pub fn at(&self, local: Vec3) -> Vec3 {
        vec3::add(self.value, vec3::scale(self.gradient, local[2]))
    }
}

/// 所有已加载磁场图的集合与查询入口
///
/// 构建完成后不再修改，可以在多个线程之间只读共享。
#[derive(Debug, Clone)]
pub struct FieldManager {
    maps: Vec<FieldMap>,
    origin_offset: Vec3,
    map_type: MapType,
    torus_radius: f64,
    uniform: Option<UniformField>,
}

impl FieldManager {
    /// 全局坐标 `point` 处的磁场
    ///
    /// 按加入顺序查询各磁场图，第一个有定义的结果胜出；都没有覆盖时
    /// 使用均匀场，没有配置均匀场则返回零。
    pub fn field(&self, point: Vec3) -> Vec3 {
        self.field_and_coverage(point).0
    }

    /// 同 [`field`](Self::field)，另外返回该点是否落在某个详细磁场图内
    pub fn field_and_coverage(&self, point: Vec3) -> (Vec3, bool) {
        let local = self.to_local(point);
        if let Some(b) = self.lookup(local) {
            return (b, true);
        }
        let b = match &self.uniform {
            Some(uniform) => uniform.at(local),
            None => vec3::ZERO,
        };
        (b, false)
    }

    /// 只查询详细磁场图，都没有覆盖时返回 `None`
    pub fn field_with_status(&self, point: Vec3) -> Option<Vec3> {
        self.lookup(self.to_local(point))
    }

    fn to_local(&self, point: Vec3) -> Vec3 {
        vec3::sub(point, self.origin_offset)
    }

    fn lookup(&self, local: Vec3) -> Option<Vec3> {
        self.maps.iter().find_map(|m| m.interpolated_field(local))
    }

    pub fn map(&self, key: &str) -> Option<&FieldMap> {
        self.maps.iter().find(|m| m.key() == key)
    }

    pub fn maps(&self) -> &[FieldMap] {
        &self.maps
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn torus_radius(&self) -> f64 {
        self.torus_radius
    }

    /// 全局坐标到局部坐标的偏移
    pub fn origin_offset(&self) -> Vec3 {
        self.origin_offset
    }

    pub fn uniform_field(&self) -> Option<UniformField> {
        self.uniform
    }
}

/// 两阶段构建: 先逐个加入校验过的磁场图，最后一次性生成不可变的 `FieldManager`
#[derive(Debug)]
pub struct FieldManagerBuilder {
    map_type: MapType,
    torus_radius: f64,
    origin_offset: Vec3,
    maps: Vec<FieldMap>,
    uniform: Option<UniformField>,
}

impl FieldManagerBuilder {
    /// 校验配置的环形半径与磁场格式是否匹配
    pub fn new(map_type: MapType, configured_torus_radius: f64) -> Result<Self> {
        let required = map_type.required_torus_radius();
        if (configured_torus_radius - required).abs() > TORUS_RADIUS_TOLERANCE {
            return Err(FieldMapError::ConfigMismatch {
                format: map_type.to_string(),
                required,
                configured: configured_torus_radius,
            });
        }
        Ok(FieldManagerBuilder {
            map_type,
            torus_radius: required,
            origin_offset: vec3::ZERO,
            maps: Vec::new(),
            uniform: None,
        })
    }

    /// 螺线管沿 x 方向的偏移 (mm)
    pub fn with_solenoid_offset(mut self, x_offset: f64) -> Self {
        self.origin_offset = [x_offset, 0.0, 0.0];
        self
    }

    pub fn with_uniform_field(mut self, uniform: UniformField) -> Self {
        self.uniform = Some(uniform);
        self
    }

    /// 加入一个磁场图，缩放因子在这里一次性乘进磁场值
    pub fn add_map(&mut self, mut map: FieldMap) -> Result<()> {
        if map.map_type() != self.map_type {
            return Err(FieldMapError::Config(format!(
                "磁场图 `{}` 的格式 {} 与管理器格式 {} 不一致",
                map.key(),
                map.map_type(),
                self.map_type
            )));
        }
        if self.contains_key(map.key()) {
            return Err(FieldMapError::DuplicateMapKey {
                key: map.key().to_string(),
            });
        }
        map.apply_scale_factor();
        self.maps.push(map);
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.maps.iter().any(|m| m.key() == key)
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn build(self) -> FieldManager {
        FieldManager {
            maps: self.maps,
            origin_offset: self.origin_offset,
            map_type: self.map_type,
            torus_radius: self.torus_radius,
            uniform: self.uniform,
        }
    }
}
