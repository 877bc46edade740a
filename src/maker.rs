use std::path::Path;

use crate::config::BFieldConfig;
use crate::error::{FieldMapError, Result};
use crate::field_manager::{FieldManager, FieldManagerBuilder, UniformField};
use crate::field_map::{FieldMap, MapType};
use crate::parsers::write_binary_cache;
use crate::utils::parser::MapSource;
use crate::utils::parser_registry::ParserRegistry;
use crate::utils::resolver::FileResolver;
use crate::vec3::Vec3;

/// 加载完成后打印磁场的位置（生产靶附近，mm）
pub const TARGET_PROBE_POINT: Vec3 = [3900.0, 0.0, -6550.0];

const MU2E_PREFIX: &str = "Mu2e_";

/// 由文件名得到 G4BL 磁场图的名字
///
/// 先去掉最后一个扩展名，再去掉目录，最后去掉 `Mu2e_` 前缀:
/// `maps/Mu2e_DSMap.txt.gz` -> `DSMap.txt`
pub fn map_key_for_file(file: &str) -> String {
    let mut name = file;
    if let Some(i) = name.rfind('.') {
        name = &name[..i];
    }
    if let Some(i) = name.rfind('/') {
        name = &name[i + 1..];
    }
    name.strip_prefix(MU2E_PREFIX).unwrap_or(name).to_string()
}

/// 按配置加载所有磁场图并构建磁场管理器
pub struct BFieldManagerMaker<'a> {
    config: &'a BFieldConfig,
    resolver: &'a dyn FileResolver,
    registry: ParserRegistry,
}

impl<'a> BFieldManagerMaker<'a> {
    pub fn new(config: &'a BFieldConfig, resolver: &'a dyn FileResolver) -> Self {
        Self {
            config,
            resolver,
            registry: ParserRegistry::new(),
        }
    }

    pub fn build(&self) -> Result<FieldManager> {
        let config = self.config;
        tracing::info!(
            target: "bfield::load",
            parsers = ?self.registry.parser_names(),
            "parser_registry.ready"
        );
        let mut builder = FieldManagerBuilder::new(config.format, config.torus_radius)?
            .with_solenoid_offset(config.solenoid_offset);

        match config.format {
            MapType::Gmc => self.load_gmc_maps(&mut builder)?,
            MapType::G4bl => self.load_g4bl_maps(&mut builder)?,
        }

        if let Some(uniform) = config.uniform_ds {
            builder = builder.with_uniform_field(UniformField {
                value: [0.0, 0.0, uniform.bz * config.scale_factor],
                gradient: [0.0, 0.0, uniform.gradient * config.scale_factor],
            });
        }

        let manager = builder.build();
        let b = manager.field(TARGET_PROBE_POINT);
        tracing::info!(
            target: "bfield::load",
            format = %manager.map_type(),
            maps = manager.maps().len(),
            bx = b[0],
            by = b[1],
            bz = b[2],
            "field_manager.built"
        );
        Ok(manager)
    }

    fn load_gmc_maps(&self, builder: &mut FieldManagerBuilder) -> Result<()> {
        let config = self.config;
        let regions = [
            ("DS", "ds_file", &config.ds_file, config.ds_dimensions),
            ("TS", "ts_file", &config.ts_file, config.ts_dimensions),
            ("PS", "ps_file", &config.ps_file, config.ps_dimensions),
        ];
        for (key, file_key, file, dimensions) in regions {
            let Some(name) = file else {
                warn_not_configured(file_key);
                continue;
            };
            let map = self.load_map(MapType::Gmc, key, name, dimensions)?;
            builder.add_map(map)?;
        }
        Ok(())
    }

    fn load_g4bl_maps(&self, builder: &mut FieldManagerBuilder) -> Result<()> {
        let config = self.config;
        let files: Vec<&String> = match &config.files {
            Some(files) => files.iter().collect(),
            None => {
                let deprecated = [
                    ("ds_file", &config.ds_file),
                    ("ps_file", &config.ps_file),
                    ("tsu_file", &config.tsu_file),
                    ("tsd_file", &config.tsd_file),
                ];
                let mut files = Vec::new();
                for (file_key, file) in deprecated {
                    match file {
                        Some(name) => files.push(name),
                        None => warn_not_configured(file_key),
                    }
                }
                files
            }
        };

        for (i, name) in files.into_iter().enumerate() {
            let key = map_key_for_file(name);
            let map = self.load_map(MapType::G4bl, &key, name, None)?;
            if config.write_binaries {
                let output = config.binary_files.get(i).ok_or_else(|| {
                    FieldMapError::Config(format!(
                        "write_binaries 已开启，但 binary_files 中没有第 {} 个文件（磁场图 `{}`）",
                        i, key
                    ))
                })?;
                write_binary_cache(&map, Path::new(output))?;
            }
            builder.add_map(map)?;
        }
        Ok(())
    }

    fn load_map(
        &self,
        map_type: MapType,
        key: &str,
        name: &str,
        dimensions: Option<[usize; 3]>,
    ) -> Result<FieldMap> {
        let path = self.resolver.resolve(name)?;
        let parser = self
            .registry
            .find_parser_for_file(map_type, name)
            .ok_or_else(|| FieldMapError::Config(format!("没有可以读取 {name:?} 的解析器")))?;

        let map = parser.parse(&MapSource {
            key,
            name,
            path: &path,
            dimensions,
            scale_factor: self.config.scale_factor,
            resolver: self.resolver,
        })?;

        tracing::info!(
            target: "bfield::load",
            key,
            path = %path.display(),
            parser = parser.name(),
            nx = map.shape()[0],
            ny = map.shape()[1],
            nz = map.shape()[2],
            defined = map.defined_count(),
            "field_map.loaded"
        );
        Ok(map)
    }
}

fn warn_not_configured(file_key: &str) {
    tracing::warn!(
        target: "bfield::load",
        file_key,
        "field_map.not_configured"
    );
}

/// 便捷入口: 用给定的路径解析器构建磁场管理器
pub fn build_field_manager(config: &BFieldConfig, resolver: &dyn FileResolver) -> Result<FieldManager> {
    BFieldManagerMaker::new(config, resolver).build()
}
