use std::io::BufRead;

use crate::error::{FieldMapError, Result};
use crate::field_map::{FieldMap, MapType};
use crate::parsers::g4bl_header::GridHeader;
use crate::utils::decompress;
use crate::utils::parser::{FieldMapParser, MapFileFormat, MapSource};
use crate::vec3::{self, Vec3};

/// G4BL 文本网格格式解析器
///
/// 头部给出网格描述，`data` 行之后是 nX*nY*nZ 行 "x y z bx by bz"，
/// 按 x 最慢、z 最快的顺序排列。
pub struct TextGridParser;

impl TextGridParser {
    pub fn new() -> Self {
        TextGridParser
    }
}

impl Default for TextGridParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapParser for TextGridParser {
    fn format(&self) -> MapFileFormat {
        MapFileFormat::TextGrid
    }

    fn name(&self) -> &'static str {
        "G4BL Text Parser"
    }

    fn parse(&self, source: &MapSource<'_>) -> Result<FieldMap> {
        let path = source.path;
        let header = GridHeader::read(path)?;

        let mut map = FieldMap::new(source.key, header.shape, MapType::G4bl, source.scale_factor);
        header.apply_limits(&mut map)?;

        let mut lines = decompress::open_buffered(path)
            .map_err(|e| FieldMapError::io(path, e))?
            .lines();

        // 跳到 data 行
        let mut found_data = false;
        for line in lines.by_ref() {
            let line = line.map_err(|e| FieldMapError::io(path, e))?;
            if line.trim_start().starts_with("data") {
                found_data = true;
                break;
            }
        }
        if !found_data {
            return Err(FieldMapError::HeaderNotFound {
                path: path.to_path_buf(),
                directive: "data".to_string(),
            });
        }

        let [_, ny, nz] = header.shape;
        let expected = header.cell_count();
        let mut last_line = String::new();
        for n in 0..expected {
            let truncated = |last_line: String| FieldMapError::TruncatedData {
                path: path.to_path_buf(),
                read: n,
                expected,
                last_line,
            };

            let Some(line) = lines.next() else {
                return Err(truncated(last_line));
            };
            last_line = line.map_err(|e| FieldMapError::io(path, e))?;
            let Some((position, field)) = parse_data_line(&last_line) else {
                return Err(truncated(last_line));
            };

            let ix = n / (ny * nz);
            let iy = (n / nz) % ny;
            let iz = n % nz;
            map.store(ix, iy, iz, vec3::sub(position, header.offset), field);
        }

        tracing::debug!(
            target: "bfield::load",
            key = source.key,
            path = %path.display(),
            cells = expected,
            offset_found = header.offset_found,
            "text_map.parsed"
        );
        Ok(map)
    }
}

/// 一行数据的前六个数: 位置和磁场，多余的列忽略
fn parse_data_line(line: &str) -> Option<(Vec3, Vec3)> {
    let mut values = [0.0f64; 6];
    let mut tokens = line.split_whitespace();
    for slot in &mut values {
        *slot = tokens.next()?.parse().ok()?;
    }
    Some((
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
    ))
}
