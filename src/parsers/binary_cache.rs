use std::fs::OpenOptions;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FieldMapError, Result};
use crate::field_map::{FieldMap, MapType};
use crate::parsers::g4bl_header::GridHeader;
use crate::utils::decompress;
use crate::utils::parser::{FieldMapParser, MapFileFormat, MapSource};

/// 缓存文件开头的字节序标记
pub const CACHE_MARKER: u32 = 0xDEAD_BEEF;

const HEADER_SUFFIX: &str = ".header";
const BINARY_SUFFIX: &str = ".bin";

/// 由 `.header` 文件名得到对应的 `.bin` 文件名
pub fn binary_name_for_header(header_name: &str) -> Option<String> {
    let i = header_name.find(HEADER_SUFFIX)?;
    Some(format!("{}{}", &header_name[..i], BINARY_SUFFIX))
}

/// G4BL 二进制缓存解析器
///
/// 网格描述来自 `.header` 文件，数据来自同名的 `.bin` 文件:
/// 标记字 + 所有格点位置 + 所有格点磁场，每个向量 3 个 f64，小端序。
/// 缓存总是完整的盒子，所有格点都标记为已定义。
pub struct BinaryCacheParser;

impl BinaryCacheParser {
    pub fn new() -> Self {
        BinaryCacheParser
    }
}

impl Default for BinaryCacheParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapParser for BinaryCacheParser {
    fn format(&self) -> MapFileFormat {
        MapFileFormat::BinaryCache
    }

    fn name(&self) -> &'static str {
        "G4BL Binary Cache Parser"
    }

    fn parse(&self, source: &MapSource<'_>) -> Result<FieldMap> {
        let header = GridHeader::read(source.path)?;

        let bin_name = binary_name_for_header(source.name).ok_or_else(|| {
            FieldMapError::Config(format!(
                "二进制缓存需要 {HEADER_SUFFIX} 文件，但配置的是 {:?}",
                source.name
            ))
        })?;
        let bin_path = source.resolver.resolve(&bin_name)?;

        let mut map = FieldMap::new(source.key, header.shape, MapType::G4bl, source.scale_factor);
        header.apply_limits(&mut map)?;

        let reader = decompress::open(&bin_path).map_err(|e| FieldMapError::io(&bin_path, e))?;
        read_cache(BufReader::new(reader), &bin_path, &mut map)?;
        map.mark_all_defined();

        tracing::debug!(
            target: "bfield::load",
            key = source.key,
            header = %source.path.display(),
            path = %bin_path.display(),
            cells = header.cell_count(),
            "binary_cache.parsed"
        );
        Ok(map)
    }
}

/// 读取标记字和两个大数组，标记不对时不读任何数据
fn read_cache<R: Read>(mut reader: R, path: &Path, map: &mut FieldMap) -> Result<()> {
    let marker = reader
        .read_u32::<LittleEndian>()
        .map_err(|e| FieldMapError::io(path, e))?;
    if marker != CACHE_MARKER {
        return Err(FieldMapError::EndianMismatch {
            path: path.to_path_buf(),
            found: marker,
            expected: CACHE_MARKER,
        });
    }

    reader
        .read_f64_into::<LittleEndian>(map.grid_points_mut().as_flattened_mut())
        .map_err(|e| FieldMapError::io(path, e))?;
    reader
        .read_f64_into::<LittleEndian>(map.field_values_mut().as_flattened_mut())
        .map_err(|e| FieldMapError::io(path, e))?;
    Ok(())
}

/// 把磁场图写成二进制缓存，目标文件已存在时报错而不是覆盖
pub fn write_binary_cache(map: &FieldMap, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                FieldMapError::FileExists {
                    path: path.to_path_buf(),
                }
            } else {
                FieldMapError::io(path, e)
            }
        })?;

    let mut out = BufWriter::new(file);
    write_cache(&mut out, map).map_err(|e| FieldMapError::io(path, e))?;
    out.flush().map_err(|e| FieldMapError::io(path, e))?;

    tracing::info!(
        target: "bfield::load",
        key = map.key(),
        path = %path.display(),
        "binary_cache.written"
    );
    Ok(())
}

fn write_cache<W: Write>(out: &mut W, map: &FieldMap) -> io::Result<()> {
    out.write_u32::<LittleEndian>(CACHE_MARKER)?;
    for v in map.grid_points().as_flattened() {
        out.write_f64::<LittleEndian>(*v)?;
    }
    for v in map.field_values().as_flattened() {
        out.write_f64::<LittleEndian>(*v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use tempfile::tempdir;

    use crate::utils::resolver::SearchPath;

    const HEADER: &str = "grid X0=0 Y0=0 Z0=0 nX=2 nY=1 nZ=3 dX=5 dY=1 dZ=2\n\
                          # Origin shift for Mu2e: 0 0 0\n";

    fn source_map() -> FieldMap {
        let mut map = FieldMap::new("TSu", [2, 1, 3], MapType::G4bl, 1.0);
        map.set_limits(0.0, 5.0, 0.0, 0.0, 0.0, 4.0).unwrap();
        for ix in 0..2 {
            for iz in 0..3 {
                let p = [ix as f64 * 5.0, 0.0, iz as f64 * 2.0];
                map.store(ix, 0, iz, p, [0.1 * ix as f64, -0.3, 1.0 / (1.0 + iz as f64)]);
            }
        }
        map
    }

    fn parse_header(dir: &Path, name: &str) -> Result<FieldMap> {
        let resolver = SearchPath::new(vec![dir.to_path_buf()]);
        let path: PathBuf = dir.join(name);
        BinaryCacheParser::new().parse(&MapSource {
            key: "TSu",
            name,
            path: &path,
            dimensions: None,
            scale_factor: 1.0,
            resolver: &resolver,
        })
    }

    #[test]
    fn binary_name_replaces_header_suffix() {
        assert_eq!(binary_name_for_header("Mu2e_TSuMap.header").as_deref(), Some("Mu2e_TSuMap.bin"));
        assert_eq!(binary_name_for_header("Mu2e_TSuMap.txt"), None);
    }

    #[test]
    fn write_then_read_is_bit_identical() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("TSuMap.header"), HEADER).unwrap();
        let original = source_map();
        write_binary_cache(&original, &dir.path().join("TSuMap.bin")).unwrap();

        let loaded = parse_header(dir.path(), "TSuMap.header").unwrap();
        assert_eq!(loaded.defined_count(), 6);
        assert_eq!(loaded.limits(), original.limits());
        for (a, b) in loaded.grid_points().iter().zip(original.grid_points()) {
            assert_eq!(a.map(f64::to_bits), b.map(f64::to_bits));
        }
        for (a, b) in loaded.field_values().iter().zip(original.field_values()) {
            assert_eq!(a.map(f64::to_bits), b.map(f64::to_bits));
        }
    }

    #[test]
    fn existing_destination_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("TSuMap.bin");
        std::fs::write(&path, b"keep").unwrap();
        let err = write_binary_cache(&source_map(), &path).unwrap_err();
        assert!(matches!(err, FieldMapError::FileExists { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    }

    #[test]
    fn wrong_marker_is_endian_mismatch() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("TSuMap.header"), HEADER).unwrap();
        let mut bytes = Vec::new();
        bytes.write_u32::<byteorder::BigEndian>(CACHE_MARKER).unwrap();
        bytes.extend(std::iter::repeat_n(0u8, 2 * 6 * 24));
        std::fs::write(dir.path().join("TSuMap.bin"), bytes).unwrap();

        let err = parse_header(dir.path(), "TSuMap.header").unwrap_err();
        assert!(
            matches!(err, FieldMapError::EndianMismatch { found: 0xEFBE_ADDE, .. }),
            "{err}"
        );
    }

    #[test]
    fn short_cache_is_io_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("TSuMap.header"), HEADER).unwrap();
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(CACHE_MARKER).unwrap();
        bytes.extend(std::iter::repeat_n(0u8, 100));
        std::fs::write(dir.path().join("TSuMap.bin"), bytes).unwrap();

        let err = parse_header(dir.path(), "TSuMap.header").unwrap_err();
        assert!(matches!(err, FieldMapError::Io { .. }), "{err}");
    }

    #[test]
    fn missing_binary_is_file_not_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("TSuMap.header"), HEADER).unwrap();
        let err = parse_header(dir.path(), "TSuMap.header").unwrap_err();
        assert!(matches!(err, FieldMapError::FileNotFound { ref name, .. } if name == "TSuMap.bin"));
    }
}
