use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;

/// 根据文件名后缀判断的压缩方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    /// 后缀为 `.gz` 或 `.bz2`（允许末尾空白）时使用对应的解压
    pub fn from_path(path: &Path) -> Self {
        let name = path.to_string_lossy();
        let name = name.trim_end();
        if name.ends_with(".gz") {
            Compression::Gzip
        } else if name.ends_with(".bz2") {
            Compression::Bzip2
        } else {
            Compression::None
        }
    }
}

/// 在读取器前面按需插入解压过滤器，对后面的格式解析透明
pub fn decompressed<R: Read + 'static>(path: &Path, inner: R) -> Box<dyn Read> {
    match Compression::from_path(path) {
        Compression::Gzip => Box::new(MultiGzDecoder::new(inner)),
        Compression::Bzip2 => Box::new(MultiBzDecoder::new(inner)),
        Compression::None => Box::new(inner),
    }
}

/// 打开文件并返回（必要时已解压的）字节流
pub fn open(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    Ok(decompressed(path, file))
}

/// 打开文件并返回按行读取的缓冲流
pub fn open_buffered(path: &Path) -> io::Result<Box<dyn BufRead>> {
    Ok(Box::new(BufReader::new(open(path)?)))
}

/// 把整个（解压后的）文件读入内存
pub fn read_all(path: &Path) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    open(path)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use bzip2::write::BzEncoder;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    #[test]
    fn compression_from_suffix() {
        assert_eq!(Compression::from_path(Path::new("a/DSMap.txt.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("DSMap.txt.bz2 ")), Compression::Bzip2);
        assert_eq!(Compression::from_path(Path::new("DSMap.txt")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("gz.txt")), Compression::None);
    }

    #[test]
    fn reads_through_each_filter() {
        let dir = tempdir().unwrap();
        let payload = b"grid X0=0 Y0=0 Z0=0\ndata\n".to_vec();

        let plain = dir.path().join("map.txt");
        std::fs::write(&plain, &payload).unwrap();

        let gz = dir.path().join("map.txt.gz");
        let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&payload).unwrap();
        std::fs::write(&gz, enc.finish().unwrap()).unwrap();

        let bz = dir.path().join("map.txt.bz2");
        let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(&payload).unwrap();
        std::fs::write(&bz, enc.finish().unwrap()).unwrap();

        for path in [plain, gz, bz] {
            assert_eq!(read_all(&path).unwrap(), payload, "{path:?}");
        }
    }

    fn bz2_stream(part: &[u8]) -> Vec<u8> {
        let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(part).unwrap();
        enc.finish().unwrap()
    }

    fn gz_stream(part: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(part).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn concatenated_streams_are_read_to_the_end() {
        let dir = tempdir().unwrap();
        let (head, tail) = (b"grid X0=0 Y0=0 Z0=0\ndata\n".as_slice(), b"0 0 0 0 0 1\n".as_slice());
        let whole = [head, tail].concat();

        let bz = dir.path().join("map.txt.bz2");
        std::fs::write(&bz, [bz2_stream(head), bz2_stream(tail)].concat()).unwrap();
        let gz = dir.path().join("map.txt.gz");
        std::fs::write(&gz, [gz_stream(head), gz_stream(tail)].concat()).unwrap();

        for path in [bz, gz] {
            assert_eq!(read_all(&path).unwrap(), whole, "{path:?}");
        }
    }
}
