#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use bfield_maps::parsers::GridRecord;
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;

/// 按后缀决定是否压缩后写入
pub fn write_maybe_compressed(path: &Path, bytes: &[u8]) {
    let name = path.to_string_lossy();
    let data = if name.ends_with(".gz") {
        let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    } else if name.ends_with(".bz2") {
        let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    } else {
        bytes.to_vec()
    };
    std::fs::write(path, data).unwrap();
}

/// 把数据拆成两段，分别压成 bzip2 流后首尾相接写入（pbzip2 的输出形式）
pub fn write_two_bz2_streams(path: &Path, bytes: &[u8]) {
    let (head, tail) = bytes.split_at(bytes.len() / 2);
    let mut data = Vec::new();
    for part in [head, tail] {
        let mut enc = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(part).unwrap();
        data.extend(enc.finish().unwrap());
    }
    std::fs::write(path, data).unwrap();
}

/// GMC 盒子: 间距 `step_cm`，原点在 `origin_cm`，磁场 `b_kg` 均匀
pub fn gmc_box(shape: [usize; 3], origin_cm: [f32; 3], step_cm: f32, b_kg: [f32; 3]) -> Vec<GridRecord> {
    let mut out = Vec::new();
    for ix in 0..shape[0] {
        for iy in 0..shape[1] {
            for iz in 0..shape[2] {
                out.push(GridRecord {
                    head: 24,
                    position: [
                        origin_cm[0] + ix as f32 * step_cm,
                        origin_cm[1] + iy as f32 * step_cm,
                        origin_cm[2] + iz as f32 * step_cm,
                    ],
                    field: b_kg,
                    tail: 24,
                });
            }
        }
    }
    out
}

pub fn write_gmc(path: &Path, records: &[GridRecord]) {
    let mut bytes = Vec::new();
    for r in records {
        r.encode(&mut bytes).unwrap();
    }
    write_maybe_compressed(path, &bytes);
}

/// G4BL 文本磁场图，磁场为 (0, 0, bz0 + slope * z_local)
pub fn g4bl_text(
    origin: [f64; 3],
    shape: [usize; 3],
    step: f64,
    offset: Option<[f64; 3]>,
    bz0: f64,
    slope: f64,
) -> String {
    let mut text = String::from("# test field map\n");
    if let Some(o) = offset {
        text.push_str(&format!("# Origin shift for Mu2e: {} {} {}\n", o[0], o[1], o[2]));
    }
    text.push_str(&format!(
        "grid X0={} Y0={} Z0={} nX={} nY={} nZ={} dX={step} dY={step} dZ={step}\n",
        origin[0], origin[1], origin[2], shape[0], shape[1], shape[2]
    ));
    text.push_str("extendX flip=By\ndata\n");
    let off = offset.unwrap_or(bfield_maps::parsers::g4bl_header::DEFAULT_ORIGIN_SHIFT);
    for ix in 0..shape[0] {
        for iy in 0..shape[1] {
            for iz in 0..shape[2] {
                let x = origin[0] + ix as f64 * step;
                let y = origin[1] + iy as f64 * step;
                let z = origin[2] + iz as f64 * step;
                let bz = bz0 + slope * (z - off[2]);
                text.push_str(&format!("{x} {y} {z} 0 0 {bz}\n"));
            }
        }
    }
    text
}
