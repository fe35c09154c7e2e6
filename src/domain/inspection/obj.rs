//! Wavefront OBJ signature and structural validation

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use super::byte_source::ByteSource;
use super::verdict::{BoundsAccumulator, InspectionError, ModelMetadata};

const SIGNATURE_TOKENS: &[&str] = &["v", "vt", "vn", "f", "o", "g", "mtllib", "usemtl"];
const SIGNATURE_LINES: usize = 100;
const SIGNATURE_MIN_VALID: usize = 5;
/// Short files may pass with fewer recognised lines
const SHORT_FILE_LINES: usize = 20;

/// Looks at the first lines of the file for OBJ statements, reading at most `cap` bytes
pub fn has_signature<S: ByteSource>(source: &mut S, cap: u64) -> Result<bool, InspectionError> {
    source.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(source.by_ref().take(cap));
    let mut line = Vec::new();
    let mut checked = 0;
    let mut valid = 0;

    while checked < SIGNATURE_LINES {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        checked += 1;
        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let keyword = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if SIGNATURE_TOKENS.contains(&keyword.as_str()) {
            valid += 1;
            if valid >= SIGNATURE_MIN_VALID {
                return Ok(true);
            }
        }
    }

    Ok(valid > 0 && checked < SHORT_FILE_LINES)
}

/// Full line scan: vertex/face counts, face references, bounds and object name
pub fn validate<S: ByteSource>(source: &mut S) -> Result<ModelMetadata, InspectionError> {
    source.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(source.by_ref());
    let mut line = Vec::new();
    let mut vertices: u64 = 0;
    let mut faces: u64 = 0;
    let mut bounds = BoundsAccumulator::default();
    let mut model_name = None;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let mut parts = text.split_whitespace();
        let keyword = parts.next().unwrap_or_default().to_ascii_lowercase();
        match keyword.as_str() {
            "v" => {
                vertices += 1;
                let coords: Vec<f64> = parts.take(3).filter_map(|p| p.parse().ok()).collect();
                if let &[x, y, z] = coords.as_slice() {
                    bounds.include(x, y, z);
                }
            }
            "f" => {
                faces += 1;
                if vertices == 0 {
                    return Err(InspectionError::rejected("Faces definidas antes de vértices"));
                }
                for reference in parts {
                    check_face_reference(reference, vertices)?;
                }
            }
            "o" => {
                if let Some(name) = parts.next() {
                    model_name = Some(name.to_string());
                }
            }
            _ => {}
        }
    }

    if vertices == 0 {
        return Err(InspectionError::rejected("O arquivo OBJ não contém vértices"));
    }
    if faces == 0 {
        return Err(InspectionError::rejected("O arquivo OBJ não contém faces"));
    }

    Ok(ModelMetadata {
        vertices: Some(vertices),
        faces: Some(faces),
        bounding_box: bounds.finish(),
        model_name,
        ..Default::default()
    })
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`; only the vertex index is checked.
/// Indices are 1-based; up to twice the vertices seen so far is tolerated.
fn check_face_reference(reference: &str, vertices: u64) -> Result<(), InspectionError> {
    let index = reference
        .split('/')
        .next()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    if index <= 0 || index as u64 > vertices.saturating_mul(2) {
        return Err(InspectionError::rejected("Referência a vértice inválido"));
    }
    Ok(())
}
