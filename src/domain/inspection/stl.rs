//! STL structural validation (binary and ASCII variants)

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::byte_source::{read_at, read_prefix, ByteSource};
use super::config::InspectorConfig;
use super::verdict::{BoundingBox, BoundsAccumulator, InspectionError, ModelMetadata};

pub const HEADER_LEN: u64 = 80;
pub const PREAMBLE_LEN: u64 = 84;
pub const TRIANGLE_LEN: u64 = 50;

/// Normal plus three vertices
const FLOATS_LEN: usize = 48;
const NORMAL_LEN: u64 = 12;
const VERTICES_LEN: usize = 36;

static SOLID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^solid[ \t]+(.+?)\r?$").expect("Invalid solid name regex"));

static ASCII_VERTEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*vertex\s+(\S+)\s+(\S+)\s+(\S+)").expect("Invalid vertex regex")
});

/// ASCII STL files open with the literal `solid`, in any case
pub fn has_ascii_signature(prefix: &[u8]) -> bool {
    prefix.len() >= 5 && prefix[..5].eq_ignore_ascii_case(b"solid")
}

pub fn expected_binary_size(triangles: u32) -> u64 {
    PREAMBLE_LEN + u64::from(triangles) * TRIANGLE_LEN
}

/// Header count and file size must agree; this is the binary STL signature
pub fn check_binary_consistency<S: ByteSource>(
    source: &mut S,
    size: u64,
    config: &InspectorConfig,
) -> Result<u32, InspectionError> {
    if size < PREAMBLE_LEN {
        return Err(InspectionError::rejected("Formato STL binário inválido"));
    }
    let mut count_bytes = [0u8; 4];
    if read_at(source, HEADER_LEN, &mut count_bytes)? < count_bytes.len() {
        return Err(InspectionError::rejected("Formato STL binário inválido"));
    }
    let triangles = u32::from_le_bytes(count_bytes);
    if triangles == 0 || triangles > config.max_stl_triangles {
        return Err(InspectionError::rejected(format!(
            "Contagem de triângulos inválida: {}",
            triangles
        )));
    }

    let expected = expected_binary_size(triangles) as f64;
    if (size as f64 - expected).abs() > expected * config.size_tolerance {
        return Err(InspectionError::rejected(
            "Estrutura de arquivo STL binário inválida",
        ));
    }
    Ok(triangles)
}

pub fn validate_binary<S: ByteSource>(
    source: &mut S,
    size: u64,
    config: &InspectorConfig,
) -> Result<ModelMetadata, InspectionError> {
    let triangles = check_binary_consistency(source, size, config)?;

    let samples = u64::from(triangles.min(config.triangle_samples));
    let stride = (u64::from(triangles) / samples).max(1);
    let mut record = [0u8; FLOATS_LEN];
    let mut malformed = 0u64;
    for i in 0..samples {
        let offset = PREAMBLE_LEN + i * stride * TRIANGLE_LEN;
        let read = read_at(source, offset, &mut record)?;
        if read < FLOATS_LEN || !all_finite(&record) {
            malformed += 1;
        }
    }
    debug!(triangles, samples, malformed, "Sampled binary STL triangles");

    if malformed as f64 / samples as f64 > config.malformed_tolerance {
        return Err(InspectionError::rejected("Estrutura de vértices inválida"));
    }

    Ok(ModelMetadata {
        triangles: Some(u64::from(triangles)),
        header: read_header(source)?,
        bounding_box: sample_bounds(source, triangles, config)?,
        ..Default::default()
    })
}

pub fn validate_ascii<S: ByteSource>(
    source: &mut S,
    config: &InspectorConfig,
) -> Result<ModelMetadata, InspectionError> {
    let content = read_prefix(source, config.ascii_read_cap)?;
    let lower = content.to_ascii_lowercase();

    if !contains(&lower, b"endsolid") {
        return Err(InspectionError::rejected("Formato STL ASCII inválido"));
    }
    if !contains(&lower, b"facet normal") || !contains(&lower, b"vertex") {
        return Err(InspectionError::rejected("Estrutura STL ASCII inválida"));
    }

    let text = String::from_utf8_lossy(&content);
    let mut bounds = BoundsAccumulator::default();
    for caps in ASCII_VERTEX.captures_iter(&text) {
        if let (Ok(x), Ok(y), Ok(z)) = (
            caps[1].parse::<f64>(),
            caps[2].parse::<f64>(),
            caps[3].parse::<f64>(),
        ) {
            bounds.include(x, y, z);
        }
    }

    Ok(ModelMetadata {
        triangles: Some(count_occurrences(&lower, b"facet normal") as u64),
        model_name: SOLID_NAME
            .captures(&text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|name| !name.is_empty()),
        bounding_box: bounds.finish(),
        ..Default::default()
    })
}

fn read_header<S: ByteSource>(source: &mut S) -> Result<Option<String>, InspectionError> {
    let mut header = [0u8; HEADER_LEN as usize];
    let read = read_at(source, 0, &mut header)?;
    let text = String::from_utf8_lossy(&header[..read]);
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn sample_bounds<S: ByteSource>(
    source: &mut S,
    triangles: u32,
    config: &InspectorConfig,
) -> Result<Option<BoundingBox>, InspectionError> {
    let samples = u64::from(triangles.min(config.bounding_box_samples));
    let stride = (u64::from(triangles) / samples).max(1);
    let mut vertices = [0u8; VERTICES_LEN];
    let mut bounds = BoundsAccumulator::default();
    for i in 0..samples {
        let offset = PREAMBLE_LEN + i * stride * TRIANGLE_LEN + NORMAL_LEN;
        if read_at(source, offset, &mut vertices)? < VERTICES_LEN {
            continue;
        }
        let floats = le_floats(&vertices);
        for vertex in floats.chunks_exact(3) {
            bounds.include(
                f64::from(vertex[0]),
                f64::from(vertex[1]),
                f64::from(vertex[2]),
            );
        }
    }
    Ok(bounds.finish())
}

fn le_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn all_finite(bytes: &[u8]) -> bool {
    le_floats(bytes).iter().all(|f| f.is_finite())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
