use serde::Deserialize;

/// Limits applied by [`super::ModelInspector`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Upper bound on the declared triangle count of a binary STL
    pub max_stl_triangles: u32,
    /// Allowed relative deviation between actual and expected binary STL size
    pub size_tolerance: f64,
    /// Allowed ratio of malformed sampled triangles
    pub malformed_tolerance: f64,
    pub triangle_samples: u32,
    pub bounding_box_samples: u32,
    pub ascii_read_cap: u64,
    pub scan_cap: u64,
    pub min_model_size: u64,
    pub max_model_size: u64,
    /// Accept `application/octet-stream` for STL once the structure is proven
    pub strict_validation: bool,
    pub max_3mf_model_entry: u64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_stl_triangles: 5_000_000,
            size_tolerance: 0.01,
            malformed_tolerance: 0.02,
            triangle_samples: 100,
            bounding_box_samples: 1000,
            ascii_read_cap: 10 * 1024 * 1024,
            scan_cap: 1024 * 1024,
            min_model_size: 100,
            max_model_size: 500 * 1024 * 1024,
            strict_validation: true,
            max_3mf_model_entry: 256 * 1024 * 1024,
        }
    }
}

impl InspectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_stl_triangles == 0 {
            return Err("max_stl_triangles must be greater than 0".to_string());
        }
        if !(0.0..1.0).contains(&self.size_tolerance) {
            return Err("size_tolerance must be in [0, 1)".to_string());
        }
        if !(0.0..1.0).contains(&self.malformed_tolerance) {
            return Err("malformed_tolerance must be in [0, 1)".to_string());
        }
        if self.triangle_samples == 0 || self.bounding_box_samples == 0 {
            return Err("sample sizes must be greater than 0".to_string());
        }
        if self.min_model_size >= self.max_model_size {
            return Err("min_model_size must be below max_model_size".to_string());
        }
        Ok(())
    }
}
