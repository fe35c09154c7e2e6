//! 3MF container validation: ZIP archive holding an XML model part

use std::io::{Read, Seek, SeekFrom};

use zip::result::ZipError;
use zip::ZipArchive;

use super::byte_source::ByteSource;
use super::verdict::{InspectionError, ModelMetadata};

const MODEL_ENTRY: &str = "3dmodel.model";
const RELATIONSHIPS_ENTRY: &str = "_rels/.rels";
/// Some element must declare a namespace under the consortium domain
const CORE_NAMESPACE_MARKER: &str = "3mf.org";

pub fn has_signature(prefix: &[u8]) -> bool {
    prefix.starts_with(b"PK")
}

/// Outcome of a successful 3MF structural check
#[derive(Debug)]
pub struct ThreeMfReport {
    pub metadata: ModelMetadata,
    /// Leading bytes of the decompressed model XML, for the heuristic scan
    pub scan_sample: Vec<u8>,
}

pub fn validate<S: ByteSource>(
    source: &mut S,
    max_entry: u64,
    scan_cap: u64,
) -> Result<ThreeMfReport, InspectionError> {
    source.seek(SeekFrom::Start(0))?;
    let mut archive = ZipArchive::new(&mut *source).map_err(|e| match e {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            InspectionError::rejected("O arquivo 3MF não é um arquivo ZIP válido")
        }
        other => InspectionError::from(other),
    })?;

    let model_entry = archive
        .file_names()
        .find(|name| name.ends_with(MODEL_ENTRY))
        .map(str::to_string)
        .ok_or_else(|| {
            InspectionError::rejected("O arquivo 3MF não contém um modelo 3D válido")
        })?;
    let has_relationships = archive
        .file_names()
        .any(|name| name.trim_start_matches('/') == RELATIONSHIPS_ENTRY);

    let xml = {
        let entry = archive.by_name(&model_entry)?;
        if entry.size() > max_entry {
            return Err(InspectionError::rejected(
                "O modelo 3MF excede o tamanho máximo suportado",
            ));
        }
        let mut buf = Vec::new();
        entry.take(max_entry + 1).read_to_end(&mut buf)?;
        if buf.len() as u64 > max_entry {
            return Err(InspectionError::rejected(
                "O modelo 3MF excede o tamanho máximo suportado",
            ));
        }
        buf
    };

    let metadata = parse_model(&xml, has_relationships)?;
    let sample_len = xml.len().min(scan_cap as usize);
    Ok(ThreeMfReport {
        metadata,
        scan_sample: xml[..sample_len].to_vec(),
    })
}

fn parse_model(xml: &[u8], has_relationships: bool) -> Result<ModelMetadata, InspectionError> {
    let invalid_xml = || InspectionError::rejected("O arquivo 3MF contém XML inválido");
    let text = std::str::from_utf8(xml).map_err(|_| invalid_xml())?;
    // DTDs are refused by the parser, which also rules out external entities
    let document = roxmltree::Document::parse(text).map_err(|_| invalid_xml())?;

    let declares_core_namespace = document
        .descendants()
        .filter(|node| node.is_element())
        .any(|node| {
            node.namespaces()
                .any(|ns| ns.uri().contains(CORE_NAMESPACE_MARKER))
        });
    if !declares_core_namespace {
        return Err(InspectionError::rejected(
            "O arquivo 3MF não contém o namespace 3MF correto",
        ));
    }

    let count = |tag: &str| {
        document
            .descendants()
            .filter(|node| node.is_element() && node.tag_name().name() == tag)
            .count() as u64
    };
    let metadata_text = |key: &str| {
        document
            .descendants()
            .find(|node| {
                node.is_element()
                    && node.tag_name().name() == "metadata"
                    && node.attribute("name") == Some(key)
            })
            .and_then(|node| node.text())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    };

    Ok(ModelMetadata {
        vertices: Some(count("vertex")),
        triangles: Some(count("triangle")),
        title: metadata_text("Title"),
        description: metadata_text("Description"),
        designer: metadata_text("Designer"),
        has_relationships: Some(has_relationships),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.3mf.org/3dmanufacturing/core/2015/02">
  <metadata name="Title">Calibration Cube</metadata>
  <metadata name="Designer">Ana</metadata>
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="1" v3="2"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build><item objectid="1"/></build>
</model>"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn run(bytes: Vec<u8>) -> Result<ThreeMfReport, InspectionError> {
        validate(&mut Cursor::new(bytes), 1024 * 1024, 100)
    }

    #[test]
    fn test_valid_model() {
        let report = run(archive(&[
            ("_rels/.rels", "<Relationships/>"),
            ("3D/3dmodel.model", MODEL),
        ]))
        .unwrap();
        let meta = report.metadata;
        assert_eq!(meta.vertices, Some(3));
        assert_eq!(meta.triangles, Some(1));
        assert_eq!(meta.title.as_deref(), Some("Calibration Cube"));
        assert_eq!(meta.designer.as_deref(), Some("Ana"));
        assert_eq!(meta.description, None);
        assert_eq!(meta.has_relationships, Some(true));
        assert_eq!(report.scan_sample.len(), 100);
    }

    #[test]
    fn test_missing_model_entry() {
        let err = run(archive(&[("_rels/.rels", "<Relationships/>")])).unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF não contém um modelo 3D válido");
    }

    #[test]
    fn test_not_a_zip() {
        let err = run(b"PK but not really an archive".to_vec()).unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF não é um arquivo ZIP válido");
    }

    #[test]
    fn test_malformed_xml() {
        let err = run(archive(&[("3D/3dmodel.model", "<model><unclosed></model>")])).unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF contém XML inválido");
    }

    #[test]
    fn test_doctype_refused() {
        let xml = r#"<?xml version="1.0"?><!DOCTYPE m [<!ENTITY x SYSTEM "file:///etc/passwd">]><model xmlns="http://schemas.3mf.org/3dmanufacturing/core/2015/02">&x;</model>"#;
        let err = run(archive(&[("3D/3dmodel.model", xml)])).unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF contém XML inválido");
    }

    #[test]
    fn test_consortium_namespace_accepted() {
        let xml = r#"<model xmlns="http://schemas.3mf.org/core"><resources/></model>"#;
        assert!(run(archive(&[("3D/3dmodel.model", xml)])).is_ok());
    }

    #[test]
    fn test_namespace_outside_consortium_domain_rejected() {
        let xml = r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources/></model>"#;
        let err = run(archive(&[("3D/3dmodel.model", xml)])).unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF não contém o namespace 3MF correto");
    }

    #[test]
    fn test_model_entry_must_end_the_name() {
        let err = run(archive(&[
            ("3D/3dmodel.model.bak", MODEL),
            ("3D/x3dmodel.model/readme.txt", "hi"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF não contém um modelo 3D válido");

        let report = run(archive(&[("3D/part3dmodel.model", MODEL)])).unwrap();
        assert_eq!(report.metadata.has_relationships, Some(false));
    }

    #[test]
    fn test_wrong_namespace() {
        let err = run(archive(&[(
            "3D/3dmodel.model",
            r#"<model xmlns="http://example.com/other"/>"#,
        )]))
        .unwrap_err();
        assert_eq!(err.to_string(), "O arquivo 3MF não contém o namespace 3MF correto");
    }

    #[test]
    fn test_entry_size_cap() {
        let bytes = archive(&[("3D/3dmodel.model", MODEL)]);
        let err = validate(&mut Cursor::new(bytes), 64, 1024).unwrap_err();
        assert_eq!(err.to_string(), "O modelo 3MF excede o tamanho máximo suportado");
    }

    #[test]
    fn test_signature() {
        assert!(has_signature(b"PK\x03\x04"));
        assert!(!has_signature(b"solid"));
    }
}
