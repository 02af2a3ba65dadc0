//! BOM import from KiCad's CSV and XML exports.
//!
//! Grouped rows (`"R1, R2"`) are split into one line per reference and
//! KiCad's `~` placeholder reads as absent. Rows that cannot be read are
//! kept in [`BomFile::rejected`] like undecodable JSON lines.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::BomGuardError;
use crate::model::Component;

use super::persist::{BomFile, RejectedLine};

const MPN_FIELDS: [&str; 4] = ["mpn", "part number", "manufacturer part number", "mfr part number"];

/// Load a KiCad BOM export, picking the parser from the file extension.
pub fn load_kicad_export(path: &Path) -> Result<BomFile, BomGuardError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let content = fs::read_to_string(path)?;
    let mut bom = match extension.as_str() {
        "csv" => parse_kicad_csv(&content)?,
        "xml" => parse_kicad_xml(&content)?,
        other => {
            return Err(BomGuardError::Import(format!(
                "unsupported export format '{other}', expected csv or xml"
            )))
        }
    };
    if bom.project_name.is_none() {
        bom.project_name = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
    }
    tracing::info!(
        "Imported {} components from KiCad export {:?} ({} rejected)",
        bom.components.len(),
        path,
        bom.rejected.len()
    );
    Ok(bom)
}

/// `~` and blank cells are absent.
fn cell(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "~")
        .map(str::to_string)
}

fn component_lines(
    references: &str,
    value: &str,
    footprint: Option<String>,
    datasheet: Option<String>,
    mpn: Option<String>,
    description: Option<String>,
    package: Option<String>,
) -> Vec<Component> {
    let value = value.trim();
    let description = description.unwrap_or_else(|| {
        format!("{} {}", value, footprint.as_deref().unwrap_or_default())
            .trim()
            .to_string()
    });
    references
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|reference| {
            let mut component = Component::new(reference, value).with_description(description.clone());
            if let Some(footprint) = &footprint {
                component = component.with_footprint(footprint.clone());
            }
            component.datasheet_url = datasheet.clone();
            component.mpn = mpn.clone();
            component.package = package.clone();
            component
        })
        .collect()
}

fn reject(bom: &mut BomFile, reference: String, error: impl Into<String>) {
    let error = error.into();
    tracing::warn!("Rejected KiCad BOM row {}: {}", reference, error);
    let index = bom.components.len() + bom.rejected.len();
    bom.rejected.push(RejectedLine {
        index,
        reference,
        error,
        raw: None,
    });
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Split CSV text into records, honouring quoted fields and `""` escapes.
fn csv_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            '"' if field.is_empty() => quoted = true,
            ',' if !quoted => record.push(std::mem::take(&mut field)),
            '\r' if !quoted => {}
            '\n' if !quoted => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

struct CsvColumns {
    reference: usize,
    value: usize,
    footprint: usize,
    datasheet: Option<usize>,
    mpn: Option<usize>,
    description: Option<usize>,
    package: Option<usize>,
}

impl CsvColumns {
    /// Recognise the header row; preamble rows above it yield `None`.
    fn from_header(row: &[String]) -> Option<Self> {
        let find = |names: &[&str]| {
            row.iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        Some(Self {
            reference: find(&["reference", "ref", "references"])?,
            value: find(&["value"])?,
            footprint: find(&["footprint"])?,
            datasheet: find(&["datasheet"]),
            mpn: find(&MPN_FIELDS),
            description: find(&["description"]),
            package: find(&["package"]),
        })
    }

    fn required_width(&self) -> usize {
        self.reference.max(self.value).max(self.footprint) + 1
    }
}

/// Parse KiCad's CSV BOM export.
///
/// Rows above the first header naming Reference, Value and Footprint are
/// treated as preamble. A file without such a header is an error.
pub fn parse_kicad_csv(content: &str) -> Result<BomFile, BomGuardError> {
    let records = csv_records(content);
    let mut rows = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.iter().any(|f| !f.trim().is_empty()));

    let columns = rows
        .by_ref()
        .find_map(|(_, row)| CsvColumns::from_header(row))
        .ok_or_else(|| {
            BomGuardError::Import("CSV has no header row with Reference, Value and Footprint".to_string())
        })?;

    let mut bom = BomFile::default();
    for (index, row) in rows {
        let at = |column: Option<usize>| cell(column.and_then(|c| row.get(c)).map(String::as_str));
        if row.len() < columns.required_width() {
            let reference = at(Some(columns.reference)).unwrap_or_else(|| format!("row {}", index + 1));
            reject(&mut bom, reference, format!("row has {} columns", row.len()));
            continue;
        }
        let references = row[columns.reference].as_str();
        if references.trim().is_empty() {
            reject(&mut bom, format!("row {}", index + 1), "empty reference");
            continue;
        }
        let lines = component_lines(
            references,
            &row[columns.value],
            at(Some(columns.footprint)),
            at(columns.datasheet),
            at(columns.mpn),
            at(columns.description),
            at(columns.package),
        );
        bom.components.extend(lines);
    }
    Ok(bom)
}

// ---------------------------------------------------------------------------
// XML
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename = "export")]
struct KicadExportXml {
    design: Option<KicadDesignXml>,
    components: Option<KicadComponentsXml>,
}

#[derive(Debug, Deserialize)]
struct KicadDesignXml {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KicadComponentsXml {
    #[serde(rename = "comp", default)]
    comp: Vec<KicadCompXml>,
}

#[derive(Debug, Deserialize)]
struct KicadCompXml {
    #[serde(rename = "@ref")]
    reference: Option<String>,
    value: Option<String>,
    footprint: Option<String>,
    datasheet: Option<String>,
    description: Option<String>,
    fields: Option<KicadFieldsXml>,
}

#[derive(Debug, Deserialize)]
struct KicadFieldsXml {
    #[serde(rename = "field", default)]
    field: Vec<KicadFieldXml>,
}

#[derive(Debug, Deserialize)]
struct KicadFieldXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$value", default)]
    value: String,
}

impl KicadCompXml {
    fn field(&self, names: &[&str]) -> Option<String> {
        self.fields
            .as_ref()?
            .field
            .iter()
            .find(|f| names.iter().any(|n| f.name.trim().eq_ignore_ascii_case(n)))
            .and_then(|f| cell(Some(f.value.as_str())))
    }
}

/// Parse KiCad's XML netlist/BOM export (`<export><components><comp ref=..>`).
pub fn parse_kicad_xml(content: &str) -> Result<BomFile, BomGuardError> {
    let export: KicadExportXml =
        quick_xml::de::from_str(content).map_err(|e| BomGuardError::Import(e.to_string()))?;
    let components = export
        .components
        .ok_or_else(|| BomGuardError::Import("XML has no <components> element".to_string()))?;

    let mut bom = BomFile {
        project_name: export
            .design
            .and_then(|d| cell(d.source.as_deref()))
            .and_then(|source| {
                Path::new(&source)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            }),
        ..BomFile::default()
    };

    for (index, comp) in components.comp.iter().enumerate() {
        let Some(reference) = cell(comp.reference.as_deref()) else {
            reject(&mut bom, format!("comp {}", index + 1), "missing ref attribute");
            continue;
        };
        let description = comp
            .field(&["description"])
            .or_else(|| cell(comp.description.as_deref()));
        let lines = component_lines(
            &reference,
            comp.value.as_deref().unwrap_or_default(),
            cell(comp.footprint.as_deref()),
            cell(comp.datasheet.as_deref()),
            comp.field(&MPN_FIELDS),
            description,
            comp.field(&["package"]),
        );
        bom.components.extend(lines);
    }
    Ok(bom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FootprintOrigin;

    const CSV: &str = "\"Source:\",\"/home/me/blinky/blinky.kicad_sch\"\n\
\"Tool:\",\"Eeschema 7.0\"\n\
\n\
\"Reference\",\"Value\",\"Footprint\",\"Datasheet\",\"Part Number\"\n\
\"R1, R2\",\"10k\",\"Resistor_SMD:R_0805_2012Metric\",\"~\",\"RC0805FR-0710KL\"\n\
\"C1\",\"100nF, 50V\",\"~\",\"https://example.invalid/c.pdf\",\"\"\n\
\"U1\"\n";

    #[test]
    fn test_csv_records_handle_quotes() {
        let records = csv_records("a,\"b,c\",\"say \"\"hi\"\"\"\r\nx,\"multi\nline\"\n");
        assert_eq!(records, vec![vec!["a", "b,c", "say \"hi\""], vec!["x", "multi\nline"]]);
    }

    #[test]
    fn test_csv_import_splits_grouped_references() {
        let bom = parse_kicad_csv(CSV).unwrap();
        let refs: Vec<_> = bom.components.iter().map(|c| c.reference.as_str()).collect();
        assert_eq!(refs, vec!["R1", "R2", "C1"]);

        let r2 = &bom.components[1];
        assert_eq!(r2.footprint.as_deref(), Some("Resistor_SMD:R_0805_2012Metric"));
        assert_eq!(r2.status.footprint_origin, FootprintOrigin::Bom);
        assert_eq!(r2.mpn.as_deref(), Some("RC0805FR-0710KL"));
        assert!(r2.datasheet_url.is_none());
        assert_eq!(r2.description, "10k Resistor_SMD:R_0805_2012Metric");
        assert_eq!(r2.quantity, 1);

        let c1 = &bom.components[2];
        assert_eq!(c1.value, "100nF, 50V");
        assert!(c1.footprint.is_none());
        assert!(c1.mpn.is_none());
        assert_eq!(c1.datasheet_url.as_deref(), Some("https://example.invalid/c.pdf"));

        assert_eq!(bom.rejected.len(), 1);
        assert_eq!(bom.rejected[0].reference, "U1");
    }

    #[test]
    fn test_csv_without_header_is_error() {
        let err = parse_kicad_csv("\"Ref\",\"Qty\"\n\"R1\",\"1\"\n").unwrap_err();
        assert!(matches!(err, BomGuardError::Import(_)));
    }

    #[test]
    fn test_xml_import_reads_fields() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<export version="E">
  <design>
    <source>/home/me/blinky/blinky.kicad_sch</source>
    <tool>Eeschema 7.0</tool>
  </design>
  <components>
    <comp ref="U1">
      <value>NE555</value>
      <footprint>Package_SO:SOIC-8_3.9x4.9mm_P1.27mm</footprint>
      <datasheet>~</datasheet>
      <fields>
        <field name="Manufacturer Part Number">NE555DR</field>
        <field name="Description">Precision timer</field>
      </fields>
      <libsource lib="Timer" part="NE555" description="Timer"/>
    </comp>
    <comp ref="R1">
      <value>10k</value>
      <datasheet>https://example.invalid/r.pdf</datasheet>
    </comp>
  </components>
</export>"#;

        let bom = parse_kicad_xml(xml).unwrap();
        assert_eq!(bom.project_name.as_deref(), Some("blinky"));
        assert_eq!(bom.components.len(), 2);

        let u1 = &bom.components[0];
        assert_eq!(u1.mpn.as_deref(), Some("NE555DR"));
        assert_eq!(u1.description, "Precision timer");
        assert!(u1.datasheet_url.is_none());

        let r1 = &bom.components[1];
        assert!(r1.footprint.is_none());
        assert_eq!(r1.description, "10k");
        assert_eq!(r1.datasheet_url.as_deref(), Some("https://example.invalid/r.pdf"));
    }

    #[test]
    fn test_xml_without_components_is_error() {
        let err = parse_kicad_xml("<export><design/></export>").unwrap_err();
        assert!(matches!(err, BomGuardError::Import(_)));
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bom.xlsx");
        fs::write(&path, "").unwrap();
        assert!(matches!(load_kicad_export(&path), Err(BomGuardError::Import(_))));
    }
}
