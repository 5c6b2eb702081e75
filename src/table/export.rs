//! CSV serialization of a fixed column projection

use crate::table::record::{Column, Record};
use crate::Result;
use anyhow::{anyhow, Context};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// How field values are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvStyle {
    /// Standard CSV quoting where a field needs it (commas, quotes, newlines)
    #[default]
    Quoted,
    /// Fields joined verbatim; a value containing a comma shifts the row
    Verbatim,
}

impl CsvStyle {
    fn quote_style(self) -> QuoteStyle {
        match self {
            CsvStyle::Quoted => QuoteStyle::Necessary,
            CsvStyle::Verbatim => QuoteStyle::Never,
        }
    }
}

/// Serialize `records` under a header of `columns` labels.
///
/// Returns `None` for an empty record set.
pub fn export_csv<R: Record>(
    records: &[R],
    columns: &[Column],
    style: CsvStyle,
) -> Result<Option<Vec<u8>>> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut writer = WriterBuilder::new()
        .quote_style(style.quote_style())
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.label))?;
    for record in records {
        writer.write_record(
            columns
                .iter()
                .map(|c| record.sort_value(c.key).to_string()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV buffer: {}", e.error()))?;
    Ok(Some(bytes))
}

/// Write the table's CSV artifact into `dir` under its fixed file name.
///
/// Returns the written path, or `None` when there was nothing to export.
pub fn write_csv<R: Record>(dir: &Path, records: &[R], style: CsvStyle) -> Result<Option<PathBuf>> {
    let spec = R::table();
    let Some(bytes) = export_csv(records, spec.csv_columns, style)? else {
        return Ok(None);
    };

    let path = dir.join(spec.csv_filename);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::models::{QualityRecord, WhoisRecord};

    fn la() -> WhoisRecord {
        WhoisRecord {
            ip: "1.2.3.4".to_string(),
            country: "US".to_string(),
            region: "CA".to_string(),
            city: "LA".to_string(),
            isp: "X".to_string(),
            asn: "AS1".to_string(),
            timezone: "PST".to_string(),
            status: "success".to_string(),
            ..Default::default()
        }
    }

    fn export_text<R: Record>(records: &[R], style: CsvStyle) -> String {
        let bytes = export_csv(records, R::table().csv_columns, style)
            .unwrap()
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_whois_row_below_header() {
        let text = export_text(&[la()], CsvStyle::Quoted);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "IP,Country,Region,City,ISP,ASN,Timezone,Status");
        assert_eq!(lines[1], "1.2.3.4,US,CA,LA,X,AS1,PST,success");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_quality_projection_and_flag_tokens() {
        let mut record = QualityRecord::live("1.1.1.1", "8080");
        record.country = "US".to_string();
        record.city = "NYC".to_string();
        record.region = "NY".to_string();
        record.vpn = true;
        record.isp = "ISP".to_string();
        record.organization = "Org".to_string();
        record.fraud_score = Some(90);

        let text = export_text(&[record], CsvStyle::Quoted);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "IP:Port,Status,Country,City,VPN,Proxy,ISP,Organization"
        );
        assert_eq!(lines[1], "1.1.1.1:8080,Live,US,NYC,Yes,No,ISP,Org");
    }

    #[test]
    fn test_empty_export_is_none() {
        let out = export_csv::<WhoisRecord>(&[], WhoisRecord::table().csv_columns, CsvStyle::Quoted)
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_embedded_comma_quoted_or_verbatim() {
        let mut record = la();
        record.isp = "Cloudflare, Inc.".to_string();

        let quoted = export_text(&[record.clone()], CsvStyle::Quoted);
        assert_eq!(
            quoted.lines().nth(1).unwrap(),
            "1.2.3.4,US,CA,LA,\"Cloudflare, Inc.\",AS1,PST,success"
        );

        let verbatim = export_text(&[record], CsvStyle::Verbatim);
        assert_eq!(
            verbatim.lines().nth(1).unwrap(),
            "1.2.3.4,US,CA,LA,Cloudflare, Inc.,AS1,PST,success"
        );
    }

    #[test]
    fn test_rows_follow_input_order() {
        let mut second = la();
        second.ip = "9.9.9.9".to_string();
        let text = export_text(&[second, la()], CsvStyle::Quoted);
        let first_cells: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(first_cells, vec!["9.9.9.9", "1.2.3.4"]);
    }

    #[test]
    fn test_write_csv_uses_fixed_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), &[la()], CsvStyle::Quoted)
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("whois_results.csv"));
        assert!(fs::read_to_string(&path).unwrap().starts_with("IP,Country"));

        let none = write_csv::<QualityRecord>(dir.path(), &[], CsvStyle::Quoted).unwrap();
        assert!(none.is_none());
        assert!(!dir.path().join("quality_results.csv").exists());
    }
}
