//! Turns uploaded files into texts for analysis.

use crate::error::IngestError;
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    PlainText,
    Csv,
}

impl UploadKind {
    /// Reads the media type from a `Content-Type` header value, ignoring parameters.
    pub fn from_content_type(content_type: &str) -> Result<Self, IngestError> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media_type.as_str() {
            "text/plain" => Ok(Self::PlainText),
            "text/csv" | "application/csv" => Ok(Self::Csv),
            _ => Err(IngestError::UnsupportedType(content_type.to_string())),
        }
    }
}

/// What an upload should be analyzed as.
#[derive(Debug, Clone, PartialEq)]
pub enum Upload {
    /// Fits within the length limit and is analyzed in one request.
    Single(String),
    /// Chunks of an oversized text file, or the cells of a CSV column.
    Batch(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub clean: bool,
    pub max_text_length: usize,
    pub csv_row_limit: usize,
    pub column: Option<String>,
}

pub fn ingest(kind: UploadKind, bytes: Vec<u8>, options: &IngestOptions) -> Result<Upload, IngestError> {
    match kind {
        UploadKind::PlainText => plain_text(bytes, options),
        UploadKind::Csv => csv_column(&bytes, options).map(Upload::Batch),
    }
}

fn plain_text(bytes: Vec<u8>, options: &IngestOptions) -> Result<Upload, IngestError> {
    let mut content = String::from_utf8(bytes)?;
    if options.clean {
        content = text::clean(&content);
    }
    if content.trim().is_empty() {
        return Err(IngestError::Empty);
    }

    if content.chars().count() > options.max_text_length {
        let chunks = text::chunk(&content, options.max_text_length);
        tracing::info!(chunks = chunks.len(), "Text split into chunks for analysis");
        Ok(Upload::Batch(chunks))
    } else {
        Ok(Upload::Single(content))
    }
}

/// Extracts the selected column, or the first one holding non-numeric values.
fn csv_column(bytes: &[u8], options: &IngestOptions) -> Result<Vec<String>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    let index = match &options.column {
        Some(column) => headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| IngestError::ColumnNotFound(column.clone()))?,
        None => (0..headers.len())
            .find(|&i| {
                records.iter().any(|record| {
                    record
                        .get(i)
                        .is_some_and(|cell| !cell.trim().is_empty() && cell.trim().parse::<f64>().is_err())
                })
            })
            .ok_or(IngestError::NoTextColumn)?,
    };
    tracing::debug!(column = &headers[index], rows = records.len(), "Selected CSV column");

    let texts: Vec<String> = records
        .iter()
        .filter_map(|record| record.get(index))
        .filter(|cell| !cell.trim().is_empty())
        .take(options.csv_row_limit)
        .map(|cell| {
            if options.clean {
                text::clean(cell)
            } else {
                cell.to_string()
            }
        })
        .collect();

    if texts.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> IngestOptions {
        IngestOptions {
            clean: true,
            max_text_length: 20,
            csv_row_limit: 3,
            column: None,
        }
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            UploadKind::from_content_type("text/plain; charset=utf-8").unwrap(),
            UploadKind::PlainText
        );
        assert_eq!(UploadKind::from_content_type("TEXT/CSV").unwrap(), UploadKind::Csv);
        assert!(matches!(
            UploadKind::from_content_type("image/png"),
            Err(IngestError::UnsupportedType(_))
        ));
    }

    #[test]
    fn short_text_is_analyzed_whole() {
        let upload = ingest(UploadKind::PlainText, b"  nice\n\nday ".to_vec(), &options()).unwrap();
        assert_eq!(upload, Upload::Single("nice day".into()));
    }

    #[test]
    fn long_text_is_chunked() {
        let body = b"one two three four five six seven eight nine ten".to_vec();
        let Upload::Batch(chunks) = ingest(UploadKind::PlainText, body, &options()).unwrap() else {
            panic!("expected chunks");
        };
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = ingest(UploadKind::PlainText, vec![0xff, 0xfe, 0x00], &options()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidUtf8(_)));
    }

    #[test]
    fn csv_picks_first_text_column_and_limits_rows() {
        let body = b"id,score,review\n1,0.5,Great stuff\n2,0.1,\n3,0.9,Awful http://spam.example\n4,0.2,Fine\n5,0.3,Extra\n";
        let upload = ingest(UploadKind::Csv, body.to_vec(), &options()).unwrap();
        assert_eq!(
            upload,
            Upload::Batch(vec!["Great stuff".into(), "Awful".into(), "Fine".into()])
        );
    }

    #[test]
    fn csv_named_column() {
        let mut opts = options();
        opts.column = Some("title".into());
        let body = b"body,title\nlong text,Headline\nmore,Second\n";
        let upload = ingest(UploadKind::Csv, body.to_vec(), &opts).unwrap();
        assert_eq!(upload, Upload::Batch(vec!["Headline".into(), "Second".into()]));

        opts.column = Some("missing".into());
        let err = ingest(UploadKind::Csv, body.to_vec(), &opts).unwrap_err();
        assert!(matches!(err, IngestError::ColumnNotFound(_)));
    }

    #[test]
    fn csv_without_text_column() {
        let body = b"a,b\n1,2\n3,4.5\n";
        let err = ingest(UploadKind::Csv, body.to_vec(), &options()).unwrap_err();
        assert!(matches!(err, IngestError::NoTextColumn));
    }
}
