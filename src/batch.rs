//! CSV batch ingestion.
//!
//! Each row's first 30 cells are the anonymized feature vector; any further
//! columns (such as a ground-truth `Class`) are carried through unchanged.
//! The scored table gets three extra columns: `Prediction`, `Fraud Probability`
//! and `Label`.

use crate::error::{ShieldError, ShieldResult};
use crate::feature_extractor::InputSchema;
use crate::models::{BatchPrediction, PredictionService};
use crate::types::record::{FeatureRecord, FEATURE_COUNT};
use crate::types::Record;
use std::io::{Read, Write};
use tracing::{debug, info};

/// File name offered to clients downloading a scored table
pub const RESULT_FILE_NAME: &str = "fraud_predictions.csv";

/// Columns appended to every scored table
pub const RESULT_COLUMNS: [&str; 3] = ["Prediction", "Fraud Probability", "Label"];

/// Input table with predictions appended
#[derive(Debug, Clone)]
pub struct ScoredTable {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
    prediction: BatchPrediction,
}

impl ScoredTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fraud_count(&self) -> usize {
        self.prediction.fraud_count()
    }

    pub fn prediction(&self) -> &BatchPrediction {
        &self.prediction
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> ShieldResult<()> {
        let mut out = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        let mut header = self.headers.clone();
        for column in RESULT_COLUMNS {
            header.push_field(column);
        }
        out.write_record(&header).map_err(write_error)?;

        for (i, row) in self.rows.iter().enumerate() {
            let label = self.prediction.labels[i];
            let probability = self.prediction.probabilities[i].fraud();

            let mut record = row.clone();
            record.push_field(&label.as_u8().to_string());
            record.push_field(&probability.to_string());
            record.push_field(label.as_str());
            out.write_record(&record).map_err(write_error)?;
        }

        out.flush()
            .map_err(|e| ShieldError::prediction(format!("failed to flush CSV output: {}", e)))
    }

    pub fn to_csv(&self) -> ShieldResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }
}

fn write_error(e: csv::Error) -> ShieldError {
    ShieldError::prediction(format!("failed to write CSV output: {}", e))
}

/// Score every row of a CSV table with a header row
pub fn score_csv<R: Read>(service: &PredictionService, reader: R) -> ShieldResult<ScoredTable> {
    if service.schema() != InputSchema::Anonymized {
        return Err(ShieldError::invalid(format!(
            "batch scoring requires the anonymized schema, this model scores {} records",
            service.schema().as_str()
        )));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| ShieldError::invalid(format!("failed to read CSV header: {}", e)))?
        .clone();

    if headers.len() < FEATURE_COUNT {
        return Err(too_few_columns());
    }

    let mut rows = Vec::new();
    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let line = i + 1;
        let row = row.map_err(|e| ShieldError::invalid(format!("row {}: {}", line, e)))?;
        if row.len() < FEATURE_COUNT {
            return Err(ShieldError::invalid(format!(
                "row {}: has {} columns, at least {} are required",
                line,
                row.len(),
                FEATURE_COUNT
            )));
        }

        let record = FeatureRecord::from_cells(row.iter().take(FEATURE_COUNT))
            .map_err(|e| ShieldError::invalid(format!("row {}: {}", line, reason(&e))))?;
        records.push(Record::from(record));
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = headers.len(), "CSV parsed");

    let prediction = service.predict_batch(&records)?;

    info!(
        rows = prediction.len(),
        fraud = prediction.fraud_count(),
        "Batch scored"
    );

    Ok(ScoredTable {
        headers,
        rows,
        prediction,
    })
}

fn too_few_columns() -> ShieldError {
    ShieldError::invalid(format!(
        "The CSV must contain at least {} columns",
        FEATURE_COUNT
    ))
}

fn reason(e: &ShieldError) -> String {
    match e {
        ShieldError::InvalidRecord(msg)
        | ShieldError::ArtifactLoad(msg)
        | ShieldError::Prediction(msg) => msg.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureEncoder;
    use crate::models::Classifier;
    use crate::types::verdict::FraudLabel;

    /// Fraud probability is the Amount column scaled down
    struct AmountScaled;

    impl Classifier for AmountScaled {
        fn kind(&self) -> &'static str {
            "amount_scaled"
        }

        fn input_width(&self) -> usize {
            FEATURE_COUNT
        }

        fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
            Ok(rows.iter().map(|r| (r[29] / 1000.0).clamp(0.0, 1.0)).collect())
        }
    }

    fn service() -> PredictionService {
        PredictionService::new("amount", FeatureEncoder::anonymized(), Box::new(AmountScaled))
            .unwrap()
    }

    fn header() -> String {
        let mut cols: Vec<String> = vec!["Time".to_string()];
        cols.extend((1..=28).map(|i| format!("V{}", i)));
        cols.push("Amount".to_string());
        cols.push("Class".to_string());
        cols.join(",")
    }

    fn row(amount: f64, class: u8) -> String {
        let mut cells = vec!["0".to_string(); 29];
        cells.push(amount.to_string());
        cells.push(class.to_string());
        cells.join(",")
    }

    #[test]
    fn test_score_csv_appends_columns() {
        let input = format!("{}\n{}\n{}\n{}\n", header(), row(900.0, 1), row(100.0, 0), row(750.0, 1));
        let table = score_csv(&service(), input.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.fraud_count(), 2);
        assert_eq!(
            table.prediction().labels,
            vec![FraudLabel::Fraud, FraudLabel::Legitimate, FraudLabel::Fraud]
        );

        let output = String::from_utf8(table.to_csv().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("Amount,Class,Prediction,Fraud Probability,Label"));
        assert!(lines[1].ends_with(",900,1,1,0.9,Fraud"));
        assert!(lines[2].ends_with(",100,0,0,0.1,Legitimate"));
    }

    #[test]
    fn test_too_few_columns() {
        let input = "a,b,c\n1,2,3\n";
        let err = score_csv(&service(), input.as_bytes()).unwrap_err();
        assert_eq!(err, too_few_columns());
        assert!(err.to_string().contains("at least 30 columns"));
    }

    #[test]
    fn test_short_row_rejected() {
        let input = format!("{}\n{}\n1,2,3\n", header(), row(10.0, 0));
        let err = score_csv(&service(), input.as_bytes()).unwrap_err();
        assert!(err.is_invalid_record());
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_non_numeric_cell_names_row_and_column() {
        let bad = row(10.0, 0).replacen('0', "abc", 1);
        let input = format!("{}\n{}\n{}\n", header(), row(10.0, 0), bad);
        let err = score_csv(&service(), input.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(err.is_invalid_record());
        assert!(msg.contains("row 2"));
        assert!(msg.contains("Time"));
    }

    #[test]
    fn test_header_only_table() {
        let input = format!("{}\n", header());
        let table = score_csv(&service(), input.as_bytes()).unwrap();
        assert!(table.is_empty());

        let output = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_transaction_schema_rejected() {
        let svc = PredictionService::new(
            "tx",
            FeatureEncoder::transaction_default(),
            Box::new(TxWidth),
        )
        .unwrap();
        let input = format!("{}\n{}\n", header(), row(1.0, 0));
        let err = score_csv(&svc, input.as_bytes()).unwrap_err();
        assert!(err.is_invalid_record());
    }

    struct TxWidth;

    impl Classifier for TxWidth {
        fn kind(&self) -> &'static str {
            "tx"
        }

        fn input_width(&self) -> usize {
            6
        }

        fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
            Ok(vec![0.0; rows.len()])
        }
    }

    #[test]
    fn test_carried_cells_keep_their_whitespace() {
        let input = format!(
            "{}, note\n{},  padded text  \n",
            header(),
            row(100.0, 0).replacen("0,", " 0 ,", 1)
        );
        let table = score_csv(&service(), input.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);

        let output = table.to_csv().unwrap();
        let mut reader = csv::Reader::from_reader(output.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[31], " note");
        assert_eq!(&headers[32], "Prediction");

        let scored = reader.records().next().unwrap().unwrap();
        assert_eq!(&scored[0], " 0 ");
        assert_eq!(&scored[31], "  padded text  ");
        assert_eq!(&scored[32], "0");
        assert_eq!(&scored[34], "Legitimate");
    }
}
