//! Batch category: settlement and store-and-forward upkeep.
//!
//! Request body layout:
//!
//! ```text
//! 0 command        `B` + two-digit sub-type
//! 1 version
//! 2 edc type       two-digit channel code
//! 3 timestamp      YYYYMMDDhhmmss, force close only
//! 4 saf indicator
//! ```

use chrono::NaiveDateTime;

use crate::error::EncodeError;
use crate::ext::ExtView;
use crate::field::{BodyBuilder, FieldView};
use crate::message::Category;
use crate::money::Money;
use crate::symbol::{BatchType, EdcType};
use crate::WIRE_VERSION;

/// Timestamp format batches carry on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A staged settlement operation.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub kind: BatchType,
    /// Channel to settle; `All` closes every open batch.
    pub edc_type: EdcType,
    /// Batch timestamp a force close targets.
    pub timestamp: Option<NaiveDateTime>,
    /// Store-and-forward scope selector, firmware specific.
    pub saf_indicator: Option<String>,
}

impl BatchRequest {
    pub fn new(kind: BatchType) -> Self {
        BatchRequest {
            kind,
            ..Default::default()
        }
    }

    pub fn close() -> Self {
        Self::new(BatchType::BatchClose)
    }

    pub fn force_close(timestamp: NaiveDateTime) -> Self {
        let mut r = Self::new(BatchType::ForceBatchClose);
        r.timestamp = Some(timestamp);
        r
    }

    pub fn clear() -> Self {
        Self::new(BatchType::BatchClear)
    }

    pub fn purge() -> Self {
        Self::new(BatchType::PurgeBatch)
    }

    pub fn saf_upload() -> Self {
        Self::new(BatchType::SafUpload)
    }

    pub fn delete_saf_file() -> Self {
        Self::new(BatchType::DeleteSafFile)
    }

    pub fn with_edc(mut self, edc_type: EdcType) -> Self {
        self.edc_type = edc_type;
        self
    }

    /// Validates the request and encodes the wire body.
    pub fn encode(&self) -> Result<String, EncodeError> {
        if self.kind == BatchType::ForceBatchClose && self.timestamp.is_none() {
            return Err(EncodeError::ForceValue {
                trans: self.kind.name(),
                field: "timestamp",
            });
        }

        let mut b = BodyBuilder::new();
        b.push_raw(format!(
            "{}{}",
            Category::Batch.letter(),
            self.kind.wire_code()
        ));
        b.push_raw(WIRE_VERSION.to_string());
        b.push_raw(self.edc_type.wire_code());
        b.push_opt(
            "timestamp",
            self.timestamp
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .as_deref(),
        )?;
        b.push_opt("saf_indicator", self.saf_indicator.as_deref())?;
        b.finish()
    }
}

/// Per-channel settlement totals, decoded from `NAME=count=amount` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdcTotal {
    /// Channel name exactly as reported.
    pub edc_name: String,
    pub count: u32,
    pub amount: Money,
}

impl EdcTotal {
    /// Channel behind the reported name, if it is in the table.
    pub fn edc_type(&self) -> Option<EdcType> {
        EdcType::from_name(&self.edc_name)
    }

    pub(crate) fn from_records(records: Vec<Vec<&str>>) -> Vec<EdcTotal> {
        records
            .into_iter()
            .filter_map(|cols| match cols.as_slice() {
                [name, count, amount] => Some(EdcTotal {
                    edc_name: name.to_string(),
                    count: count.parse().ok()?,
                    amount: Money::from_wire(amount)?,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Terminal reply to a batch request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    pub result_code: String,
    pub result_text: String,
    pub batch_number: Option<String>,
    pub host_trace_number: Option<String>,
    pub terminal_id: Option<String>,
    pub merchant_id: Option<String>,
    pub timestamp: Option<String>,
    pub auth_code: Option<String>,
    pub host_code: Option<String>,
    pub host_response: Option<String>,
    pub message: Option<String>,
    /// Totals per settled channel.
    pub edc_totals: Vec<EdcTotal>,
    pub saf_total_count: Option<u32>,
    pub saf_total_amount: Option<Money>,
    pub saf_uploaded_count: Option<u32>,
    pub saf_uploaded_amount: Option<Money>,
    pub saf_failed_count: Option<u32>,
    pub saf_failed_amount: Option<Money>,
    pub saf_deleted_count: Option<u32>,
    pub ext_data: ExtView,
}

impl BatchResponse {
    /// Decodes a reassembled body, leniently.
    pub fn decode(body: &str) -> Self {
        let v = FieldView::new(body);
        BatchResponse {
            result_code: v.get(0).unwrap_or("").to_string(),
            result_text: v.get(1).unwrap_or("").to_string(),
            batch_number: v.owned(2),
            host_trace_number: v.owned(3),
            terminal_id: v.owned(4),
            merchant_id: v.owned(5),
            timestamp: v.owned(6),
            auth_code: v.owned(7),
            host_code: v.owned(8),
            host_response: v.owned(9),
            message: v.owned(10),
            edc_totals: EdcTotal::from_records(v.records(11)),
            saf_total_count: v.number(12),
            saf_total_amount: v.amount(13),
            saf_uploaded_count: v.number(14),
            saf_uploaded_amount: v.amount(15),
            saf_failed_count: v.number(16),
            saf_failed_amount: v.amount(17),
            saf_deleted_count: v.number(18),
            ext_data: ExtView::parse(v.get(19).unwrap_or("")),
        }
    }

    /// Totals for one channel, if the terminal reported it.
    pub fn totals_for(&self, edc_type: EdcType) -> Option<&EdcTotal> {
        self.edc_totals
            .iter()
            .find(|t| t.edc_type() == Some(edc_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FS;
    use chrono::NaiveDate;

    fn split(body: &str) -> Vec<&str> {
        body.split(FS as char).collect()
    }

    #[test]
    fn test_close_encoding() {
        let body = BatchRequest::close().encode().unwrap();
        let f = split(&body);
        assert_eq!(f[0], "B01");
        assert_eq!(f[1], "1.28");
        assert_eq!(f[2], "00");
        assert_eq!(f.len(), 5);
    }

    #[test]
    fn test_force_close_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2026, 8, 25)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let body = BatchRequest::force_close(ts).encode().unwrap();
        let f = split(&body);
        assert_eq!(f[0], "B02");
        assert_eq!(f[3], "20260825143000");

        let req = BatchRequest::new(BatchType::ForceBatchClose);
        assert!(matches!(
            req.encode(),
            Err(EncodeError::ForceValue {
                field: "timestamp",
                ..
            })
        ));
    }

    #[test]
    fn test_scoped_close() {
        let body = BatchRequest::close()
            .with_edc(EdcType::Credit)
            .encode()
            .unwrap();
        assert_eq!(split(&body)[2], "01");
    }

    #[test]
    fn test_response_decoding_with_totals() {
        let body = [
            "000000",
            "OK",
            "77",
            "000812",
            "TERM001",
            "MID9",
            "20260825020000",
            "",
            "00",
            "CLOSED",
            "BATCH CLOSED",
            "CREDIT=12=345000\u{1f}DEBIT=3=42000\u{1f}bogus",
            "4",
            "9000",
            "4",
            "9000",
            "0",
            "0",
            "0",
            "",
        ]
        .join("\u{1c}");
        let resp = BatchResponse::decode(&body);
        assert_eq!(resp.result_code, "000000");
        assert_eq!(resp.batch_number.as_deref(), Some("77"));
        assert_eq!(resp.edc_totals.len(), 2);
        let credit = resp.totals_for(EdcType::Credit).unwrap();
        assert_eq!(credit.count, 12);
        assert_eq!(credit.amount, Money::from_cents(345000));
        assert_eq!(resp.totals_for(EdcType::Gift), None);
        assert_eq!(resp.saf_total_count, Some(4));
        assert_eq!(resp.saf_total_amount, Some(Money::from_cents(9000)));
    }

    #[test]
    fn test_short_response_keeps_totals_empty() {
        let resp = BatchResponse::decode("100013\u{1c}ABORTED");
        assert_eq!(resp.result_code, "100013");
        assert!(resp.edc_totals.is_empty());
        assert_eq!(resp.saf_total_count, None);
    }
}
