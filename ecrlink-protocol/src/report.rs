//! Report category: local and host transaction queries.
//!
//! Request body layout:
//!
//! ```text
//! 0 command          `R` + two-digit sub-type
//! 1 version
//! 2 edc type
//! 3 card brand       two-digit filter
//! 4 payment type     two-digit filter
//! 5 record number
//! 6 ref number
//! 7 auth code
//! 8 ecr ref number
//! 9 saf indicator
//! ```
//!
//! Detail queries address a single stored record and must carry at least one
//! of record number, ref number, auth code or ECR ref.

use crate::error::EncodeError;
use crate::ext::ExtView;
use crate::field::{BodyBuilder, FieldView};
use crate::message::Category;
use crate::money::Money;
use crate::symbol::{CardBrand, EdcType, PaymentType, ReportType};
use crate::WIRE_VERSION;

/// A staged report query.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub kind: ReportType,
    pub edc_type: EdcType,
    pub card_brand: Option<CardBrand>,
    pub payment_type: Option<PaymentType>,
    /// One-based index into the terminal's stored transactions.
    pub record_number: Option<u32>,
    pub ref_number: Option<String>,
    pub auth_code: Option<String>,
    pub ecr_ref_number: Option<String>,
    pub saf_indicator: Option<String>,
}

impl ReportRequest {
    pub fn new(kind: ReportType) -> Self {
        ReportRequest {
            kind,
            ..Default::default()
        }
    }

    pub fn local_totals(edc_type: EdcType) -> Self {
        let mut r = Self::new(ReportType::LocalTotalReport);
        r.edc_type = edc_type;
        r
    }

    pub fn local_detail(record_number: u32) -> Self {
        let mut r = Self::new(ReportType::LocalDetailReport);
        r.record_number = Some(record_number);
        r
    }

    pub fn local_failed() -> Self {
        Self::new(ReportType::LocalFailedReport)
    }

    pub fn host_report() -> Self {
        Self::new(ReportType::HostReport)
    }

    pub fn history() -> Self {
        Self::new(ReportType::HistoryReport)
    }

    pub fn saf_summary() -> Self {
        Self::new(ReportType::SafSummaryReport)
    }

    pub fn with_card_brand(mut self, brand: CardBrand) -> Self {
        self.card_brand = Some(brand);
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    fn has_record_identifier(&self) -> bool {
        self.record_number.is_some()
            || self.ref_number.is_some()
            || self.auth_code.is_some()
            || self.ecr_ref_number.is_some()
    }

    /// Validates the request and encodes the wire body.
    pub fn encode(&self) -> Result<String, EncodeError> {
        if self.kind.is_detail() && !self.has_record_identifier() {
            return Err(EncodeError::ForceValue {
                trans: self.kind.name(),
                field: "record_number",
            });
        }

        let mut b = BodyBuilder::new();
        b.push_raw(format!(
            "{}{}",
            Category::Report.letter(),
            self.kind.wire_code()
        ));
        b.push_raw(WIRE_VERSION.to_string());
        b.push_raw(self.edc_type.wire_code());
        b.push_raw(
            self.card_brand
                .map(|c| c.wire_code())
                .unwrap_or_default(),
        );
        b.push_raw(
            self.payment_type
                .map(|t| t.wire_code())
                .unwrap_or_default(),
        );
        b.push_opt(
            "record_number",
            self.record_number.map(|n| n.to_string()).as_deref(),
        )?;
        b.push_opt("ref_number", self.ref_number.as_deref())?;
        b.push_opt("auth_code", self.auth_code.as_deref())?;
        b.push_opt("ecr_ref_number", self.ecr_ref_number.as_deref())?;
        b.push_opt("saf_indicator", self.saf_indicator.as_deref())?;
        b.finish()
    }
}

/// Per-brand totals, decoded from `code=count=amount` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandTotal {
    /// Two-digit brand code exactly as reported.
    pub brand_code: String,
    pub count: u32,
    pub amount: Money,
}

impl BrandTotal {
    /// Brand behind the reported code, if it is in the table.
    pub fn brand(&self) -> Option<CardBrand> {
        CardBrand::from_wire(&self.brand_code)
    }

    fn from_records(records: Vec<Vec<&str>>) -> Vec<BrandTotal> {
        records
            .into_iter()
            .filter_map(|cols| match cols.as_slice() {
                [code, count, amount] => Some(BrandTotal {
                    brand_code: code.to_string(),
                    count: count.parse().ok()?,
                    amount: Money::from_wire(amount)?,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Terminal reply to a report query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportResponse {
    pub result_code: String,
    pub result_text: String,
    /// How many records matched the query.
    pub total_records: Option<u32>,
    /// Which record this body describes.
    pub record_number: Option<u32>,
    /// Two-digit payment type of the reported transaction.
    pub payment_type_code: Option<String>,
    /// Payment type before a void or adjust rewrote it.
    pub orig_payment_type_code: Option<String>,
    pub host_trace_number: Option<String>,
    pub batch_number: Option<String>,
    pub auth_code: Option<String>,
    pub host_code: Option<String>,
    pub host_response: Option<String>,
    pub message: Option<String>,
    pub approved_amount: Option<Money>,
    pub remaining_balance: Option<Money>,
    pub extra_balance: Option<Money>,
    pub account: Option<String>,
    pub card_brand_code: Option<String>,
    pub cv_response: Option<String>,
    pub ref_number: Option<String>,
    pub ecr_ref_number: Option<String>,
    pub timestamp: Option<String>,
    pub clerk_id: Option<String>,
    pub shift_id: Option<String>,
    /// Totals per channel, for total-style reports.
    pub edc_totals: Vec<crate::batch::EdcTotal>,
    /// Totals per card brand, for total-style reports.
    pub brand_totals: Vec<BrandTotal>,
    pub ext_data: ExtView,
}

impl ReportResponse {
    /// Decodes a reassembled body, leniently.
    pub fn decode(body: &str) -> Self {
        let v = FieldView::new(body);
        let balances = v.sub(13);
        ReportResponse {
            result_code: v.get(0).unwrap_or("").to_string(),
            result_text: v.get(1).unwrap_or("").to_string(),
            total_records: v.number(2),
            record_number: v.number(3),
            payment_type_code: v.owned(4),
            orig_payment_type_code: v.owned(5),
            host_trace_number: v.owned(6),
            batch_number: v.owned(7),
            auth_code: v.owned(8),
            host_code: v.owned(9),
            host_response: v.owned(10),
            message: v.owned(11),
            approved_amount: v.amount(12),
            remaining_balance: balances.first().copied().and_then(Money::from_wire),
            extra_balance: balances.get(1).copied().and_then(Money::from_wire),
            account: v.owned(14),
            card_brand_code: v.owned(15),
            cv_response: v.owned(16),
            ref_number: v.owned(17),
            ecr_ref_number: v.owned(18),
            timestamp: v.owned(19),
            clerk_id: v.owned(20),
            shift_id: v.owned(21),
            edc_totals: crate::batch::EdcTotal::from_records(v.records(22)),
            brand_totals: BrandTotal::from_records(v.records(23)),
            ext_data: ExtView::parse(v.get(24).unwrap_or("")),
        }
    }

    /// Payment type of the reported transaction, if its code is known.
    pub fn payment_type(&self) -> Option<PaymentType> {
        self.payment_type_code
            .as_deref()
            .and_then(PaymentType::from_wire)
    }
}
