//! Payment category: financial transactions.
//!
//! Request body layout (FS-joined positions):
//!
//! ```text
//!  0 command        `T` + two-digit sub-type
//!  1 version
//!  2 tender         two-digit tender code
//!  3 amount         minor units
//!  4 tip            minor units
//!  5 cashback       minor units
//!  6 tax            minor units
//!  7 surcharge      minor units
//!  8 fuel           minor units
//!  9 total due      derived: amount + tip
//! 10 account        blank when full account data is requested
//! 11 expiry         MMYY
//! 12 voucher        EBT tenders only
//! 13 clerk id
//! 14 invoice
//! 15 po number
//! 16 original ref
//! 17 auth code
//! 18 ecr ref
//! 19 ecr trans id
//! 20 zip
//! 21 street 1
//! 22 street 2
//! 23 ext data       US-joined markup lines
//! ```
//!
//! Responses put the result code and text in the first two positions; every
//! later field is optional and decodes leniently.

use crate::error::EncodeError;
use crate::ext::ExtView;
use crate::field::{self, BodyBuilder, FieldView};
use crate::message::Category;
use crate::money::Money;
use crate::symbol::{CardBrand, PaymentType, TenderType};
use crate::WIRE_VERSION;

/// A staged financial transaction.
#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    pub tender_type: TenderType,
    pub trans_type: PaymentType,
    pub amount: Option<Money>,
    pub tip_amount: Option<Money>,
    pub cashback_amount: Option<Money>,
    pub tax_amount: Option<Money>,
    pub surcharge_amount: Option<Money>,
    pub fuel_amount: Option<Money>,
    /// Card account number for card-not-present entry.
    pub account: Option<String>,
    /// Card expiry as MMYY.
    pub expiry: Option<String>,
    /// When set, the account field is withheld and the terminal captures
    /// (and later reports) the full card data itself.
    pub full_account_data: bool,
    /// EBT voucher number; sent only for EBT-family tenders.
    pub voucher_number: Option<String>,
    pub clerk_id: Option<String>,
    pub invoice_number: Option<String>,
    pub po_number: Option<String>,
    /// Reference number of the original transaction, for voids and adjusts.
    pub orig_ref_number: Option<String>,
    /// Approval code from a voice authorization, for force auth.
    pub auth_code: Option<String>,
    pub ecr_ref_number: Option<String>,
    pub ecr_trans_id: Option<String>,
    pub zip: Option<String>,
    pub street1: Option<String>,
    pub street2: Option<String>,
    /// Markup lines appended as extension data.
    pub ext_data: Vec<String>,
}

impl PaymentRequest {
    pub fn new(tender_type: TenderType, trans_type: PaymentType) -> Self {
        PaymentRequest {
            tender_type,
            trans_type,
            ..Default::default()
        }
    }

    pub fn sale(tender_type: TenderType, amount: Money) -> Self {
        let mut r = Self::new(tender_type, PaymentType::Sale);
        r.amount = Some(amount);
        r
    }

    pub fn auth(tender_type: TenderType, amount: Money) -> Self {
        let mut r = Self::new(tender_type, PaymentType::Auth);
        r.amount = Some(amount);
        r
    }

    pub fn refund(tender_type: TenderType, amount: Money) -> Self {
        let mut r = Self::new(tender_type, PaymentType::Return);
        r.amount = Some(amount);
        r
    }

    pub fn void(tender_type: TenderType, orig_ref_number: impl Into<String>) -> Self {
        let mut r = Self::new(tender_type, PaymentType::Void);
        r.orig_ref_number = Some(orig_ref_number.into());
        r
    }

    pub fn adjust(tender_type: TenderType, orig_ref_number: impl Into<String>, tip: Money) -> Self {
        let mut r = Self::new(tender_type, PaymentType::Adjust);
        r.orig_ref_number = Some(orig_ref_number.into());
        r.tip_amount = Some(tip);
        r
    }

    pub fn force_auth(tender_type: TenderType, amount: Money, auth_code: impl Into<String>) -> Self {
        let mut r = Self::new(tender_type, PaymentType::ForceAuth);
        r.amount = Some(amount);
        r.auth_code = Some(auth_code.into());
        r
    }

    pub fn balance_inquiry(tender_type: TenderType) -> Self {
        Self::new(tender_type, PaymentType::Inquiry)
    }

    pub fn verify() -> Self {
        Self::new(TenderType::Credit, PaymentType::Verify)
    }

    pub fn with_tip(mut self, tip: Money) -> Self {
        self.tip_amount = Some(tip);
        self
    }

    pub fn with_cashback(mut self, cashback: Money) -> Self {
        self.cashback_amount = Some(cashback);
        self
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax_amount = Some(tax);
        self
    }

    pub fn with_clerk(mut self, clerk_id: impl Into<String>) -> Self {
        self.clerk_id = Some(clerk_id.into());
        self
    }

    pub fn with_invoice(mut self, invoice: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice.into());
        self
    }

    pub fn with_ecr_ref(mut self, ecr_ref: impl Into<String>) -> Self {
        self.ecr_ref_number = Some(ecr_ref.into());
        self
    }

    pub fn with_ext(mut self, line: impl Into<String>) -> Self {
        self.ext_data.push(line.into());
        self
    }

    /// Validates the request and encodes the wire body.
    pub fn encode(&self) -> Result<String, EncodeError> {
        if self.trans_type == PaymentType::Unknown {
            return Err(EncodeError::TransType(self.trans_type.name()));
        }
        if self.trans_type.requires_amount() && self.amount.is_none() {
            return Err(EncodeError::Missing("amount"));
        }
        if self.trans_type == PaymentType::ForceAuth && self.auth_code.is_none() {
            return Err(EncodeError::ForceValue {
                trans: self.trans_type.name(),
                field: "auth_code",
            });
        }
        // Cashback rides only on PIN-backed tenders.
        if self.cashback_amount.is_some()
            && !matches!(
                self.tender_type,
                TenderType::All | TenderType::Debit | TenderType::EbtCashbenefit
            )
        {
            return Err(EncodeError::TenderMismatch {
                tender: self.tender_type.name(),
                field: "cashback_amount",
            });
        }

        let amount = self.amount.map(Money::to_wire).unwrap_or_default();
        let tip = self.tip_amount.map(Money::to_wire).unwrap_or_default();
        let total_due = field::derived_sum("total_due", &amount, &tip)?;

        let mut b = BodyBuilder::new();
        b.push_raw(format!(
            "{}{}",
            Category::Payment.letter(),
            self.trans_type.wire_code()
        ));
        b.push_raw(WIRE_VERSION.to_string());
        b.push_raw(self.tender_type.wire_code());
        b.push_raw(amount);
        b.push_raw(tip);
        b.push_amount("cashback_amount", self.cashback_amount)?;
        b.push_amount("tax_amount", self.tax_amount)?;
        b.push_amount("surcharge_amount", self.surcharge_amount)?;
        b.push_amount("fuel_amount", self.fuel_amount)?;
        b.push_raw(total_due);
        b.push(
            "account",
            field::mask(self.account.as_deref(), self.full_account_data),
        )?;
        b.push_opt("expiry", self.expiry.as_deref())?;
        b.push(
            "voucher_number",
            field::when(
                self.tender_type.is_ebt_family(),
                self.voucher_number.as_deref(),
            ),
        )?;
        b.push_opt("clerk_id", self.clerk_id.as_deref())?;
        b.push_opt("invoice_number", self.invoice_number.as_deref())?;
        b.push_opt("po_number", self.po_number.as_deref())?;
        b.push_opt("orig_ref_number", self.orig_ref_number.as_deref())?;
        b.push_opt("auth_code", self.auth_code.as_deref())?;
        b.push_opt("ecr_ref_number", self.ecr_ref_number.as_deref())?;
        b.push_opt("ecr_trans_id", self.ecr_trans_id.as_deref())?;
        b.push_opt("zip", self.zip.as_deref())?;
        b.push_opt("street1", self.street1.as_deref())?;
        b.push_opt("street2", self.street2.as_deref())?;
        b.push_lines("ext_data", &self.ext_data)?;
        b.finish()
    }
}

/// Terminal reply to a payment request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentResponse {
    pub result_code: String,
    pub result_text: String,
    pub auth_code: Option<String>,
    pub approved_amount: Option<Money>,
    pub avs_response: Option<String>,
    /// Account number as masked by the terminal.
    pub account: Option<String>,
    /// Two-digit brand code as sent; see [`PaymentResponse::card_brand`].
    pub card_brand_code: Option<String>,
    pub cv_response: Option<String>,
    pub host_code: Option<String>,
    pub host_response: Option<String>,
    pub message: Option<String>,
    /// Host reference number, quoted by voids and adjusts.
    pub ref_number: Option<String>,
    pub raw_response: Option<String>,
    /// Remaining balance, for prepaid and EBT tenders.
    pub remaining_balance: Option<Money>,
    /// Second balance, e.g. EBT cash benefit alongside food stamp.
    pub extra_balance: Option<Money>,
    pub requested_amount: Option<Money>,
    /// Terminal clock at approval, `YYYYMMDDhhmmss`.
    pub timestamp: Option<String>,
    pub ext_data: ExtView,
}

impl PaymentResponse {
    /// Decodes a reassembled body. Total: any body, including an empty one,
    /// produces a response.
    pub fn decode(body: &str) -> Self {
        let v = FieldView::new(body);
        let balances = v.sub(13);
        PaymentResponse {
            result_code: v.get(0).unwrap_or("").to_string(),
            result_text: v.get(1).unwrap_or("").to_string(),
            auth_code: v.owned(2),
            approved_amount: v.amount(3),
            avs_response: v.owned(4),
            account: v.owned(5),
            card_brand_code: v.owned(6),
            cv_response: v.owned(7),
            host_code: v.owned(8),
            host_response: v.owned(9),
            message: v.owned(10),
            ref_number: v.owned(11),
            raw_response: v.owned(12),
            remaining_balance: balances.first().copied().and_then(Money::from_wire),
            extra_balance: balances.get(1).copied().and_then(Money::from_wire),
            requested_amount: v.amount(14),
            timestamp: v.owned(15),
            ext_data: ExtView::parse(v.get(16).unwrap_or("")),
        }
    }

    /// Brand behind the two-digit code, if the code is in the table.
    pub fn card_brand(&self) -> Option<CardBrand> {
        self.card_brand_code
            .as_deref()
            .and_then(CardBrand::from_wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FS;

    fn split(body: &str) -> Vec<&str> {
        body.split(FS as char).collect()
    }

    #[test]
    fn test_sale_encoding_layout() {
        let req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(1099))
            .with_tip(Money::from_cents(100))
            .with_clerk("042")
            .with_invoice("INV-7");
        let body = req.encode().unwrap();
        let f = split(&body);
        assert_eq!(f[0], "T02");
        assert_eq!(f[1], "1.28");
        assert_eq!(f[2], "01");
        assert_eq!(f[3], "1099");
        assert_eq!(f[4], "100");
        assert_eq!(f[9], "1199");
        assert_eq!(f[13], "042");
        assert_eq!(f[14], "INV-7");
        assert_eq!(f.len(), 24);
    }

    #[test]
    fn test_total_due_derived_from_amount_and_tip() {
        let req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(10));
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[9], "10");

        let req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(10))
            .with_tip(Money::from_cents(5));
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[9], "15");
    }

    #[test]
    fn test_account_masked_when_full_data_requested() {
        let mut req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(500));
        req.account = Some("4111111111111111".to_string());
        req.expiry = Some("1227".to_string());
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[10], "4111111111111111");

        req.full_account_data = true;
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[10], "");
        assert_eq!(split(&body)[11], "1227");
    }

    #[test]
    fn test_voucher_gated_by_tender_family() {
        let mut req = PaymentRequest::sale(TenderType::EbtFoodstamp, Money::from_cents(2000));
        req.voucher_number = Some("V555".to_string());
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[12], "V555");

        let mut req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(2000));
        req.voucher_number = Some("V555".to_string());
        let body = req.encode().unwrap();
        assert_eq!(split(&body)[12], "");
    }

    #[test]
    fn test_unknown_trans_type_rejected() {
        let req = PaymentRequest::new(TenderType::Credit, PaymentType::Unknown);
        assert_eq!(
            req.encode().unwrap_err(),
            EncodeError::TransType("UNKNOWN")
        );
    }

    #[test]
    fn test_missing_amount_rejected() {
        let req = PaymentRequest::new(TenderType::Credit, PaymentType::Sale);
        assert_eq!(req.encode().unwrap_err(), EncodeError::Missing("amount"));

        // Void quotes an original ref instead of an amount.
        let req = PaymentRequest::void(TenderType::Credit, "12345");
        assert!(req.encode().is_ok());
    }

    #[test]
    fn test_force_auth_requires_auth_code() {
        let mut req = PaymentRequest::force_auth(TenderType::Credit, Money::from_cents(900), "AB12");
        assert!(req.encode().is_ok());

        req.auth_code = None;
        assert_eq!(
            req.encode().unwrap_err(),
            EncodeError::ForceValue {
                trans: "FORCEAUTH",
                field: "auth_code"
            }
        );
    }

    #[test]
    fn test_cashback_tender_rule() {
        let req = PaymentRequest::sale(TenderType::Debit, Money::from_cents(1000))
            .with_cashback(Money::from_cents(2000));
        assert!(req.encode().is_ok());

        let req = PaymentRequest::sale(TenderType::Credit, Money::from_cents(1000))
            .with_cashback(Money::from_cents(2000));
        assert_eq!(
            req.encode().unwrap_err(),
            EncodeError::TenderMismatch {
                tender: "CREDIT",
                field: "cashback_amount"
            }
        );
    }

    #[test]
    fn test_response_decoding() {
        let body = [
            "000000",
            "OK",
            "AB1234",
            "1199",
            "Y",
            "************1111",
            "01",
            "M",
            "H77",
            "APPROVED",
            "THANK YOU",
            "REF889",
            "",
            "5000\u{1f}2500",
            "1199",
            "20260825143000",
            "<TipRequest>1</TipRequest>",
        ]
        .join("\u{1c}");
        let resp = PaymentResponse::decode(&body);
        assert_eq!(resp.result_code, "000000");
        assert_eq!(resp.result_text, "OK");
        assert_eq!(resp.auth_code.as_deref(), Some("AB1234"));
        assert_eq!(resp.approved_amount, Some(Money::from_cents(1199)));
        assert_eq!(resp.card_brand(), Some(CardBrand::Visa));
        assert_eq!(resp.remaining_balance, Some(Money::from_cents(5000)));
        assert_eq!(resp.extra_balance, Some(Money::from_cents(2500)));
        assert_eq!(resp.raw_response, None);
        assert_eq!(resp.ext_data.get("TipRequest"), Some("1"));
    }

    #[test]
    fn test_response_decoding_is_lenient() {
        // A terminal may cut the body off after any field.
        let resp = PaymentResponse::decode("100011\u{1c}DECLINED");
        assert_eq!(resp.result_code, "100011");
        assert_eq!(resp.result_text, "DECLINED");
        assert_eq!(resp.auth_code, None);
        assert_eq!(resp.approved_amount, None);
        assert!(resp.ext_data.is_empty());

        // Malformed amounts and brands read as unset.
        let resp = PaymentResponse::decode("000000\u{1c}OK\u{1c}\u{1c}12x4\u{1c}\u{1c}\u{1c}zz");
        assert_eq!(resp.approved_amount, None);
        assert_eq!(resp.card_brand_code.as_deref(), Some("zz"));
        assert_eq!(resp.card_brand(), None);
    }
}
