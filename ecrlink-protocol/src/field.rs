//! Delimited field codec for message bodies.
//!
//! A body is printable text split into fields by FS. A field may itself hold
//! sub-values split by US, and a sub-value may hold GS-joined sub-records.
//! [`BodyBuilder`] assembles outbound bodies and rejects values that would
//! corrupt the framing; [`FieldView`] is the lenient inbound counterpart that
//! never fails, it only yields `None` for fields that are absent or empty.

use crate::error::EncodeError;
use crate::money::Money;
use crate::packet::{ACK, ENQ, EOT, ETX, NAK, STX};
use crate::MAX_BODY_SIZE;

/// Field separator.
pub const FS: u8 = 0x1c;
/// Group separator, third level inside a sub-value.
pub const GS: u8 = 0x1d;
/// Unit separator, second level inside a field.
pub const US: u8 = 0x1f;
/// Column separator inside a totals record.
pub const RECORD_EQ: char = '=';

/// Returns the first reserved byte found in `value`, if any.
///
/// GS may be admitted for multi-line content that carries sub-records.
pub fn reserved_byte(value: &str, allow_gs: bool) -> Option<u8> {
    value.bytes().find(|&b| {
        b == STX
            || b == ETX
            || b == EOT
            || b == ENQ
            || b == ACK
            || b == NAK
            || b == FS
            || b == US
            || (b == GS && !allow_gs)
    })
}

/// Mask transform: the value is withheld when the peer already has the full
/// data and must not receive it again.
pub fn mask(value: Option<&str>, full_data: bool) -> &str {
    if full_data {
        ""
    } else {
        value.unwrap_or("")
    }
}

/// Conditional transform: the value is emitted only when `cond` holds.
pub fn when(cond: bool, value: Option<&str>) -> &str {
    if cond {
        value.unwrap_or("")
    } else {
        ""
    }
}

/// Derived-sum transform: adds two digit strings, preserving the wider
/// operand's zero padding. Empty operands count as zero; two empty operands
/// derive an empty field.
pub fn derived_sum(field: &'static str, a: &str, b: &str) -> Result<String, EncodeError> {
    if a.is_empty() && b.is_empty() {
        return Ok(String::new());
    }
    let parse = |s: &str| -> Result<u64, EncodeError> {
        if s.is_empty() {
            return Ok(0);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EncodeError::Amount(field));
        }
        s.parse::<u64>().map_err(|_| EncodeError::Amount(field))
    };
    let sum = parse(a)?
        .checked_add(parse(b)?)
        .ok_or(EncodeError::Amount(field))?;
    let width = a.len().max(b.len());
    Ok(format!("{sum:0width$}"))
}

/// Joins multi-line content at the second level.
pub fn join_lines(lines: &[String]) -> String {
    lines.join(&(US as char).to_string())
}

/// Joins structured sub-records at the third level.
pub fn join_subrecords(parts: &[&str]) -> String {
    parts.join(&(GS as char).to_string())
}

/// Splits third-level sub-records out of a sub-value.
pub fn split_subrecords(value: &str) -> Vec<&str> {
    value.split(GS as char).collect()
}

/// Assembles an outbound body field by field.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    fields: Vec<String>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        BodyBuilder { fields: Vec::new() }
    }

    /// Copy transform: appends `value` verbatim after separator screening.
    pub fn push(&mut self, field: &'static str, value: &str) -> Result<(), EncodeError> {
        if let Some(byte) = reserved_byte(value, false) {
            return Err(EncodeError::Separator { field, byte });
        }
        self.fields.push(value.to_string());
        Ok(())
    }

    /// Copy transform for optional values; `None` encodes as empty.
    pub fn push_opt(&mut self, field: &'static str, value: Option<&str>) -> Result<(), EncodeError> {
        self.push(field, value.unwrap_or(""))
    }

    /// Amount fields encode as unpadded minor-unit digits.
    pub fn push_amount(
        &mut self,
        field: &'static str,
        value: Option<Money>,
    ) -> Result<(), EncodeError> {
        match value {
            Some(m) if m.cents() < 0 => Err(EncodeError::Amount(field)),
            Some(m) => self.push(field, &m.to_wire()),
            None => self.push(field, ""),
        }
    }

    /// Multi-line transform: lines join at the US level. A line may carry
    /// GS-joined sub-records, so GS is admitted here.
    pub fn push_lines(&mut self, field: &'static str, lines: &[String]) -> Result<(), EncodeError> {
        for line in lines {
            if let Some(byte) = reserved_byte(line, true) {
                return Err(EncodeError::Separator { field, byte });
            }
        }
        self.fields.push(join_lines(lines));
        Ok(())
    }

    /// Appends a pre-validated value without screening. Only for output of
    /// other transforms, never for caller data.
    pub fn push_raw(&mut self, value: String) {
        self.fields.push(value);
    }

    /// Joins all fields with FS and enforces the body cap.
    pub fn finish(self) -> Result<String, EncodeError> {
        let body = self.fields.join(&(FS as char).to_string());
        if body.len() > MAX_BODY_SIZE {
            return Err(EncodeError::BodyTooLarge {
                size: body.len(),
                max: MAX_BODY_SIZE,
            });
        }
        Ok(body)
    }
}

/// Zero-copy lenient view over an inbound body.
///
/// Every accessor is total. Missing trailing fields and present-but-empty
/// fields both read as `None` through [`FieldView::non_empty`]; the
/// distinction is preserved by [`FieldView::get`].
#[derive(Debug)]
pub struct FieldView<'a> {
    fields: Vec<&'a str>,
}

impl<'a> FieldView<'a> {
    pub fn new(body: &'a str) -> Self {
        FieldView {
            fields: body.split(FS as char).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at `idx`; `None` once past the last field actually sent.
    pub fn get(&self, idx: usize) -> Option<&'a str> {
        self.fields.get(idx).copied()
    }

    /// Field at `idx` if it was sent and is non-empty.
    pub fn non_empty(&self, idx: usize) -> Option<&'a str> {
        self.get(idx).filter(|f| !f.is_empty())
    }

    /// Second-level values of the field at `idx`. Absent or empty fields
    /// yield no values.
    pub fn sub(&self, idx: usize) -> Vec<&'a str> {
        match self.non_empty(idx) {
            Some(f) => f.split(US as char).collect(),
            None => Vec::new(),
        }
    }

    /// Totals records: US-joined entries of `=`-separated columns. Empty
    /// entries are skipped.
    pub fn records(&self, idx: usize) -> Vec<Vec<&'a str>> {
        match self.non_empty(idx) {
            Some(f) => f
                .split(US as char)
                .filter(|r| !r.is_empty())
                .map(|r| r.split(RECORD_EQ).collect())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Minor-unit amount at `idx`; malformed digits read as `None`.
    pub fn amount(&self, idx: usize) -> Option<Money> {
        self.non_empty(idx).and_then(Money::from_wire)
    }

    /// Unsigned integer at `idx`; malformed digits read as `None`.
    pub fn number(&self, idx: usize) -> Option<u32> {
        self.non_empty(idx).and_then(|f| f.parse().ok())
    }

    /// Owned copy of the field at `idx` if non-empty.
    pub fn owned(&self, idx: usize) -> Option<String> {
        self.non_empty(idx).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_builder_joins_with_fs() {
        let mut b = BodyBuilder::new();
        b.push("cmd", "T02").unwrap();
        b.push("version", "1.28").unwrap();
        b.push("amount", "1099").unwrap();
        assert_eq!(b.finish().unwrap(), "T02\u{1c}1.28\u{1c}1099");
    }

    #[test]
    fn test_builder_rejects_reserved_bytes() {
        let mut b = BodyBuilder::new();
        let err = b.push("invoice", "ab\u{1c}cd").unwrap_err();
        assert_eq!(
            err,
            EncodeError::Separator {
                field: "invoice",
                byte: 0x1c
            }
        );
        let mut b = BodyBuilder::new();
        assert!(b.push("invoice", "ab\u{02}cd").is_err());
        assert!(b.push("invoice", "ab\u{1f}cd").is_err());
    }

    #[test]
    fn test_lines_admit_gs_but_not_us() {
        let mut b = BodyBuilder::new();
        let ok = vec![format!("part1{}part2", GS as char)];
        b.push_lines("ext_data", &ok).unwrap();

        let mut b = BodyBuilder::new();
        let bad = vec![format!("part1{}part2", US as char)];
        assert!(b.push_lines("ext_data", &bad).is_err());
    }

    #[test]
    fn test_view_missing_vs_empty() {
        let v = FieldView::new("000000\u{1c}OK\u{1c}");
        assert_eq!(v.len(), 3);
        assert_eq!(v.get(2), Some(""));
        assert_eq!(v.non_empty(2), None);
        assert_eq!(v.get(3), None);
        assert_eq!(v.non_empty(3), None);
        assert_eq!(v.get(0), Some("000000"));
    }

    #[test]
    fn test_view_sub_and_records() {
        let body = "000000\u{1c}OK\u{1c}line1\u{1f}line2\u{1c}CREDIT=2=34500\u{1f}DEBIT=1=1000";
        let v = FieldView::new(body);
        assert_eq!(v.sub(2), vec!["line1", "line2"]);
        let recs = v.records(3);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0], vec!["CREDIT", "2", "34500"]);
        assert_eq!(recs[1], vec!["DEBIT", "1", "1000"]);
        assert!(v.records(9).is_empty());
    }

    #[test]
    fn test_derived_sum_preserves_padding() {
        assert_eq!(derived_sum("total", "000010", "000005").unwrap(), "000015");
        assert_eq!(derived_sum("total", "10", "5").unwrap(), "15");
        assert_eq!(derived_sum("total", "99", "99").unwrap(), "198");
        assert_eq!(derived_sum("total", "", "").unwrap(), "");
        assert_eq!(derived_sum("total", "0500", "").unwrap(), "0500");
        assert_eq!(
            derived_sum("total", "12x", "1").unwrap_err(),
            EncodeError::Amount("total")
        );
    }

    #[test]
    fn test_mask_and_when() {
        assert_eq!(mask(Some("4111111111111111"), false), "4111111111111111");
        assert_eq!(mask(Some("4111111111111111"), true), "");
        assert_eq!(mask(None, false), "");
        assert_eq!(when(true, Some("v123")), "v123");
        assert_eq!(when(false, Some("v123")), "");
    }

    #[test]
    fn test_body_cap() {
        let mut b = BodyBuilder::new();
        b.push_raw("x".repeat(MAX_BODY_SIZE + 1));
        assert!(matches!(
            b.finish(),
            Err(EncodeError::BodyTooLarge { .. })
        ));
    }

    #[test]
    fn test_subrecords_roundtrip() {
        let joined = join_subrecords(&["a", "b", "c"]);
        assert_eq!(split_subrecords(&joined), vec!["a", "b", "c"]);
    }

    proptest! {
        #[test]
        fn prop_body_roundtrip(fields in proptest::collection::vec("[A-Za-z0-9 .=]{0,16}", 1..8)) {
            let mut b = BodyBuilder::new();
            for f in &fields {
                b.push("field", f).unwrap();
            }
            let body = b.finish().unwrap();
            let v = FieldView::new(&body);
            prop_assert_eq!(v.len(), fields.len());
            for (i, f) in fields.iter().enumerate() {
                prop_assert_eq!(v.get(i), Some(f.as_str()));
            }
        }
    }
}
