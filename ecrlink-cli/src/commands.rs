//! Command execution and output formatting.

use chrono::NaiveDateTime;
use colored::Colorize;

use ecrlink_client::{ExchangeOutcome, ExchangeResult, Terminal, TerminalStatus};
use ecrlink_protocol::batch::TIMESTAMP_FORMAT;
use ecrlink_protocol::{
    BatchRequest, BatchResponse, BatchType, CardBrand, Category, EdcType, ManageRequest,
    ManageResponse, Money, PaymentRequest, PaymentResponse, ReportRequest, ReportResponse,
    ReportType, TenderType, RESULT_OK,
};

use crate::Commands;

type CliResult = Result<String, Box<dyn std::error::Error>>;

pub async fn execute(terminal: &mut Terminal, command: Commands) -> CliResult {
    match command {
        Commands::Sale {
            amount,
            tender,
            tip,
            clerk,
            invoice,
        } => {
            let mut request = PaymentRequest::sale(tender, amount);
            if let Some(tip) = tip {
                request = request.with_tip(tip);
            }
            if let Some(clerk) = clerk {
                request = request.with_clerk(clerk);
            }
            if let Some(invoice) = invoice {
                request = request.with_invoice(invoice);
            }
            run_payment(terminal, request).await
        }
        Commands::Auth { amount, tender } => {
            run_payment(terminal, PaymentRequest::auth(tender, amount)).await
        }
        Commands::Refund { amount, tender } => {
            run_payment(terminal, PaymentRequest::refund(tender, amount)).await
        }
        Commands::Void { reference, tender } => {
            run_payment(terminal, PaymentRequest::void(tender, reference)).await
        }
        Commands::Adjust {
            reference,
            tip,
            tender,
        } => run_payment(terminal, PaymentRequest::adjust(tender, reference, tip)).await,
        Commands::Force {
            amount,
            auth_code,
            tender,
        } => run_payment(terminal, PaymentRequest::force_auth(tender, amount, auth_code)).await,
        Commands::Verify => run_payment(terminal, PaymentRequest::verify()).await,
        Commands::Inquiry { tender } => {
            run_payment(terminal, PaymentRequest::balance_inquiry(tender)).await
        }
        Commands::Init => run_manage(terminal, ManageRequest::init()).await,
        Commands::Reset => run_manage(terminal, ManageRequest::reset()).await,
        Commands::Reboot => run_manage(terminal, ManageRequest::reboot()).await,
        Commands::Signature => run_manage(terminal, ManageRequest::get_signature()).await,
        Commands::ShowMessage { lines } => {
            run_manage(terminal, ManageRequest::show_message(lines)).await
        }
        Commands::SetVar { name, value } => {
            run_manage(terminal, ManageRequest::set_variable(name, value)).await
        }
        Commands::GetVar { name } => {
            run_manage(terminal, ManageRequest::get_variable(name)).await
        }
        Commands::Batch { op, edc, timestamp } => {
            let mut request = BatchRequest::new(op).with_edc(edc);
            if let Some(raw) = timestamp {
                request.timestamp = Some(NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)?);
            }
            run_batch(terminal, request).await
        }
        Commands::Report {
            kind,
            edc,
            record,
            brand,
        } => {
            let mut request = ReportRequest::new(kind);
            request.edc_type = edc;
            request.record_number = record;
            request.card_brand = brand;
            run_report(terminal, request).await
        }
        Commands::Status => {
            let status = terminal.status().await?;
            Ok(render_status(&status))
        }
        // The repl is dispatched in main before execute is reached.
        Commands::Repl => Ok(String::new()),
    }
}

pub(crate) async fn run_payment(terminal: &mut Terminal, request: PaymentRequest) -> CliResult {
    terminal.stage(request);
    let result = terminal.process(Category::Payment).await;
    match terminal.payment_response() {
        Some(response) if result.is_ok() => Ok(render_payment(response)),
        _ => Ok(render_failure(&result)),
    }
}

pub(crate) async fn run_manage(terminal: &mut Terminal, request: ManageRequest) -> CliResult {
    terminal.stage(request);
    let result = terminal.process(Category::Manage).await;
    match terminal.manage_response() {
        Some(response) if result.is_ok() => Ok(render_manage(response)),
        _ => Ok(render_failure(&result)),
    }
}

pub(crate) async fn run_batch(terminal: &mut Terminal, request: BatchRequest) -> CliResult {
    terminal.stage(request);
    let result = terminal.process(Category::Batch).await;
    match terminal.batch_response() {
        Some(response) if result.is_ok() => Ok(render_batch(response)),
        _ => Ok(render_failure(&result)),
    }
}

pub(crate) async fn run_report(terminal: &mut Terminal, request: ReportRequest) -> CliResult {
    terminal.stage(request);
    let result = terminal.process(Category::Report).await;
    match terminal.report_response() {
        Some(response) if result.is_ok() => Ok(render_report(response)),
        _ => Ok(render_failure(&result)),
    }
}

pub fn parse_money(s: &str) -> Result<Money, String> {
    Money::parse_decimal(s).ok_or_else(|| format!("not a decimal amount: {s}"))
}

pub fn parse_tender(s: &str) -> Result<TenderType, String> {
    TenderType::from_name(&canonical(s)).ok_or_else(|| format!("unknown tender type: {s}"))
}

pub fn parse_edc(s: &str) -> Result<EdcType, String> {
    EdcType::from_name(&canonical(s)).ok_or_else(|| format!("unknown edc type: {s}"))
}

pub fn parse_brand(s: &str) -> Result<CardBrand, String> {
    CardBrand::from_name(&canonical(s)).ok_or_else(|| format!("unknown card brand: {s}"))
}

pub fn parse_batch_op(s: &str) -> Result<BatchType, String> {
    match s {
        "close" => Ok(BatchType::BatchClose),
        "force-close" => Ok(BatchType::ForceBatchClose),
        "clear" => Ok(BatchType::BatchClear),
        "purge" => Ok(BatchType::PurgeBatch),
        "saf-upload" => Ok(BatchType::SafUpload),
        "delete-saf" => Ok(BatchType::DeleteSafFile),
        other => Err(format!("unknown batch operation: {other}")),
    }
}

pub fn parse_report_kind(s: &str) -> Result<ReportType, String> {
    match s {
        "totals" => Ok(ReportType::LocalTotalReport),
        "detail" => Ok(ReportType::LocalDetailReport),
        "failed" => Ok(ReportType::LocalFailedReport),
        "host" => Ok(ReportType::HostReport),
        "history" => Ok(ReportType::HistoryReport),
        "saf" => Ok(ReportType::SafSummaryReport),
        other => Err(format!("unknown report kind: {other}")),
    }
}

fn canonical(s: &str) -> String {
    s.to_uppercase().replace('-', "_")
}

fn header(code: &str, text: &str) -> String {
    let code = if code == RESULT_OK {
        code.green().bold()
    } else {
        code.red().bold()
    };
    format!("{} {}", code, text)
}

fn field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("\n  {:<18} {}", label.dimmed(), value));
    }
}

fn amount_field(out: &mut String, label: &str, value: Option<Money>) {
    if let Some(value) = value {
        field(out, label, Some(&value.to_string()));
    }
}

pub(crate) fn render_failure(result: &ExchangeResult) -> String {
    match result.outcome {
        ExchangeOutcome::Timeout => format!("{} {}", "timeout:".yellow().bold(), result.message),
        _ => format!("{} {}", "error:".red().bold(), result.message),
    }
}

pub(crate) fn render_status(status: &TerminalStatus) -> String {
    match status {
        TerminalStatus::Ready => "ready".green().to_string(),
        TerminalStatus::Busy => "busy".yellow().to_string(),
        TerminalStatus::Unknown(report) => format!("unknown status report: {report}"),
    }
}

fn render_payment(response: &PaymentResponse) -> String {
    let mut out = header(&response.result_code, &response.result_text);
    field(&mut out, "auth code", response.auth_code.as_deref());
    amount_field(&mut out, "approved", response.approved_amount);
    amount_field(&mut out, "requested", response.requested_amount);
    field(&mut out, "account", response.account.as_deref());
    if let Some(brand) = response.card_brand() {
        field(&mut out, "card", Some(brand.name()));
    }
    field(&mut out, "avs", response.avs_response.as_deref());
    field(&mut out, "cv", response.cv_response.as_deref());
    field(&mut out, "ref number", response.ref_number.as_deref());
    amount_field(&mut out, "balance", response.remaining_balance);
    amount_field(&mut out, "extra balance", response.extra_balance);
    field(&mut out, "host response", response.host_response.as_deref());
    field(&mut out, "message", response.message.as_deref());
    field(&mut out, "timestamp", response.timestamp.as_deref());
    out
}

fn render_manage(response: &ManageResponse) -> String {
    let mut out = header(&response.result_code, &response.result_text);
    field(&mut out, "serial number", response.serial_number.as_deref());
    field(&mut out, "model", response.model_name.as_deref());
    field(&mut out, "os version", response.os_version.as_deref());
    field(&mut out, "mac address", response.mac_address.as_deref());
    if let Some(lines) = response.lines_per_screen {
        field(&mut out, "screen", Some(&format!(
            "{} lines x {} chars",
            lines,
            response.chars_per_line.unwrap_or(0)
        )));
    }
    if !response.variable_values.is_empty() {
        field(&mut out, "values", Some(&response.variable_values.join(", ")));
    }
    if let Some(button) = response.button_number {
        field(&mut out, "button", Some(&button.to_string()));
    }
    field(&mut out, "input", response.text_input.as_deref());
    if let Some(signature) = &response.signature_data {
        field(&mut out, "signature", Some(&format!("{} bytes", signature.len())));
    }
    out
}

fn render_batch(response: &BatchResponse) -> String {
    let mut out = header(&response.result_code, &response.result_text);
    field(&mut out, "batch number", response.batch_number.as_deref());
    field(&mut out, "host trace", response.host_trace_number.as_deref());
    field(&mut out, "terminal id", response.terminal_id.as_deref());
    field(&mut out, "merchant id", response.merchant_id.as_deref());
    field(&mut out, "timestamp", response.timestamp.as_deref());
    field(&mut out, "message", response.message.as_deref());
    for total in &response.edc_totals {
        field(
            &mut out,
            &total.edc_name.to_lowercase(),
            Some(&format!("{} transactions, {}", total.count, total.amount)),
        );
    }
    if let Some(count) = response.saf_total_count {
        let amount = response.saf_total_amount.unwrap_or(Money::ZERO);
        field(&mut out, "saf stored", Some(&format!("{count} ({amount})")));
    }
    if let Some(count) = response.saf_uploaded_count {
        let amount = response.saf_uploaded_amount.unwrap_or(Money::ZERO);
        field(&mut out, "saf uploaded", Some(&format!("{count} ({amount})")));
    }
    if let Some(count) = response.saf_failed_count {
        let amount = response.saf_failed_amount.unwrap_or(Money::ZERO);
        field(&mut out, "saf failed", Some(&format!("{count} ({amount})")));
    }
    out
}

fn render_report(response: &ReportResponse) -> String {
    let mut out = header(&response.result_code, &response.result_text);
    if let Some(total) = response.total_records {
        field(&mut out, "records", Some(&total.to_string()));
    }
    if let Some(record) = response.record_number {
        field(&mut out, "record", Some(&record.to_string()));
    }
    if let Some(payment_type) = response.payment_type() {
        field(&mut out, "type", Some(payment_type.name()));
    }
    amount_field(&mut out, "approved", response.approved_amount);
    field(&mut out, "account", response.account.as_deref());
    field(&mut out, "auth code", response.auth_code.as_deref());
    field(&mut out, "ref number", response.ref_number.as_deref());
    field(&mut out, "batch number", response.batch_number.as_deref());
    field(&mut out, "timestamp", response.timestamp.as_deref());
    field(&mut out, "clerk", response.clerk_id.as_deref());
    for total in &response.edc_totals {
        field(
            &mut out,
            &total.edc_name.to_lowercase(),
            Some(&format!("{} transactions, {}", total.count, total.amount)),
        );
    }
    for total in &response.brand_totals {
        let label = total
            .brand()
            .map(|b| b.name().to_lowercase())
            .unwrap_or_else(|| total.brand_code.clone());
        field(
            &mut out,
            &label,
            Some(&format!("{} transactions, {}", total.count, total.amount)),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsers() {
        assert_eq!(parse_tender("credit").unwrap(), TenderType::Credit);
        assert_eq!(
            parse_tender("ebt-foodstamp").unwrap(),
            TenderType::EbtFoodstamp
        );
        assert!(parse_tender("plutonium").is_err());
        assert_eq!(parse_money("10.99").unwrap(), Money::from_cents(1099));
        assert!(parse_money("ten").is_err());
        assert_eq!(
            parse_batch_op("force-close").unwrap(),
            BatchType::ForceBatchClose
        );
        assert_eq!(parse_report_kind("saf").unwrap(), ReportType::SafSummaryReport);
        assert_eq!(parse_brand("visa").unwrap(), CardBrand::Visa);
        assert_eq!(parse_edc("credit").unwrap(), EdcType::Credit);
    }

    #[test]
    fn test_render_payment_lists_set_fields() {
        let response = PaymentResponse {
            result_code: "000000".to_string(),
            result_text: "OK".to_string(),
            auth_code: Some("AB1234".to_string()),
            approved_amount: Some(Money::from_cents(1099)),
            card_brand_code: Some("01".to_string()),
            ..Default::default()
        };
        let out = render_payment(&response);
        assert!(out.contains("AB1234"));
        assert!(out.contains("10.99"));
        assert!(out.contains("VISA"));
        assert!(!out.contains("ref number"));
    }

    #[test]
    fn test_render_failure() {
        let result = ExchangeResult {
            outcome: ExchangeOutcome::Timeout,
            message: "exchange timed out".to_string(),
        };
        assert!(render_failure(&result).contains("exchange timed out"));
    }
}
