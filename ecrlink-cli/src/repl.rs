//! Interactive console.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use ecrlink_client::Terminal;
use ecrlink_protocol::{
    BatchRequest, BatchType, ManageRequest, PaymentRequest, ReportRequest, TenderType,
};

use crate::commands;

const HELP_TEXT: &str = r#"
Available commands:
  help                          Show this help
  status                        Ask the terminal whether it is ready

  sale <amount> [tender]        Charge a card
  auth <amount> [tender]        Authorize without capturing
  refund <amount> [tender]      Return funds to a card
  void <ref> [tender]           Void a transaction by reference number
  adjust <ref> <tip> [tender]   Adjust the tip on a transaction
  force <amount> <auth-code>    Force a voice-authorized transaction
  verify                        Verify a card without moving funds
  inquiry [tender]              Query a card balance

  init                          Report terminal identity
  reset                         Reset the terminal display
  reboot                        Reboot the terminal
  signature                     Capture a signature from the pad
  message <line> [line ...]     Show message lines on the display
  setvar <name> <value>         Set a terminal variable
  getvar <name>                 Read a terminal variable

  batch [op] [edc]              Batch operation: close, force-close, clear,
                                purge, saf-upload or delete-saf
  report [kind] [record]        Report query: totals, detail, failed, host,
                                history or saf

  quit, exit                    Leave the console
"#;

pub async fn run(terminal: &mut Terminal) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "ecrlink console".bold().cyan());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = home::home_dir()
        .map(|h| h.join(".ecrlink_history"))
        .unwrap_or_else(|| ".ecrlink_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "ecrlink>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(terminal, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    Ok(())
}

async fn execute_repl_command(
    terminal: &mut Terminal,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "status" => {
            let status = terminal.status().await?;
            Ok(Some(commands::render_status(&status)))
        }

        "sale" | "s" => {
            if args.is_empty() {
                return Ok(Some("Usage: sale <amount> [tender]".to_string()));
            }
            let amount = commands::parse_money(args[0])?;
            let tender = opt_tender(args.get(1), TenderType::Credit)?;
            let request = PaymentRequest::sale(tender, amount);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "auth" => {
            if args.is_empty() {
                return Ok(Some("Usage: auth <amount> [tender]".to_string()));
            }
            let amount = commands::parse_money(args[0])?;
            let tender = opt_tender(args.get(1), TenderType::Credit)?;
            let request = PaymentRequest::auth(tender, amount);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "refund" | "return" => {
            if args.is_empty() {
                return Ok(Some("Usage: refund <amount> [tender]".to_string()));
            }
            let amount = commands::parse_money(args[0])?;
            let tender = opt_tender(args.get(1), TenderType::Credit)?;
            let request = PaymentRequest::refund(tender, amount);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "void" | "v" => {
            if args.is_empty() {
                return Ok(Some("Usage: void <ref> [tender]".to_string()));
            }
            let tender = opt_tender(args.get(1), TenderType::Credit)?;
            let request = PaymentRequest::void(tender, args[0]);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "adjust" => {
            if args.len() < 2 {
                return Ok(Some("Usage: adjust <ref> <tip> [tender]".to_string()));
            }
            let tip = commands::parse_money(args[1])?;
            let tender = opt_tender(args.get(2), TenderType::Credit)?;
            let request = PaymentRequest::adjust(tender, args[0], tip);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "force" => {
            if args.len() < 2 {
                return Ok(Some("Usage: force <amount> <auth-code>".to_string()));
            }
            let amount = commands::parse_money(args[0])?;
            let request = PaymentRequest::force_auth(TenderType::Credit, amount, args[1]);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "verify" => {
            let request = PaymentRequest::verify();
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "inquiry" | "balance" => {
            let tender = opt_tender(args.first(), TenderType::Gift)?;
            let request = PaymentRequest::balance_inquiry(tender);
            Ok(Some(commands::run_payment(terminal, request).await?))
        }

        "init" => Ok(Some(
            commands::run_manage(terminal, ManageRequest::init()).await?,
        )),

        "reset" => Ok(Some(
            commands::run_manage(terminal, ManageRequest::reset()).await?,
        )),

        "reboot" => Ok(Some(
            commands::run_manage(terminal, ManageRequest::reboot()).await?,
        )),

        "signature" | "sig" => Ok(Some(
            commands::run_manage(terminal, ManageRequest::get_signature()).await?,
        )),

        "message" | "msg" => {
            if args.is_empty() {
                return Ok(Some("Usage: message <line> [line ...]".to_string()));
            }
            let lines = args.iter().map(|s| s.to_string()).collect();
            let request = ManageRequest::show_message(lines);
            Ok(Some(commands::run_manage(terminal, request).await?))
        }

        "setvar" => {
            if args.len() < 2 {
                return Ok(Some("Usage: setvar <name> <value>".to_string()));
            }
            let request = ManageRequest::set_variable(args[0], args[1]);
            Ok(Some(commands::run_manage(terminal, request).await?))
        }

        "getvar" => {
            if args.is_empty() {
                return Ok(Some("Usage: getvar <name>".to_string()));
            }
            let request = ManageRequest::get_variable(args[0]);
            Ok(Some(commands::run_manage(terminal, request).await?))
        }

        "batch" | "b" => {
            let op = match args.first() {
                Some(name) => commands::parse_batch_op(name)?,
                None => BatchType::BatchClose,
            };
            let mut request = BatchRequest::new(op);
            if let Some(name) = args.get(1) {
                request = request.with_edc(commands::parse_edc(name)?);
            }
            if op == BatchType::ForceBatchClose {
                request.timestamp = Some(chrono::Local::now().naive_local());
            }
            Ok(Some(commands::run_batch(terminal, request).await?))
        }

        "report" | "r" => {
            let kind = match args.first() {
                Some(name) => commands::parse_report_kind(name)?,
                None => ecrlink_protocol::ReportType::LocalTotalReport,
            };
            let record = args.get(1).map(|s| s.parse::<u32>()).transpose()?;
            if kind.is_detail() && record.is_none() {
                return Ok(Some("Usage: report detail <record>".to_string()));
            }
            let mut request = ReportRequest::new(kind);
            request.record_number = record;
            Ok(Some(commands::run_report(terminal, request).await?))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

fn opt_tender(
    arg: Option<&&str>,
    default: TenderType,
) -> Result<TenderType, String> {
    match arg {
        Some(name) => commands::parse_tender(name),
        None => Ok(default),
    }
}
