//! Symbol tables shared with terminal firmware.
//!
//! Every enum here pairs a stable numeric wire code with a stable uppercase
//! name. Codes are carried on the wire as zero-padded two-digit decimal;
//! names appear in configuration, logs and integrator-facing APIs. Name
//! lookup by code is total: a code the table does not know renders as
//! [`UNRECOGNIZED`] rather than failing.

/// Sentinel name reported for wire codes missing from a table.
pub const UNRECOGNIZED: &str = "UNRECOGNIZED";

macro_rules! symbol_impl {
    ($ty:ident) => {
        impl $ty {
            /// Numeric wire code.
            pub fn code(self) -> u8 {
                self as u8
            }

            /// Zero-padded two-digit code as carried on the wire.
            pub fn wire_code(self) -> String {
                format!("{:02}", self as u8)
            }

            /// Stable uppercase name.
            pub fn name(self) -> &'static str {
                match Self::NAMES.iter().find(|(v, _)| *v == self) {
                    Some((_, n)) => n,
                    None => UNRECOGNIZED,
                }
            }

            /// Total name lookup: codes outside the table map to the sentinel.
            pub fn name_for(code: u8) -> &'static str {
                match Self::from_code(code) {
                    Some(v) => v.name(),
                    None => UNRECOGNIZED,
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                Self::NAMES.iter().map(|(v, _)| *v).find(|v| *v as u8 == code)
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::NAMES.iter().find(|(_, n)| *n == name).map(|(v, _)| *v)
            }

            /// Parses the zero-padded decimal form used on the wire.
            pub fn from_wire(s: &str) -> Option<Self> {
                s.parse::<u8>().ok().and_then(Self::from_code)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TenderType {
    /// Terminal prompts the customer to choose.
    #[default]
    All = 0,
    Credit = 1,
    Debit = 2,
    Check = 3,
    EbtFoodstamp = 4,
    EbtCashbenefit = 5,
    Gift = 6,
    Loyalty = 7,
    Cash = 8,
    /// Terminal prompts for the EBT sub-kind.
    Ebt = 9,
}

impl TenderType {
    const NAMES: &'static [(TenderType, &'static str)] = &[
        (TenderType::All, "ALL"),
        (TenderType::Credit, "CREDIT"),
        (TenderType::Debit, "DEBIT"),
        (TenderType::Check, "CHECK"),
        (TenderType::EbtFoodstamp, "EBT_FOODSTAMP"),
        (TenderType::EbtCashbenefit, "EBT_CASHBENEFIT"),
        (TenderType::Gift, "GIFT"),
        (TenderType::Loyalty, "LOYALTY"),
        (TenderType::Cash, "CASH"),
        (TenderType::Ebt, "EBT"),
    ];

    /// Tenders that ride the EBT rails and may carry a voucher number.
    pub fn is_ebt_family(self) -> bool {
        matches!(
            self,
            TenderType::Ebt | TenderType::EbtFoodstamp | TenderType::EbtCashbenefit
        )
    }
}

symbol_impl!(TenderType);

/// Payment transaction sub-type. Encoded into the command token as `T` plus
/// the two-digit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PaymentType {
    /// Placeholder; refused by the encoder.
    #[default]
    Unknown = 0,
    Auth = 1,
    Sale = 2,
    Return = 3,
    Void = 4,
    PostAuth = 5,
    ForceAuth = 6,
    Capture = 7,
    RepeatSale = 8,
    CaptureAll = 9,
    Adjust = 10,
    Inquiry = 11,
    Activate = 12,
    Deactivate = 13,
    Reload = 14,
    VoidSale = 15,
    VoidReturn = 16,
    VoidAuth = 17,
    VoidPostAuth = 18,
    VoidForceAuth = 19,
    VoidWithdrawal = 20,
    Reversal = 21,
    Withdrawal = 22,
    IssueCard = 23,
    CashOut = 24,
    Replace = 25,
    Merge = 26,
    ReportLost = 27,
    VoidCashOut = 28,
    VoidIssue = 29,
    VoidReplace = 30,
    VoidMerge = 31,
    VoidReportLost = 32,
    StatusCheck = 33,
    Verify = 34,
    Redeem = 35,
    VoidRedeem = 36,
    Renew = 37,
}

impl PaymentType {
    const NAMES: &'static [(PaymentType, &'static str)] = &[
        (PaymentType::Unknown, "UNKNOWN"),
        (PaymentType::Auth, "AUTH"),
        (PaymentType::Sale, "SALE"),
        (PaymentType::Return, "RETURN"),
        (PaymentType::Void, "VOID"),
        (PaymentType::PostAuth, "POSTAUTH"),
        (PaymentType::ForceAuth, "FORCEAUTH"),
        (PaymentType::Capture, "CAPTURE"),
        (PaymentType::RepeatSale, "REPEATSALE"),
        (PaymentType::CaptureAll, "CAPTUREALL"),
        (PaymentType::Adjust, "ADJUST"),
        (PaymentType::Inquiry, "INQUIRY"),
        (PaymentType::Activate, "ACTIVATE"),
        (PaymentType::Deactivate, "DEACTIVATE"),
        (PaymentType::Reload, "RELOAD"),
        (PaymentType::VoidSale, "VOIDSALE"),
        (PaymentType::VoidReturn, "VOIDRETURN"),
        (PaymentType::VoidAuth, "VOIDAUTH"),
        (PaymentType::VoidPostAuth, "VOIDPOSTAUTH"),
        (PaymentType::VoidForceAuth, "VOIDFORCEAUTH"),
        (PaymentType::VoidWithdrawal, "VOIDWITHDRAWAL"),
        (PaymentType::Reversal, "REVERSAL"),
        (PaymentType::Withdrawal, "WITHDRAWAL"),
        (PaymentType::IssueCard, "ISSUECARD"),
        (PaymentType::CashOut, "CASHOUT"),
        (PaymentType::Replace, "REPLACE"),
        (PaymentType::Merge, "MERGE"),
        (PaymentType::ReportLost, "REPORTLOST"),
        (PaymentType::VoidCashOut, "VOIDCASHOUT"),
        (PaymentType::VoidIssue, "VOIDISSUE"),
        (PaymentType::VoidReplace, "VOIDREPLACE"),
        (PaymentType::VoidMerge, "VOIDMERGE"),
        (PaymentType::VoidReportLost, "VOIDREPORTLOST"),
        (PaymentType::StatusCheck, "STATUSCHECK"),
        (PaymentType::Verify, "VERIFY"),
        (PaymentType::Redeem, "REDEEM"),
        (PaymentType::VoidRedeem, "VOIDREDEEM"),
        (PaymentType::Renew, "RENEW"),
    ];

    /// Sub-types whose request must carry a transaction amount.
    pub fn requires_amount(self) -> bool {
        matches!(
            self,
            PaymentType::Auth
                | PaymentType::Sale
                | PaymentType::Return
                | PaymentType::PostAuth
                | PaymentType::ForceAuth
                | PaymentType::Capture
                | PaymentType::RepeatSale
                | PaymentType::Activate
                | PaymentType::Reload
                | PaymentType::Withdrawal
                | PaymentType::IssueCard
                | PaymentType::CashOut
                | PaymentType::Redeem
        )
    }
}

symbol_impl!(PaymentType);

/// Terminal management operation. Command token is `A` plus the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ManageType {
    #[default]
    Unknown = 0,
    Init = 1,
    GetSignature = 2,
    ShowMessage = 3,
    ClearMessage = 4,
    ShowThankYou = 5,
    Reset = 6,
    ShowDialog = 7,
    InputText = 8,
    InputAccount = 9,
    GetPinBlock = 10,
    SetVariable = 11,
    GetVariable = 12,
    Reboot = 13,
}

impl ManageType {
    const NAMES: &'static [(ManageType, &'static str)] = &[
        (ManageType::Unknown, "UNKNOWN"),
        (ManageType::Init, "INIT"),
        (ManageType::GetSignature, "GETSIGNATURE"),
        (ManageType::ShowMessage, "SHOWMESSAGE"),
        (ManageType::ClearMessage, "CLEARMESSAGE"),
        (ManageType::ShowThankYou, "SHOWTHANKYOU"),
        (ManageType::Reset, "RESET"),
        (ManageType::ShowDialog, "SHOWDIALOG"),
        (ManageType::InputText, "INPUTTEXT"),
        (ManageType::InputAccount, "INPUTACCOUNT"),
        (ManageType::GetPinBlock, "GETPINBLOCK"),
        (ManageType::SetVariable, "SETVAR"),
        (ManageType::GetVariable, "GETVAR"),
        (ManageType::Reboot, "REBOOT"),
    ];
}

symbol_impl!(ManageType);

/// Batch operation. Command token is `B` plus the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BatchType {
    #[default]
    BatchClose = 1,
    ForceBatchClose = 2,
    BatchClear = 3,
    PurgeBatch = 4,
    SafUpload = 5,
    DeleteSafFile = 6,
}

impl BatchType {
    const NAMES: &'static [(BatchType, &'static str)] = &[
        (BatchType::BatchClose, "BATCHCLOSE"),
        (BatchType::ForceBatchClose, "FORCEBATCHCLOSE"),
        (BatchType::BatchClear, "BATCHCLEAR"),
        (BatchType::PurgeBatch, "PURGEBATCH"),
        (BatchType::SafUpload, "SAFUPLOAD"),
        (BatchType::DeleteSafFile, "DELETESAFFILE"),
    ];
}

symbol_impl!(BatchType);

/// Report query. Command token is `R` plus the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReportType {
    #[default]
    LocalTotalReport = 1,
    LocalDetailReport = 2,
    LocalFailedReport = 3,
    HostReport = 4,
    HistoryReport = 5,
    SafSummaryReport = 6,
}

impl ReportType {
    const NAMES: &'static [(ReportType, &'static str)] = &[
        (ReportType::LocalTotalReport, "LOCALTOTALREPORT"),
        (ReportType::LocalDetailReport, "LOCALDETAILREPORT"),
        (ReportType::LocalFailedReport, "LOCALFAILEDREPORT"),
        (ReportType::HostReport, "HOSTREPORT"),
        (ReportType::HistoryReport, "HISTORYREPORT"),
        (ReportType::SafSummaryReport, "SAFSUMMARYREPORT"),
    ];

    /// Detail queries address one stored record and need an identifier.
    pub fn is_detail(self) -> bool {
        matches!(self, ReportType::LocalDetailReport)
    }
}

symbol_impl!(ReportType);

/// Electronic draft capture channel a batch or report is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EdcType {
    #[default]
    All = 0,
    Credit = 1,
    Debit = 2,
    Check = 3,
    Ebt = 4,
    Gift = 5,
    Loyalty = 6,
    Cash = 7,
}

impl EdcType {
    const NAMES: &'static [(EdcType, &'static str)] = &[
        (EdcType::All, "ALL"),
        (EdcType::Credit, "CREDIT"),
        (EdcType::Debit, "DEBIT"),
        (EdcType::Check, "CHECK"),
        (EdcType::Ebt, "EBT"),
        (EdcType::Gift, "GIFT"),
        (EdcType::Loyalty, "LOYALTY"),
        (EdcType::Cash, "CASH"),
    ];
}

symbol_impl!(EdcType);

/// Card brand as reported by the terminal in response field position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CardBrand {
    Visa = 1,
    Mastercard = 2,
    Amex = 3,
    Discover = 4,
    DinerClub = 5,
    EnRoute = 6,
    Jcb = 7,
    RevolutionCard = 8,
    VisaFleet = 9,
    MastercardFleet = 10,
    FleetOne = 11,
    FleetWide = 12,
    Fuelman = 13,
    GasCard = 14,
    Voyager = 15,
    WrightExpress = 16,
    /// Brand the terminal knew but this table does not enumerate.
    Other = 99,
}

impl CardBrand {
    const NAMES: &'static [(CardBrand, &'static str)] = &[
        (CardBrand::Visa, "VISA"),
        (CardBrand::Mastercard, "MASTERCARD"),
        (CardBrand::Amex, "AMEX"),
        (CardBrand::Discover, "DISCOVER"),
        (CardBrand::DinerClub, "DINERCLUB"),
        (CardBrand::EnRoute, "ENROUTE"),
        (CardBrand::Jcb, "JCB"),
        (CardBrand::RevolutionCard, "REVOLUTIONCARD"),
        (CardBrand::VisaFleet, "VISAFLEET"),
        (CardBrand::MastercardFleet, "MASTERCARDFLEET"),
        (CardBrand::FleetOne, "FLEETONE"),
        (CardBrand::FleetWide, "FLEETWIDE"),
        (CardBrand::Fuelman, "FUELMAN"),
        (CardBrand::GasCard, "GASCARD"),
        (CardBrand::Voyager, "VOYAGER"),
        (CardBrand::WrightExpress, "WRIGHTEXPRESS"),
        (CardBrand::Other, "OTHER"),
    ];
}

symbol_impl!(CardBrand);
