use crate::access::Permission;
use crate::blood_type::BloodType;
use crate::transfer::TransferStatus;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum ColdChainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] hemolink_types::TextError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("unit {0} is locked after a cold-chain breach")]
    Locked(String),
    #[error("invalid temperature reading: {0}")]
    InvalidReading(String),
    #[error(
        "insufficient {blood_type} stock at {hospital_id}: requested {requested}, eligible {eligible}"
    )]
    InsufficientStock {
        hospital_id: String,
        blood_type: BloodType,
        requested: u32,
        eligible: u32,
    },
    #[error("stock totals out of balance for hospital {0}")]
    StockInvariant(String),
    #[error("transfer {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TransferStatus,
        to: TransferStatus,
    },
    #[error("donor {donor_id} is not eligible to donate until after {next_eligible}")]
    DonationTooSoon {
        donor_id: String,
        next_eligible: NaiveDate,
    },

    #[error("authentication required")]
    Unauthorised,
    #[error("missing permission: {0}")]
    Forbidden(Permission),

    #[error("failed to read seed file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to deserialize seed YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("engine state lock poisoned")]
    StatePoisoned,
}

impl ColdChainError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type ColdChainResult<T> = std::result::Result<T, ColdChainError>;
