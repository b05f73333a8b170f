use axum::http::StatusCode;
use hemolink_core::ColdChainError;

pub(crate) type ApiResult<T> = Result<T, (StatusCode, &'static str)>;

/// Maps an engine error to a status code and a fixed message, logging the full error.
pub(crate) fn rejection(context: &str, err: ColdChainError) -> (StatusCode, &'static str) {
    match err {
        ColdChainError::NotFound { .. } => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::NOT_FOUND, "Not found")
        }
        ColdChainError::Locked(_) => {
            tracing::warn!("{}: {}", context, err);
            (
                StatusCode::CONFLICT,
                "Unit is locked after a cold-chain breach",
            )
        }
        ColdChainError::InvalidReading(_) => {
            tracing::warn!("{}: {}", context, err);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid temperature reading",
            )
        }
        ColdChainError::InsufficientStock { .. } => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::CONFLICT, "Insufficient eligible stock")
        }
        ColdChainError::InvalidTransition { .. } => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::CONFLICT, "Transfer is no longer submitted")
        }
        ColdChainError::DonationTooSoon { .. } => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::CONFLICT, "Donor is not yet eligible to donate")
        }
        ColdChainError::InvalidInput(_) | ColdChainError::Text(_) => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::BAD_REQUEST, "Bad request")
        }
        ColdChainError::Unauthorised => (StatusCode::UNAUTHORIZED, "Authentication required"),
        ColdChainError::Forbidden(_) => {
            tracing::warn!("{}: {}", context, err);
            (StatusCode::FORBIDDEN, "Missing permission")
        }
        ColdChainError::StockInvariant(_)
        | ColdChainError::FileRead(_)
        | ColdChainError::YamlDeserialization(_)
        | ColdChainError::StatePoisoned => {
            tracing::error!("{} error: {:?}", context, err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hemolink_core::{BloodType, Permission};

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        let cases = [
            (
                ColdChainError::NotFound {
                    kind: "unit",
                    id: "BB999".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (ColdChainError::Locked("BB006".into()), StatusCode::CONFLICT),
            (
                ColdChainError::InvalidReading("NaN".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ColdChainError::InsufficientStock {
                    hospital_id: "H004".into(),
                    blood_type: BloodType::ONegative,
                    requested: 5,
                    eligible: 2,
                },
                StatusCode::CONFLICT,
            ),
            (ColdChainError::Unauthorised, StatusCode::UNAUTHORIZED),
            (
                ColdChainError::Forbidden(Permission::Transfers),
                StatusCode::FORBIDDEN,
            ),
            (ColdChainError::StatePoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(rejection("test", err).0, status);
        }
    }
}
