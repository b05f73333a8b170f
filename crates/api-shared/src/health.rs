use crate::wire::HealthRes;

/// Simple health service shared by the HemoLink binaries.
pub struct HealthService;

impl HealthService {
    /// Health status; needs no engine or login.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "HemoLink is alive".into(),
        }
    }
}
