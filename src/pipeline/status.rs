//! Status resolution: the only place a model-supplied status becomes a
//! [`VerificationStatus`].

use crate::output::VerificationStatus;

/// `"verified"` (exactly) → verified; anything else, including absent,
/// misspelt or differently cased values → rejected.
pub fn resolve_status(parsed_status: Option<&str>) -> VerificationStatus {
    match parsed_status {
        Some("verified") => VerificationStatus::Verified,
        _ => VerificationStatus::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_verified_is_accepted() {
        assert_eq!(resolve_status(Some("verified")), VerificationStatus::Verified);
        for other in ["rejected", "Verified", "VERIFIED", " verified", "approved", "pending", ""] {
            assert_eq!(
                resolve_status(Some(other)),
                VerificationStatus::Rejected,
                "{other:?}"
            );
        }
        assert_eq!(resolve_status(None), VerificationStatus::Rejected);
    }

    #[test]
    fn resolving_a_resolved_value_is_identity() {
        for status in [VerificationStatus::Verified, VerificationStatus::Rejected] {
            assert_eq!(resolve_status(Some(status.as_str())), status);
        }
    }
}
