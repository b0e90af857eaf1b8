// src/checker/classify.rs
// =============================================================================
// Turns an HTTP outcome into a LinkStatus.
//
// This is a pure function: the same status code always gives the same
// answer. Redirects never reach it as 3xx in practice, because the transport
// follows them itself and reports the final status plus the redirect target.
// =============================================================================

use super::transport::ProbeOutcome;
use crate::model::LinkStatus;

/// Classifies a response status code.
pub fn classify_status(code: u16) -> LinkStatus {
    match code {
        200..=299 | 307 | 418 => LinkStatus::Okay,
        400 | 404 | 410 | 523 | 530 => LinkStatus::Missing,
        305 | 401 | 403 | 407 | 423 | 450 | 451 | 495 | 496 | 497 | 525 | 526 => {
            LinkStatus::Forbidden
        }
        300..=399 => LinkStatus::Redirected,
        _ => LinkStatus::Failed,
    }
}

/// Classifies a probe outcome; transport failures are always `Failed`.
pub fn classify(outcome: &ProbeOutcome) -> LinkStatus {
    match outcome {
        ProbeOutcome::Status(code) => classify_status(*code),
        ProbeOutcome::Failed(_) => LinkStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        for code in [200, 201, 204, 299, 307, 418] {
            assert_eq!(classify_status(code), LinkStatus::Okay, "code {}", code);
        }
    }

    #[test]
    fn test_missing_codes() {
        for code in [400, 404, 410, 523, 530] {
            assert_eq!(classify_status(code), LinkStatus::Missing, "code {}", code);
        }
    }

    #[test]
    fn test_forbidden_codes() {
        for code in [305, 401, 403, 407, 423, 450, 451, 495, 496, 497, 525, 526] {
            assert_eq!(classify_status(code), LinkStatus::Forbidden, "code {}", code);
        }
    }

    #[test]
    fn test_other_redirects() {
        for code in [300, 301, 302, 303, 304, 308] {
            assert_eq!(classify_status(code), LinkStatus::Redirected, "code {}", code);
        }
    }

    #[test]
    fn test_everything_else_fails() {
        for code in [100, 402, 405, 429, 500, 502, 503, 599, 999] {
            assert_eq!(classify_status(code), LinkStatus::Failed, "code {}", code);
        }
    }

    #[test]
    fn test_transport_failure() {
        let outcome = ProbeOutcome::Failed("connection refused".to_string());
        assert_eq!(classify(&outcome), LinkStatus::Failed);
        assert_eq!(classify(&ProbeOutcome::Status(404)), LinkStatus::Missing);
    }
}
