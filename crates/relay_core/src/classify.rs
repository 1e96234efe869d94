use crate::filename::{suffix_of_name, suffix_of_url};
use crate::{Configuration, DownloadCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Why a candidate was left to the host. Rejection is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Disabled,
    BelowMinimumSize { size_bytes: u64, min_size_bytes: u64 },
    NoSuffix,
    SuffixNotAccepted(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Disabled => write!(f, "interception disabled"),
            RejectReason::BelowMinimumSize {
                size_bytes,
                min_size_bytes,
            } => write!(f, "size {size_bytes} below minimum {min_size_bytes}"),
            RejectReason::NoSuffix => write!(f, "no file suffix"),
            RejectReason::SuffixNotAccepted(suffix) => write!(f, "suffix {suffix} not accepted"),
        }
    }
}

/// Decides whether `candidate` should be redirected to the companion.
///
/// Rules are checked in order and the first failing one rejects: disabled,
/// known non-zero size under the threshold, missing suffix, suffix not in
/// the accepted set.
pub fn classify(candidate: &DownloadCandidate, config: &Configuration) -> Decision {
    if !config.enabled {
        return Decision::Reject(RejectReason::Disabled);
    }

    if let Some(size) = candidate.size_bytes.filter(|size| *size > 0) {
        if size < config.min_size_bytes {
            return Decision::Reject(RejectReason::BelowMinimumSize {
                size_bytes: size,
                min_size_bytes: config.min_size_bytes,
            });
        }
    }

    let Some(suffix) = extract_suffix(candidate) else {
        return Decision::Reject(RejectReason::NoSuffix);
    };

    if !config.accepts_suffix(&suffix) {
        return Decision::Reject(RejectReason::SuffixNotAccepted(suffix));
    }

    Decision::Accept
}

/// Suffix of the suggested filename when there is one, else of the URL path.
pub fn extract_suffix(candidate: &DownloadCandidate) -> Option<String> {
    match candidate.suggested_filename.as_deref() {
        Some(name) if !name.trim().is_empty() => suffix_of_name(name.trim()),
        _ => suffix_of_url(&candidate.url),
    }
}
