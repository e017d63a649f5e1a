//! Input limits and the validated forms of user input.
//!
//! Raw request bodies are turned into [`NewPoll`], [`Fingerprint`] and ids
//! here. Every problem found is collected so one response can list them all.

use crate::ids::{OptionId, PollId};
use crate::poll::{CreatePollRequest, VoteRequest};

// =============================================================================
// Constants
// =============================================================================

pub const MIN_QUESTION_LENGTH: usize = 10;
pub const MAX_QUESTION_LENGTH: usize = 500;

pub const MIN_OPTIONS_PER_POLL: usize = 2;
pub const MAX_OPTIONS_PER_POLL: usize = 10;

pub const MIN_OPTION_LENGTH: usize = 1;
pub const MAX_OPTION_LENGTH: usize = 200;

pub const FINGERPRINT_MIN_LENGTH: usize = 32;
pub const FINGERPRINT_MAX_LENGTH: usize = 64;

// =============================================================================
// Errors
// =============================================================================

/// One or more problems with user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .issues.join("; "))]
pub struct ValidationError {
    issues: Vec<String>,
}

impl ValidationError {
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    fn from_issues(issues: Vec<String>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self { issues })
        }
    }
}

// =============================================================================
// Validated inputs
// =============================================================================

/// A poll that passed validation: trimmed question and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    question: String,
    options: Vec<String>,
}

impl NewPoll {
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Option texts in display order.
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl TryFrom<CreatePollRequest> for NewPoll {
    type Error = ValidationError;

    fn try_from(req: CreatePollRequest) -> Result<Self, Self::Error> {
        let mut issues = Vec::new();

        let question = req.question.trim().to_string();
        let len = question.chars().count();
        if len < MIN_QUESTION_LENGTH {
            issues.push(format!(
                "Question must be at least {MIN_QUESTION_LENGTH} characters"
            ));
        } else if len > MAX_QUESTION_LENGTH {
            issues.push(format!(
                "Question must be at most {MAX_QUESTION_LENGTH} characters"
            ));
        }

        if req.options.len() < MIN_OPTIONS_PER_POLL {
            issues.push(format!(
                "At least {MIN_OPTIONS_PER_POLL} options required"
            ));
        } else if req.options.len() > MAX_OPTIONS_PER_POLL {
            issues.push(format!("At most {MAX_OPTIONS_PER_POLL} options allowed"));
        }

        let options: Vec<String> = req
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        for (index, option) in options.iter().enumerate() {
            let len = option.chars().count();
            if len < MIN_OPTION_LENGTH {
                issues.push(format!(
                    "Option {} must be at least {MIN_OPTION_LENGTH} character",
                    index + 1
                ));
            } else if len > MAX_OPTION_LENGTH {
                issues.push(format!(
                    "Option {} must be at most {MAX_OPTION_LENGTH} characters",
                    index + 1
                ));
            }
        }

        ValidationError::from_issues(issues)?;
        Ok(Self { question, options })
    }
}

/// Opaque per-browser voter identity. Alphanumeric, 32 to 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let len = raw.chars().count();
        if !(FINGERPRINT_MIN_LENGTH..=FINGERPRINT_MAX_LENGTH).contains(&len) {
            return Err(ValidationError::new("Invalid fingerprint"));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::new("Fingerprint must be alphanumeric"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A vote that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub option_id: OptionId,
    pub fingerprint: Fingerprint,
}

impl TryFrom<VoteRequest> for NewVote {
    type Error = ValidationError;

    fn try_from(req: VoteRequest) -> Result<Self, Self::Error> {
        let mut issues = Vec::new();

        let option_id = req.option_id.parse::<OptionId>().ok();
        if option_id.is_none() {
            issues.push("Invalid option ID format".to_string());
        }

        let fingerprint = match Fingerprint::parse(&req.fingerprint) {
            Ok(f) => Some(f),
            Err(e) => {
                issues.extend(e.issues);
                None
            }
        };

        match (option_id, fingerprint) {
            (Some(option_id), Some(fingerprint)) => Ok(Self {
                option_id,
                fingerprint,
            }),
            _ => Err(ValidationError { issues }),
        }
    }
}

/// Parse a poll id taken from a URL path segment.
pub fn parse_poll_id(raw: &str) -> Result<PollId, ValidationError> {
    raw.parse()
        .map_err(|_| ValidationError::new("Invalid poll ID format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6";

    fn request(question: &str, options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            question: question.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_new_poll_trims_input() {
        let poll = NewPoll::try_from(request(
            "  What should we eat?  ",
            &[" Pizza ", "Sushi"],
        ))
        .unwrap();

        assert_eq!(poll.question(), "What should we eat?");
        assert_eq!(poll.options(), &["Pizza".to_string(), "Sushi".to_string()]);
    }

    #[test]
    fn test_new_poll_rejects_short_question_and_single_option() {
        let err = NewPoll::try_from(request("Why?", &["Because"])).unwrap_err();

        assert_eq!(err.issues().len(), 2);
        assert!(err.to_string().contains("Question must be at least 10"));
        assert!(err.to_string().contains("At least 2 options"));
    }

    #[test]
    fn test_new_poll_rejects_blank_option() {
        let err = NewPoll::try_from(request("What should we eat?", &["Pizza", "   "])).unwrap_err();
        assert_eq!(err.issues(), &["Option 2 must be at least 1 character".to_string()]);
    }

    #[test]
    fn test_new_poll_option_bounds() {
        let eleven: Vec<String> = (0..11).map(|i| format!("Choice {i}")).collect();
        let refs: Vec<&str> = eleven.iter().map(String::as_str).collect();
        assert!(NewPoll::try_from(request("What should we eat?", &refs)).is_err());
        assert!(NewPoll::try_from(request("What should we eat?", &refs[..10])).is_ok());

        let long = "x".repeat(MAX_OPTION_LENGTH + 1);
        assert!(NewPoll::try_from(request("What should we eat?", &["Pizza", &long])).is_err());
    }

    #[test]
    fn test_question_length_counts_characters() {
        // 10 multi-byte characters are long enough.
        let question = "é".repeat(MIN_QUESTION_LENGTH);
        assert!(NewPoll::try_from(request(&question, &["a", "b"])).is_ok());

        let question = "q".repeat(MAX_QUESTION_LENGTH + 1);
        assert!(NewPoll::try_from(request(&question, &["a", "b"])).is_err());
    }

    #[test]
    fn test_fingerprint_rules() {
        assert!(Fingerprint::parse(FINGERPRINT).is_ok());
        assert!(Fingerprint::parse("short").is_err());
        assert!(Fingerprint::parse(&"a".repeat(FINGERPRINT_MAX_LENGTH + 1)).is_err());

        let err = Fingerprint::parse("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d-").unwrap_err();
        assert_eq!(err.to_string(), "Fingerprint must be alphanumeric");
    }

    #[test]
    fn test_new_vote_collects_all_issues() {
        let err = NewVote::try_from(VoteRequest {
            option_id: "nope".into(),
            fingerprint: "x".into(),
        })
        .unwrap_err();

        assert_eq!(
            err.issues(),
            &[
                "Invalid option ID format".to_string(),
                "Invalid fingerprint".to_string()
            ]
        );
    }

    #[test]
    fn test_new_vote_ok() {
        let option = OptionId::new();
        let vote = NewVote::try_from(VoteRequest {
            option_id: option.to_string(),
            fingerprint: FINGERPRINT.into(),
        })
        .unwrap();

        assert_eq!(vote.option_id, option);
        assert_eq!(vote.fingerprint.as_str(), FINGERPRINT);
    }

    #[test]
    fn test_parse_poll_id() {
        let id = PollId::new();
        assert_eq!(parse_poll_id(&id.to_string()).unwrap(), id);
        assert_eq!(
            parse_poll_id("123").unwrap_err().to_string(),
            "Invalid poll ID format"
        );
    }
}
