//! Field-level input rules, checked before anything touches the store.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::api::{ChatCreate, EmotionCreate, LoginRequest, RegisterRequest, UserUpdate};

pub const RESULT_OF_EXPECT: [&str; 3] = ["yes", "no", "unclear"];
pub const DEFAULT_TIMEZONE: &str = "UTC";

const LEVEL_MIN: i64 = 1;
const LEVEL_MAX: i64 = 5;
const STORY_MAX: usize = 1000;
const NARRATIVE_MAX: usize = 500;
const PASSWORD_MIN: usize = 6;
const NAME_MAX: usize = 100;
const OCCUPATION_MAX: usize = 100;
const CHAT_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("result of expect = yes, no or unclear")]
    InvalidResultOfExpect,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("{field} must be an RFC 3339 timestamp or a YYYY-MM-DD date")]
    InvalidDate { field: &'static str },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for EmotionCreate {
    fn validate(&self) -> Result<(), ValidationError> {
        check_level("card1", self.card1)?;
        check_level("card2", self.card2)?;
        check_level("card3", self.card3)?;
        check_level("before_card1_level", self.before_card1_level)?;
        check_level("before_card2_level", self.before_card2_level)?;
        check_level("before_card3_level", self.before_card3_level)?;
        check_level("after_card1_level", self.after_card1_level)?;
        check_level("after_card2_level", self.after_card2_level)?;
        check_level("after_card3_level", self.after_card3_level)?;

        check_max("story", self.story.as_deref(), STORY_MAX)?;
        check_max("thoughts_action", self.thoughts_action.as_deref(), NARRATIVE_MAX)?;
        check_max("consequences", self.consequences.as_deref(), NARRATIVE_MAX)?;
        check_max(
            "feeling_of_consequences",
            self.feeling_of_consequences.as_deref(),
            NARRATIVE_MAX,
        )?;
        check_max("take_out", self.take_out.as_deref(), NARRATIVE_MAX)?;

        if let Some(result) = &self.result_of_expect {
            if !RESULT_OF_EXPECT.contains(&result.as_str()) {
                return Err(ValidationError::InvalidResultOfExpect);
            }
        }

        Ok(())
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(ValidationError::TooShort {
                field: "password",
                min: PASSWORD_MIN,
            });
        }
        check_name(&self.name)?;
        check_max("occupation", self.occupation.as_deref(), OCCUPATION_MAX)?;
        if let Some(birthday) = &self.birthday {
            parse_birthday(birthday)?;
        }
        if let Some(timezone) = &self.timezone {
            parse_timezone(timezone)?;
        }
        Ok(())
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.is_empty() {
            return Err(ValidationError::TooShort {
                field: "password",
                min: 1,
            });
        }
        Ok(())
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(Some(name)) = &self.name {
            check_name(name)?;
        }
        if let Some(occupation) = &self.occupation {
            check_max("occupation", occupation.as_deref(), OCCUPATION_MAX)?;
        }
        if let Some(Some(birthday)) = &self.birthday {
            parse_birthday(birthday)?;
        }
        if let Some(Some(timezone)) = &self.timezone {
            parse_timezone(timezone)?;
        }
        Ok(())
    }
}

impl Validate for ChatCreate {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.content.is_empty() {
            return Err(ValidationError::TooShort {
                field: "content",
                min: 1,
            });
        }
        check_max("content", Some(self.content.as_str()), CHAT_MAX)
    }
}

/// Resolve an IANA zone name. Names are matched exactly.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// Accepts a full RFC 3339 timestamp or a bare date, read as midnight UTC.
pub fn parse_birthday(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(ValidationError::InvalidDate { field: "birthday" })
}

/// Syntactic check only: one `@`, a non-empty local part, and a dotted
/// domain with no empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn check_level(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if (LEVEL_MIN..=LEVEL_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: LEVEL_MIN,
            max: LEVEL_MAX,
            value,
        })
    }
}

fn check_max(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::TooShort { field: "name", min: 1 });
    }
    check_max("name", Some(name), NAME_MAX)
}
