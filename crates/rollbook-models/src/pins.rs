//! Registration PINs.
//!
//! A PIN is a short uppercase alphanumeric code that lets one person register
//! (or upgrade an existing account) as a teacher or a student of the school
//! that issued it. Codes are unique across every PIN ever issued, consumed or
//! not, and a PIN is consumed at most once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rollbook_auth::RoleFlags;
use rollbook_core::serde::{deserialize_optional_bool, deserialize_optional_uuid};
use rollbook_core::{PaginationMeta, PaginationParams, StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, FromRow, Type};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::ids::{PinId, SchoolId, UserId};

/// Category of a PIN, deciding the role granted on redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid PIN category `{0}`, expected `teacher` or `student`")]
pub struct UnknownPinType(pub String);

impl PinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinType::Teacher => "teacher",
            PinType::Student => "student",
        }
    }

    /// Sets the role flag this category grants.
    pub fn grant(&self, roles: &mut RoleFlags) {
        match self {
            PinType::Teacher => roles.is_teacher = true,
            PinType::Student => roles.is_student = true,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinType {
    type Err = UnknownPinType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(PinType::Teacher),
            "student" => Ok(PinType::Student),
            _ => Err(UnknownPinType(s.to_string())),
        }
    }
}

// Stored as text, constrained by a CHECK on `pins.category`.
impl Type<Postgres> for PinType {
    fn type_info() -> PgTypeInfo {
        <str as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <str as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for PinType {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<'q, Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for PinType {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<'r, Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// A persisted PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct IssuedPin {
    pub id: PinId,
    pub code: String,
    pub category: PinType,
    pub school_id: Option<SchoolId>,
    pub consumed: bool,
    pub redeemed_by: Option<UserId>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
    /// `None` never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssuedPin {
    pub const COLUMNS: &'static str = "id, code, category, school_id, consumed, redeemed_by, \
         redeemed_at, issued_at, expires_at";

    pub fn has_expired(&self) -> bool {
        self.has_expired_at(Utc::now())
    }

    /// A PIN is expired from its expiry instant onwards.
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }

    /// Checks whether a user of `redeemer_school` may consume this PIN at `now`.
    ///
    /// A PIN with no school can be redeemed by anyone; a redeemer without a
    /// school adopts the PIN's school.
    pub fn check_redeemable(
        &self,
        now: DateTime<Utc>,
        redeemer_school: Option<SchoolId>,
    ) -> Result<(), RedeemError> {
        if self.consumed {
            return Err(RedeemError::AlreadyConsumed);
        }
        if self.has_expired_at(now) {
            return Err(RedeemError::Expired);
        }
        if let (Some(pin_school), Some(user_school)) = (self.school_id, redeemer_school) {
            if pin_school != user_school {
                return Err(RedeemError::SchoolMismatch);
            }
        }
        Ok(())
    }

    /// Consumes the PIN. The transition is one-way.
    pub fn redeem(
        &mut self,
        by: UserId,
        redeemer_school: Option<SchoolId>,
        now: DateTime<Utc>,
    ) -> Result<(), RedeemError> {
        self.check_redeemable(now, redeemer_school)?;
        self.consumed = true;
        self.redeemed_by = Some(by);
        self.redeemed_at = Some(now);
        Ok(())
    }
}

/// Reasons a PIN cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RedeemError {
    #[error("PIN not found")]
    NotFound,
    #[error("PIN has already been used")]
    AlreadyConsumed,
    #[error("PIN has expired")]
    Expired,
    #[error("PIN belongs to a different school")]
    SchoolMismatch,
}

impl RedeemError {
    pub fn status(&self) -> StatusCode {
        match self {
            RedeemError::NotFound => StatusCode::NOT_FOUND,
            RedeemError::AlreadyConsumed => StatusCode::CONFLICT,
            RedeemError::Expired => StatusCode::GONE,
            RedeemError::SchoolMismatch => StatusCode::FORBIDDEN,
        }
    }
}

/// A PIN ready to be inserted. Always unconsumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPin {
    pub code: String,
    pub category: PinType,
    pub school_id: Option<SchoolId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewPin {
    pub fn into_issued(self, id: PinId) -> IssuedPin {
        IssuedPin {
            id,
            code: self.code,
            category: self.category,
            school_id: self.school_id,
            consumed: false,
            redeemed_by: None,
            redeemed_at: None,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

/// Batch issuance request.
///
/// Both fields are optional at the JSON level so that a missing category or
/// count reports the same error as an invalid one.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct IssuePinsRequest {
    #[serde(alias = "pin_type")]
    #[schema(example = "teacher")]
    pub category: Option<String>,
    #[serde(alias = "pin_count")]
    #[schema(example = 3)]
    pub count: Option<i64>,
    /// Overrides the default validity window
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RedeemPinRequest {
    #[validate(length(min = 8, max = 32))]
    #[schema(example = "K3XQ9ZP0AB")]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PinResponse {
    pub id: PinId,
    pub code: String,
    pub category: PinType,
    pub consumed: bool,
    pub owning_organization: Option<SchoolId>,
    pub redeemed_by: Option<UserId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<IssuedPin> for PinResponse {
    fn from(pin: IssuedPin) -> Self {
        Self {
            id: pin.id,
            code: pin.code,
            category: pin.category,
            consumed: pin.consumed,
            owning_organization: pin.school_id,
            redeemed_by: pin.redeemed_by,
            issued_at: pin.issued_at,
            expires_at: pin.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PinStatusResponse {
    #[serde(flatten)]
    pub pin: PinResponse,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub redeemable: bool,
}

impl PinStatusResponse {
    pub fn at(pin: IssuedPin, now: DateTime<Utc>) -> Self {
        let expired = pin.has_expired_at(now);
        let redeemable = !pin.consumed && !expired;
        let redeemed_at = pin.redeemed_at;
        Self {
            pin: pin.into(),
            redeemed_at,
            expired,
            redeemable,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PinFilterParams {
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub consumed: Option<bool>,
    /// Honoured for superusers only
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedPinsResponse {
    pub data: Vec<PinResponse>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pin(expires_at: Option<DateTime<Utc>>) -> IssuedPin {
        NewPin {
            code: "AB12CD34EF".to_string(),
            category: PinType::Student,
            school_id: None,
            issued_at: Utc::now(),
            expires_at,
        }
        .into_issued(PinId::new())
    }

    #[test]
    fn test_parse_category_case_insensitive() {
        assert_eq!("teacher".parse::<PinType>().unwrap(), PinType::Teacher);
        assert_eq!("STUDENT".parse::<PinType>().unwrap(), PinType::Student);
        assert_eq!(" Teacher ".parse::<PinType>().unwrap(), PinType::Teacher);
        assert!("parent".parse::<PinType>().is_err());
        assert!("".parse::<PinType>().is_err());
    }

    #[test]
    fn test_grant_sets_matching_flag() {
        let mut roles = RoleFlags::default();
        PinType::Teacher.grant(&mut roles);
        assert!(roles.is_teacher);
        assert!(!roles.is_student);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let p = pin(Some(now));
        assert!(!p.has_expired_at(now - Duration::seconds(1)));
        assert!(p.has_expired_at(now));
        assert!(p.has_expired_at(now + Duration::days(1)));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let p = pin(None);
        assert!(!p.has_expired_at(Utc::now() + Duration::days(365 * 100)));
    }

    #[test]
    fn test_redeem_is_one_way() {
        let now = Utc::now();
        let mut p = pin(Some(now + Duration::days(30)));
        let user = UserId::new();

        p.redeem(user, None, now).unwrap();
        assert!(p.consumed);
        assert_eq!(p.redeemed_by, Some(user));
        assert_eq!(p.redeemed_at, Some(now));

        assert_eq!(
            p.redeem(UserId::new(), None, now),
            Err(RedeemError::AlreadyConsumed)
        );
        assert_eq!(p.redeemed_by, Some(user));
    }

    #[test]
    fn test_expired_pin_not_redeemable() {
        let now = Utc::now();
        let mut p = pin(Some(now - Duration::minutes(1)));
        assert_eq!(p.redeem(UserId::new(), None, now), Err(RedeemError::Expired));
        assert!(!p.consumed);
    }

    #[test]
    fn test_school_scoping() {
        let now = Utc::now();
        let school = SchoolId::new();
        let mut p = pin(None);
        p.school_id = Some(school);

        assert_eq!(
            p.check_redeemable(now, Some(SchoolId::new())),
            Err(RedeemError::SchoolMismatch)
        );
        assert!(p.check_redeemable(now, Some(school)).is_ok());
        assert!(p.check_redeemable(now, None).is_ok());
    }

    #[test]
    fn test_redeem_error_status() {
        assert_eq!(RedeemError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RedeemError::AlreadyConsumed.status(), StatusCode::CONFLICT);
        assert_eq!(RedeemError::Expired.status(), StatusCode::GONE);
        assert_eq!(RedeemError::SchoolMismatch.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_issue_request_aliases() {
        let req: IssuePinsRequest =
            serde_json::from_str(r#"{"pin_type":"student","pin_count":4}"#).unwrap();
        assert_eq!(req.category.as_deref(), Some("student"));
        assert_eq!(req.count, Some(4));

        let req: IssuePinsRequest = serde_json::from_str("{}").unwrap();
        assert!(req.category.is_none());
        assert!(req.count.is_none());
    }

    #[test]
    fn test_status_response_shape() {
        let now = Utc::now();
        let p = pin(Some(now - Duration::days(1)));
        let json = serde_json::to_value(PinStatusResponse::at(p, now)).unwrap();
        assert_eq!(json["code"], "AB12CD34EF");
        assert_eq!(json["category"], "student");
        assert_eq!(json["expired"], true);
        assert_eq!(json["redeemable"], false);
        assert!(json["owning_organization"].is_null());
    }
}
