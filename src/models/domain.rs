use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Degree {
    Bachelor,
    Master,
    Specialist,
    Postgraduate,
}

/// Registered student with the attributes used for matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    pub faculty: String,
    pub gender: Gender,
    pub degree: Degree,
    pub course: u8,
    #[serde(default)]
    pub contacts: Vec<String>,
}

/// Acceptance window a searcher submits with a search
///
/// A candidate is acceptable when their faculty, gender and degree are all
/// listed and their course falls inside `[min_course, max_course]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_course_range"))]
pub struct SearchParams {
    #[validate(length(min = 1))]
    pub faculties: Vec<String>,
    #[validate(length(min = 1))]
    pub genders: Vec<Gender>,
    #[validate(length(min = 1))]
    pub degrees: Vec<Degree>,
    #[serde(rename = "minCourse")]
    #[validate(range(min = 1, max = 6))]
    pub min_course: u8,
    #[serde(rename = "maxCourse")]
    #[validate(range(min = 1, max = 6))]
    pub max_course: u8,
}

impl SearchParams {
    /// Whether `user` falls inside this acceptance window
    #[inline]
    pub fn accepts(&self, user: &User) -> bool {
        self.faculties.contains(&user.faculty)
            && self.genders.contains(&user.gender)
            && self.degrees.contains(&user.degree)
            && (self.min_course..=self.max_course).contains(&user.course)
    }
}

fn validate_course_range(params: &SearchParams) -> Result<(), ValidationError> {
    if params.min_course > params.max_course {
        return Err(ValidationError::new("course_range"));
    }
    Ok(())
}

/// Pending pool entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub finder: User,
    pub params: SearchParams,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Search {
    pub fn new(finder: User, params: SearchParams, created_at: DateTime<Utc>) -> Self {
        Self {
            finder,
            params,
            created_at,
        }
    }
}

/// Stored state of a meet. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetStatus {
    Active,
    Finished,
}

/// Time-boxed pairing of two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meet {
    pub id: Uuid,
    pub user1: User,
    pub user2: User,
    pub status: MeetStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

impl Meet {
    /// Open a new active meet between two users
    pub fn new(
        user1: User,
        user2: User,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user1,
            user2,
            status: MeetStatus::Active,
            created_at,
            expires_at,
        }
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.user1.id == user_id || self.user2.id == user_id
    }

    /// The other participant, if `user_id` takes part in this meet
    pub fn partner_of(&self, user_id: UserId) -> Option<&User> {
        if self.user1.id == user_id {
            Some(&self.user2)
        } else if self.user2.id == user_id {
            Some(&self.user1)
        } else {
            None
        }
    }
}
