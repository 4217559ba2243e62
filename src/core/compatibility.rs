use crate::models::{SearchParams, User};

/// A searcher together with the criteria they submitted
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub user: &'a User,
    pub params: &'a SearchParams,
}

impl<'a> Candidate<'a> {
    pub fn new(user: &'a User, params: &'a SearchParams) -> Self {
        Self { user, params }
    }
}

/// Check whether two searchers accept each other
///
/// Every criterion must hold in both directions: faculty, gender, degree
/// and course range. The check is symmetric, so argument order does not
/// matter.
#[inline]
pub fn is_compatible(first: Candidate<'_>, second: Candidate<'_>) -> bool {
    faculties_match(first, second)
        && genders_match(first, second)
        && degrees_match(first, second)
        && courses_match(first, second)
}

#[inline]
fn faculties_match(a: Candidate<'_>, b: Candidate<'_>) -> bool {
    a.params.faculties.contains(&b.user.faculty) && b.params.faculties.contains(&a.user.faculty)
}

#[inline]
fn genders_match(a: Candidate<'_>, b: Candidate<'_>) -> bool {
    a.params.genders.contains(&b.user.gender) && b.params.genders.contains(&a.user.gender)
}

#[inline]
fn degrees_match(a: Candidate<'_>, b: Candidate<'_>) -> bool {
    a.params.degrees.contains(&b.user.degree) && b.params.degrees.contains(&a.user.degree)
}

#[inline]
fn courses_match(a: Candidate<'_>, b: Candidate<'_>) -> bool {
    let in_range = |params: &SearchParams, course: u8| {
        params.min_course <= course && course <= params.max_course
    };
    in_range(a.params, b.user.course) && in_range(b.params, a.user.course)
}
