//! Star ratings and score aggregation.
//!
//! Reviewers rate a paper with 1 to 5 stars. The rating is stored as a signed
//! score centred on zero (`stars - 3`), so a paper's total is positive when its
//! reviewers lean towards acceptance. Unscored assignments do not count.

use thiserror::Error;

pub const MIN_STARS: i32 = 1;
pub const MAX_STARS: i32 = 5;
pub const STAR_OFFSET: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("star rating {0} is outside 1..=5")]
pub struct InvalidStars(pub i32);

pub fn stars_to_score(stars: i32) -> Result<i32, InvalidStars> {
    if !(MIN_STARS..=MAX_STARS).contains(&stars) {
        return Err(InvalidStars(stars));
    }
    Ok(stars - STAR_OFFSET)
}

pub fn score_to_stars(score: i32) -> i32 {
    score + STAR_OFFSET
}

/// Sum of the scores that have been entered; `None` entries are skipped.
pub fn total_score<I>(scores: I) -> i32
where
    I: IntoIterator<Item = Option<i32>>,
{
    scores.into_iter().flatten().sum()
}
