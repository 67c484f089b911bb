//! Profile statistics and the mapping from the provider's JSON shape.
//!
//! The provider answers with `{"users": [ {...} ]}`; only the first user is
//! used. An absent or empty list is a defined "not found" state rather than a
//! transport failure.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::LookupError;

/// Statistics for a single user, immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    /// Display name printed on the certificate
    pub name: String,
    /// Current streak in days; absent, zero and negative are distinct inputs
    pub streak: Option<i64>,
    /// Total XP across all courses
    pub total_xp: i64,
    /// Native language code (resolved to a flag glyph)
    pub from_language: String,
    /// Free-form learning motivation
    pub motivation: Option<String>,
    /// First day of the current streak
    pub streak_start_date: Option<NaiveDate>,
    /// Courses in provider order; this is also display order
    pub courses: Vec<Course>,
    /// Absolute avatar URL, if the user has a custom avatar
    pub avatar_url: Option<String>,
}

/// A single course entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub title: String,
    pub learning_language_code: Option<String>,
    pub xp: i64,
}

impl UserStats {
    /// Minimal record with only a name; every other field uses its fallback.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streak: None,
            total_xp: 0,
            from_language: String::new(),
            motivation: None,
            streak_start_date: None,
            courses: Vec::new(),
            avatar_url: None,
        }
    }

    /// The renderer requires a non-blank name.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::InvalidStats("name must not be empty".into()));
        }
        Ok(())
    }

    /// Map a provider response to stats for `requested`.
    pub fn from_response(resp: UsersResponse, requested: &str) -> Result<Self, LookupError> {
        let user = resp
            .users
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::UserNotFound(requested.to_string()))?;
        Ok(user.into_stats(requested))
    }
}

/// Top-level provider payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Option<Vec<RawUser>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub streak: Option<i64>,
    #[serde(default)]
    pub total_xp: Option<i64>,
    #[serde(default)]
    pub from_language: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub streak_data: Option<RawStreakData>,
    #[serde(default)]
    pub courses: Option<Vec<RawCourse>>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStreakData {
    #[serde(default)]
    pub current_streak: Option<RawCurrentStreak>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCurrentStreak {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub length: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCourse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub learning_language: Option<String>,
    #[serde(default)]
    pub xp: Option<i64>,
}

impl RawUser {
    fn into_stats(self, requested: &str) -> UserStats {
        let name = non_blank(self.username)
            .or_else(|| non_blank(self.name))
            .unwrap_or_else(|| requested.trim().to_string());

        let streak_start_date = self
            .streak_data
            .and_then(|d| d.current_streak)
            .and_then(|s| s.start_date)
            .and_then(|raw| parse_start_date(&raw));

        let courses = self
            .courses
            .unwrap_or_default()
            .into_iter()
            .map(|c| Course {
                title: c.title.unwrap_or_default(),
                learning_language_code: non_blank(c.learning_language),
                xp: c.xp.unwrap_or(0),
            })
            .collect();

        UserStats {
            name,
            streak: self.streak,
            total_xp: self.total_xp.unwrap_or(0),
            from_language: self.from_language.unwrap_or_default(),
            motivation: non_blank(self.motivation),
            streak_start_date,
            courses,
            avatar_url: self.picture.as_deref().and_then(avatar_url),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(e) => {
            log::debug!("ignoring unparsable streak start date {:?}: {}", raw, e);
            None
        }
    }
}

/// Turn the provider's protocol-relative `picture` into a fetchable URL.
/// Default avatars carry no useful image and are dropped.
fn avatar_url(picture: &str) -> Option<String> {
    let p = picture.trim();
    if p.is_empty() || p.contains("defaultAvatar") {
        return None;
    }
    let absolute = if let Some(rest) = p.strip_prefix("//") {
        format!("https://{}", rest)
    } else if p.starts_with("http://") || p.starts_with("https://") {
        p.to_string()
    } else {
        return None;
    };
    if absolute.ends_with("/xlarge") {
        Some(absolute)
    } else {
        Some(format!("{}/xlarge", absolute.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> UsersResponse {
        serde_json::from_str(json).expect("valid json")
    }

    #[test]
    fn maps_first_user_fields() {
        let resp = parse(
            r#"{"users":[{"username":"ana","name":"Ana B","streak":15,"totalXp":4200,
                "fromLanguage":"es","motivation":"travel",
                "streakData":{"currentStreak":{"startDate":"2024-03-01","length":15}},
                "courses":[{"title":"French","learningLanguage":"fr","xp":1200},
                           {"title":"Italian","learningLanguage":"it","xp":3000}],
                "picture":"//simg-ssl.duolingo.com/avatars/1/abc"}]}"#,
        );
        let stats = UserStats::from_response(resp, "ana").unwrap();
        assert_eq!(stats.name, "ana");
        assert_eq!(stats.streak, Some(15));
        assert_eq!(stats.total_xp, 4200);
        assert_eq!(stats.from_language, "es");
        assert_eq!(stats.streak_start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.courses[0].title, "French");
        assert_eq!(stats.courses[1].xp, 3000);
        assert_eq!(
            stats.avatar_url.as_deref(),
            Some("https://simg-ssl.duolingo.com/avatars/1/abc/xlarge")
        );
    }

    #[test]
    fn empty_or_missing_users_is_not_found() {
        for body in [r#"{"users":[]}"#, r#"{}"#, r#"{"users":null}"#] {
            let err = UserStats::from_response(parse(body), "ghost").unwrap_err();
            assert_eq!(err, LookupError::UserNotFound("ghost".into()));
        }
    }

    #[test]
    fn tolerates_nulls_and_bad_dates() {
        let resp = parse(
            r#"{"users":[{"username":"bo","streak":null,"motivation":"",
                "streakData":{"currentStreak":{"startDate":"yesterday"}},"courses":null,
                "picture":"//simg-ssl.duolingo.com/ssr-avatars/defaultAvatar"}]}"#,
        );
        let stats = UserStats::from_response(resp, "bo").unwrap();
        assert_eq!(stats.streak, None);
        assert_eq!(stats.motivation, None);
        assert_eq!(stats.streak_start_date, None);
        assert!(stats.courses.is_empty());
        assert_eq!(stats.avatar_url, None);
    }

    #[test]
    fn falls_back_to_display_name_then_request() {
        let resp = parse(r#"{"users":[{"name":"Display"}]}"#);
        assert_eq!(UserStats::from_response(resp, "req").unwrap().name, "Display");
        let resp = parse(r#"{"users":[{}]}"#);
        assert_eq!(UserStats::from_response(resp, " req ").unwrap().name, "req");
    }

    #[test]
    fn validate_rejects_blank_name() {
        assert!(UserStats::named("  ").validate().is_err());
        assert!(UserStats::named("Ana").validate().is_ok());
    }
}
