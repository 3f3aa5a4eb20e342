//! Client-visible routes.

use std::fmt;

use thiserror::Error;

use crate::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Home feed (`/para-ti`).
    ForYou,
    Post(ItemId),
    Video(ItemId),
    Profile(String),
    Followers(String),
    Following(String),
    Auth,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown route: {0}")]
pub struct RouteParseError(pub String);

impl Route {
    /// Parse a path, ignoring any query string, fragment and trailing slash.
    /// `/` is treated as the home feed.
    pub fn parse(path: &str) -> Result<Self, RouteParseError> {
        let bare = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = bare.split('/').skip(1).collect();

        let route = match segments.as_slice() {
            [] | [""] | ["para-ti"] => Self::ForYou,
            ["auth"] => Self::Auth,
            ["post", id] if !id.is_empty() => Self::Post(ItemId::new(*id)),
            ["video", id] if !id.is_empty() => Self::Video(ItemId::new(*id)),
            ["user", handle] if !handle.is_empty() => Self::Profile((*handle).to_string()),
            ["user", handle, "followers"] if !handle.is_empty() => {
                Self::Followers((*handle).to_string())
            }
            ["user", handle, "following"] if !handle.is_empty() => {
                Self::Following((*handle).to_string())
            }
            _ => return Err(RouteParseError(path.to_string())),
        };
        Ok(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForYou => f.write_str("/para-ti"),
            Self::Post(id) => write!(f, "/post/{id}"),
            Self::Video(id) => write!(f, "/video/{id}"),
            Self::Profile(handle) => write!(f, "/user/{handle}"),
            Self::Followers(handle) => write!(f, "/user/{handle}/followers"),
            Self::Following(handle) => write!(f, "/user/{handle}/following"),
            Self::Auth => f.write_str("/auth"),
        }
    }
}
