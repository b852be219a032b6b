use crate::database::models::{User, UserDetail};
use serde::Deserialize;

/// Item of `GET /users`.
#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// Body of `GET /users/{login}`. Only the fields the cache keeps are read.
#[derive(Debug, Deserialize)]
pub struct UserDetailDto {
    pub id: i64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    #[serde(default)]
    pub location: Option<String>,
    pub followers: u32,
    pub following: u32,
    #[serde(default)]
    pub blog: Option<String>,
}

/// Error body GitHub sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorDto {
    pub message: String,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            login: dto.login,
            avatar_url: dto.avatar_url,
            html_url: dto.html_url,
        }
    }
}

impl From<UserDetailDto> for UserDetail {
    fn from(dto: UserDetailDto) -> Self {
        Self {
            id: dto.id,
            login: dto.login,
            avatar_url: dto.avatar_url,
            html_url: dto.html_url,
            location: dto.location,
            followers: dto.followers,
            following: dto.following,
            blog: dto.blog,
        }
    }
}
