use crate::duel::PlayerId;
use actix_web::FromRequest;
use actix_web::HttpRequest;
use actix_web::dev::Payload;
use std::future::Ready;
use std::future::ready;

/// Authenticated caller identity, minted by the auth middleware upstream
/// of this service and forwarded as trusted headers (`x-user-id`,
/// optionally `x-user-name`). Authentication itself is out of scope here.
#[derive(Debug, Clone)]
pub struct Auth {
    user: PlayerId,
    username: String,
}

impl Auth {
    pub fn user(&self) -> PlayerId {
        self.user
    }
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl FromRequest for Auth {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(PlayerId::parse);
        let Some(user) = user else {
            return ready(Err(actix_web::error::ErrorUnauthorized(
                "missing or malformed x-user-id",
            )));
        };
        let username = req
            .headers()
            .get("x-user-name")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("skater-{}", &user.to_string()[..8]));
        ready(Ok(Self { user, username }))
    }
}
