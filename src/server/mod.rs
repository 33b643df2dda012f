//! Public surface: HTTP endpoints for the async variant, cron endpoints
//! for the external scheduler, and the websocket bridge for the live
//! variant. An envelope, not the core: parse strictly, call the gateway,
//! map rejections to status codes, emit effects after commit.

mod app;
mod auth;
mod breaker;
mod cron;
mod dto;
mod emit;
mod http;
mod ws;

pub use app::*;
pub use auth::*;
pub use breaker::*;
pub use cron::*;
pub use dto::*;
pub use emit::*;
pub use http::*;
pub use ws::*;
