//! Bearer authentication for the control surface.

mod middleware;

pub use middleware::AuthUser;
