//! Request middleware
//!
//! Every route runs under, outermost first: [`SecurityHeadersLayer`],
//! [`recover_panic`] and [`log_request`]. Page handlers additionally run
//! under [`SessionLayer`] and then [`authenticate`].

pub mod authenticate;
pub mod logging;
pub mod recover;
pub mod security_headers;
pub mod session;

pub use authenticate::authenticate;
pub use logging::log_request;
pub use recover::{handle_panic, recover_panic};
pub use security_headers::{
    FrameOptions, ReferrerPolicy, SecurityHeadersConfig, SecurityHeadersLayer,
};
pub use session::{SessionLayer, SessionMiddleware};
