//! Twitch sign-in: window coordination, payload mapping, session queries.

pub mod coordinator;
pub mod payload;
pub mod session;
pub mod surface;

pub use coordinator::{AuthCoordinator, CoordinatorOptions, SignInTicket};
pub use payload::CallbackPayload;
pub use session::{
    SessionProfile, SessionStatus, SignOutOutcome, is_signed_in, session_status, sign_out,
};
pub use surface::{AuthSurface, AuthSurfaceFactory, SurfaceEvent};
