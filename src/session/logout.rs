//! Logout notifications.

// self
use crate::_prelude::*;

/// Why a session was torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogoutReason {
	/// The user asked to log out.
	UserRequested,
	/// No usable refresh token was stored when a refresh was needed.
	MissingRefreshToken,
	/// The refresh endpoint answered with 401.
	RefreshRejected,
	/// Refresh failed for any other reason (network, malformed response, storage).
	RefreshFailed,
}
impl LogoutReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LogoutReason::UserRequested => "user_requested",
			LogoutReason::MissingRefreshToken => "missing_refresh_token",
			LogoutReason::RefreshRejected => "refresh_rejected",
			LogoutReason::RefreshFailed => "refresh_failed",
		}
	}
}
impl Display for LogoutReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Receives the user-visible consequence of a logout (typically a redirect to the login page).
pub trait LogoutListener
where
	Self: Send + Sync,
{
	/// Called once per teardown, after local credentials are cleared.
	fn logged_out(&self, reason: LogoutReason);
}

/// Listener that ignores notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogout;
impl LogoutListener for NoopLogout {
	fn logged_out(&self, _reason: LogoutReason) {}
}
