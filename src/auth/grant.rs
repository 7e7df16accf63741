//! Wire shapes for the refresh/login token envelope.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Body posted to the refresh endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct RefreshRequest<'a> {
	/// Current refresh token.
	pub refresh_token: &'a str,
}

/// Response envelope returned by the refresh and login endpoints.
///
/// Every field is optional on the wire; [`TokenEnvelope::into_issued`] decides whether the
/// payload carries a usable grant.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenEnvelope {
	/// Grant payload nested under `data`.
	#[serde(default)]
	pub data: Option<TokenGrant>,
}
impl TokenEnvelope {
	/// Extracts the issued tokens, returning `None` when `data.access_token` is absent or empty.
	pub fn into_issued(self) -> Option<IssuedTokens> {
		let grant = self.data?;
		let access_token = grant.access_token.filter(|token| !token.is_empty())?;
		let refresh_token =
			grant.refresh_token.filter(|token| !token.is_empty()).map(TokenSecret::from);
		let expires_in = grant.expires_in.and_then(seconds_to_duration);

		Some(IssuedTokens { access_token: TokenSecret::from(access_token), refresh_token, expires_in })
	}
}

/// Raw grant fields as sent by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Rotated refresh token, if the backend rotates.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<f64>,
}

/// Validated token pair ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedTokens {
	/// Access token to attach to subsequent requests.
	pub access_token: TokenSecret,
	/// Rotated refresh token; `None` keeps the current one.
	pub refresh_token: Option<TokenSecret>,
	/// Positive lifetime reported by the backend.
	pub expires_in: Option<Duration>,
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
	if !secs.is_finite() || secs <= 0. {
		return None;
	}

	Duration::checked_seconds_f64(secs)
}
