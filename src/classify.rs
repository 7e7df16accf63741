//! Response classification: success, refresh-and-retry, terminal, or plain failure.
//!
//! The login endpoint's own 401 means "bad credentials", not "expired session", so requests
//! flagged with `skip_auth_redirect` surface the backend's message instead of entering the
//! refresh cycle.

// self
use crate::{_prelude::*, http::HttpResponse};

/// HTTP status signalling a missing or expired credential.
pub const UNAUTHENTICATED: u16 = 401;
/// Message surfaced when a login 401 carries no readable reason.
pub const INVALID_CREDENTIALS_FALLBACK: &str = "Invalid username or password";

/// Flags carried from the caller into classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttemptFlags {
	/// Set only for the login request.
	pub skip_auth_redirect: bool,
	/// Set on the single replay that follows a successful refresh.
	pub is_retry: bool,
}

/// Outcome of classifying a completed response.
#[derive(Debug)]
pub enum Classification {
	/// 2xx response; carries the raw body.
	Success(HttpResponse),
	/// First 401 on a non-login request; refresh and replay once.
	RetryRequired,
	/// 401 on the replay; credentials must be cleared.
	Terminal,
	/// Any other failure, ready to hand back to the caller.
	Failed(Error),
}

/// Classifies a completed response.
pub fn classify(response: HttpResponse, flags: AttemptFlags) -> Classification {
	if response.status == UNAUTHENTICATED {
		if flags.skip_auth_redirect {
			let message = extract_message(&response.body)
				.unwrap_or_else(|| INVALID_CREDENTIALS_FALLBACK.to_owned());

			return Classification::Failed(Error::CredentialsInvalid { message });
		}
		if flags.is_retry {
			return Classification::Terminal;
		}

		return Classification::RetryRequired;
	}
	if !response.is_success() {
		let message = extract_message(&response.body).unwrap_or_else(|| response.status_text());

		return Classification::Failed(Error::RequestFailed { status: response.status, message });
	}

	Classification::Success(response)
}

/// Decodes a success body, treating an empty body as the empty JSON object.
pub fn decode_json<T>(status: u16, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"{}".as_slice() } else { body };
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|source| Error::Decode { source, status })
}

/// Extracts a human-readable message from an error body.
///
/// Checks `message`, then a string `error`, then `error.message`.
pub fn extract_message(body: &[u8]) -> Option<String> {
	let payload = serde_json::from_slice::<serde_json::Value>(body).ok()?;
	let text = |value: Option<&serde_json::Value>| {
		value.and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned)
	};
	let error = payload.get("error");

	text(payload.get("message"))
		.or_else(|| text(error))
		.or_else(|| text(error.and_then(|e| e.get("message"))))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const NORMAL: AttemptFlags = AttemptFlags { skip_auth_redirect: false, is_retry: false };
	const RETRY: AttemptFlags = AttemptFlags { skip_auth_redirect: false, is_retry: true };
	const LOGIN: AttemptFlags = AttemptFlags { skip_auth_redirect: true, is_retry: false };

	fn response(status: u16, body: &str) -> HttpResponse {
		HttpResponse::new(status, body)
	}

	#[test]
	fn first_401_requests_refresh_and_second_is_terminal() {
		assert!(matches!(classify(response(401, ""), NORMAL), Classification::RetryRequired));
		assert!(matches!(classify(response(401, ""), RETRY), Classification::Terminal));
	}

	#[test]
	fn login_401_surfaces_backend_message() {
		let classified = classify(response(401, r#"{"message":"Account locked"}"#), LOGIN);

		assert!(matches!(
			classified,
			Classification::Failed(Error::CredentialsInvalid { ref message }) if message == "Account locked"
		));

		let classified = classify(response(401, r#"{"error":{"message":"Wrong password"}}"#), LOGIN);

		assert!(matches!(
			classified,
			Classification::Failed(Error::CredentialsInvalid { ref message }) if message == "Wrong password"
		));

		let classified = classify(response(401, "<html>nope</html>"), LOGIN);

		assert!(matches!(
			classified,
			Classification::Failed(Error::CredentialsInvalid { ref message })
				if message == INVALID_CREDENTIALS_FALLBACK
		));
	}

	#[test]
	fn other_failures_follow_message_precedence() {
		let cases = [
			(r#"{"message":"flat","error":"text"}"#, "flat"),
			(r#"{"error":"text"}"#, "text"),
			(r#"{"error":{"message":"nested"}}"#, "nested"),
			(r#"{"message":42,"error":{"message":"nested"}}"#, "nested"),
			(r#"{"message":"","error":"text"}"#, "text"),
		];

		for (body, expected) in cases {
			let Classification::Failed(Error::RequestFailed { status, message }) =
				classify(response(422, body), NORMAL)
			else {
				panic!("422 should classify as a request failure for {body}.");
			};

			assert_eq!(status, 422);
			assert_eq!(message, expected, "Unexpected message for {body}.");
		}
	}

	#[test]
	fn failures_without_message_use_status_text() {
		let mut failed = response(500, "");

		failed.reason = Some("Internal Server Error".into());

		let Classification::Failed(err) = classify(failed, NORMAL) else {
			panic!("500 should classify as a request failure.");
		};

		assert_eq!(err.to_string(), "Internal Server Error");
	}

	#[test]
	fn empty_success_body_decodes_as_empty_object() {
		let value: serde_json::Value =
			decode_json(204, b"").expect("Empty body should decode as an object.");

		assert_eq!(value, serde_json::json!({}));

		let _: serde::de::IgnoredAny =
			decode_json(200, b"  \n").expect("Whitespace body should decode.");
	}

	#[test]
	fn malformed_success_body_reports_path() {
		#[derive(Debug, Deserialize)]
		struct Book {
			#[allow(dead_code)]
			title: String,
		}

		let err = decode_json::<Book>(200, br#"{"title":7}"#)
			.expect_err("Numeric title should fail to decode.");

		let Error::Decode { source, status } = err else {
			panic!("Decode failures should map to Error::Decode.");
		};

		assert_eq!(status, 200);
		assert_eq!(source.path().to_string(), "title");
	}
}
