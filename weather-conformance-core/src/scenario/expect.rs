use std::fmt::Debug;

use reqwest::StatusCode;

use crate::client::{ApiResponse, truncate_body};
use crate::error::{HarnessError, Result};
use crate::model::ErrorResponse;

pub fn status(res: &ApiResponse, expected: StatusCode) -> Result<()> {
    if res.status == expected {
        return Ok(());
    }
    Err(HarnessError::UnexpectedStatus {
        expected: expected.as_u16(),
        actual: res.status.as_u16(),
        body: truncate_body(&res.body),
    })
}

pub fn content_type(res: &ApiResponse, expected: &str) -> Result<()> {
    match res.content_type.as_deref() {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(HarnessError::UnexpectedContentType {
            expected: expected.to_string(),
            actual: actual.unwrap_or("<none>").to_string(),
        }),
    }
}

pub fn equal<T: PartialEq + Debug + ?Sized>(what: &str, expected: &T, actual: &T) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::Assertion(format!(
            "{what} mismatch: expected {expected:?}, got {actual:?}"
        )))
    }
}

/// Status plus the exact `cod` and `message` of the error body.
pub fn error_body(
    res: &ApiResponse,
    expected_status: StatusCode,
    expected: &ErrorResponse,
) -> Result<()> {
    status(res, expected_status)?;
    let body: ErrorResponse = res.json("ErrorResponse")?;
    equal("Error code", expected.cod.as_str(), body.cod.as_str())?;
    equal(
        "Error message",
        expected.message.as_str(),
        body.message.as_str(),
    )
}

/// Strip `callback(` and `)` from a JSONP body. No whitespace is tolerated.
pub fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Result<&'a str> {
    let inner = body
        .strip_prefix(callback)
        .and_then(|rest| rest.strip_prefix('('))
        .ok_or_else(|| {
            HarnessError::Assertion(format!(
                "Response body does not start with the expected callback function '{callback}('"
            ))
        })?;
    inner.strip_suffix(')').ok_or_else(|| {
        HarnessError::Assertion(
            "Response body does not end with a closing parenthesis".into(),
        )
    })
}
