//! Pagination arguments and their validation.
//!
//! Arguments arrive from the transport layer in raw form: the limits are
//! kept as JSON values so that a limit of the wrong runtime type is still
//! representable and can be reported with its actual type name, the way the
//! API surfaces it to clients. [`validate`] enforces the invariants in a
//! fixed priority order before any query executes, and emits one warning
//! log line per rejection.

use serde_json::Value;
use tracing::warn;

use crate::error::{ArgSet, MAX_PAGE_SIZE, ValidationError};
use crate::metrics::record_validation_failure;

// =============================================================================
// Arguments
// =============================================================================

/// Raw, unvalidated pagination arguments.
///
/// Exactly one of `first`/`last` must be set; `after`/`before` are optional
/// opaque cursors and may be combined with either limit.
#[derive(Debug, Clone, Default)]
pub struct PageArgs {
    /// Requested page size when paging forward.
    pub first: Option<Value>,
    /// Requested page size when paging backward.
    pub last: Option<Value>,
    /// Exclusive lower boundary cursor.
    pub after: Option<String>,
    /// Exclusive upper boundary cursor.
    pub before: Option<String>,
}

impl PageArgs {
    /// Forward window of `n` records.
    pub fn first(n: i64) -> Self {
        Self {
            first: Some(Value::from(n)),
            ..Default::default()
        }
    }

    /// Backward window of `n` records.
    pub fn last(n: i64) -> Self {
        Self {
            last: Some(Value::from(n)),
            ..Default::default()
        }
    }

    /// Set the exclusive lower boundary cursor.
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Set the exclusive upper boundary cursor.
    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

// =============================================================================
// Validated Window
// =============================================================================

/// Which end of the ordered set the window anchors at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAnchor {
    /// `first`: the window grows from the start.
    Start,
    /// `last`: the window grows from the end.
    End,
}

/// A validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Requested page size, `0..=MAX_PAGE_SIZE`.
    pub limit: u32,
    /// Which end of the ordered set the window anchors at.
    pub anchor: WindowAnchor,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate pagination arguments for the named connection.
///
/// Rules are evaluated in fixed order, first failure wins:
/// both limits, no limit, limit not a number, limit below zero, limit above
/// [`MAX_PAGE_SIZE`]. A rejection logs one warning identifying the
/// connection and the offending arguments, then propagates.
pub fn validate(connection: &str, args: &PageArgs) -> Result<PageWindow, ValidationError> {
    match check(connection, args) {
        Ok(window) => Ok(window),
        Err(err) => {
            record_validation_failure(connection);
            warn!(
                connection = connection,
                first = ?args.first,
                last = ?args.last,
                error = %err,
                "rejected pagination arguments"
            );
            Err(err)
        }
    }
}

fn check(connection: &str, args: &PageArgs) -> Result<PageWindow, ValidationError> {
    match (&args.first, &args.last) {
        (Some(_), Some(_)) => Err(ValidationError::BothLimitsSupplied {
            connection: connection.to_string(),
        }),
        (None, None) => Err(ValidationError::NoLimitSupplied {
            connection: connection.to_string(),
        }),
        (Some(value), None) => Ok(PageWindow {
            limit: check_limit(connection, ArgSet::First, value)?,
            anchor: WindowAnchor::Start,
        }),
        (None, Some(value)) => Ok(PageWindow {
            limit: check_limit(connection, ArgSet::Last, value)?,
            anchor: WindowAnchor::End,
        }),
    }
}

fn check_limit(connection: &str, arg: ArgSet, value: &Value) -> Result<u32, ValidationError> {
    let amount = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            // Integers beyond i64 are necessarily above the maximum; report
            // them as such rather than as a type error.
            None if n.as_u64().is_some() => {
                return Err(ValidationError::LimitAboveMaximum {
                    connection: connection.to_string(),
                    arg,
                    requested: n.to_string(),
                    max: MAX_PAGE_SIZE,
                });
            }
            None => {
                return Err(ValidationError::LimitNotANumber {
                    connection: connection.to_string(),
                    arg,
                    type_name: "float",
                });
            }
        },
        other => {
            return Err(ValidationError::LimitNotANumber {
                connection: connection.to_string(),
                arg,
                type_name: json_type_name(other),
            });
        }
    };

    if amount < 0 {
        return Err(ValidationError::LimitBelowZero {
            connection: connection.to_string(),
            arg,
        });
    }
    if amount > MAX_PAGE_SIZE as i64 {
        return Err(ValidationError::LimitAboveMaximum {
            connection: connection.to_string(),
            arg,
            requested: amount.to_string(),
            max: MAX_PAGE_SIZE,
        });
    }

    Ok(amount as u32)
}

/// Runtime type name of a JSON value, as surfaced in error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(first: Option<Value>, last: Option<Value>) -> PageArgs {
        PageArgs {
            first,
            last,
            ..Default::default()
        }
    }

    #[test]
    fn both_limits_rejected_first() {
        // Priorité des règles: both l'emporte même si les valeurs sont absurdes
        let err = validate("Domain", &args(Some(json!("x")), Some(json!(-1)))).unwrap_err();
        assert!(matches!(err, ValidationError::BothLimitsSupplied { .. }));
        assert_eq!(
            err.to_string(),
            "Requesting both `first` and `last` to paginate the `Domain` connection is not supported."
        );
    }

    #[test]
    fn missing_limits_rejected() {
        let err = validate("Domain", &args(None, None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must provide a `first` or `last` value to properly paginate the `Domain` connection."
        );
    }

    #[test]
    fn non_numeric_limits_carry_the_runtime_type() {
        let cases = [
            (json!("5"), "string"),
            (json!(true), "boolean"),
            (json!(null), "null"),
            (json!([5]), "array"),
            (json!({"n": 5}), "object"),
            (json!(2.5), "float"),
        ];
        for (value, expected) in cases {
            let err = validate("HTTPS", &args(Some(value), None)).unwrap_err();
            match err {
                ValidationError::LimitNotANumber {
                    arg, type_name, ..
                } => {
                    assert_eq!(arg, ArgSet::First);
                    assert_eq!(type_name, expected);
                }
                other => panic!("expected LimitNotANumber, got {:?}", other),
            }
        }
    }

    #[test]
    fn negative_limit_rejected_with_exact_message() {
        let err = validate("VerifiedDomain", &args(Some(json!(-5)), None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`first` on the `VerifiedDomain` connection cannot be less than zero."
        );
    }

    #[test]
    fn limit_above_maximum_names_both_amounts() {
        let err = validate("Domain", &args(None, Some(json!(101)))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requesting `101` records on the `Domain` connection exceeds the `last` limit of `100` records."
        );
    }

    #[test]
    fn huge_limit_is_above_maximum_not_a_type_error() {
        let err = validate("Domain", &args(Some(json!(u64::MAX)), None)).unwrap_err();
        assert!(matches!(err, ValidationError::LimitAboveMaximum { .. }));
    }

    #[test]
    fn in_range_limits_pass() {
        let window = validate("Domain", &args(Some(json!(0)), None)).unwrap();
        assert_eq!(window.limit, 0);
        assert_eq!(window.anchor, WindowAnchor::Start);

        let window = validate("Domain", &args(Some(json!(100)), None)).unwrap();
        assert_eq!(window.limit, 100);

        let window = validate("Domain", &args(None, Some(json!(20)))).unwrap();
        assert_eq!(window.limit, 20);
        assert_eq!(window.anchor, WindowAnchor::End);
    }

    #[test]
    fn builder_helpers_set_cursors() {
        let args = PageArgs::first(10).after("abc").before("def");
        assert_eq!(args.after.as_deref(), Some("abc"));
        assert_eq!(args.before.as_deref(), Some("def"));
        assert!(args.last.is_none());
    }
}
