//! JSON body extractor with field validation
//!
//! Rejections become 400 `ValidationFailed` with user-level messages; serde
//! and type names never reach the client.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use shared::error::AppError;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// JSON body with sanitized rejections, for payloads checked by hand
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(rejection_message(&e)))?;
        Ok(JsonBody(value))
    }
}

/// JSON body run through `validator` rules
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(validation_error)?;
        Ok(ValidJson(value))
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            let text = e.body_text();
            match text
                .split("missing field `")
                .nth(1)
                .and_then(|rest| rest.split('`').next())
            {
                Some(field) => format!("{field} is required"),
                None => "request body has invalid field values".to_string(),
            }
        }
        JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "expected Content-Type: application/json".to_string()
        }
        _ => "invalid request body".to_string(),
    }
}

/// Collapse `validator` errors into one 400
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let fields: BTreeMap<String, String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            (field.to_string(), message)
        })
        .collect();
    fields_error(fields)
}

/// First message (by field name) becomes the error text; all go in details
pub fn fields_error(fields: BTreeMap<String, String>) -> AppError {
    let headline = fields
        .values()
        .next()
        .cloned()
        .unwrap_or_else(|| "invalid request".to_string());
    fields
        .into_iter()
        .fold(AppError::validation(headline), |err, (field, message)| {
            err.with_detail(field, message)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;
    use shared::error::ErrorCode;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(email(message = "email must be a valid address"))]
        email: String,
        #[validate(length(min = 8, message = "password must be at least 8 characters"))]
        password: String,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidJson(s) = ValidJson::<Signup>::from_request(
            request(r#"{"email":"a@example.com","password":"longenough"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(s.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_field_messages_are_user_level() {
        let Err(err) = ValidJson::<Signup>::from_request(
            request(r#"{"email":"nope","password":"short"}"#),
            &(),
        )
        .await
        else {
            panic!("expected rejection");
        };
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "email must be a valid address");
        let details = err.details.unwrap();
        assert_eq!(details["password"], "password must be at least 8 characters");
    }

    #[tokio::test]
    async fn test_missing_field_hides_type_names() {
        let Err(err) =
            ValidJson::<Signup>::from_request(request(r#"{"email":"a@example.com"}"#), &()).await
        else {
            panic!("expected rejection");
        };
        assert_eq!(err.message, "password is required");
        assert!(!err.message.contains("Signup"));

        let Err(err) = ValidJson::<Signup>::from_request(request("{not json"), &()).await else {
            panic!("expected rejection");
        };
        assert_eq!(err.message, "request body is not valid JSON");
    }

    #[test]
    fn test_fields_error_headline_and_details() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), "name is required".to_string());
        fields.insert(
            "cost_price".to_string(),
            "cost_price must be at least 0.01".to_string(),
        );
        let err = fields_error(fields);
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "cost_price must be at least 0.01");
        assert_eq!(err.details.unwrap().len(), 2);
    }
}
