use aws_sdk_cognitoidentityprovider::error::ProvideErrorMetadata;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct EmailRequest {
    email: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: i32,
}

/// The fixed set of user-facing sign-in failure categories. Anything the
/// identity service reports collapses into one of these; retry is always
/// manual resubmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCategory {
    BadCredentials,
    MalformedEmail,
    RateLimited,
    Unknown,
}

impl AuthCategory {
    pub fn status(self) -> StatusCode {
        match self {
            AuthCategory::BadCredentials => StatusCode::UNAUTHORIZED,
            AuthCategory::MalformedEmail => StatusCode::BAD_REQUEST,
            AuthCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AuthCategory::BadCredentials => {
                "Incorrect username or password. Please check your details."
            }
            AuthCategory::MalformedEmail => "The email address format is invalid.",
            AuthCategory::RateLimited => "Too many attempts. Please try again later.",
            AuthCategory::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Map a Cognito service error code onto the fixed category set.
pub fn category_for(code: Option<&str>) -> AuthCategory {
    match code {
        Some("NotAuthorizedException") | Some("UserNotFoundException") => {
            AuthCategory::BadCredentials
        }
        Some("InvalidParameterException") | Some("InvalidPasswordException") => {
            AuthCategory::MalformedEmail
        }
        Some("TooManyRequestsException") | Some("LimitExceededException") => {
            AuthCategory::RateLimited
        }
        _ => AuthCategory::Unknown,
    }
}

/// Cognito's SECRET_HASH: HMAC-SHA256 of username + client id, keyed by
/// the client secret.
fn secret_hash(username: &str, client_id: &str, client_secret: &str) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| Error::from(format!("invalid client secret: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Handle POST /login
pub async fn login(
    cognito: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CredentialsRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let result = cognito
        .initiate_auth()
        .client_id(client_id)
        .auth_flow(AuthFlowType::UserPasswordAuth)
        .auth_parameters("USERNAME", &req.email)
        .auth_parameters("PASSWORD", &req.password)
        .auth_parameters("SECRET_HASH", secret_hash(&req.email, client_id, client_secret)?)
        .send()
        .await;

    match result {
        Ok(output) => {
            let tokens = match output.authentication_result() {
                Some(auth) => TokenResponse {
                    access_token: auth.access_token().unwrap_or_default().to_string(),
                    id_token: auth.id_token().map(|t| t.to_string()),
                    refresh_token: auth.refresh_token().map(|t| t.to_string()),
                    expires_in: auth.expires_in(),
                },
                None => return category_response(AuthCategory::Unknown),
            };
            tracing::info!("Sign-in succeeded");
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(serde_json::to_string(&tokens)?.into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            let category = category_for(e.code());
            tracing::warn!("Sign-in failed: {:?} ({:?})", category, e.code());
            category_response(category)
        }
    }
}

/// Handle POST /signup
pub async fn signup(
    cognito: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CredentialsRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let email_attr = AttributeType::builder()
        .name("email")
        .value(&req.email)
        .build()
        .map_err(Box::new)?;

    let result = cognito
        .sign_up()
        .client_id(client_id)
        .secret_hash(secret_hash(&req.email, client_id, client_secret)?)
        .username(&req.email)
        .password(&req.password)
        .user_attributes(email_attr)
        .send()
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Sign-up succeeded");
            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("Content-Type", "application/json")
                .body(serde_json::json!({"message": "ok"}).to_string().into())
                .map_err(Box::new)?)
        }
        Err(e) => {
            let category = category_for(e.code());
            tracing::warn!("Sign-up failed: {:?} ({:?})", category, e.code());
            category_response(category)
        }
    }
}

/// Handle POST /reset-password
pub async fn reset_password(
    cognito: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: EmailRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let result = cognito
        .forgot_password()
        .client_id(client_id)
        .secret_hash(secret_hash(&req.email, client_id, client_secret)?)
        .username(&req.email)
        .send()
        .await;

    match result {
        // Deliberately the same response whether or not the account
        // exists; the mail only goes out for registered addresses.
        Ok(_) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(
                serde_json::json!({"message": "If this address is registered, a reset link is on its way."})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?),
        Err(e) => {
            let category = category_for(e.code());
            if category == AuthCategory::BadCredentials {
                return Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "application/json")
                    .body(
                        serde_json::json!({"message": "If this address is registered, a reset link is on its way."})
                            .to_string()
                            .into(),
                    )
                    .map_err(Box::new)?);
            }
            tracing::warn!("Password reset failed: {:?} ({:?})", category, e.code());
            category_response(category)
        }
    }
}

/// Resolve the bearer token to the signed-in user's email, then check it
/// against the server-held admin allow-list. Returns the email for
/// logging, or a ready-made 401/403 response.
pub async fn require_admin(
    cognito: &CognitoClient,
    dynamo: &DynamoClient,
    table_name: &str,
    auth_header: Option<&str>,
) -> Result<String, Response<Body>> {
    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        _ => return Err(unauthorized("Missing bearer token")),
    };

    let user = match cognito.get_user().access_token(token).send().await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Token rejected: {:?}", e.code());
            return Err(unauthorized("Invalid or expired token"));
        }
    };

    let email = user
        .user_attributes()
        .iter()
        .find(|a| a.name() == "email")
        .and_then(|a| a.value())
        .map(|v| v.to_string());

    let email = match email {
        Some(email) => email,
        None => return Err(unauthorized("Account has no email attribute")),
    };

    match is_admin_email(dynamo, table_name, &email).await {
        Ok(true) => Ok(email),
        Ok(false) => {
            tracing::warn!("Non-admin {} hit an admin route", email);
            Err(forbidden())
        }
        Err(e) => {
            tracing::error!("Admin lookup failed: {}", e);
            Err(forbidden())
        }
    }
}

/// Admin status is a membership test against the allow-list document,
/// looked up fresh on every call.
pub async fn is_admin_email(
    dynamo: &DynamoClient,
    table_name: &str,
    email: &str,
) -> Result<bool, Error> {
    let result = dynamo
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S("SETTINGS".to_string()))
        .key("SK", AttributeValue::S("ADMINS".to_string()))
        .send()
        .await
        .map_err(|e| Error::from(format!("DynamoDB get_item error: {}", e)))?;

    let Some(item) = result.item() else {
        return Ok(false);
    };

    let allowed = match item.get("allowed_emails") {
        Some(AttributeValue::Ss(emails)) => emails.iter().any(|e| e == email),
        Some(AttributeValue::L(list)) => list
            .iter()
            .filter_map(|v| v.as_s().ok())
            .any(|e| e == email),
        _ => false,
    };
    Ok(allowed)
}

fn category_response(category: AuthCategory) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(category.status())
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": category.message()}).to_string().into())
        .map_err(Box::new)?)
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn unauthorized(message: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": message}).to_string().into())
        .unwrap_or_else(|_| Response::new(Body::Empty))
}

fn forbidden() -> Response<Body> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Admin access required"}).to_string().into())
        .unwrap_or_else(|_| Response::new(Body::Empty))
}
