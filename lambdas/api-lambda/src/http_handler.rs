use bloomcart_atoms as atoms;
use bloomcart_shared::{auth, AppState};
use lambda_http::{
    http::{header::HeaderValue, Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::env;
use std::sync::Arc;

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

/// Main Lambda handler - routes requests to auth, catalog and media endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    // Auth endpoints (no token required)
    if path.starts_with("/login")
        || path.starts_with("/signup")
        || path.starts_with("/reset-password")
    {
        let client_id = env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
        let client_secret =
            env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");

        if method != &Method::POST {
            return finalize_response(method_not_allowed());
        }

        let resp = if path.starts_with("/login") {
            auth::login(&state.cognito_client, &client_id, &client_secret, body).await
        } else if path.starts_with("/signup") {
            auth::signup(&state.cognito_client, &client_id, &client_secret, body).await
        } else {
            auth::reset_password(&state.cognito_client, &client_id, &client_secret, body).await
        };
        return finalize_response(resp);
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "bloomcart".to_string());
    let bucket_name = env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "bloomcart-media".to_string());
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // --- PUBLIC STOREFRONT READS ---
        // GET /products?categories=a,b&sort=price_asc&page=1
        (&Method::GET, ["products"]) => {
            let params = event.query_string_parameters_ref();
            atoms::products::list_products_handler(
                &state.dynamo_client,
                &table_name,
                params.and_then(|p| p.first("categories")),
                params.and_then(|p| p.first("sort")),
                params.and_then(|p| p.first("page")),
            )
            .await
        }
        // GET /products/{id}
        (&Method::GET, ["products", product_id]) => {
            atoms::products::get_product_handler(&state.dynamo_client, &table_name, product_id)
                .await
        }
        // GET /info-cards[?active=true]
        (&Method::GET, ["info-cards"]) => {
            let active_only = event
                .query_string_parameters_ref()
                .and_then(|p| p.first("active"))
                .map(|v| v == "true")
                .unwrap_or(false);
            atoms::info_cards::list_info_cards_handler(&state.dynamo_client, &table_name, active_only)
                .await
        }
        // GET /categories
        (&Method::GET, ["categories"]) => {
            atoms::categories::list_categories_handler(&state.dynamo_client, &table_name).await
        }

        // --- ADMIN: catalog and media mutations ---
        (&Method::POST, ["products"])
        | (&Method::PATCH, ["products", _])
        | (&Method::PATCH, ["products", _, "activity"])
        | (&Method::DELETE, ["products", _])
        | (&Method::PUT, ["info-cards"])
        | (&Method::POST, ["uploads"]) => {
            let auth_header = event
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok());
            let admin_email = match auth::require_admin(
                &state.cognito_client,
                &state.dynamo_client,
                &table_name,
                auth_header,
            )
            .await
            {
                Ok(email) => email,
                Err(resp) => return Ok(with_cors_headers(resp)),
            };
            tracing::info!("Admin {} - {} {}", admin_email, method, path);

            match (method, parts.as_slice()) {
                // POST /products - create from the form draft + pending files
                (&Method::POST, ["products"]) => {
                    atoms::products::save_product_handler(
                        &state.dynamo_client,
                        &state.s3_client,
                        &table_name,
                        &bucket_name,
                        None,
                        body,
                    )
                    .await
                }
                // PATCH /products/{id}/activity - flip storefront visibility
                (&Method::PATCH, ["products", product_id, "activity"]) => {
                    atoms::products::toggle_product_activity_handler(
                        &state.dynamo_client,
                        &table_name,
                        product_id,
                    )
                    .await
                }
                // PATCH /products/{id} - update in place via the same sequencer
                (&Method::PATCH, ["products", product_id]) => {
                    atoms::products::save_product_handler(
                        &state.dynamo_client,
                        &state.s3_client,
                        &table_name,
                        &bucket_name,
                        Some(product_id),
                        body,
                    )
                    .await
                }
                // DELETE /products/{id}
                (&Method::DELETE, ["products", product_id]) => {
                    atoms::products::delete_product_handler(
                        &state.dynamo_client,
                        &table_name,
                        product_id,
                    )
                    .await
                }
                // PUT /info-cards - all-or-nothing batch save of the card list
                (&Method::PUT, ["info-cards"]) => {
                    atoms::info_cards::sync_info_cards_handler(
                        &state.dynamo_client,
                        &state.s3_client,
                        &table_name,
                        &bucket_name,
                        body,
                    )
                    .await
                }
                // POST /uploads - standalone image upload
                (&Method::POST, ["uploads"]) => {
                    let uploader =
                        atoms::media::S3ImageUploader::new(state.s3_client.clone(), &bucket_name);
                    atoms::media::upload_handler(&uploader, body).await
                }
                _ => not_found(),
            }
        }

        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    };

    finalize_response(resp)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
