pub mod auth;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;

/// AWS clients shared across handler invocations. Built once at cold
/// start; the domain layer takes these as arguments.
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub s3_client: S3Client,
    pub cognito_client: CognitoClient,
}

impl AppState {
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            dynamo_client: DynamoClient::new(&config),
            s3_client: S3Client::new(&config),
            cognito_client: CognitoClient::new(&config),
        }
    }
}
