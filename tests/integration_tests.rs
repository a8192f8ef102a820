use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use idc_bearer_exchange::broker::{BrokerResponse, IdentityBroker, JwtBearerGrant};
use idc_bearer_exchange::error::Result;
use idc_bearer_exchange::sts::{AssumeRoleRequest, RoleAssumer};
use idc_bearer_exchange::{
    ErrorKind, ExchangeConfig, ExchangeError, ExchangePipeline, ExchangeRequest, ExchangeResponse,
    Stage, TemporaryCredentials,
};

const APP_ARN: &str = "arn:aws:sso::111122223333:application/ssoins-7223/apl-4b1e";
const ROLE_ARN: &str = "arn:aws:iam::111122223333:role/IdentityBearerRole";

fn config() -> ExchangeConfig {
    ExchangeConfig::from_lookup(|key| match key {
        "REGION" => Some("us-east-2".to_string()),
        "IDP_APP_ARN" => Some(APP_ARN.to_string()),
        "IDENTITY_BEARER_ROLE_ARN" => Some(ROLE_ARN.to_string()),
        _ => None,
    })
    .expect("test configuration is complete")
}

fn jwt(payload: &str) -> String {
    format!(
        "{}.{}.c2ln",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

fn external_token() -> String {
    jwt(r#"{"iss":"https://idp.example.com","sub":"user-42","aud":"client"}"#)
}

fn broker_token_with_context() -> String {
    jwt(r#"{"sub":"user-42","sts:identity_context":"AQoJb3JpZ2luX2VjEJr"}"#)
}

fn sts_credentials() -> TemporaryCredentials {
    TemporaryCredentials::new(
        "ASIAQEXAMPLE7Q",
        "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
        "IQoJb3JpZ2luX2VjEJr//////////wEaCXVzLWVhc3QtMiJH",
        "2026-10-19T12:15:00Z",
    )
}

#[derive(Clone)]
struct FakeBroker {
    id_token: Option<String>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    assertions: Arc<Mutex<Vec<String>>>,
}

impl FakeBroker {
    fn issuing(id_token: Option<String>) -> Self {
        Self {
            id_token,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            assertions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn rejecting() -> Self {
        Self {
            fail: true,
            ..Self::issuing(None)
        }
    }
}

#[async_trait]
impl IdentityBroker for FakeBroker {
    async fn create_token(&self, grant: JwtBearerGrant<'_>) -> Result<BrokerResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(grant.client_id, APP_ARN);
        assert_eq!(grant.grant_type, "urn:ietf:params:oauth:grant-type:jwt-bearer");
        self.assertions
            .lock()
            .unwrap()
            .push(grant.assertion.to_string());

        if self.fail {
            return Err(ExchangeError::BrokerExchangeFailed(
                "InvalidGrantException: assertion could not be validated".to_string(),
            ));
        }
        Ok(BrokerResponse {
            id_token: self.id_token.clone(),
        })
    }
}

#[derive(Clone)]
struct FakeAssumer {
    credentials: Option<TemporaryCredentials>,
    calls: Arc<AtomicUsize>,
    sessions: Arc<Mutex<Vec<(String, i32, String)>>>,
}

impl FakeAssumer {
    fn returning(credentials: Option<TemporaryCredentials>) -> Self {
        Self {
            credentials,
            calls: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl RoleAssumer for FakeAssumer {
    async fn assume(&self, request: AssumeRoleRequest<'_>) -> Result<Option<TemporaryCredentials>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.role_arn, ROLE_ARN);
        assert_eq!(
            request.provider_arn,
            "arn:aws:iam::aws:contextProvider/IdentityCenter"
        );
        self.sessions.lock().unwrap().push((
            request.session_name.to_string(),
            request.duration_seconds,
            request.context_assertion.as_str().to_string(),
        ));
        Ok(self.credentials.clone())
    }
}

fn error_details(response: &ExchangeResponse) -> String {
    let json: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["body"]["message"], "Error processing request");
    json["body"]["details"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_malformed_token_makes_no_network_calls() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());

    let response = pipeline.handle_json(r#"{"idToken":"not-a-jwt"}"#).await;

    let details = error_details(&response);
    assert!(details.starts_with("InvalidInput"));
    assert!(!details.contains("not-a-jwt"));
    assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_request_documents_fail_closed() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());

    for raw in ["", "{}", r#"{"token":"x"}"#, r#"{"idToken":null}"#, "[]"] {
        let response = pipeline.handle_json(raw).await;
        assert!(error_details(&response).starts_with("InvalidInput"));
    }
    assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_broker_without_token_stops_before_role_assumption() {
    let broker = FakeBroker::issuing(None);
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());

    let outcome = pipeline.run(&ExchangeRequest::new(external_token())).await;

    assert_eq!(outcome.stage(), Stage::Failed(ErrorKind::BrokerExchangeFailed));
    assert_eq!(outcome.reached, Stage::Validated);
    assert_eq!(broker.calls.load(Ordering::SeqCst), 1);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_broker_rejection_is_reported_without_token_material() {
    let broker = FakeBroker::rejecting();
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());
    let token = external_token();

    let response = pipeline.handle(&ExchangeRequest::new(token.clone())).await;

    let details = error_details(&response);
    assert!(details.starts_with("BrokerExchangeFailed"));
    assert!(details.contains("InvalidGrantException"));
    assert!(!details.contains(&token));
    assert_eq!(broker.calls.load(Ordering::SeqCst), 1);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_identity_context_stops_before_role_assumption() {
    let broker = FakeBroker::issuing(Some(jwt(r#"{"sub":"user-42","aud":"apl-4b1e"}"#)));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());

    let outcome = pipeline.run(&ExchangeRequest::new(external_token())).await;

    assert_eq!(
        outcome.stage(),
        Stage::Failed(ErrorKind::MissingIdentityContext)
    );
    assert_eq!(outcome.reached, Stage::Exchanged);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_undecodable_broker_token_is_missing_context() {
    let broker = FakeBroker::issuing(Some("opaque-access-token".to_string()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker, assumer.clone());

    let outcome = pipeline.run(&ExchangeRequest::new(external_token())).await;

    assert_eq!(
        outcome.stage(),
        Stage::Failed(ErrorKind::MissingIdentityContext)
    );
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_credentials_is_role_assumption_failure() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(None);
    let pipeline = ExchangePipeline::new(config(), broker, assumer.clone());

    let outcome = pipeline.run(&ExchangeRequest::new(external_token())).await;

    assert_eq!(outcome.stage(), Stage::Failed(ErrorKind::RoleAssumptionFailed));
    assert_eq!(outcome.reached, Stage::ContextExtracted);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_full_exchange_returns_credentials_verbatim() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());
    let token = external_token();

    let outcome = pipeline.run(&ExchangeRequest::new(token.clone())).await;
    assert_eq!(outcome.stage(), Stage::Succeeded);
    assert_eq!(outcome.reached, Stage::Assumed);
    assert_eq!(outcome.result.unwrap(), sts_credentials());

    // The external token goes only to the broker; the context only to STS.
    assert_eq!(*broker.assertions.lock().unwrap(), vec![token]);
    let sessions = assumer.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        sessions[0],
        (
            "IdentityBearerRoleSession".to_string(),
            900,
            "AQoJb3JpZ2luX2VjEJr".to_string()
        )
    );
}

#[tokio::test]
async fn test_success_response_body() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker, assumer);

    let raw = format!(r#"{{"arguments":{{"idToken":"{}"}}}}"#, external_token());
    let response = pipeline.handle_json(&raw).await;

    assert!(response.is_success());
    assert_eq!(
        response.to_json().unwrap(),
        concat!(
            r#"{"AccessKeyId":"ASIAQEXAMPLE7Q","#,
            r#""SecretAccessKey":"wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY","#,
            r#""SessionToken":"IQoJb3JpZ2luX2VjEJr//////////wEaCXVzLWVhc3QtMiJH","#,
            r#""Expiration":"2026-10-19T12:15:00Z"}"#
        )
    );
}

#[tokio::test]
async fn test_each_request_is_a_fresh_exchange() {
    let broker = FakeBroker::issuing(Some(broker_token_with_context()));
    let assumer = FakeAssumer::returning(Some(sts_credentials()));
    let pipeline = ExchangePipeline::new(config(), broker.clone(), assumer.clone());
    let request = ExchangeRequest::new(external_token());

    for _ in 0..3 {
        pipeline.exchange(&request).await.unwrap();
    }

    assert_eq!(broker.calls.load(Ordering::SeqCst), 3);
    assert_eq!(assumer.calls.load(Ordering::SeqCst), 3);
    let sessions = assumer.sessions.lock().unwrap();
    assert!(
        sessions
            .iter()
            .all(|(name, secs, _)| name == "IdentityBearerRoleSession" && *secs == 900)
    );
}
