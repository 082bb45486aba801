//! Minimal AWS JSON 1.1 client with Signature Version 4 request signing.

use std::env;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use naturetalk_core::SecretSourceError;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Clone, Debug)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: SecretString) -> Self {
        Self { access_key_id: access_key_id.into(), secret_access_key, session_token: None }
    }

    pub fn with_session_token(mut self, session_token: SecretString) -> Self {
        self.session_token = Some(session_token);
        self
    }

    /// Reads the standard `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// optional `AWS_SESSION_TOKEN` variables.
    pub fn from_env() -> Option<Self> {
        let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")?;
        let credentials = Self::new(access_key_id, SecretString::from(secret_access_key));

        Some(match non_empty_env("AWS_SESSION_TOKEN") {
            Some(token) => credentials.with_session_token(SecretString::from(token)),
            None => credentials,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AwsService {
    pub signing_name: &'static str,
    pub target_prefix: &'static str,
}

pub const PARAMETER_STORE: AwsService =
    AwsService { signing_name: "ssm", target_prefix: "AmazonSSM" };
pub const SECRETS_MANAGER: AwsService =
    AwsService { signing_name: "secretsmanager", target_prefix: "secretsmanager" };

/// The parts of a JSON 1.1 request that go into its signature.
pub struct JsonRequest<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub target: &'a str,
    pub body: &'a [u8],
}

pub struct RequestSigner<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
}

impl RequestSigner<'_> {
    /// Headers to add to `request` so AWS accepts it: `x-amz-date`,
    /// `authorization` and, for temporary credentials, `x-amz-security-token`.
    pub fn sign(&self, request: &JsonRequest<'_>, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let session_token =
            self.credentials.session_token.as_ref().map(|token| token.expose_secret().to_owned());

        // Canonical headers must be sorted by name.
        let mut canonical_headers = vec![
            ("content-type", CONTENT_TYPE.to_owned()),
            ("host", request.host.to_owned()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &session_token {
            canonical_headers.push(("x-amz-security-token", token.clone()));
        }
        canonical_headers.push(("x-amz-target", request.target.to_owned()));

        let header_block: String = canonical_headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_headers =
            canonical_headers.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "POST\n{}\n\n{header_block}\n{signed_headers}\n{}",
            request.path,
            sha256_hex(request.body)
        );
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let key = signing_key(
            self.credentials.secret_access_key.expose_secret(),
            &date,
            self.region,
            self.service,
        );
        let signature = encode_hex(&hmac_sha256(&key, string_to_sign.as_bytes()));
        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key_id
        );

        let mut headers = vec![("x-amz-date", amz_date), ("authorization", authorization)];
        if let Some(token) = session_token {
            headers.push(("x-amz-security-token", token));
        }
        headers
    }
}

pub struct AwsJsonClient {
    http: reqwest::Client,
    service: AwsService,
    region: String,
    endpoint: String,
    credentials: Option<AwsCredentials>,
}

impl AwsJsonClient {
    pub fn new(
        service: AwsService,
        region: impl Into<String>,
        credentials: Option<AwsCredentials>,
    ) -> Self {
        let region = region.into();
        let endpoint = format!("https://{}.{region}.amazonaws.com/", service.signing_name);
        Self { http: reqwest::Client::new(), service, region, endpoint, credentials }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        payload: &Value,
    ) -> Result<T, SecretSourceError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SecretSourceError::NotConfigured("AWS credentials are not set".to_owned())
        })?;
        let url = reqwest::Url::parse(&self.endpoint).map_err(|error| {
            SecretSourceError::NotConfigured(format!("invalid endpoint `{}`: {error}", self.endpoint))
        })?;
        let host = host_header(&url).ok_or_else(|| {
            SecretSourceError::NotConfigured(format!("endpoint `{}` has no host", self.endpoint))
        })?;
        let path = url.path().to_owned();
        let body = serde_json::to_vec(payload)
            .map_err(|error| SecretSourceError::Decode(error.to_string()))?;
        let target = format!("{}.{operation}", self.service.target_prefix);

        let signer = RequestSigner {
            credentials,
            region: &self.region,
            service: self.service.signing_name,
        };
        let signed = signer.sign(
            &JsonRequest { host: &host, path: &path, target: &target, body: &body },
            Utc::now(),
        );

        let mut request = self
            .http
            .post(url)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|error| SecretSourceError::Transport(error.to_string()))?;
        let status = response.status();
        let text =
            response.text().await.map_err(|error| SecretSourceError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(SecretSourceError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|error| SecretSourceError::Decode(error.to_string()))
    }
}

fn host_header(url: &reqwest::Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// AWS error bodies carry `__type` and a `message` (or `Message`) field.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.chars().take(200).collect();
    };

    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    match value.get("__type").and_then(Value::as_str) {
        Some(kind) if message.is_empty() => kind.to_owned(),
        Some(kind) => format!("{kind}: {message}"),
        None => message.to_owned(),
    }
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Sha256::digest(payload).to_vec(),
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(payload: &[u8]) -> String {
    encode_hex(Sha256::digest(payload).as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;

    use super::{
        encode_hex, error_message, host_header, sha256_hex, signing_key, AwsCredentials,
        JsonRequest, RequestSigner,
    };

    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2015-08-30T12:36:00Z").expect("timestamp").with_timezone(&Utc)
    }

    fn credentials() -> AwsCredentials {
        AwsCredentials::new("AKIDEXAMPLE", SecretString::from(EXAMPLE_SECRET.to_owned()))
    }

    fn request(body: &[u8]) -> JsonRequest<'_> {
        JsonRequest {
            host: "ssm.ap-northeast-1.amazonaws.com",
            path: "/",
            target: "AmazonSSM.GetParameter",
            body,
        }
    }

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }

    #[test]
    fn signing_key_matches_published_derivation() {
        let key = signing_key(EXAMPLE_SECRET, "20150830", "us-east-1", "iam");
        assert_eq!(
            encode_hex(&key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn empty_payload_hash_is_well_known() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn authorization_carries_scope_and_signed_headers() {
        let creds = credentials();
        let signer =
            RequestSigner { credentials: &creds, region: "ap-northeast-1", service: "ssm" };

        let headers = signer.sign(&request(br#"{"Name":"/key"}"#), fixed_time());

        assert_eq!(header(&headers, "x-amz-date"), Some("20150830T123600Z"));
        let authorization = header(&headers, "authorization").expect("authorization");
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/ap-northeast-1/ssm/aws4_request, "
        ));
        assert!(authorization.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target, "));
        let signature = authorization.rsplit("Signature=").next().expect("signature");
        assert_eq!(signature.len(), 64);
        assert!(header(&headers, "x-amz-security-token").is_none());
    }

    #[test]
    fn signature_depends_on_body_and_is_deterministic() {
        let creds = credentials();
        let signer =
            RequestSigner { credentials: &creds, region: "ap-northeast-1", service: "ssm" };

        let first = signer.sign(&request(b"{}"), fixed_time());
        let again = signer.sign(&request(b"{}"), fixed_time());
        let other = signer.sign(&request(b"{\"Name\":\"x\"}"), fixed_time());

        assert_eq!(first, again);
        assert_ne!(header(&first, "authorization"), header(&other, "authorization"));
    }

    #[test]
    fn session_token_is_signed_and_sent() {
        let creds = credentials().with_session_token(SecretString::from("token-1".to_owned()));
        let signer =
            RequestSigner { credentials: &creds, region: "ap-northeast-1", service: "ssm" };

        let headers = signer.sign(&request(b"{}"), fixed_time());

        assert_eq!(header(&headers, "x-amz-security-token"), Some("token-1"));
        assert!(header(&headers, "authorization").expect("authorization").contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"
        ));
    }

    #[test]
    fn host_header_keeps_non_default_port() {
        let local = reqwest::Url::parse("http://127.0.0.1:4566/").expect("url");
        let remote = reqwest::Url::parse("https://ssm.ap-northeast-1.amazonaws.com/").expect("url");

        assert_eq!(host_header(&local).as_deref(), Some("127.0.0.1:4566"));
        assert_eq!(host_header(&remote).as_deref(), Some("ssm.ap-northeast-1.amazonaws.com"));
    }

    #[test]
    fn error_message_reads_aws_error_shapes() {
        assert_eq!(
            error_message(r#"{"__type":"ParameterNotFound","message":"no such parameter"}"#),
            "ParameterNotFound: no such parameter"
        );
        assert_eq!(
            error_message(r#"{"__type":"AccessDeniedException","Message":"denied"}"#),
            "AccessDeniedException: denied"
        );
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }
}
