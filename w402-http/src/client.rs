//! The payment orchestrator.
//!
//! [`PaymentClient`] drives one payment attempt end to end: issue the
//! request, detect the 402 challenge, select an option, validate limits and
//! balance, produce proof of payment, attach best-effort attestation
//! headers, retry, and reconcile the result into a transaction record.
//!
//! The flow is linear and no step re-enters: `Idle → ChallengeReceived →
//! OptionSelected → LimitChecked → BalanceChecked → ProofProduced →
//! Retried → {Succeeded | Failed}`. Failure at any step maps to one
//! [`PaymentError`] variant and then to a structured outcome;
//! [`PaymentClient::execute_payment`] never propagates an error to its
//! caller.

use rand::Rng;
use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use w402::amount::{DEFAULT_DECIMALS, display_amount, parse_base_units};
use w402::audit::{AuditKind, AuditSink, TracingAudit};
use w402::chain::{LedgerClient, PaymentProof, ProofStrategy};
use w402::error::PaymentError;
use w402::history::{MemoryStore, TransactionRecord, TransactionStatus, TransactionStore};
use w402::limits::SpendLimitGuard;
use w402::proto::{PaymentRequired, PaymentRequirements, UnixTimestamp};
use w402::select::select_option;

use crate::attestation::{AttestationHeaders, RequestAttestor};
use crate::headers;
use crate::outcome::{PaymentOutcome, PaymentReceipt};

/// Static configuration for a [`PaymentClient`].
///
/// All state the flow depends on is threaded through this struct and the
/// injected collaborators; nothing is read from ambient process state.
#[derive(Debug, Clone)]
pub struct PaymentClientConfig {
    /// The network the wallet normally operates on (selection preference).
    pub primary_network: String,
    /// Display currency label for records and receipts.
    pub currency: String,
    /// Decimal count assumed when a challenge does not specify one.
    pub default_decimals: u8,
    /// Timeout applied to each HTTP request in the flow.
    pub request_timeout: Duration,
}

impl Default for PaymentClientConfig {
    fn default() -> Self {
        Self {
            primary_network: "base".into(),
            currency: "USDC".into(),
            default_decimals: DEFAULT_DECIMALS,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One resource request that may require payment.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// The resource URL.
    pub url: Url,
    /// The HTTP method.
    pub method: Method,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Optional human description recorded with the transaction.
    pub description: Option<String>,
}

impl PaymentRequest {
    /// A GET request for `url`.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            body: None,
            description: None,
        }
    }

    /// A POST request for `url` with a JSON body.
    #[must_use]
    pub const fn post(url: Url, body: Value) -> Self {
        Self {
            url,
            method: Method::POST,
            body: Some(body),
            description: None,
        }
    }

    /// Attaches a human description for the transaction record.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn service(&self) -> String {
        self.url.host_str().unwrap_or("unknown").to_string()
    }
}

/// Orchestrates x402 payments over HTTP.
///
/// Construct with [`PaymentClient::new`] and the chain-side collaborators,
/// then customize with the `with_*` builders. One client serves any number
/// of sequential or concurrent payment attempts; the spend-limit guard
/// serializes the shared daily counter.
pub struct PaymentClient {
    http: Client,
    config: PaymentClientConfig,
    strategy: Arc<dyn ProofStrategy>,
    ledger: Arc<dyn LedgerClient>,
    guard: Arc<SpendLimitGuard>,
    store: Arc<dyn TransactionStore>,
    audit: Arc<dyn AuditSink>,
    attestor: Option<RequestAttestor>,
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("config", &self.config)
            .field("payer", &self.strategy.payer())
            .field("has_attestor", &self.attestor.is_some())
            .finish_non_exhaustive()
    }
}

impl PaymentClient {
    /// Creates a client with default guard (unlimited), in-memory history,
    /// and tracing audit.
    #[must_use]
    pub fn new(
        config: PaymentClientConfig,
        strategy: Arc<dyn ProofStrategy>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            http: Client::new(),
            config,
            strategy,
            ledger,
            guard: Arc::new(SpendLimitGuard::unlimited()),
            store: Arc::new(MemoryStore::new()),
            audit: Arc::new(TracingAudit),
            attestor: None,
        }
    }

    /// Replaces the spend-limit guard.
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<SpendLimitGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Replaces the transaction store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Enables request attestation.
    #[must_use]
    pub fn with_attestor(mut self, attestor: RequestAttestor) -> Self {
        self.attestor = Some(attestor);
        self
    }

    /// Executes one payment attempt.
    ///
    /// Never returns an error: every failure is folded into a
    /// [`PaymentOutcome`] with `success: false` and a message carrying
    /// enough context for the calling agent to act.
    pub async fn execute_payment(&self, request: PaymentRequest) -> PaymentOutcome {
        match self.try_execute(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(url = %request.url, error = %err, kind = err.kind(), "payment attempt failed");
                if matches!(err, PaymentError::Unexpected(_)) {
                    self.audit
                        .log_action(
                            AuditKind::PaymentError,
                            json!({ "url": request.url.as_str(), "error": err.to_string() }),
                        )
                        .await;
                }
                PaymentOutcome::failure(err.to_string())
            }
        }
    }

    async fn try_execute(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        // Step 1: the free-resource path short-circuits before any
        // limit or balance checks.
        let initial = self
            .send(request, None, None)
            .await
            .map_err(|e| PaymentError::Unexpected(format!("request to {} failed: {e}", request.url)))?;

        if initial.status() != StatusCode::PAYMENT_REQUIRED {
            debug!(url = %request.url, status = %initial.status(), "no payment required");
            let body = read_body(initial).await;
            return Ok(PaymentOutcome::free(body));
        }

        info!(url = %request.url, "received 402 Payment Required");

        // Step 2: parse and validate the challenge.
        let text = initial
            .text()
            .await
            .map_err(|e| PaymentError::InvalidChallenge(format!("unreadable 402 body: {e}")))?;
        let challenge = PaymentRequired::from_json(&text)
            .map_err(|e| PaymentError::InvalidChallenge(e.to_string()))?;
        if challenge.accepts.is_empty() {
            return Err(PaymentError::InvalidChallenge(
                "challenge offered no payment options".into(),
            ));
        }

        // Step 3: deterministic option selection.
        let option = select_option(&challenge.accepts, &self.config.primary_network)
            .ok_or_else(|| PaymentError::NoCompatibleOption("empty option list".into()))?
            .clone();
        debug!(scheme = %option.scheme, network = %option.network, "selected payment option");

        // Step 4: spend-limit check, in display units.
        let decimals = option
            .extra
            .as_ref()
            .and_then(|extra| extra.decimals)
            .unwrap_or(self.config.default_decimals);
        let base_units = parse_base_units(&option.max_amount_required)
            .map_err(|e| PaymentError::InvalidChallenge(e.to_string()))?;
        let amount = display_amount(base_units, decimals)
            .map_err(|e| PaymentError::InvalidChallenge(e.to_string()))?;
        self.guard.check_and_reserve(amount).await?;

        // Step 5: balance check. Not atomic with the transfer; a concurrent
        // spend can still race between here and proof production.
        let payer = self.strategy.payer();
        let balance = match self.ledger.balance_of(&payer).await {
            Ok(balance) => balance,
            Err(e) => {
                self.guard.release(amount).await;
                return Err(PaymentError::Unexpected(format!("balance query failed: {e}")));
            }
        };
        let available = match display_amount(balance.amount, balance.decimals) {
            Ok(available) => available,
            Err(e) => {
                self.guard.release(amount).await;
                return Err(PaymentError::Unexpected(e.to_string()));
            }
        };
        if available < amount {
            self.guard.release(amount).await;
            return Err(PaymentError::InsufficientBalance {
                required: amount,
                available,
                currency: self.config.currency.clone(),
            });
        }

        // Step 6: produce proof. Audit entries bracket the fund movement.
        self.audit
            .log_action(
                AuditKind::PaymentApproved,
                json!({
                    "url": request.url.as_str(),
                    "amount": amount,
                    "payTo": option.pay_to,
                    "network": option.network,
                    "payer": payer,
                }),
            )
            .await;
        let proof = match self.strategy.produce_proof(&option).await {
            Ok(proof) => proof,
            Err(e) => {
                self.audit
                    .log_action(
                        AuditKind::PaymentFailed,
                        json!({ "url": request.url.as_str(), "error": e.to_string() }),
                    )
                    .await;
                self.guard.release(amount).await;
                return Err(e.into());
            }
        };
        self.audit
            .log_action(
                AuditKind::PaymentExecuted,
                json!({
                    "url": request.url.as_str(),
                    "settlementId": proof.settlement_id,
                    "payer": payer,
                }),
            )
            .await;

        // Step 7: best-effort attestation; never aborts the payment.
        let attestation = self.build_attestation(request, &proof).await;

        // Step 8: retry with payment headers. From here on funds may have
        // moved, so failures still leave a record behind.
        let retried = match self
            .send(request, Some(&proof.header_value), attestation.as_ref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.finalize(request, &option, amount, &proof, TransactionStatus::Pending, None)
                    .await;
                return Err(PaymentError::Unexpected(format!(
                    "retried request failed after payment was committed: {e}"
                )));
            }
        };

        // Steps 9-10: reconcile.
        let status = retried.status();
        let header_settlement = headers::settlement_id_from(retried.headers());
        if status.is_success() {
            let body = read_body(retried).await;
            let settlement_id = proof.settlement_id.clone().or(header_settlement);
            let record_id = self
                .finalize(
                    request,
                    &option,
                    amount,
                    &proof,
                    TransactionStatus::Success,
                    settlement_id.clone(),
                )
                .await;
            info!(
                url = %request.url,
                %amount,
                record_id,
                settlement_id = settlement_id.as_deref().unwrap_or("none"),
                "payment accepted"
            );
            Ok(PaymentOutcome::paid(
                body,
                PaymentReceipt {
                    amount_paid: amount,
                    currency: self.currency_for(&option),
                    service: request.service(),
                    settlement_id,
                },
            ))
        } else {
            let text = retried.text().await.unwrap_or_default();
            let message = merchant_error_message(&text, status);
            self.audit
                .log_action(
                    AuditKind::PaymentFailed,
                    json!({
                        "url": request.url.as_str(),
                        "status": status.as_u16(),
                        "message": message,
                    }),
                )
                .await;
            self.finalize(request, &option, amount, &proof, TransactionStatus::Failed, None)
                .await;
            Err(PaymentError::MerchantRejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Builds attestation headers, swallowing every failure. Attestation is
    /// an enhancement, not a requirement; the audit trail distinguishes a
    /// skip from an error.
    async fn build_attestation(
        &self,
        request: &PaymentRequest,
        proof: &PaymentProof,
    ) -> Option<AttestationHeaders> {
        let attestor = self.attestor.as_ref()?;
        match attestor
            .build_headers(&request.method, &request.url, &proof.header_value)
            .await
        {
            Ok(Some(headers)) => {
                self.audit
                    .log_action(
                        AuditKind::AttestationIncluded,
                        json!({ "url": request.url.as_str() }),
                    )
                    .await;
                Some(headers)
            }
            Ok(None) => {
                self.audit
                    .log_action(
                        AuditKind::AttestationSkipped,
                        json!({
                            "url": request.url.as_str(),
                            "reason": "no valid attestation token",
                        }),
                    )
                    .await;
                None
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "attestation signing failed, continuing without");
                self.audit
                    .log_action(
                        AuditKind::AttestationSkipped,
                        json!({ "url": request.url.as_str(), "reason": e.to_string() }),
                    )
                    .await;
                None
            }
        }
    }

    /// Appends the transaction record for a completed attempt. Store
    /// trouble is logged, not surfaced; the payment result stands.
    async fn finalize(
        &self,
        request: &PaymentRequest,
        option: &PaymentRequirements,
        amount: Decimal,
        proof: &PaymentProof,
        status: TransactionStatus,
        settlement_id: Option<String>,
    ) -> String {
        let id = format!("{:032x}", rand::rng().random::<u128>());
        let record = TransactionRecord {
            id: id.clone(),
            timestamp: UnixTimestamp::now(),
            service: request.service(),
            description: request
                .description
                .clone()
                .or_else(|| option.description.clone())
                .unwrap_or_else(|| option.resource.clone()),
            amount,
            currency: self.currency_for(option),
            settlement_id: settlement_id.or_else(|| proof.settlement_id.clone()),
            status,
        };
        if let Err(e) = self.store.append(record).await {
            warn!(error = %e, "failed to append transaction record");
        }
        id
    }

    fn currency_for(&self, option: &PaymentRequirements) -> String {
        option
            .extra
            .as_ref()
            .and_then(|extra| extra.display_name.clone())
            .unwrap_or_else(|| self.config.currency.clone())
    }

    async fn send(
        &self,
        request: &PaymentRequest,
        payment_header: Option<&str>,
        attestation: Option<&AttestationHeaders>,
    ) -> reqwest::Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .timeout(self.config.request_timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(value) = payment_header {
            builder = builder.header(headers::PAYMENT, value);
        }
        if let Some(att) = attestation {
            builder = builder
                .header(headers::ATTESTATION_TOKEN, &att.token)
                .header(headers::SIGNATURE_INPUT, &att.signature_input)
                .header(headers::SIGNATURE, &att.signature);
        }
        builder.send().await
    }
}

/// Parses a response body as JSON, falling back to a string value.
async fn read_body(response: Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Extracts a human-readable failure message from a merchant's error body.
///
/// Precedence: the body's `error` field, then `message`, then generic
/// status text.
fn merchant_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    format!("payment failed with status {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use w402::audit::RecordingAudit;
    use w402::chain::{Balance, LedgerError, ProofError, SignError, TransferReceipt};
    use w402::chain::IdentityKey;
    use w402::limits::{SpendLimitGuard, SpendLimits};
    use w402::proto::UnixTimestamp;

    use crate::attestation::{AttestationToken, RequestAttestor, StaticTokenSource};

    const CHALLENGE: &str = r#"{
        "x402Version": 1,
        "accepts": [{
            "scheme": "exact",
            "network": "base",
            "maxAmountRequired": "10000",
            "payTo": "0xRECIPIENT",
            "asset": "0xUSDC",
            "resource": "https://svc/api"
        }]
    }"#;

    struct FakeStrategy {
        calls: AtomicUsize,
        settlement: Option<String>,
    }

    impl FakeStrategy {
        fn new(settlement: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                settlement: settlement.map(str::to_string),
            })
        }
    }

    #[async_trait]
    impl ProofStrategy for FakeStrategy {
        fn payer(&self) -> String {
            "0xPAYER".into()
        }

        async fn produce_proof(
            &self,
            _requirements: &PaymentRequirements,
        ) -> Result<PaymentProof, ProofError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentProof {
                header_value: "c2lnbmVk".into(),
                settlement_id: self.settlement.clone(),
            })
        }
    }

    struct FakeLedger {
        balance: u128,
        calls: AtomicUsize,
    }

    impl FakeLedger {
        fn with_balance(balance: u128) -> Arc<Self> {
            Arc::new(Self {
                balance,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn balance_of(&self, _address: &str) -> Result<Balance, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Balance {
                amount: self.balance,
                decimals: 6,
            })
        }

        async fn transfer(
            &self,
            _to: &str,
            _amount_base_units: u128,
        ) -> Result<TransferReceipt, LedgerError> {
            unreachable!("orchestrator never transfers directly")
        }
    }

    struct FakeKey;

    #[async_trait]
    impl IdentityKey for FakeKey {
        fn key_id(&self) -> String {
            "erc8128:8453:0xPAYER".into()
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, SignError> {
            Ok(vec![0x42; 65])
        }
    }

    fn client(
        strategy: Arc<FakeStrategy>,
        ledger: Arc<FakeLedger>,
        store: Arc<MemoryStore>,
        audit: Arc<RecordingAudit>,
    ) -> PaymentClient {
        PaymentClient::new(PaymentClientConfig::default(), strategy, ledger)
            .with_store(store)
            .with_audit(audit)
    }

    async fn mount_paid_endpoint(server: &MockServer, paid_response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header_exists("X-Payment"))
            .respond_with(paid_response)
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(
                ResponseTemplate::new(402)
                    .set_body_raw(CHALLENGE, "application/json"),
            )
            .with_priority(2)
            .mount(server)
            .await;
    }

    fn api_request(server: &MockServer) -> PaymentRequest {
        let url: Url = format!("{}/api", server.uri()).parse().unwrap();
        PaymentRequest::get(url).with_description("api call")
    }

    #[tokio::test]
    async fn free_resource_short_circuits_without_wallet_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "free"})))
            .mount(&server)
            .await;

        let strategy = FakeStrategy::new(None);
        let ledger = FakeLedger::with_balance(0);
        let store = Arc::new(MemoryStore::new());
        let client = client(
            Arc::clone(&strategy),
            Arc::clone(&ledger),
            Arc::clone(&store),
            Arc::new(RecordingAudit::new()),
        );

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(outcome.success);
        assert_eq!(outcome.body.unwrap()["data"], "free");
        assert!(outcome.payment.is_none());
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn pays_and_records_on_successful_retry() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})),
        )
        .await;

        let strategy = FakeStrategy::new(Some("0xsettle"));
        // $50 balance in micro-USDC.
        let ledger = FakeLedger::with_balance(50_000_000);
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(RecordingAudit::new());
        let client = client(
            Arc::clone(&strategy),
            ledger,
            Arc::clone(&store),
            Arc::clone(&audit),
        );

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(outcome.success, "outcome: {outcome:?}");
        let receipt = outcome.payment.unwrap();
        assert_eq!(receipt.amount_paid, "0.01".parse::<Decimal>().unwrap());
        assert_eq!(receipt.service, "127.0.0.1");
        assert_eq!(receipt.settlement_id.as_deref(), Some("0xsettle"));
        assert_eq!(outcome.body.unwrap()["data"], "ok");

        let records = store.list(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, "0.01".parse::<Decimal>().unwrap());
        assert_eq!(records[0].service, "127.0.0.1");
        assert_eq!(records[0].settlement_id.as_deref(), Some("0xsettle"));
        assert_eq!(records[0].status, TransactionStatus::Success);

        assert_eq!(audit.count(AuditKind::PaymentApproved).await, 1);
        assert_eq!(audit.count(AuditKind::PaymentExecuted).await, 1);
    }

    #[tokio::test]
    async fn insufficient_balance_stops_before_signing() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})),
        )
        .await;

        let strategy = FakeStrategy::new(None);
        let ledger = FakeLedger::with_balance(0);
        let store = Arc::new(MemoryStore::new());
        let client = client(
            Arc::clone(&strategy),
            ledger,
            Arc::clone(&store),
            Arc::new(RecordingAudit::new()),
        );

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("nsufficient balance"), "error: {error}");
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn limit_rejection_stops_before_balance_and_signing() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})),
        )
        .await;

        let strategy = FakeStrategy::new(None);
        let ledger = FakeLedger::with_balance(50_000_000);
        let store = Arc::new(MemoryStore::new());
        let guard = Arc::new(SpendLimitGuard::new(SpendLimits {
            per_transaction: Some("0.005".parse().unwrap()),
            daily: None,
        }));
        let client = client(
            Arc::clone(&strategy),
            Arc::clone(&ledger),
            Arc::clone(&store),
            Arc::new(RecordingAudit::new()),
        )
        .with_guard(guard);

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("per-transaction limit"));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_challenge_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(402).set_body_raw("not json", "text/plain"))
            .mount(&server)
            .await;

        let client = client(
            FakeStrategy::new(None),
            FakeLedger::with_balance(0),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingAudit::new()),
        );

        let outcome = client.execute_payment(api_request(&server)).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("invalid 402 challenge"));
    }

    #[tokio::test]
    async fn empty_option_list_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(
                ResponseTemplate::new(402)
                    .set_body_json(json!({"x402Version": 1, "accepts": []})),
            )
            .mount(&server)
            .await;

        let client = client(
            FakeStrategy::new(None),
            FakeLedger::with_balance(0),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingAudit::new()),
        );

        let outcome = client.execute_payment(api_request(&server)).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("no payment options"));
    }

    #[tokio::test]
    async fn merchant_rejection_surfaces_error_field_and_records_failure() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(500).set_body_json(json!({"error": "quota exceeded"})),
        )
        .await;

        let strategy = FakeStrategy::new(Some("0xsettle"));
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(RecordingAudit::new());
        let client = client(
            strategy,
            FakeLedger::with_balance(50_000_000),
            Arc::clone(&store),
            Arc::clone(&audit),
        );

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("quota exceeded"));
        let records = store.list(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Failed);
        assert_eq!(audit.count(AuditKind::PaymentFailed).await, 1);
    }

    #[tokio::test]
    async fn attaches_attestation_headers_when_token_is_valid() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})),
        )
        .await;

        let audit = Arc::new(RecordingAudit::new());
        let token = AttestationToken {
            value: "tok-abc".into(),
            expires_at: UnixTimestamp::now() + 600,
        };
        let attestor = RequestAttestor::new(
            Arc::new(FakeKey),
            Arc::new(StaticTokenSource::new(token)),
        );
        let client = client(
            FakeStrategy::new(None),
            FakeLedger::with_balance(50_000_000),
            Arc::new(MemoryStore::new()),
            Arc::clone(&audit),
        )
        .with_attestor(attestor);

        let outcome = client.execute_payment(api_request(&server)).await;
        assert!(outcome.success);
        assert_eq!(audit.count(AuditKind::AttestationIncluded).await, 1);

        let requests = server.received_requests().await.unwrap();
        let paid = requests
            .iter()
            .find(|r| r.headers.contains_key("X-Payment"))
            .unwrap();
        assert!(paid.headers.contains_key("Signature-Input"));
        assert!(paid.headers.contains_key("Signature"));
        assert_eq!(
            paid.headers.get("Attestation-Token").unwrap().to_str().unwrap(),
            "tok-abc"
        );
    }

    #[tokio::test]
    async fn expired_attestation_skips_but_payment_completes() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": "ok"})),
        )
        .await;

        let audit = Arc::new(RecordingAudit::new());
        let token = AttestationToken {
            value: "tok-old".into(),
            expires_at: UnixTimestamp::from_secs(1),
        };
        let attestor = RequestAttestor::new(
            Arc::new(FakeKey),
            Arc::new(StaticTokenSource::new(token)),
        );
        let client = client(
            FakeStrategy::new(None),
            FakeLedger::with_balance(50_000_000),
            Arc::new(MemoryStore::new()),
            Arc::clone(&audit),
        )
        .with_attestor(attestor);

        let outcome = client.execute_payment(api_request(&server)).await;

        assert!(outcome.success);
        assert_eq!(audit.count(AuditKind::AttestationSkipped).await, 1);
        assert_eq!(audit.count(AuditKind::AttestationIncluded).await, 0);

        let requests = server.received_requests().await.unwrap();
        let paid = requests
            .iter()
            .find(|r| r.headers.contains_key("X-Payment"))
            .unwrap();
        assert!(!paid.headers.contains_key("Signature"));
    }

    #[tokio::test]
    async fn settlement_id_recovered_from_response_headers() {
        let server = MockServer::start().await;
        mount_paid_endpoint(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": "ok"}))
                .insert_header("x-payment-transaction", "0xfromheader"),
        )
        .await;

        let store = Arc::new(MemoryStore::new());
        let client = client(
            FakeStrategy::new(None),
            FakeLedger::with_balance(50_000_000),
            Arc::clone(&store),
            Arc::new(RecordingAudit::new()),
        );

        let outcome = client.execute_payment(api_request(&server)).await;
        assert_eq!(
            outcome.payment.unwrap().settlement_id.as_deref(),
            Some("0xfromheader")
        );
    }

    #[test]
    fn merchant_message_prefers_error_then_message_then_generic() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            merchant_error_message(r#"{"error": "E", "message": "M"}"#, status),
            "E"
        );
        assert_eq!(merchant_error_message(r#"{"message": "M"}"#, status), "M");
        assert_eq!(
            merchant_error_message("garbage", status),
            "payment failed with status 500"
        );
        assert_eq!(
            merchant_error_message(r#"{"other": 1}"#, status),
            "payment failed with status 500"
        );
    }
}
