use crate::domain::gateway::{
    CouponRequest, CouponValue, GatewayCoupon, GatewayError, GatewayPaymentStatus, GatewayPrice,
    GatewayProduct, GatewaySession, GatewayTaxRate, PriceRequest, ProductRequest, SessionRequest,
    TaxRateRequest,
};
use crate::domain::money::Currency;
use crate::domain::ports::PaymentGateway;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

type GatewayResult<T> = std::result::Result<T, GatewayError>;
type FormParams = Vec<(String, String)>;

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
    unit_amount: Option<i64>,
    currency: Currency,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    amount_total: Option<i64>,
    currency: Option<Currency>,
    payment_status: GatewayPaymentStatus,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: String,
}

/// Payment gateway backed by the Stripe REST API.
#[derive(Clone)]
pub struct StripeGateway {
    secret_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, params: &FormParams) -> GatewayResult<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, Some(""))
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::new(format!("Stripe API error: {e}")))?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| GatewayError::new(format!("Stripe API error: {e}")))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            warn!("Stripe API error ({}): {}", status, message);
            return Err(GatewayError::new(format!("{status}: {message}")));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::new(format!("Failed to parse Stripe response: {e}")))
    }
}

fn param(key: impl Into<String>, value: impl ToString) -> (String, String) {
    (key.into(), value.to_string())
}

pub(crate) fn price_form(request: &PriceRequest) -> FormParams {
    vec![
        param("unit_amount", request.unit_amount),
        param("currency", request.currency.code()),
        param("product", &request.product),
        param("tax_behavior", request.tax_behavior.as_str()),
    ]
}

pub(crate) fn coupon_form(request: &CouponRequest) -> FormParams {
    let mut params = vec![param("duration", request.duration.as_str())];
    match request.value {
        CouponValue::PercentOff(percent) => params.push(param("percent_off", percent)),
        CouponValue::AmountOff { amount, currency } => {
            params.push(param("amount_off", amount));
            params.push(param("currency", currency.code()));
        }
    }
    params
}

pub(crate) fn tax_rate_form(request: &TaxRateRequest) -> FormParams {
    vec![
        param("percentage", request.percentage),
        param("display_name", &request.display_name),
        param("description", &request.description),
        param("inclusive", request.inclusive),
    ]
}

pub(crate) fn session_form(request: &SessionRequest) -> FormParams {
    let mut params = vec![
        param("mode", request.mode.as_str()),
        param("success_url", &request.success_url),
    ];
    for (i, method) in request.payment_method_types.iter().enumerate() {
        params.push(param(format!("payment_method_types[{i}]"), method));
    }
    for (i, line) in request.line_items.iter().enumerate() {
        params.push(param(format!("line_items[{i}][price]"), &line.price));
        params.push(param(format!("line_items[{i}][quantity]"), line.quantity));
        for (j, tax_rate) in line.tax_rates.iter().enumerate() {
            params.push(param(format!("line_items[{i}][tax_rates][{j}]"), tax_rate));
        }
    }
    for (i, coupon) in request.discounts.iter().enumerate() {
        params.push(param(format!("discounts[{i}][coupon]"), coupon));
    }
    params
}

impl TryFrom<StripeSession> for GatewaySession {
    type Error = GatewayError;

    fn try_from(session: StripeSession) -> GatewayResult<Self> {
        let currency = session
            .currency
            .ok_or_else(|| GatewayError::new("Stripe session has no currency"))?;
        Ok(Self {
            id: session.id,
            url: session.url.unwrap_or_default(),
            amount_total: session.amount_total.unwrap_or_default(),
            currency,
            payment_status: session.payment_status,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn create_product(&self, request: ProductRequest) -> GatewayResult<GatewayProduct> {
        let product: StripeObject = self
            .post("/products", &vec![param("name", &request.name)])
            .await?;
        Ok(GatewayProduct {
            id: product.id,
            name: request.name,
        })
    }

    #[instrument(skip(self))]
    async fn create_price(&self, request: PriceRequest) -> GatewayResult<GatewayPrice> {
        let price: StripePrice = self.post("/prices", &price_form(&request)).await?;
        Ok(GatewayPrice {
            id: price.id,
            unit_amount: price.unit_amount.unwrap_or(request.unit_amount),
            currency: price.currency,
        })
    }

    #[instrument(skip(self))]
    async fn create_coupon(&self, request: CouponRequest) -> GatewayResult<GatewayCoupon> {
        let coupon: StripeObject = self.post("/coupons", &coupon_form(&request)).await?;
        Ok(GatewayCoupon { id: coupon.id })
    }

    #[instrument(skip(self))]
    async fn create_tax_rate(&self, request: TaxRateRequest) -> GatewayResult<GatewayTaxRate> {
        let tax_rate: StripeObject = self.post("/tax_rates", &tax_rate_form(&request)).await?;
        Ok(GatewayTaxRate { id: tax_rate.id })
    }

    #[instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    async fn create_session(&self, request: SessionRequest) -> GatewayResult<GatewaySession> {
        let session: StripeSession = self
            .post("/checkout/sessions", &session_form(&request))
            .await?;
        info!("Checkout session created: {}", session.id);
        session.try_into()
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> GatewayResult<GatewaySession> {
        let session: StripeSession = self
            .get(&format!("/checkout/sessions/{session_id}"))
            .await?;
        session.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{CouponDuration, LineItem, SessionMode};
    use crate::domain::pricing::TaxBehavior;
    use rust_decimal_macros::dec;

    fn has(params: &FormParams, key: &str, value: &str) -> bool {
        params.iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn test_price_form() {
        let params = price_form(&PriceRequest {
            unit_amount: 1999,
            currency: Currency::Eur,
            product: "prod_1".to_string(),
            tax_behavior: TaxBehavior::Exclusive,
        });
        assert!(has(&params, "unit_amount", "1999"));
        assert!(has(&params, "currency", "eur"));
        assert!(has(&params, "tax_behavior", "exclusive"));
    }

    #[test]
    fn test_coupon_form_amount_off() {
        let params = coupon_form(&CouponRequest {
            duration: CouponDuration::Once,
            value: CouponValue::AmountOff {
                amount: 50000,
                currency: Currency::Usd,
            },
        });
        assert!(has(&params, "duration", "once"));
        assert!(has(&params, "amount_off", "50000"));
        assert!(has(&params, "currency", "usd"));
        assert!(!params.iter().any(|(k, _)| k == "percent_off"));
    }

    #[test]
    fn test_tax_rate_form() {
        let params = tax_rate_form(&TaxRateRequest {
            percentage: dec!(20),
            display_name: "Tax VAT".to_string(),
            description: "Tax VAT".to_string(),
            inclusive: false,
        });
        assert!(has(&params, "percentage", "20"));
        assert!(has(&params, "inclusive", "false"));
    }

    #[test]
    fn test_session_form_nesting() {
        let params = session_form(&SessionRequest {
            line_items: vec![
                LineItem {
                    price: "price_1".to_string(),
                    quantity: 1,
                    tax_rates: vec!["txr_1".to_string()],
                },
                LineItem {
                    price: "price_2".to_string(),
                    quantity: 1,
                    tax_rates: vec!["txr_1".to_string()],
                },
            ],
            discounts: vec!["coupon_1".to_string()],
            mode: SessionMode::Payment,
            payment_method_types: vec!["card".to_string()],
            success_url: "https://example.com/success".to_string(),
        });

        assert!(has(&params, "mode", "payment"));
        assert!(has(&params, "payment_method_types[0]", "card"));
        assert!(has(&params, "line_items[1][price]", "price_2"));
        assert!(has(&params, "line_items[0][quantity]", "1"));
        assert!(has(&params, "line_items[1][tax_rates][0]", "txr_1"));
        assert!(has(&params, "discounts[0][coupon]", "coupon_1"));
    }

    #[test]
    fn test_session_response_mapping() {
        let body = r#"{
            "id": "cs_test_a1",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_a1",
            "amount_total": 2160,
            "currency": "usd",
            "payment_status": "unpaid"
        }"#;
        let session: StripeSession = serde_json::from_str(body).unwrap();
        let session = GatewaySession::try_from(session).unwrap();
        assert_eq!(session.amount_total, 2160);
        assert_eq!(session.currency, Currency::Usd);
        assert_eq!(session.payment_status, GatewayPaymentStatus::Unpaid);
    }

    #[test]
    fn test_error_body_parsing() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such price"}}"#;
        let parsed: StripeErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "No such price");
    }

    mod http {
        use super::*;
        use wiremock::matchers::{basic_auth, body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn gateway(server: &MockServer) -> StripeGateway {
            StripeGateway::with_base_url("sk_test_123", server.uri())
        }

        #[tokio::test]
        async fn test_create_product_posts_form_with_basic_auth() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/products"))
                .and(basic_auth("sk_test_123", ""))
                .and(body_string_contains("name=Mug"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "prod_1",
                    "object": "product",
                    "name": "Mug"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let product = gateway(&server)
                .await
                .create_product(ProductRequest {
                    name: "Mug".to_string(),
                })
                .await
                .unwrap();

            assert_eq!(product.id, "prod_1");
            assert_eq!(product.name, "Mug");
        }

        #[tokio::test]
        async fn test_error_response_becomes_gateway_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/prices"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": {
                        "type": "invalid_request_error",
                        "message": "No such product: 'prod_missing'"
                    }
                })))
                .mount(&server)
                .await;

            let error = gateway(&server)
                .await
                .create_price(PriceRequest {
                    unit_amount: 1000,
                    currency: Currency::Usd,
                    product: "prod_missing".to_string(),
                    tax_behavior: TaxBehavior::Inclusive,
                })
                .await
                .unwrap_err();

            assert!(error.message.starts_with("400"));
            assert!(error.message.ends_with("No such product: 'prod_missing'"));
        }

        #[tokio::test]
        async fn test_non_json_error_body_is_kept() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/coupons"))
                .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
                .mount(&server)
                .await;

            let error = gateway(&server)
                .await
                .create_coupon(CouponRequest {
                    duration: CouponDuration::Once,
                    value: CouponValue::PercentOff(dec!(10)),
                })
                .await
                .unwrap_err();

            assert!(error.message.ends_with("bad gateway"));
        }

        #[tokio::test]
        async fn test_retrieve_session_reads_payment_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/checkout/sessions/cs_test_a1"))
                .and(basic_auth("sk_test_123", ""))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "cs_test_a1",
                    "object": "checkout.session",
                    "url": null,
                    "amount_total": 1550,
                    "currency": "usd",
                    "payment_status": "paid"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let session = gateway(&server)
                .await
                .retrieve_session("cs_test_a1")
                .await
                .unwrap();

            assert_eq!(session.id, "cs_test_a1");
            assert_eq!(session.payment_status, GatewayPaymentStatus::Paid);
            assert_eq!(session.amount_total, 1550);
            assert_eq!(session.url, "");
        }
    }
}
