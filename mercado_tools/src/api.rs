use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{
    config::MercadoConfig,
    data_objects::{MerchantOrderDetail, PaymentDetail, PaymentSearchResults},
    MercadoApiError,
};

#[derive(Clone)]
pub struct MercadoApi {
    config: MercadoConfig,
    client: Arc<Client>,
}

impl MercadoApi {
    pub fn new(config: MercadoConfig) -> Result<Self, MercadoApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let token = format!("Bearer {}", config.access_token.reveal());
        let val = HeaderValue::from_str(&token).map_err(|e| MercadoApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MercadoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MercadoApiError> {
        let url = self.url(path);
        trace!("🛒 Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                MercadoApiError::Timeout(path.to_string())
            } else {
                MercadoApiError::ResponseError(e.to_string())
            }
        })?;
        match response.status() {
            s if s.is_success() => {
                trace!("🛒 REST query successful. {s}");
                response.json::<T>().await.map_err(|e| MercadoApiError::JsonError(e.to_string()))
            },
            StatusCode::NOT_FOUND => Err(MercadoApiError::NotFound(path.to_string())),
            s => {
                let message = response.text().await.map_err(|e| MercadoApiError::ResponseError(e.to_string()))?;
                Err(MercadoApiError::QueryError { status: s.as_u16(), message })
            },
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetches the authoritative state of a single payment.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetail, MercadoApiError> {
        let path = format!("/v1/payments/{payment_id}");
        debug!("🛒 Fetching payment {payment_id}");
        let payment = self.rest_query::<PaymentDetail>(Method::GET, &path, &[]).await?;
        debug!("🛒 Fetched payment {payment_id}. Status: {}", payment.status);
        Ok(payment)
    }

    /// Fetches a merchant order, including its embedded payment attempts.
    pub async fn get_merchant_order(&self, order_id: &str) -> Result<MerchantOrderDetail, MercadoApiError> {
        let path = format!("/merchant_orders/{order_id}");
        debug!("🛒 Fetching merchant order {order_id}");
        let order = self.rest_query::<MerchantOrderDetail>(Method::GET, &path, &[]).await?;
        debug!("🛒 Fetched merchant order {order_id}. {} payment(s) attached", order.payments.len());
        Ok(order)
    }

    /// Searches payments carrying the given external reference, most recent first.
    pub async fn search_payments_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<PaymentDetail>, MercadoApiError> {
        let params = [("external_reference", reference), ("sort", "date_created"), ("criteria", "desc")];
        debug!("🛒 Searching payments with external reference {reference}");
        let found = self.rest_query::<PaymentSearchResults>(Method::GET, "/v1/payments/search", &params).await?;
        debug!("🛒 Payment search for {reference} returned {} result(s)", found.results.len());
        Ok(found.results)
    }
}
