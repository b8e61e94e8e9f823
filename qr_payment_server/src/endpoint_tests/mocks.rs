use async_trait::async_trait;
use mercado_tools::{MerchantOrderDetail, PaymentDetail};
use mockall::mock;
use qr_payment_engine::{
    db_types::{NewSale, Sale, SaleId, WebhookTopic},
    traits::{ProviderApi, ProviderApiError, ReconciliationDatabase, SaleApiError, SalePaymentUpdate},
};

mock! {
    pub ReconciliationDb {}

    impl Clone for ReconciliationDb {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl ReconciliationDatabase for ReconciliationDb {
        async fn fetch_sale(&self, id: &SaleId) -> Result<Option<Sale>, SaleApiError>;
        async fn fetch_sale_by_order_id(&self, provider_order_id: &str) -> Result<Option<Sale>, SaleApiError>;
        async fn fetch_sale_by_payment_id(&self, provider_payment_id: &str) -> Result<Option<Sale>, SaleApiError>;
        async fn insert_sale(&self, sale: NewSale) -> Result<Sale, SaleApiError>;
        async fn update_sale_payment(&self, id: &SaleId, update: SalePaymentUpdate) -> Result<Sale, SaleApiError>;
        async fn record_webhook_event_if_new(
            &self,
            provider: &str,
            topic: WebhookTopic,
            resource_id: &str,
        ) -> Result<bool, SaleApiError>;
    }
}

mock! {
    pub Provider {}

    impl Clone for Provider {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl ProviderApi for Provider {
        async fn payment(&self, payment_id: &str) -> Result<PaymentDetail, ProviderApiError>;
        async fn merchant_order(&self, order_id: &str) -> Result<MerchantOrderDetail, ProviderApiError>;
        async fn search_payments_by_reference(
            &self,
            external_reference: &str,
        ) -> Result<Vec<PaymentDetail>, ProviderApiError>;
    }
}
