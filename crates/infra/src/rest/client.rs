//! Pipeline store backed by a PostgREST endpoint.
//!
//! Tables live under `{base}/rest/v1/{table}` and rows are filtered with
//! `column=eq.value`. The atomic save is a remote procedure
//! (`rpc/save_opportunity_with_line_items`) so the opportunity write and the
//! line-item replacement commit together on the server.

use std::time::Duration;

use async_trait::async_trait;
use dealdesk_core::{PipelineStore, ProductCatalog};
use dealdesk_domain::{
    DealDeskError, LineItem, NewStage, Opportunity, OpportunityFields, Product, RemoteConfig,
    Result as DomainResult, Stage, TenantContext,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use super::rows::{
    ErrorBody, LineItemPayload, LineItemRow, OpportunityPayload, OpportunityRow, ProductRow,
    SaveOpportunityCall, StageRow,
};
use crate::errors::status_error;
use crate::http::HttpClient;

const STAGES: &str = "pipeline_stages";
const OPPORTUNITIES: &str = "opportunities";
const LINE_ITEMS: &str = "opportunity_line_items";
const PRODUCTS: &str = "products";
const SAVE_PROCEDURE: &str = "rpc/save_opportunity_with_line_items";

const OPPORTUNITY_COLUMNS: &str = "id,title,value,stage,close_date,lead_id,customer_id,created_at";
const LINE_ITEM_COLUMNS: &str = "id,opportunity_id,product_id,quantity,unit_price,products(name)";

type Filters<'a> = Vec<(&'a str, String)>;

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Remote pipeline store and product catalog.
pub struct RestPipelineStore {
    http: HttpClient,
    rest_root: Url,
    api_key: String,
}

impl RestPipelineStore {
    pub fn new(config: &RemoteConfig) -> DomainResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .user_agent(concat!("dealdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(http, &config.base_url, &config.api_key)
    }

    pub fn with_client(http: HttpClient, base_url: &str, api_key: &str) -> DomainResult<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let rest_root = Url::parse(&base)
            .and_then(|url| url.join("rest/v1/"))
            .map_err(|err| DealDeskError::Config(format!("invalid remote base URL {base_url}: {err}")))?;

        if api_key.trim().is_empty() {
            return Err(DealDeskError::Config("remote API key must not be empty".into()));
        }

        Ok(Self { http, rest_root, api_key: api_key.to_string() })
    }

    fn endpoint(&self, path: &str) -> DomainResult<Url> {
        self.rest_root
            .join(path)
            .map_err(|err| DealDeskError::Internal(format!("failed to build URL for {path}: {err}")))
    }

    /// Auth headers for one tenant. The bearer is the tenant's session token
    /// when present and the project key otherwise.
    fn auth_headers(&self, tenant: &TenantContext) -> DomainResult<HeaderMap> {
        let bearer = tenant.access_token.as_deref().unwrap_or(&self.api_key);
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {bearer}"))?);
        Ok(headers)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        tenant: &TenantContext,
        filters: &Filters<'_>,
    ) -> DomainResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut builder = self.http.request(method, url).headers(self.auth_headers(tenant)?);
        if !filters.is_empty() {
            builder = builder.query(filters);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder) -> DomainResult<Response> {
        let response = self.http.send(builder).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body).ok().and_then(|err| err.message).unwrap_or(body);
        warn!(%status, detail = %detail, "remote request rejected");
        Err(status_error(status, Some(&detail)))
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DomainResult<T> {
        let response = self.execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| DealDeskError::Network(format!("invalid response body: {err}")))
    }

    async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        tenant: &TenantContext,
        filters: Filters<'_>,
    ) -> DomainResult<Vec<R>> {
        let builder = self.request(Method::GET, table, tenant, &filters)?;
        self.fetch(builder).await
    }

    /// PATCH or DELETE rows and return how many the server touched.
    async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        tenant: &TenantContext,
        filters: Filters<'_>,
        body: Option<&B>,
    ) -> DomainResult<usize> {
        let mut builder =
            self.request(method, table, tenant, &filters)?.header("Prefer", "return=representation");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let rows: Vec<serde_json::Value> = self.fetch(builder).await?;
        Ok(rows.len())
    }

    async fn mutate_one<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        tenant: &TenantContext,
        id: &str,
        body: Option<&B>,
    ) -> DomainResult<()> {
        let filters = vec![("id", eq(id)), ("tenant_id", eq(&tenant.tenant_id))];
        match self.mutate(method, table, tenant, filters, body).await? {
            0 => Err(DealDeskError::NotFound(format!("{table} {id}"))),
            _ => Ok(()),
        }
    }
}

fn header_value(value: &str) -> DomainResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| DealDeskError::Config("credential contains characters not allowed in a header".into()))
}

#[async_trait]
impl PipelineStore for RestPipelineStore {
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_stages(&self, tenant: &TenantContext) -> DomainResult<Vec<Stage>> {
        let rows: Vec<StageRow> = self
            .select(
                STAGES,
                tenant,
                vec![
                    ("select", "id,name,position,color".into()),
                    ("tenant_id", eq(&tenant.tenant_id)),
                    ("order", "position.asc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Stage::from).collect())
    }

    #[instrument(skip(self, tenant, stage), fields(tenant_id = %tenant.tenant_id, name = %stage.name))]
    async fn create_stage(&self, tenant: &TenantContext, stage: &NewStage) -> DomainResult<Stage> {
        let body = json!({
            "tenant_id": tenant.tenant_id,
            "name": stage.name,
            "color": stage.color,
            "position": stage.position,
        });
        let builder = self
            .request(Method::POST, STAGES, tenant, &Vec::new())?
            .header("Prefer", "return=representation")
            .json(&body);

        let rows: Vec<StageRow> = self.fetch(builder).await?;
        rows.into_iter()
            .next()
            .map(Stage::from)
            .ok_or_else(|| DealDeskError::Network("stage insert returned no representation".into()))
    }

    #[instrument(skip(self, tenant, stage), fields(tenant_id = %tenant.tenant_id, stage_id = %stage.id))]
    async fn update_stage(&self, tenant: &TenantContext, stage: &Stage) -> DomainResult<()> {
        let body = json!({ "name": stage.name, "color": stage.color });
        self.mutate_one(Method::PATCH, STAGES, tenant, &stage.id, Some(&body)).await
    }

    #[instrument(skip(self, tenant, stages), fields(tenant_id = %tenant.tenant_id, count = stages.len()))]
    async fn reorder_stages(&self, tenant: &TenantContext, stages: &[Stage]) -> DomainResult<()> {
        let mut failed = 0usize;

        for stage in stages {
            let body = json!({ "position": stage.position });
            if let Err(err) = self.mutate_one(Method::PATCH, STAGES, tenant, &stage.id, Some(&body)).await {
                failed += 1;
                warn!(stage_id = %stage.id, error = %err, "stage position update failed");
            }
        }

        if failed > 0 {
            return Err(DealDeskError::Network(format!(
                "{failed} of {} stage position updates failed",
                stages.len()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn delete_stage(&self, tenant: &TenantContext, stage_id: &str) -> DomainResult<()> {
        self.mutate_one::<()>(Method::DELETE, STAGES, tenant, stage_id, None).await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_opportunities(&self, tenant: &TenantContext) -> DomainResult<Vec<Opportunity>> {
        let rows: Vec<OpportunityRow> = self
            .select(
                OPPORTUNITIES,
                tenant,
                vec![
                    ("select", OPPORTUNITY_COLUMNS.into()),
                    ("tenant_id", eq(&tenant.tenant_id)),
                    ("order", "created_at.asc".into()),
                ],
            )
            .await?;
        debug!(count = rows.len(), "opportunities fetched");
        Ok(rows.into_iter().map(Opportunity::from).collect())
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn update_opportunity_stage(
        &self,
        tenant: &TenantContext,
        opportunity_id: &str,
        stage: &str,
    ) -> DomainResult<()> {
        let body = json!({ "stage": stage });
        self.mutate_one(Method::PATCH, OPPORTUNITIES, tenant, opportunity_id, Some(&body)).await
    }

    #[instrument(
        skip(self, tenant, fields, line_items),
        fields(tenant_id = %tenant.tenant_id, line_items = line_items.len())
    )]
    async fn save_opportunity_with_line_items(
        &self,
        tenant: &TenantContext,
        opportunity_id: Option<&str>,
        fields: &OpportunityFields,
        line_items: &[LineItem],
    ) -> DomainResult<String> {
        let call = SaveOpportunityCall {
            p_tenant_id: &tenant.tenant_id,
            p_opportunity_id: opportunity_id,
            p_opportunity: OpportunityPayload::from(fields),
            p_line_items: line_items.iter().map(LineItemPayload::from).collect(),
        };
        let builder = self.request(Method::POST, SAVE_PROCEDURE, tenant, &Vec::new())?.json(&call);

        let id: String = self.fetch(builder).await?;
        debug!(opportunity_id = %id, "opportunity saved remotely");
        Ok(id)
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn delete_opportunity(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<()> {
        self.mutate_one::<()>(Method::DELETE, OPPORTUNITIES, tenant, opportunity_id, None).await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_line_items(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<Vec<LineItem>> {
        let rows: Vec<LineItemRow> = self
            .select(
                LINE_ITEMS,
                tenant,
                vec![
                    ("select", LINE_ITEM_COLUMNS.into()),
                    ("opportunity_id", eq(opportunity_id)),
                    ("tenant_id", eq(&tenant.tenant_id)),
                    ("order", "created_at.asc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(LineItem::from).collect())
    }
}

#[async_trait]
impl ProductCatalog for RestPipelineStore {
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_products(&self, tenant: &TenantContext) -> DomainResult<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .select(
                PRODUCTS,
                tenant,
                vec![
                    ("select", "id,name,price,active".into()),
                    ("tenant_id", eq(&tenant.tenant_id)),
                    ("active", "eq.true".into()),
                    ("order", "name.asc".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn find_product(&self, tenant: &TenantContext, product_id: &str) -> DomainResult<Option<Product>> {
        let rows: Vec<ProductRow> = self
            .select(
                PRODUCTS,
                tenant,
                vec![
                    ("select", "id,name,price,active".into()),
                    ("id", eq(product_id)),
                    ("tenant_id", eq(&tenant.tenant_id)),
                    ("active", "eq.true".into()),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(Product::from))
    }
}
