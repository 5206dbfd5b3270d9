//! REST implementation of [`CloudApi`] for Compute Engine and Cloud DNS.
//!
//! Requests carry an OAuth bearer token. Non-success responses become
//! [`ApiError::Status`] with the service's error message, so a `409` on an
//! insert surfaces as a conflict to the idempotent creator.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cloud::{
    ApiError, CloudApi, CloudFuture, ForwardingRuleState, Operation, OperationHandle,
};
use crate::resources::{
    DnsChange, ForwardingRule, Instance, InstanceGroupMembership, ResourceRecordSet,
    TargetHttpsProxy,
};

mod wire;

use wire::{ListPage, RecordSetPage, WireForwardingRule, WireImage, WireOperation};

/// Default Compute Engine API root.
pub const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";
/// Default Cloud DNS API root.
pub const DNS_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Compute Engine and Cloud DNS client authenticated with a bearer token.
#[derive(Clone)]
pub struct GceClient {
    http: Client,
    access_token: String,
    compute_base: String,
    dns_base: String,
}

impl fmt::Debug for GceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GceClient")
            .field("compute_base", &self.compute_base)
            .field("dns_base", &self.dns_base)
            .finish_non_exhaustive()
    }
}

fn transport(err: &reqwest::Error) -> ApiError {
    ApiError::Transport {
        message: err.to_string(),
    }
}

impl GceClient {
    /// Creates a client that talks to the public Google endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| transport(&err))?;
        Ok(Self {
            http,
            access_token: access_token.into(),
            compute_base: String::from(COMPUTE_API_BASE),
            dns_base: String::from(DNS_API_BASE),
        })
    }

    /// Points the client at alternative API roots, for example an emulator.
    #[must_use]
    pub fn with_base_urls(mut self, compute: impl Into<String>, dns: impl Into<String>) -> Self {
        let compute_root: String = compute.into();
        let dns_root: String = dns.into();
        self.compute_base = compute_root.trim_end_matches('/').to_owned();
        self.dns_base = dns_root.trim_end_matches('/').to_owned();
        self
    }

    fn compute_url(&self, path: &str) -> String {
        format!("{}/{path}", self.compute_base)
    }

    fn dns_url(&self, path: &str) -> String {
        format!("{}/{path}", self.dns_base)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|err| transport(&err))?;

        if status.is_success() {
            return Ok(body.to_vec());
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            details: wire::error_details(&body),
        })
    }

    async fn fetch<T>(&self, request: RequestBuilder, resource: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    async fn insert<B, T>(&self, url: String, body: &B, resource: &str) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, resource, "POST");
        self.fetch(self.http.post(url).json(body), resource).await
    }

    async fn remove(&self, url: String) -> Result<(), ApiError> {
        debug!(%url, "DELETE");
        self.execute(self.http.delete(url)).await.map(drop)
    }

    async fn list_names(&self, url: String, resource: &str) -> Result<Vec<String>, ApiError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let page: ListPage = self.fetch(request, resource).await?;
            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(names),
            }
        }
    }

    async fn list_all_record_sets(
        &self,
        project: &str,
        managed_zone: &str,
    ) -> Result<Vec<ResourceRecordSet>, ApiError> {
        let url = self.dns_url(&format!(
            "projects/{project}/managedZones/{managed_zone}/rrsets"
        ));
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let page: RecordSetPage = self.fetch(request, "record set list").await?;
            records.extend(page.rrsets);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(records),
            }
        }
    }
}

type Ignored = serde::de::IgnoredAny;

impl CloudApi for GceClient {
    fn create_proxy<'a>(
        &'a self,
        project: &'a str,
        body: &'a TargetHttpsProxy,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/global/targetHttpsProxies"));
            self.insert::<_, Ignored>(url, body, "target proxy insert")
                .await
                .map(drop)
        })
    }

    fn create_forwarding_rule<'a>(
        &'a self,
        project: &'a str,
        body: &'a ForwardingRule,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/global/forwardingRules"));
            self.insert::<_, Ignored>(url, body, "forwarding rule insert")
                .await
                .map(drop)
        })
    }

    fn latest_image<'a>(
        &'a self,
        image_project: &'a str,
        family: &'a str,
    ) -> CloudFuture<'a, String> {
        Box::pin(async move {
            let url = self.compute_url(&format!(
                "projects/{image_project}/global/images/family/{family}"
            ));
            let image: WireImage = self.fetch(self.http.get(url), "image").await?;
            Ok(image.self_link)
        })
    }

    fn create_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        body: &'a Instance,
    ) -> CloudFuture<'a, OperationHandle> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/zones/{zone}/instances"));
            let operation: WireOperation = self.insert(url, body, "instance insert").await?;
            Ok(operation.into_operation(zone).handle)
        })
    }

    fn attach_instance_to_group<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        group: &'a str,
        instance_link: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url = self.compute_url(&format!(
                "projects/{project}/zones/{zone}/instanceGroups/{group}/addInstances"
            ));
            let membership = InstanceGroupMembership::single(instance_link);
            self.insert::<_, Ignored>(url, &membership, "instance group add")
                .await
                .map(drop)
        })
    }

    fn get_forwarding_rule<'a>(
        &'a self,
        project: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ForwardingRuleState> {
        Box::pin(async move {
            let url =
                self.compute_url(&format!("projects/{project}/global/forwardingRules/{name}"));
            let rule: WireForwardingRule =
                self.fetch(self.http.get(url), "forwarding rule").await?;
            Ok(ForwardingRuleState {
                name: rule.name,
                ip_address: rule.ip_address,
            })
        })
    }

    fn get_operation<'a>(
        &'a self,
        project: &'a str,
        handle: &'a OperationHandle,
    ) -> CloudFuture<'a, Operation> {
        Box::pin(async move {
            let url = self.compute_url(&format!(
                "projects/{project}/zones/{}/operations/{}",
                handle.zone, handle.name
            ));
            let operation: WireOperation = self.fetch(self.http.get(url), "operation").await?;
            Ok(operation.into_operation(&handle.zone))
        })
    }

    fn list_instances<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
    ) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/zones/{zone}/instances"));
            self.list_names(url, "instance list").await
        })
    }

    fn list_forwarding_rules<'a>(&'a self, project: &'a str) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/global/forwardingRules"));
            self.list_names(url, "forwarding rule list").await
        })
    }

    fn list_proxies<'a>(&'a self, project: &'a str) -> CloudFuture<'a, Vec<String>> {
        Box::pin(async move {
            let url = self.compute_url(&format!("projects/{project}/global/targetHttpsProxies"));
            self.list_names(url, "target proxy list").await
        })
    }

    fn delete_instance<'a>(
        &'a self,
        project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url =
                self.compute_url(&format!("projects/{project}/zones/{zone}/instances/{name}"));
            self.remove(url).await
        })
    }

    fn delete_forwarding_rule<'a>(
        &'a self,
        project: &'a str,
        name: &'a str,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url =
                self.compute_url(&format!("projects/{project}/global/forwardingRules/{name}"));
            self.remove(url).await
        })
    }

    fn delete_proxy<'a>(&'a self, project: &'a str, name: &'a str) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url = self.compute_url(&format!(
                "projects/{project}/global/targetHttpsProxies/{name}"
            ));
            self.remove(url).await
        })
    }

    fn list_record_sets<'a>(
        &'a self,
        project: &'a str,
        managed_zone: &'a str,
    ) -> CloudFuture<'a, Vec<ResourceRecordSet>> {
        Box::pin(async move { self.list_all_record_sets(project, managed_zone).await })
    }

    fn apply_dns_change<'a>(
        &'a self,
        project: &'a str,
        managed_zone: &'a str,
        change: &'a DnsChange,
    ) -> CloudFuture<'a, ()> {
        Box::pin(async move {
            let url = self.dns_url(&format!(
                "projects/{project}/managedZones/{managed_zone}/changes"
            ));
            self.insert::<_, Ignored>(url, change, "DNS change")
                .await
                .map(drop)
        })
    }
}
