use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;

use crate::Groups;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Transport for buffered lines.
pub trait PushClient {
    /// Replaces every metric stored under the grouping key with `lines`.
    fn replace(&mut self, lines: &[String], job: Option<&str>, groups: &Groups)
        -> anyhow::Result<()>;
    /// Deletes every metric stored under the grouping key.
    fn delete(&mut self, job: Option<&str>, groups: &Groups) -> anyhow::Result<()>;
}
impl<C: PushClient + ?Sized> PushClient for &mut C {
    fn replace(
        &mut self,
        lines: &[String],
        job: Option<&str>,
        groups: &Groups,
    ) -> anyhow::Result<()> {
        (**self).replace(lines, job, groups)
    }
    fn delete(&mut self, job: Option<&str>, groups: &Groups) -> anyhow::Result<()> {
        (**self).delete(job, groups)
    }
}
impl<C: PushClient + ?Sized> PushClient for Box<C> {
    fn replace(
        &mut self,
        lines: &[String],
        job: Option<&str>,
        groups: &Groups,
    ) -> anyhow::Result<()> {
        (**self).replace(lines, job, groups)
    }
    fn delete(&mut self, job: Option<&str>, groups: &Groups) -> anyhow::Result<()> {
        (**self).delete(job, groups)
    }
}

/// Pushgateway client over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpPushClient {
    client: ureq::Agent,
    url: String,
}
impl HttpPushClient {
    pub fn new(url: impl Into<String>) -> Self {
        let client = ureq::Agent::new();
        Self::with_agent(client, url)
    }
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = ureq::AgentBuilder::new().timeout(timeout).build();
        Self::with_agent(client, url)
    }
    pub fn with_agent(client: ureq::Agent, url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `{url}/metrics/job/{job}[/{label}/{value}]*`
    pub fn grouping_url(&self, job: Option<&str>, groups: &Groups) -> anyhow::Result<String> {
        let job = job.context("job name is required")?;
        let mut url = format!("{}/metrics", self.url);
        push_label(&mut url, "job", job);
        for (name, value) in groups {
            push_label(&mut url, name, value);
        }
        Ok(url)
    }
}
impl PushClient for HttpPushClient {
    /// Blocking I/O
    fn replace(
        &mut self,
        lines: &[String],
        job: Option<&str>,
        groups: &Groups,
    ) -> anyhow::Result<()> {
        let url = self.grouping_url(job, groups)?;
        let body = lines.concat();
        tracing::debug!(%url, lines = lines.len(), "PUT metrics");
        let _resp = self
            .client
            .put(&url)
            .set("Content-Type", CONTENT_TYPE)
            .send_string(&body)
            .with_context(|| format!("PUT {url}"))?;
        Ok(())
    }
    /// Blocking I/O
    fn delete(&mut self, job: Option<&str>, groups: &Groups) -> anyhow::Result<()> {
        let url = self.grouping_url(job, groups)?;
        tracing::debug!(%url, "DELETE metrics");
        let _resp = self
            .client
            .delete(&url)
            .call()
            .with_context(|| format!("DELETE {url}"))?;
        Ok(())
    }
}

fn push_label(url: &mut String, name: &str, value: &str) {
    url.push('/');
    url.push_str(name);
    if is_plain_segment(value) {
        url.push('/');
        url.push_str(value);
        return;
    }
    url.push_str("@base64/");
    if value.is_empty() {
        url.push('=');
    } else {
        base64::engine::general_purpose::URL_SAFE.encode_string(value, url);
    }
}

/// Dot segments would be collapsed by the URL parser and address the parent group.
fn is_plain_segment(value: &str) -> bool {
    !matches!(value, "" | "." | "..") && value.bytes().all(is_unreserved)
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}
