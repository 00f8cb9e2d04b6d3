use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use super::error::Result;

/// The parts of an HTTP response inventory loading looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// A sequence of requests sharing one cookie jar.
pub trait Session {
    fn get(&mut self, url: &str, basic: Option<(&str, &str)>) -> Result<HttpResponse>;
    fn post_form(&mut self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse>;
}

pub trait Transport {
    /// Open a fresh session; dropping it discards its cookies.
    fn session(&self) -> Result<Box<dyn Session>>;
}

/// Blocking reqwest client, default timeouts.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport;

impl Transport for ReqwestTransport {
    fn session(&self) -> Result<Box<dyn Session>> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: Client,
}

impl ReqwestSession {
    fn read(response: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text()?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

impl Session for ReqwestSession {
    fn get(&mut self, url: &str, basic: Option<(&str, &str)>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some((username, password)) = basic {
            request = request.basic_auth(username, Some(password));
        }
        Self::read(request.send()?)
    }

    fn post_form(&mut self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        Self::read(self.client.post(url).form(form).send()?)
    }
}
