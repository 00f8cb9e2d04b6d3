use serde_json::{Map, Value};
use tracing::debug;

use super::error::{Result, SourceError};
use super::transport::HttpResponse;
use crate::inventory::InventorySink;

pub const META: &str = "_meta";

/// Turn a response into inventory JSON, or refuse it.
pub fn validate_response(url: &str, response: &HttpResponse) -> Result<Value> {
    debug!(
        "Header Content-Type: {}",
        response.content_type.as_deref().unwrap_or("<none>")
    );
    debug!("Header Status-Code: {}", response.status);

    if response.status >= 300 {
        return Err(SourceError::Configuration(format!(
            "server returned status code {}. Maybe server is in maintenance or unreachable...",
            response.status
        )));
    }

    match response.content_type.as_deref() {
        Some(ct) if ct.contains("json") => {}
        _ => {
            return Err(SourceError::Parse(format!(
                "{url} did not return json. The page must return the same content as the \
                 `ansible-inventory --list` command."
            )))
        }
    }

    serde_json::from_str(&response.body)
        .map_err(|e| SourceError::Parse(format!("{url} returned invalid json: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Hosts,
    Children,
}

/// Feed a `--list` document to the sink: every host's vars first, then a
/// full pass adding groups and their hosts, then a second full pass adding
/// child groups.
pub fn populate<S: InventorySink + ?Sized>(sink: &mut S, data: &Value) -> Result<()> {
    let doc = data
        .as_object()
        .ok_or_else(|| SourceError::Parse("inventory document must be a JSON object".into()))?;

    add_hostvars(sink, doc)?;
    add_groups(sink, doc, Pass::Hosts)?;
    add_groups(sink, doc, Pass::Children)?;
    Ok(())
}

pub(crate) fn hostvars(doc: &Map<String, Value>) -> Result<&Map<String, Value>> {
    doc.get(META)
        .and_then(|m| m.get("hostvars"))
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::Parse(format!("inventory has no {META}.hostvars mapping")))
}

fn add_hostvars<S: InventorySink + ?Sized>(sink: &mut S, doc: &Map<String, Value>) -> Result<()> {
    for (host, vars) in hostvars(doc)? {
        let vars = vars.as_object().ok_or_else(|| {
            SourceError::Parse(format!("hostvars of '{host}' must be a mapping"))
        })?;
        debug!("Add hostvars: {host} with vars {:?}", vars);
        sink.set_host_vars(host, vars)?;
    }
    Ok(())
}

fn add_groups<S: InventorySink + ?Sized>(
    sink: &mut S,
    doc: &Map<String, Value>,
    pass: Pass,
) -> Result<()> {
    for (group, body) in doc {
        if group == META {
            continue;
        }
        let body = body
            .as_object()
            .ok_or_else(|| SourceError::Parse(format!("group '{group}' must be a mapping")))?;

        debug!("Add group: {group}");
        sink.add_group(group)?;

        match pass {
            Pass::Hosts => {
                for host in names(group, body, "hosts")? {
                    debug!("Add host: {host} to group {group}");
                    sink.add_host(host, Some(group))?;
                }
            }
            Pass::Children => {
                for child in names(group, body, "children")? {
                    debug!("Add child: {child} to group {group}");
                    sink.add_child(group, child)?;
                }
            }
        }
    }
    Ok(())
}

fn names<'a>(group: &str, body: &'a Map<String, Value>, key: &str) -> Result<Vec<&'a str>> {
    let Some(list) = body.get(key) else {
        return Ok(Vec::new());
    };
    let list = list
        .as_array()
        .ok_or_else(|| SourceError::Parse(format!("{key} of group '{group}' must be a list")))?;
    list.iter()
        .map(|v| {
            v.as_str().ok_or_else(|| {
                SourceError::Parse(format!("{key} of group '{group}' must only hold names"))
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inventory::InventoryError;
    use serde_json::json;

    /// Sink that only records the calls it receives.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub calls: Vec<String>,
    }

    impl InventorySink for RecordingSink {
        fn add_group(&mut self, name: &str) -> std::result::Result<(), InventoryError> {
            self.calls.push(format!("group {name}"));
            Ok(())
        }

        fn add_host(
            &mut self,
            host: &str,
            group: Option<&str>,
        ) -> std::result::Result<(), InventoryError> {
            self.calls
                .push(format!("host {host} -> {}", group.unwrap_or("-")));
            Ok(())
        }

        fn add_child(&mut self, parent: &str, child: &str) -> std::result::Result<(), InventoryError> {
            self.calls.push(format!("child {child} -> {parent}"));
            Ok(())
        }

        fn set_host_vars(
            &mut self,
            host: &str,
            vars: &Map<String, Value>,
        ) -> std::result::Result<(), InventoryError> {
            self.calls
                .push(format!("vars {host} {}", Value::Object(vars.clone())));
            Ok(())
        }
    }

    fn response(status: u16, content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_call_order() {
        let data = json!({
            "_meta": {"hostvars": {"h1": {"a": 1}}},
            "g1": {"hosts": ["h1"]},
            "g2": {"children": ["g1"]},
        });
        let mut sink = RecordingSink::default();
        populate(&mut sink, &data).unwrap();
        assert_eq!(
            sink.calls,
            vec![
                r#"vars h1 {"a":1}"#,
                "group g1",
                "host h1 -> g1",
                "group g2",
                "group g1",
                "group g2",
                "child g1 -> g2",
            ]
        );
    }

    #[test]
    fn test_populate_with_debug_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let data = json!({
            "_meta": {"hostvars": {"h1": {"a": 1, "nested": {"b": [true]}}}},
            "g1": {"hosts": ["h1"]},
        });
        let mut sink = RecordingSink::default();
        tracing::subscriber::with_default(subscriber, || populate(&mut sink, &data)).unwrap();
        assert_eq!(sink.calls[0], r#"vars h1 {"a":1,"nested":{"b":[true]}}"#);
    }

    #[test]
    fn test_hosts_pass_finishes_before_children() {
        let data = json!({
            "_meta": {"hostvars": {}},
            "parent": {"children": ["kid"]},
            "kid": {"hosts": ["k1"]},
        });
        let mut sink = RecordingSink::default();
        populate(&mut sink, &data).unwrap();
        let host = sink.calls.iter().position(|c| c == "host k1 -> kid").unwrap();
        let child = sink.calls.iter().position(|c| c == "child kid -> parent").unwrap();
        assert!(host < child);
    }

    #[test]
    fn test_meta_never_a_group() {
        let data = json!({"_meta": {"hostvars": {}}});
        let mut sink = RecordingSink::default();
        populate(&mut sink, &data).unwrap();
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_missing_hostvars() {
        let data = json!({"g1": {"hosts": ["h1"]}});
        let mut sink = RecordingSink::default();
        assert!(matches!(populate(&mut sink, &data), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_bad_hosts_list() {
        let data = json!({"_meta": {"hostvars": {}}, "g1": {"hosts": "h1"}});
        let mut sink = RecordingSink::default();
        assert!(matches!(populate(&mut sink, &data), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_status_404() {
        let err = validate_response("http://x", &response(404, Some("application/json"), "{}"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Configuration(ref m) if m.contains("404")));
    }

    #[test]
    fn test_status_redirect_rejected() {
        let err = validate_response("http://x", &response(302, Some("application/json"), "{}"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Configuration(_)));
    }

    #[test]
    fn test_html_rejected() {
        let err = validate_response("http://x", &response(200, Some("text/html"), "<html/>"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(ref m) if m.contains("did not return json")));
    }

    #[test]
    fn test_missing_content_type_rejected() {
        let err = validate_response("http://x", &response(200, None, "{}")).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_json_accepted() {
        let value = validate_response(
            "http://x",
            &response(200, Some("application/json; charset=utf-8"), r#"{"_meta": {}}"#),
        )
        .unwrap();
        assert_eq!(value, json!({"_meta": {}}));
    }

    #[test]
    fn test_invalid_json_body() {
        let err = validate_response("http://x", &response(200, Some("application/json"), "{"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
