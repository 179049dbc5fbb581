/// A JSON `POST`, the only call shape `generateContent` needs.
#[derive(Clone, PartialEq, Eq)]
pub struct JsonPost {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json: String,
}

impl JsonPost {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.to_ascii_lowercase().contains("api-key")
}

impl std::fmt::Debug for JsonPost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let v = if is_secret_header(k) { "[REDACTED]" } else { v.as_str() };
                (k.as_str(), v)
            })
            .collect();

        // Inline audio makes the payload several MB; log its size only.
        f.debug_struct("JsonPost")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("json_len", &self.json.len())
            .finish()
    }
}
